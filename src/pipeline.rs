//! # Pipeline
//!
//! The single control loop: poll each source, decode, filter, forward.
//!
//! One cooperative task owns every stage, so the filter's and forwarder's
//! held references need no locking. Each iteration does a bounded amount of
//! work and the loop then sleeps its fixed quantum — the only suspension
//! point. Per-record failures (corrupt telemetry, collector errors) are
//! absorbed inside the iteration that saw them; the loop itself only ends
//! on Ctrl-C.

use std::time::{Duration, Instant};

use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::filter::{ChangeFilter, RefreshGate};
use crate::forward::Forwarder;
use crate::nmea::parser::SentenceParser;
use crate::radio::decoder::PayloadDecoder;
use crate::record::PositionRecord;
use crate::source::TelemetrySource;

/// Which decoder a source's frames go through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// NMEA sentences from the local GPS receiver
    DeviceNmea,
    /// Opaque payload frames from the LoRa modem
    RadioPayload,
}

/// Lifetime counters, reported at shutdown and on status lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineTotals {
    pub decoded: u64,
    pub forwarded: u64,
    pub send_failures: u64,
}

/// The decode-and-forward loop.
pub struct Pipeline {
    sources: Vec<(SourceKind, TelemetrySource)>,
    parser: SentenceParser,
    decoder: PayloadDecoder,
    filter: ChangeFilter,
    refresh: RefreshGate,
    forwarder: Forwarder,
    poll_interval: Duration,
    totals: PipelineTotals,
}

impl Pipeline {
    /// Assemble the loop from configuration. Sources are attached
    /// afterwards with [`add_source`](Self::add_source) — opening them is
    /// the caller's job, since failure to open is fatal while everything
    /// in here is not.
    pub fn new(config: &Config, forwarder: Forwarder) -> Self {
        Self {
            sources: Vec::new(),
            parser: SentenceParser::new(
                config.record.default_source_id.clone(),
                config.record.default_signal_strength,
            ),
            decoder: PayloadDecoder::new(
                config.record.default_source_id.clone(),
                config.record.default_signal_strength,
            ),
            filter: ChangeFilter::new(),
            refresh: RefreshGate::new(Duration::from_millis(config.pipeline.refresh_interval_ms)),
            forwarder,
            poll_interval: Duration::from_millis(config.pipeline.poll_interval_ms),
            totals: PipelineTotals::default(),
        }
    }

    pub fn add_source(&mut self, kind: SourceKind, source: TelemetrySource) {
        self.sources.push((kind, source));
    }

    pub fn totals(&self) -> PipelineTotals {
        self.totals
    }

    /// Run until Ctrl-C.
    ///
    /// Any input still sitting in a source's line buffer at shutdown is
    /// discarded with the pipeline — there is no drain phase.
    pub async fn run(&mut self) -> Result<()> {
        let mut quantum = interval(self.poll_interval);

        info!(
            "pipeline started: {} source(s), {}ms poll quantum",
            self.sources.len(),
            self.poll_interval.as_millis()
        );

        loop {
            tokio::select! {
                _ = quantum.tick() => {
                    self.tick(Instant::now()).await;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("received Ctrl+C, shutting down...");
                    break;
                }
            }
        }

        info!(
            "pipeline stopped: {} decoded, {} forwarded, {} send failures",
            self.totals.decoded, self.totals.forwarded, self.totals.send_failures
        );
        Ok(())
    }

    /// One loop iteration: at most one frame per source, then the
    /// refresh-gated housekeeping.
    pub async fn tick(&mut self, now: Instant) {
        for index in 0..self.sources.len() {
            let kind = self.sources[index].0;
            let polled = self.sources[index].1.poll_frame().await;

            match polled {
                Ok(Some(frame)) => {
                    if let Some(record) = self.decode(kind, &frame) {
                        self.handle_record(record).await;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    // transient read trouble; the source stays attached
                    warn!("{} source read error: {}", self.sources[index].1.name(), e);
                }
            }
        }

        if self.refresh.should_refresh(now) {
            self.resend_pending().await;
            debug!(
                "status: {} decoded, {} forwarded, {} send failures",
                self.totals.decoded, self.totals.forwarded, self.totals.send_failures
            );
        }
    }

    fn decode(&mut self, kind: SourceKind, frame: &[u8]) -> Option<PositionRecord> {
        let record = match kind {
            SourceKind::DeviceNmea => self.parser.parse(&String::from_utf8_lossy(frame)),
            SourceKind::RadioPayload => self.decoder.decode(frame),
        }?;

        self.totals.decoded += 1;
        Some(record)
    }

    async fn handle_record(&mut self, record: PositionRecord) {
        if !self.filter.accept(&record) {
            debug!("unchanged reading from {}, suppressed", record.source_id);
            return;
        }

        if self.forwarder.is_duplicate(&record) {
            debug!("reading already acknowledged by collector, skipping send");
            return;
        }

        self.send(&record).await;
    }

    /// A reading the filter accepted but the collector never acknowledged
    /// (a prior send failed) is re-attempted here, paced by the refresh
    /// gate rather than per-tick hammering.
    async fn resend_pending(&mut self) {
        let pending = self
            .filter
            .last_accepted()
            .filter(|record| !self.forwarder.is_duplicate(record))
            .cloned();

        if let Some(record) = pending {
            debug!("re-attempting unsent reading from {}", record.source_id);
            self.send(&record).await;
        }
    }

    async fn send(&mut self, record: &PositionRecord) {
        match self.forwarder.send(record).await {
            Ok(_) => {
                self.totals.forwarded += 1;
            }
            Err(e) => {
                self.totals.send_failures += 1;
                warn!("send failed: {} (will retry next cycle)", e);
            }
        }
    }
}
