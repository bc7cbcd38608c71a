//! # Forwarder
//!
//! Submits canonical records to the collector endpoint.
//!
//! One HTTP POST per call, JSON body, bounded timeout. The forwarder never
//! retries on its own — a failed send comes back as a typed `SendError` and
//! the pipeline decides when to attempt again. The only state kept is the
//! last successfully sent record, used to skip byte-identical re-sends.

use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use crate::error::{GpsBridgeError, Result, SendError};
use crate::record::PositionRecord;

/// Collector acknowledgement: any 2xx response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    /// The actual status the collector answered with
    pub status: u16,
}

/// HTTP uplink to the collector.
pub struct Forwarder {
    client: reqwest::Client,
    endpoint: String,
    last_sent: Option<PositionRecord>,
}

impl Forwarder {
    /// Build a forwarder for `endpoint` with a hard per-request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GpsBridgeError::Http(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            last_sent: None,
        })
    }

    /// The configured collector URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether `record` carries the same reading as the last record the
    /// collector acknowledged. Lets the pipeline skip a re-send that the
    /// change filter alone cannot rule out (e.g. after a failed send).
    pub fn is_duplicate(&self, record: &PositionRecord) -> bool {
        self.last_sent
            .as_ref()
            .map_or(false, |last| last.same_reading(record))
    }

    /// POST one record to the collector.
    ///
    /// On a 2xx response the record becomes the new last-sent reference.
    /// On failure nothing is stored and nothing is queued; the record is
    /// the pipeline's to re-attempt or drop.
    pub async fn send(&mut self, record: &PositionRecord) -> std::result::Result<Ack, SendError> {
        let ack = self.post(record).await?;
        self.last_sent = Some(record.clone());
        debug!(
            "forwarded {} at ({:.6}, {:.6}), HTTP {}",
            record.source_id, record.latitude, record.longitude, ack.status
        );
        Ok(ack)
    }

    /// Startup reachability probe with a synthetic test record, mirroring
    /// what an operator would send by hand. Does not touch the last-sent
    /// reference: a probe is not a reading.
    pub async fn check_connectivity(&self) -> std::result::Result<(), SendError> {
        let probe = PositionRecord {
            source_id: "TEST001".to_string(),
            latitude: 40.7128,
            longitude: -74.0060,
            speed: 0.0,
            signal_strength: 100,
            timestamp: Utc::now(),
            fix_valid: true,
        };

        self.post(&probe).await.map(|_| ())
    }

    async fn post(&self, record: &PositionRecord) -> std::result::Result<Ack, SendError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(record)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SendError::Timeout
                } else {
                    SendError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SendError::Status(status.as_u16()));
        }

        Ok(Ack {
            status: status.as_u16(),
        })
    }
}
