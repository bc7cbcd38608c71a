//! # Source Module
//!
//! Opening and polling the two telemetry inputs.
//!
//! This module handles:
//! - Probing candidate serial device paths in order (GPS receiver, LoRa modem)
//! - Bounded non-blocking polls of the open port
//! - Buffering partial input until a line terminator arrives

pub mod transport;

use std::io;
use std::time::Duration;

use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::error::{GpsBridgeError, Result};
use transport::{FrameTransport, TokioSerialTransport};

/// Upper bound for a single poll read. Short enough that an idle source
/// never stalls the loop past its quantum.
const POLL_READ_BOUND: Duration = Duration::from_millis(10);

/// Pending bytes cap. A stream that never sends a terminator (wrong baud
/// rate, line noise) must not grow the buffer forever.
const MAX_PENDING_BYTES: usize = 4096;

/// Splits a raw byte stream into complete, terminator-delimited frames.
///
/// Partial input stays buffered until its line break arrives; carriage
/// returns are stripped; blank lines are skipped.
#[derive(Debug, Default)]
pub struct LineFramer {
    pending: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);

        if self.pending.len() > MAX_PENDING_BYTES && !self.pending.contains(&b'\n') {
            debug!("discarding {} unterminated bytes", self.pending.len());
            self.pending.clear();
        }
    }

    /// Next complete frame, if one is buffered.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        while let Some(position) = self.pending.iter().position(|&b| b == b'\n') {
            let mut frame: Vec<u8> = self.pending.drain(..=position).collect();
            frame.pop(); // the terminator itself
            if frame.last() == Some(&b'\r') {
                frame.pop();
            }

            if !frame.is_empty() {
                return Some(frame);
            }
        }

        None
    }
}

/// One polled telemetry input: a byte transport plus line framing.
pub struct TelemetrySource {
    name: &'static str,
    transport: Box<dyn FrameTransport>,
    framer: LineFramer,
}

impl TelemetrySource {
    pub fn new(name: &'static str, transport: Box<dyn FrameTransport>) -> Self {
        Self {
            name,
            transport,
            framer: LineFramer::new(),
        }
    }

    /// Label used in diagnostics ("gps", "radio")
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Poll for the next complete frame.
    ///
    /// Drains an already-buffered frame first; otherwise performs one
    /// bounded read and re-checks. Never blocks past the read bound.
    pub async fn poll_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        if let Some(frame) = self.framer.next_frame() {
            return Ok(Some(frame));
        }

        if let Some(chunk) = self.transport.poll_bytes(POLL_READ_BOUND).await? {
            self.framer.push(&chunk);
        }

        Ok(self.framer.next_frame())
    }
}

/// Open a serial telemetry source, probing candidate device paths in order.
///
/// # Errors
///
/// Returns `SourceUnavailable` when none of the candidates opens. The
/// caller treats this as fatal: a pipeline without its source has nothing
/// to decode.
pub fn open_serial_source(
    name: &'static str,
    paths: &[String],
    baud_rate: u32,
) -> Result<TelemetrySource> {
    for path in paths {
        debug!("trying to open {} source at {}", name, path);

        match open_port(path, baud_rate) {
            Ok(port) => {
                info!("{} source opened at {} ({} baud)", name, path, baud_rate);
                return Ok(TelemetrySource::new(
                    name,
                    Box::new(TokioSerialTransport::new(port)),
                ));
            }
            Err(e) => {
                warn!("failed to open {}: {}", path, e);
                continue;
            }
        }
    }

    Err(GpsBridgeError::SourceUnavailable(format!(
        "no {} device found at any of: {}",
        name,
        paths.join(", ")
    )))
}

/// Open a specific serial port with 8N1 settings
fn open_port(path: &str, baud_rate: u32) -> std::result::Result<tokio_serial::SerialStream, tokio_serial::Error> {
    tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
}

#[cfg(test)]
mod tests {
    use super::*;
    use transport::mocks::ScriptedTransport;

    #[test]
    fn test_framer_buffers_partial_lines() {
        let mut framer = LineFramer::new();

        framer.push(b"$GPGGA,1235");
        assert!(framer.next_frame().is_none());

        framer.push(b"19,4807.038,N\n");
        assert_eq!(framer.next_frame().unwrap(), b"$GPGGA,123519,4807.038,N");
        assert!(framer.next_frame().is_none());
    }

    #[test]
    fn test_framer_splits_multiple_lines() {
        let mut framer = LineFramer::new();
        framer.push(b"first\nsecond\nthird");

        assert_eq!(framer.next_frame().unwrap(), b"first");
        assert_eq!(framer.next_frame().unwrap(), b"second");
        assert!(framer.next_frame().is_none()); // "third" still pending
    }

    #[test]
    fn test_framer_strips_carriage_return() {
        let mut framer = LineFramer::new();
        framer.push(b"BUS001,40.7,-74.0,85\r\n");
        assert_eq!(framer.next_frame().unwrap(), b"BUS001,40.7,-74.0,85");
    }

    #[test]
    fn test_framer_skips_blank_lines() {
        let mut framer = LineFramer::new();
        framer.push(b"\r\n\nactual\n");
        assert_eq!(framer.next_frame().unwrap(), b"actual");
    }

    #[test]
    fn test_framer_discards_runaway_garbage() {
        let mut framer = LineFramer::new();
        framer.push(&vec![b'x'; MAX_PENDING_BYTES + 1]);
        assert!(framer.next_frame().is_none());

        // buffer was reset; a fresh clean line still comes through
        framer.push(b"clean\n");
        assert_eq!(framer.next_frame().unwrap(), b"clean");
    }

    #[tokio::test]
    async fn test_source_polls_one_frame_at_a_time() {
        let transport = ScriptedTransport::new(vec![b"line-a\nline-b\n"]);
        let mut source = TelemetrySource::new("radio", Box::new(transport));

        assert_eq!(source.poll_frame().await.unwrap().unwrap(), b"line-a");
        assert_eq!(source.poll_frame().await.unwrap().unwrap(), b"line-b");
        assert!(source.poll_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_source_reassembles_across_chunks() {
        let transport = ScriptedTransport::new(vec![b"$GPRMC,12", b"3519,A\n"]);
        let mut source = TelemetrySource::new("gps", Box::new(transport));

        assert!(source.poll_frame().await.unwrap().is_none());
        assert_eq!(source.poll_frame().await.unwrap().unwrap(), b"$GPRMC,123519,A");
    }

    #[tokio::test]
    async fn test_source_surfaces_transport_errors() {
        let transport = ScriptedTransport::new(vec![]).failing_after_script();
        let mut source = TelemetrySource::new("gps", Box::new(transport));

        assert!(source.poll_frame().await.is_err());
    }

    #[test]
    fn test_open_serial_source_no_device() {
        let paths = vec![
            "/dev/nonexistent0".to_string(),
            "/dev/nonexistent1".to_string(),
        ];
        let result = open_serial_source("radio", &paths, 9600);

        match result {
            Err(GpsBridgeError::SourceUnavailable(msg)) => {
                assert!(msg.contains("/dev/nonexistent0"));
                assert!(msg.contains("/dev/nonexistent1"));
            }
            other => panic!("expected SourceUnavailable, got: {:?}", other.err()),
        }
    }

    #[test]
    fn test_open_serial_source_empty_path_list() {
        let result = open_serial_source("gps", &[], 9600);
        assert!(matches!(result, Err(GpsBridgeError::SourceUnavailable(_))));
    }
}
