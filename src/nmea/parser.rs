//! # Sentence Parser
//!
//! Classifies raw lines from the GPS receiver and turns the two sentence
//! types that carry a position (GGA and RMC) into canonical records.
//!
//! A `None` return is the normal case, not an error: most lines on the wire
//! are other sentence types, lines without a fix, or corrupted telemetry,
//! and all of them are simply dropped.

use chrono::Utc;
use tracing::debug;

use super::coordinates::to_decimal_degrees;
use crate::record::PositionRecord;

/// Knots to km/h, the unit the collector expects
const KNOTS_TO_KMH: f64 = 1.852;

/// A full GGA sentence carries 15 comma-separated fields
const GGA_MIN_FIELDS: usize = 15;

/// RMC needs at least the status, position and speed fields
const RMC_MIN_FIELDS: usize = 10;

/// Stateless per-line parser for the local receiver's sentence stream.
///
/// Holds only the record defaults (the node's own identifier and the
/// unknown-signal sentinel); each `parse` call classifies one line
/// independently.
pub struct SentenceParser {
    source_id: String,
    default_signal_strength: i32,
}

impl SentenceParser {
    pub fn new(source_id: impl Into<String>, default_signal_strength: i32) -> Self {
        Self {
            source_id: source_id.into(),
            default_signal_strength,
        }
    }

    /// Parse one sentence line into a canonical record.
    ///
    /// Returns `None` for anything that is not forwardable telemetry:
    /// unrecognized sentence types, sentences without a valid fix, and
    /// sentences whose coordinate fields fail to convert. The record's
    /// timestamp is the receipt time, never a time field from the sentence.
    pub fn parse(&self, line: &str) -> Option<PositionRecord> {
        let line = line.trim();
        if !line.starts_with('$') {
            return None;
        }

        let parts: Vec<&str> = line.split(',').collect();

        if line.starts_with("$GPGGA") || line.starts_with("$GNGGA") {
            self.parse_gga(&parts)
        } else if line.starts_with("$GPRMC") || line.starts_with("$GNRMC") {
            self.parse_rmc(&parts)
        } else {
            None
        }
    }

    /// GGA: position plus fix quality (field 6, `0` means no fix)
    fn parse_gga(&self, parts: &[&str]) -> Option<PositionRecord> {
        if parts.len() < GGA_MIN_FIELDS {
            return None;
        }

        match parts[6].parse::<u8>() {
            Ok(quality) if quality != 0 => {}
            _ => return None,
        }

        if parts[2].is_empty() || parts[4].is_empty() {
            return None;
        }

        let latitude = self.convert_field(parts[2], parts[3])?;
        let longitude = self.convert_field(parts[4], parts[5])?;

        self.build_record(latitude, longitude, 0.0)
    }

    /// RMC: position plus speed over ground, gated on the A/V status field
    fn parse_rmc(&self, parts: &[&str]) -> Option<PositionRecord> {
        if parts.len() < RMC_MIN_FIELDS {
            return None;
        }

        if parts[2] != "A" {
            return None;
        }

        if parts[3].is_empty() || parts[5].is_empty() {
            return None;
        }

        let latitude = self.convert_field(parts[3], parts[4])?;
        let longitude = self.convert_field(parts[5], parts[6])?;

        // Speed over ground in knots (field 7), optional
        let speed = parts[7]
            .parse::<f64>()
            .map(|knots| (knots * KNOTS_TO_KMH).max(0.0))
            .unwrap_or(0.0);

        self.build_record(latitude, longitude, speed)
    }

    fn convert_field(&self, raw: &str, hemisphere: &str) -> Option<f64> {
        match to_decimal_degrees(raw, hemisphere) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("dropping sentence: {}", e);
                None
            }
        }
    }

    fn build_record(&self, latitude: f64, longitude: f64, speed: f64) -> Option<PositionRecord> {
        let record = PositionRecord {
            source_id: self.source_id.clone(),
            latitude,
            longitude,
            speed,
            signal_strength: self.default_signal_strength,
            timestamp: Utc::now(),
            fix_valid: true,
        };

        record.is_forwardable().then_some(record)
    }
}
