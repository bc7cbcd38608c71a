//! # Canonical Position Record
//!
//! The single normalized telemetry unit flowing through the pipeline.
//!
//! Every decoder (NMEA sentences from the local receiver, LoRa payloads from
//! remote nodes) converges to this shape, and the forwarder serializes it
//! verbatim as the collector's JSON body.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// One normalized position reading.
///
/// Records are created fresh by a decoder on each successful decode and are
/// never mutated afterwards; the filter and the forwarder only keep clones
/// of the most recent one for comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionRecord {
    /// Identifier of the emitting node (configured fallback when the
    /// payload carries none)
    #[serde(rename = "sourceId")]
    pub source_id: String,

    /// Signed decimal degrees, [-90, 90]
    pub latitude: f64,

    /// Signed decimal degrees, [-180, 180]
    pub longitude: f64,

    /// Ground speed in km/h, 0 when unknown
    pub speed: f64,

    /// Reported link quality; the configured sentinel when unknown
    #[serde(rename = "signalStrength")]
    pub signal_strength: i32,

    /// Receipt time, assigned at normalization. Device clocks upstream are
    /// unreliable, so time fields inside the telemetry are ignored.
    #[serde(serialize_with = "serialize_wire_timestamp")]
    pub timestamp: DateTime<Utc>,

    /// True only when the decoder had definitive evidence of a valid fix
    #[serde(skip)]
    pub fix_valid: bool,
}

impl PositionRecord {
    /// False when both coordinates sit exactly on `(0, 0)`, the not-fixed
    /// sentinel. A genuine position near zero still passes; only the exact
    /// pair is reserved.
    pub fn has_position(&self) -> bool {
        !(self.latitude == 0.0 && self.longitude == 0.0)
    }

    /// Whether this record may be handed to the filter and forwarder:
    /// a valid fix with real coordinates.
    pub fn is_forwardable(&self) -> bool {
        self.fix_valid && self.has_position()
    }

    /// Compare the reading itself, ignoring the receipt timestamp.
    ///
    /// Two records taken seconds apart from a stationary node carry the
    /// same reading even though their timestamps differ.
    pub fn same_reading(&self, other: &PositionRecord) -> bool {
        self.source_id == other.source_id
            && self.latitude == other.latitude
            && self.longitude == other.longitude
            && self.speed == other.speed
            && self.signal_strength == other.signal_strength
    }
}

/// Collector wire format: `2024-05-01T12:30:45`, no sub-second part, no
/// zone suffix.
fn serialize_wire_timestamp<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&timestamp.format("%Y-%m-%dT%H:%M:%S").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record_at(latitude: f64, longitude: f64) -> PositionRecord {
        PositionRecord {
            source_id: "BUS001".to_string(),
            latitude,
            longitude,
            speed: 0.0,
            signal_strength: -1,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 45).unwrap(),
            fix_valid: true,
        }
    }

    #[test]
    fn test_wire_shape_field_names() {
        let json = serde_json::to_value(record_at(40.7128, -74.0060)).unwrap();

        assert_eq!(json["sourceId"], "BUS001");
        assert_eq!(json["latitude"], 40.7128);
        assert_eq!(json["longitude"], -74.0060);
        assert_eq!(json["speed"], 0.0);
        assert_eq!(json["signalStrength"], -1);
        assert_eq!(json["timestamp"], "2024-05-01T12:30:45");

        // fix_valid is pipeline-internal, never on the wire
        assert!(json.get("fixValid").is_none());
        assert!(json.get("fix_valid").is_none());
    }

    #[test]
    fn test_origin_pair_is_not_a_position() {
        assert!(!record_at(0.0, 0.0).has_position());
        assert!(!record_at(0.0, 0.0).is_forwardable());
    }

    #[test]
    fn test_near_zero_coordinates_are_real() {
        // Gulf of Guinea is a legitimate place to be
        assert!(record_at(0.0001, 0.0).has_position());
        assert!(record_at(0.0, 6.5).has_position());
    }

    #[test]
    fn test_same_reading_ignores_timestamp() {
        let a = record_at(40.7128, -74.0060);
        let mut b = a.clone();
        b.timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 55).unwrap();

        assert!(a.same_reading(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_same_reading_detects_field_change() {
        let a = record_at(40.7128, -74.0060);

        let mut moved = a.clone();
        moved.latitude += 0.0005;
        assert!(!a.same_reading(&moved));

        let mut renamed = a.clone();
        renamed.source_id = "BUS002".to_string();
        assert!(!a.same_reading(&renamed));

        let mut remeasured = a.clone();
        remeasured.signal_strength = 85;
        assert!(!a.same_reading(&remeasured));
    }
}
