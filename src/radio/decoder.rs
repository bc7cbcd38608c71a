//! # Payload Decoder
//!
//! Remote nodes are not under this system's control: some transmit the
//! compact delimited format, some send JSON, and a weak link can wrap
//! either in garbage bytes. The decoder runs a fixed, ordered chain of
//! strategies and the first one that produces two plausible coordinates
//! wins, so identical bytes always decode identically.

use chrono::Utc;
use tracing::debug;

use crate::record::PositionRecord;

/// Fields recovered by a strategy before record assembly. Strategies fill
/// what they can; missing identifier and signal strength take the
/// configured defaults.
#[derive(Debug, Default)]
struct DecodedFields {
    source_id: Option<String>,
    latitude: f64,
    longitude: f64,
    speed: Option<f64>,
    signal_strength: Option<i32>,
}

/// Decoder for one radio frame at a time.
pub struct PayloadDecoder {
    default_source_id: String,
    default_signal_strength: i32,
}

impl PayloadDecoder {
    pub fn new(default_source_id: impl Into<String>, default_signal_strength: i32) -> Self {
        Self {
            default_source_id: default_source_id.into(),
            default_signal_strength,
        }
    }

    /// Decode one frame into a canonical record.
    ///
    /// Strategy order is fixed: delimited fields, then an embedded JSON
    /// object, then a free-text numeric scan. A strategy that cannot make
    /// sense of the payload falls through to the next; only when all three
    /// fail (or the result is the `(0,0)` not-fixed sentinel) is the frame
    /// dropped with `None`.
    pub fn decode(&self, raw: &[u8]) -> Option<PositionRecord> {
        let text = String::from_utf8_lossy(raw);
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let fields = decode_delimited(text)
            .or_else(|| decode_embedded_json(text))
            .or_else(|| decode_numeric_scan(text));

        let Some(fields) = fields else {
            debug!("unrecognized payload format ({} bytes)", raw.len());
            return None;
        };

        let record = PositionRecord {
            source_id: fields
                .source_id
                .unwrap_or_else(|| self.default_source_id.clone()),
            latitude: fields.latitude,
            longitude: fields.longitude,
            speed: fields.speed.unwrap_or(0.0).max(0.0),
            signal_strength: fields
                .signal_strength
                .unwrap_or(self.default_signal_strength),
            timestamp: Utc::now(),
            fix_valid: true,
        };

        if !record.is_forwardable() {
            debug!("payload decoded to the not-fixed sentinel, dropping");
            return None;
        }

        Some(record)
    }
}

/// Strategy 1: comma-delimited fields, no JSON markers anywhere.
///
/// Two fields are a bare `lat,lng` pair; three or more are
/// `id,lat,lng[,speed],signal`. A field that fails numeric parsing aborts
/// this strategy only — the chain continues.
fn decode_delimited(text: &str) -> Option<DecodedFields> {
    if !text.contains(',') || text.contains('{') || text.contains('}') {
        return None;
    }

    let parts: Vec<&str> = text.split(',').map(str::trim).collect();

    match parts.len() {
        2 => {
            let latitude = parts[0].parse().ok()?;
            let longitude = parts[1].parse().ok()?;
            Some(DecodedFields {
                latitude,
                longitude,
                ..Default::default()
            })
        }
        n if n >= 3 => {
            let source_id = (!parts[0].is_empty()).then(|| parts[0].to_string());
            let latitude = parts[1].parse().ok()?;
            let longitude = parts[2].parse().ok()?;

            // Four fields carry signal strength; five carry speed first
            let (speed, signal_strength) = if n == 3 {
                (None, None)
            } else if n == 4 {
                (None, Some(parts[3].parse().ok()?))
            } else {
                let speed = if parts[3].is_empty() {
                    0.0
                } else {
                    parts[3].parse().ok()?
                };
                (Some(speed), Some(parts[4].parse().ok()?))
            };

            Some(DecodedFields {
                source_id,
                latitude,
                longitude,
                speed,
                signal_strength,
            })
        }
        _ => None,
    }
}

/// Strategy 2: a JSON object somewhere in the payload.
///
/// Radio noise before and after the object is tolerated: everything between
/// the first `{` and the last `}` is handed to the JSON parser. Keys are
/// matched case-insensitively and numeric-looking strings are coerced.
fn decode_embedded_json(text: &str) -> Option<DecodedFields> {
    let open = text.find('{')?;
    let close = text.rfind('}')?;
    if close <= open {
        return None;
    }

    let value: serde_json::Value = serde_json::from_str(&text[open..=close]).ok()?;
    let object = value.as_object()?;

    let lookup = |names: &[&str]| -> Option<serde_json::Value> {
        object.iter().find_map(|(key, v)| {
            let key = key.to_ascii_lowercase();
            names.contains(&key.as_str()).then(|| v.clone())
        })
    };

    let latitude = coerce_f64(&lookup(&["latitude", "lat"])?)?;
    let longitude = coerce_f64(&lookup(&["longitude", "lng", "lon"])?)?;

    let source_id = lookup(&["busid", "sourceid", "id"]).and_then(|v| match v {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    });

    let speed = lookup(&["speed"]).as_ref().and_then(coerce_f64);
    let signal_strength = lookup(&["signalstrength", "signal"])
        .as_ref()
        .and_then(coerce_i32);

    Some(DecodedFields {
        source_id,
        latitude,
        longitude,
        speed,
        signal_strength,
    })
}

/// Strategy 3: scan free text for signed decimal numbers, left to right.
/// The first two found become latitude and longitude. Integers without a
/// decimal point do not count — too many incidental counters look like
/// coordinates otherwise.
fn decode_numeric_scan(text: &str) -> Option<DecodedFields> {
    let numbers = scan_decimal_numbers(text, 2);
    if numbers.len() < 2 {
        return None;
    }

    Some(DecodedFields {
        latitude: numbers[0],
        longitude: numbers[1],
        ..Default::default()
    })
}

fn coerce_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_i32(value: &serde_json::Value) -> Option<i32> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Extract up to `limit` floating-point substrings (optional sign, decimal
/// point required) in left-to-right order.
fn scan_decimal_numbers(text: &str, limit: usize) -> Vec<f64> {
    let bytes = text.as_bytes();
    let mut numbers = Vec::new();
    let mut i = 0;

    while i < bytes.len() && numbers.len() < limit {
        let starts_number = bytes[i].is_ascii_digit()
            || ((bytes[i] == b'-' || bytes[i] == b'+')
                && i + 1 < bytes.len()
                && bytes[i + 1].is_ascii_digit());

        if !starts_number {
            i += 1;
            continue;
        }

        let start = i;
        if bytes[i] == b'-' || bytes[i] == b'+' {
            i += 1;
        }
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }

        let mut has_fraction = false;
        if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
            has_fraction = true;
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }

        if has_fraction {
            if let Ok(value) = text[start..i].parse() {
                numbers.push(value);
            }
        }
    }

    numbers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder() -> PayloadDecoder {
        PayloadDecoder::new("BUS001", -1)
    }

    #[test]
    fn test_delimited_four_fields() {
        let record = decoder().decode(b"BUS001,40.7128,-74.0060,85").unwrap();

        assert_eq!(record.source_id, "BUS001");
        assert_eq!(record.latitude, 40.7128);
        assert_eq!(record.longitude, -74.0060);
        assert_eq!(record.signal_strength, 85);
        assert_eq!(record.speed, 0.0);
        assert!(record.fix_valid);
    }

    #[test]
    fn test_delimited_five_fields_with_speed() {
        let record = decoder().decode(b"BUS007,40.7128,-74.0060,45.5,85").unwrap();

        assert_eq!(record.source_id, "BUS007");
        assert_eq!(record.speed, 45.5);
        assert_eq!(record.signal_strength, 85);
    }

    #[test]
    fn test_bare_coordinate_pair_uses_defaults() {
        let record = decoder().decode(b"40.7128,-74.0060").unwrap();

        assert_eq!(record.source_id, "BUS001");
        assert_eq!(record.latitude, 40.7128);
        assert_eq!(record.longitude, -74.0060);
        assert_eq!(record.signal_strength, -1);
    }

    #[test]
    fn test_empty_id_field_uses_default() {
        let record = decoder().decode(b",40.7128,-74.0060,85").unwrap();
        assert_eq!(record.source_id, "BUS001");
        assert_eq!(record.signal_strength, 85);
    }

    #[test]
    fn test_embedded_json_with_noise() {
        let record = decoder()
            .decode(b"noise{\"latitude\":1.5,\"longitude\":2.5}trailing")
            .unwrap();

        assert_eq!(record.latitude, 1.5);
        assert_eq!(record.longitude, 2.5);
        assert_eq!(record.source_id, "BUS001");
    }

    #[test]
    fn test_json_full_record() {
        let payload =
            br#"{"busId":"BUS009","latitude":40.1,"longitude":-74.2,"speed":12.5,"signalStrength":77}"#;
        let record = decoder().decode(payload).unwrap();

        assert_eq!(record.source_id, "BUS009");
        assert_eq!(record.latitude, 40.1);
        assert_eq!(record.speed, 12.5);
        assert_eq!(record.signal_strength, 77);
    }

    #[test]
    fn test_json_case_variant_keys_and_string_numbers() {
        let payload = br#"{"BUSID":"BUS002","Latitude":"40.5","LONGITUDE":"-74.5","Signal":"60"}"#;
        let record = decoder().decode(payload).unwrap();

        assert_eq!(record.source_id, "BUS002");
        assert_eq!(record.latitude, 40.5);
        assert_eq!(record.longitude, -74.5);
        assert_eq!(record.signal_strength, 60);
    }

    #[test]
    fn test_malformed_json_falls_through_to_scan() {
        // Broken object, but the text still carries two decimal numbers
        let record = decoder().decode(b"{bad json 40.7128 and -74.0060").unwrap();
        assert_eq!(record.latitude, 40.7128);
        assert_eq!(record.longitude, -74.0060);
    }

    #[test]
    fn test_free_text_scan() {
        let record = decoder().decode(b"pos lat=40.7128 lng=-74.0060 ok").unwrap();
        assert_eq!(record.latitude, 40.7128);
        assert_eq!(record.longitude, -74.0060);
        assert_eq!(record.source_id, "BUS001");
    }

    #[test]
    fn test_integers_do_not_count_as_coordinates() {
        assert!(decoder().decode(b"packet 40 of -74 total").is_none());
    }

    #[test]
    fn test_garbage_returns_none() {
        assert!(decoder().decode(b"garbage text no numbers").is_none());
    }

    #[test]
    fn test_empty_frame_returns_none() {
        assert!(decoder().decode(b"").is_none());
        assert!(decoder().decode(b"   \r\n").is_none());
    }

    #[test]
    fn test_origin_pair_is_dropped() {
        assert!(decoder().decode(b"0.0,0.0").is_none());
        assert!(decoder().decode(b"BUS001,0.0,0.0,85").is_none());
    }

    #[test]
    fn test_bad_numeric_field_aborts_delimited_only() {
        // Strategy 1 aborts on the broken latitude; the scan then finds a
        // single decimal number, which is not enough for a record
        assert!(decoder().decode(b"BUS001,abc,-74.0060").is_none());
    }

    #[test]
    fn test_non_utf8_bytes_do_not_panic() {
        assert!(decoder().decode(&[0xFF, 0xFE, 0x00, 0x80]).is_none());
    }

    #[test]
    fn test_decode_is_deterministic() {
        let a = decoder().decode(b"BUS001,40.7128,-74.0060,85").unwrap();
        let b = decoder().decode(b"BUS001,40.7128,-74.0060,85").unwrap();
        assert!(a.same_reading(&b));
    }

    #[test]
    fn test_negative_speed_clamped() {
        let record = decoder().decode(b"BUS001,40.7128,-74.0060,-3.0,85").unwrap();
        assert_eq!(record.speed, 0.0);
    }
}
