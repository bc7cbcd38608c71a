//! # Coordinate Conversion
//!
//! NMEA encodes positions as degrees and minutes packed into one number
//! (`4807.038` = 48° 7.038'), with the hemisphere carried separately.

use crate::error::{GpsBridgeError, Result};

/// Convert an NMEA degree/minute string plus hemisphere letter to signed
/// decimal degrees.
///
/// The two digits before the decimal point are minutes' whole part; what
/// precedes them is the degree part (two digits for latitude, three for
/// longitude), so `value / 100` splits both layouts without caring which
/// axis this is. `S` and `W` negate the result.
///
/// Pure and deterministic; no rounding beyond f64 arithmetic.
///
/// # Errors
///
/// Returns `MalformedCoordinate` if `raw` is shorter than 4 characters or
/// does not parse as a number.
pub fn to_decimal_degrees(raw: &str, hemisphere: &str) -> Result<f64> {
    if raw.len() < 4 {
        return Err(GpsBridgeError::MalformedCoordinate(
            format!("'{}' is too short", raw)
        ));
    }

    let value: f64 = raw.parse().map_err(|_| {
        GpsBridgeError::MalformedCoordinate(format!("'{}' is not numeric", raw))
    })?;

    let degrees = (value / 100.0).trunc();
    let minutes = value % 100.0;
    let mut decimal = degrees + minutes / 60.0;

    if hemisphere == "S" || hemisphere == "W" {
        decimal = -decimal;
    }

    Ok(decimal)
}
