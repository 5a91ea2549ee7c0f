//! Parsing of coordinate text as it appears in query strings.
//!
//! Compact DMS packs the fields without separators: `DDMMSS.fff` for
//! latitudes and `DDDMMSS.fff` for longitudes, followed by the hemisphere
//! letter. Short forms such as `5615N` (no seconds) and `90N` (degrees only)
//! are accepted too.

use crate::dms::{dms_to_decimal, Axis, Hemisphere};
use crate::{CoordError, Result};

/// Parse a single coordinate given as decimal degrees or compact DMS.
pub fn parse_coordinate(text: &str, axis: Axis) -> Result<f64> {
    let text = text.trim();
    let last = text.chars().last().ok_or(CoordError::Empty)?;

    if !last.is_ascii_alphabetic() {
        return parse_finite(text);
    }

    let hemisphere = Hemisphere::from_letter(last)?.expect_axis(axis)?;
    let numeric = text[..text.len() - last.len_utf8()].trim();
    if numeric.is_empty() {
        return Err(CoordError::Malformed(text.to_string()));
    }

    let (int_part, frac_part) = numeric.split_once('.').unwrap_or((numeric, ""));
    if int_part.is_empty() || !all_digits(int_part) || !all_digits(frac_part) {
        return Err(CoordError::Malformed(text.to_string()));
    }

    // Widest degree field first; minutes are always two digits.
    for degree_digits in (1..=axis.max_degree_digits()).rev() {
        if int_part.len() < degree_digits + 2 {
            continue;
        }

        let (degrees, rest) = int_part.split_at(degree_digits);
        let (minutes, seconds) = rest.split_at(2);
        let minutes = parse_finite(minutes)?;
        if minutes > 59.0 {
            continue;
        }

        let seconds = match (seconds.is_empty(), frac_part.is_empty()) {
            (true, true) => 0.0,
            (false, true) => parse_finite(seconds)?,
            (true, false) => parse_finite(&format!("0.{frac_part}"))?,
            (false, false) => parse_finite(&format!("{seconds}.{frac_part}"))?,
        };

        return dms_to_decimal(parse_finite(degrees)?, minutes, seconds, hemisphere);
    }

    // No degree/minute split fits, so the number is whole degrees.
    Ok(hemisphere.sign() * parse_finite(numeric)?)
}

/// Parse a `"lat,lng"` pair where each side is decimal or compact DMS.
pub fn parse_location(text: &str) -> Result<(f64, f64)> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(CoordError::PartCount(parts.len()));
    }

    let lat = parse_coordinate(parts[0], Axis::Latitude)?;
    let lon = parse_coordinate(parts[1], Axis::Longitude)?;
    Ok((lat, lon))
}

/// Parse a `|`-separated list of locations, as in `?locations=a|b|c`.
///
/// Every entry is parsed independently; one malformed entry does not affect
/// the others.
pub fn parse_locations(text: &str) -> Vec<Result<(f64, f64)>> {
    text.split('|').map(parse_location).collect()
}

fn all_digits(text: &str) -> bool {
    text.bytes().all(|b| b.is_ascii_digit())
}

fn parse_finite(text: &str) -> Result<f64> {
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(CoordError::Malformed(text.to_string())),
    }
}
