//! Degrees-minutes-seconds conversion.

use crate::{location, CoordError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which coordinate axis a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// North/south, `[-90, 90]`.
    Latitude,
    /// East/west, `[-180, 180]`.
    Longitude,
}

impl Axis {
    /// Widest degree field in compact DMS text (`DD` or `DDD`).
    pub fn max_degree_digits(self) -> usize {
        match self {
            Axis::Latitude => 2,
            Axis::Longitude => 3,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Latitude => f.write_str("latitude"),
            Axis::Longitude => f.write_str("longitude"),
        }
    }
}

/// One of the four compass hemispheres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    /// Parse a hemisphere letter, case-insensitively.
    pub fn from_letter(letter: char) -> Result<Self> {
        match letter.to_ascii_uppercase() {
            'N' => Ok(Hemisphere::North),
            'S' => Ok(Hemisphere::South),
            'E' => Ok(Hemisphere::East),
            'W' => Ok(Hemisphere::West),
            _ => Err(CoordError::UnknownHemisphere(letter.to_string())),
        }
    }

    /// The canonical upper-case letter.
    pub fn letter(self) -> char {
        match self {
            Hemisphere::North => 'N',
            Hemisphere::South => 'S',
            Hemisphere::East => 'E',
            Hemisphere::West => 'W',
        }
    }

    /// The axis this hemisphere qualifies.
    pub fn axis(self) -> Axis {
        match self {
            Hemisphere::North | Hemisphere::South => Axis::Latitude,
            Hemisphere::East | Hemisphere::West => Axis::Longitude,
        }
    }

    /// `-1.0` for south and west, `1.0` otherwise.
    pub fn sign(self) -> f64 {
        match self {
            Hemisphere::South | Hemisphere::West => -1.0,
            Hemisphere::North | Hemisphere::East => 1.0,
        }
    }

    /// Fail with [`CoordError::WrongAxis`] unless this hemisphere belongs to `axis`.
    pub fn expect_axis(self, axis: Axis) -> Result<Self> {
        if self.axis() == axis {
            Ok(self)
        } else {
            Err(CoordError::WrongAxis {
                hemisphere: self.letter(),
                axis,
            })
        }
    }
}

/// Convert degrees, minutes and seconds to signed decimal degrees.
///
/// `decimal = degrees + minutes / 60 + seconds / 3600`, negated for `S` and `W`.
///
/// # Errors
/// [`CoordError`] when `minutes` or `seconds` fall outside `[0, 60)`, when
/// `degrees` is negative, when any component is not finite, or when
/// `hemisphere` is not one of `N`, `S`, `E`, `W`.
pub fn to_decimal(degrees: f64, minutes: f64, seconds: f64, hemisphere: char) -> Result<f64> {
    let hemisphere = Hemisphere::from_letter(hemisphere)?;
    dms_to_decimal(degrees, minutes, seconds, hemisphere)
}

pub(crate) fn dms_to_decimal(
    degrees: f64,
    minutes: f64,
    seconds: f64,
    hemisphere: Hemisphere,
) -> Result<f64> {
    if !(degrees.is_finite() && minutes.is_finite() && seconds.is_finite()) {
        return Err(CoordError::NonFinite);
    }
    if degrees < 0.0 {
        return Err(CoordError::NegativeDegrees(degrees));
    }
    if !(0.0..60.0).contains(&minutes) {
        return Err(CoordError::MinutesOutOfRange(minutes));
    }
    if !(0.0..60.0).contains(&seconds) {
        return Err(CoordError::SecondsOutOfRange(seconds));
    }

    Ok(hemisphere.sign() * (degrees + minutes / 60.0 + seconds / 3600.0))
}

/// A structured DMS coordinate as it arrives in a request body.
///
/// The hemisphere is kept as text so that a bad letter fails this one
/// coordinate rather than the whole request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DmsCoordinate {
    pub degrees: f64,
    #[serde(default)]
    pub minutes: f64,
    #[serde(default)]
    pub seconds: f64,
    pub hemisphere: String,
}

impl DmsCoordinate {
    pub fn new(degrees: f64, minutes: f64, seconds: f64, hemisphere: impl Into<String>) -> Self {
        Self {
            degrees,
            minutes,
            seconds,
            hemisphere: hemisphere.into(),
        }
    }

    /// Convert to decimal degrees, checking that the hemisphere fits `axis`.
    pub fn to_decimal(&self, axis: Axis) -> Result<f64> {
        let mut letters = self.hemisphere.trim().chars();
        let hemisphere = match (letters.next(), letters.next()) {
            (Some(letter), None) => Hemisphere::from_letter(letter)?,
            _ => return Err(CoordError::UnknownHemisphere(self.hemisphere.clone())),
        };
        dms_to_decimal(
            self.degrees,
            self.minutes,
            self.seconds,
            hemisphere.expect_axis(axis)?,
        )
    }
}

/// A single coordinate in any accepted notation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoordinateInput {
    /// Already decimal degrees.
    Decimal(f64),
    /// Structured degrees-minutes-seconds.
    Dms(DmsCoordinate),
    /// Decimal or compact DMS text such as `"675643.9N"`.
    Text(String),
}

impl CoordinateInput {
    /// Normalize to decimal degrees along `axis`.
    pub fn to_decimal(&self, axis: Axis) -> Result<f64> {
        match self {
            CoordinateInput::Decimal(value) if value.is_finite() => Ok(*value),
            CoordinateInput::Decimal(_) => Err(CoordError::NonFinite),
            CoordinateInput::Dms(dms) => dms.to_decimal(axis),
            CoordinateInput::Text(text) => location::parse_coordinate(text, axis),
        }
    }
}

impl From<f64> for CoordinateInput {
    fn from(value: f64) -> Self {
        CoordinateInput::Decimal(value)
    }
}

impl From<DmsCoordinate> for CoordinateInput {
    fn from(value: DmsCoordinate) -> Self {
        CoordinateInput::Dms(value)
    }
}
