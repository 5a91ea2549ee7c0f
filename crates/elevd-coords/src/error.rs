//! Error types for coordinate normalization.

use crate::dms::Axis;
use thiserror::Error;

/// Reasons a coordinate could not be normalized to decimal degrees.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Minutes outside `[0, 60)`.
    #[error("minutes must be in [0, 60), got {0}")]
    MinutesOutOfRange(f64),

    /// Seconds outside `[0, 60)`.
    #[error("seconds must be in [0, 60), got {0}")]
    SecondsOutOfRange(f64),

    /// Degrees given as a negative number (the hemisphere carries the sign).
    #[error("degrees must not be negative, got {0}")]
    NegativeDegrees(f64),

    /// A NaN or infinite component.
    #[error("coordinate components must be finite")]
    NonFinite,

    /// Hemisphere is not one of N, S, E, W.
    #[error("unrecognized hemisphere {0:?} (expected N, S, E or W)")]
    UnknownHemisphere(String),

    /// Hemisphere letter used on the wrong axis (e.g. `E` for a latitude).
    #[error("hemisphere {hemisphere} is not valid for a {axis}")]
    WrongAxis {
        /// The hemisphere letter given.
        hemisphere: char,
        /// The axis it was given for.
        axis: Axis,
    },

    /// Empty coordinate text.
    #[error("empty coordinate")]
    Empty,

    /// Text that is neither a decimal number nor compact DMS.
    #[error("could not parse coordinate {0:?}")]
    Malformed(String),

    /// A location string that does not split into exactly two parts.
    #[error("expected exactly two comma-separated values, got {0}")]
    PartCount(usize),
}
