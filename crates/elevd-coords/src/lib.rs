//! # elevd-coords
//!
//! Pure coordinate utilities used in front of the elevation lookup engine.
//!
//! Two input notations are accepted:
//! - Structured degrees-minutes-seconds: `{degrees, minutes, seconds, hemisphere}`
//! - Compact text, as sent in query strings: `675643.9N` (latitude, `DDMMSS.fff`)
//!   or `1574905.9W` (longitude, `DDDMMSS.fff`), or plain decimal degrees.
//!
//! Everything here is a pure function of its inputs and safe to call from any
//! number of threads.
//!
//! ## Example
//!
//! ```
//! use elevd_coords::{parse_location, to_decimal};
//!
//! let lat = to_decimal(45.0, 30.0, 0.0, 'N')?;
//! assert_eq!(lat, 45.5);
//!
//! let (lat, lon) = parse_location("5615N,12345E")?;
//! assert_eq!((lat, lon), (56.25, 123.75));
//! # Ok::<(), elevd_coords::CoordError>(())
//! ```

mod dms;
mod error;
mod location;

pub use dms::{to_decimal, Axis, CoordinateInput, DmsCoordinate, Hemisphere};
pub use error::CoordError;
pub use location::{parse_coordinate, parse_location, parse_locations};

/// Result type for coordinate operations.
pub type Result<T> = std::result::Result<T, CoordError>;
