//! Error types for the DEM crate.

use elevd_coords::CoordError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while opening or reading a single raster tile.
#[derive(Debug, Error)]
pub enum DemError {
    /// I/O error reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding error.
    #[error("TIFF decode error: {0}")]
    TiffDecode(#[from] tiff::TiffError),

    /// Invalid GeoTIFF - missing or inconsistent georeferencing.
    #[error("Invalid GeoTIFF: {0}")]
    InvalidGeoTiff(String),

    /// Invalid SRTM height file.
    #[error("Invalid HGT file: {0}")]
    InvalidHgt(String),

    /// Invalid tile filename - cannot parse coordinates.
    #[error("Invalid tile filename: {0}")]
    InvalidFilename(String),

    /// File extension not handled by any raster reader.
    #[error("Unsupported raster format: {0}")]
    UnsupportedFormat(String),

    /// The georeferencing has rotation terms, so the tile is not a lat/lon rectangle.
    #[error("Rotated geotransform is not supported: {0}")]
    RotatedTransform(String),

    /// Pixel index outside the raster grid.
    #[error("Pixel (row {row}, col {col}) is outside a {width}x{height} raster")]
    PixelOutOfRange {
        /// Requested row.
        row: u32,
        /// Requested column.
        col: u32,
        /// Raster width in pixels.
        width: u32,
        /// Raster height in pixels.
        height: u32,
    },

    /// A `metadata.json` file could not be parsed.
    #[error("Invalid source metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Errors that abort a directory scan as a whole.
///
/// Individual unreadable files never produce these; they are skipped.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The data directory does not exist.
    #[error("data directory {0} does not exist")]
    Missing(PathBuf),

    /// The data path exists but is not a directory.
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    /// The data directory could not be listed.
    #[error("data directory {path} is unreadable: {source}")]
    Unreadable {
        /// The data directory.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Why a single lookup produced no elevation.
///
/// Carried inside [`LookupResult::Error`](crate::LookupResult::Error); these
/// are per-request outcomes and never abort sibling lookups.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LookupError {
    /// Latitude outside `[-90, 90]` or longitude outside `[-180, 180]`.
    #[error("coordinate out of range")]
    OutOfRange,

    /// No indexed tile covers the coordinate.
    #[error("no tile covers this coordinate")]
    NoTile,

    /// The request could not be normalized to decimal degrees.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] CoordError),

    /// The covering tile could not be opened.
    #[error("open failure: {0}")]
    Open(String),

    /// The covering tile was opened but the pixel could not be read.
    #[error("read failure: {0}")]
    Read(String),
}
