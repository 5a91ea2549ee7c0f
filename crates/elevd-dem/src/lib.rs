//! # elevd-dem
//!
//! Elevation lookups over a directory of Digital Elevation Model (DEM) tiles.
//!
//! ## Overview
//!
//! A data directory holds any number of DEM tiles, each covering a
//! rectangle of latitude and longitude:
//! - GeoTIFF tiles (`.tif`, `.tiff`) georeferenced with the usual
//!   `ModelTiepoint`/`ModelPixelScale` or `ModelTransformation` tags, or
//!   named like USGS 3DEP tiles (`USGS_13_n48w123_*.tif`)
//! - SRTM height tiles (`N47W123.hgt`, 1 or 3 arc-second)
//!
//! [`TileIndex::scan`] walks the directory once and records the bounds of
//! every tile. [`LookupEngine`] resolves a coordinate to the first tile
//! covering it, reads the pixel, and classifies the value as an elevation,
//! no-data, or an error. Pixels equal to the no-data sentinel
//! ([`DEFAULT_NO_DATA`], `-9999`) are never reported as elevations, so a real
//! reading of `0` (sea level) stays distinguishable from missing data.
//!
//! Directories may carry a `metadata.json` ranking their tiles against
//! others; see [`sources`].
//!
//! ## Example
//!
//! ```no_run
//! use elevd_dem::{EngineConfig, FileRasterSource, LookupEngine, LookupRequest, LookupResult};
//! use std::sync::Arc;
//!
//! let engine = LookupEngine::open(
//!     "data",
//!     Arc::new(FileRasterSource::default()),
//!     EngineConfig::default(),
//! )?;
//!
//! match engine.lookup(47.6062, -122.3321) {
//!     LookupResult::Ok { elevation } => println!("Elevation: {elevation} meters"),
//!     LookupResult::NoData => println!("No data"),
//!     LookupResult::Error(e) => eprintln!("Error: {e}"),
//! }
//!
//! // Batches keep request order; one bad entry does not affect the rest.
//! let results = engine.lookup_batch(&[
//!     LookupRequest::decimal(47.6, -122.3),
//!     LookupRequest::Location("473600N,1222000W".to_string()),
//! ]);
//! println!("{}", serde_json::to_string(&results)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod engine;
mod error;
mod index;
mod raster;
pub mod sources;
#[cfg(test)]
mod testing;
mod transform;

pub use engine::{
    EngineConfig, LocationResult, LookupEngine, LookupRequest, LookupResult, Status,
    DEFAULT_NO_DATA,
};
pub use error::{DemError, LookupError, ScanError};
pub use index::{TileDescriptor, TileIndex};
pub use raster::{
    FileRasterSource, GeoTiffRaster, HgtRaster, PixelValue, RasterHandle, RasterInfo, RasterSource,
    DEFAULT_EXTENSIONS, DEFAULT_OPEN_HANDLES,
};
pub use sources::{SourceInfo, SourceMetadata, METADATA_FILE};
pub use transform::{GeoTransform, TileBounds};

/// Result type for DEM operations.
pub type Result<T> = std::result::Result<T, DemError>;
