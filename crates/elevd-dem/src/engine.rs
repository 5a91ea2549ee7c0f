//! The lookup engine: coordinate in, classified elevation out.

use crate::error::{LookupError, ScanError};
use crate::index::TileIndex;
use crate::raster::{PixelValue, RasterSource};
use elevd_coords::{parse_location, Axis, CoordError, CoordinateInput, DmsCoordinate};
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Elevation value meaning "no measurement".
pub const DEFAULT_NO_DATA: f64 = -9999.0;

/// No-data policy of a [`LookupEngine`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Pixels equal to this value are reported as no-data.
    pub no_data_value: f64,
    /// Also treat the no-data value declared by each tile as no-data.
    pub honor_tile_no_data: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            no_data_value: DEFAULT_NO_DATA,
            honor_tile_no_data: true,
        }
    }
}

/// Outcome of one lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupResult {
    /// A measured elevation in the tile's native numeric type.
    Ok { elevation: PixelValue },
    /// The covering pixel holds the no-data sentinel.
    NoData,
    /// The lookup failed; see [`LookupError`].
    Error(LookupError),
}

impl LookupResult {
    pub fn status(&self) -> Status {
        match self {
            LookupResult::Ok { .. } => Status::Ok,
            LookupResult::NoData => Status::NoData,
            LookupResult::Error(_) => Status::Error,
        }
    }

    pub fn elevation(&self) -> Option<PixelValue> {
        match self {
            LookupResult::Ok { elevation } => Some(*elevation),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&LookupError> {
        match self {
            LookupResult::Error(e) => Some(e),
            _ => None,
        }
    }
}

/// Wire status of a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    NoData,
    Error,
}

/// One entry of a batch request.
///
/// Accepts `{"latitude": .., "longitude": ..}` where each side is decimal
/// degrees, a DMS object or compact DMS text, and `"lat,lng"` strings.
/// Anything else is kept as [`LookupRequest::Unrecognized`] so it can be
/// answered with an error in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LookupRequest {
    Pair {
        latitude: CoordinateInput,
        longitude: CoordinateInput,
    },
    Location(String),
    Unrecognized(serde_json::Value),
}

impl LookupRequest {
    /// A request in decimal degrees.
    pub fn decimal(latitude: f64, longitude: f64) -> Self {
        LookupRequest::Pair {
            latitude: latitude.into(),
            longitude: longitude.into(),
        }
    }

    /// A request in structured degrees-minutes-seconds.
    pub fn dms(latitude: DmsCoordinate, longitude: DmsCoordinate) -> Self {
        LookupRequest::Pair {
            latitude: latitude.into(),
            longitude: longitude.into(),
        }
    }

    /// Convert to decimal `(latitude, longitude)`.
    pub fn normalize(&self) -> Result<(f64, f64), LookupError> {
        match self {
            LookupRequest::Pair {
                latitude,
                longitude,
            } => Ok((
                latitude.to_decimal(Axis::Latitude)?,
                longitude.to_decimal(Axis::Longitude)?,
            )),
            LookupRequest::Location(text) => Ok(parse_location(text)?),
            LookupRequest::Unrecognized(value) => {
                Err(CoordError::Malformed(value.to_string()).into())
            }
        }
    }
}

impl From<(f64, f64)> for LookupRequest {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::decimal(latitude, longitude)
    }
}

/// One entry of a batch response.
///
/// Coordinates are `null` only when the request could not be normalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationResult {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<PixelValue>,
    pub status: Status,
}

impl LocationResult {
    pub fn new(latitude: f64, longitude: f64, result: &LookupResult) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            elevation: result.elevation(),
            status: result.status(),
        }
    }

    /// Result for a request that never reached a tile.
    pub fn invalid() -> Self {
        Self {
            latitude: None,
            longitude: None,
            elevation: None,
            status: Status::Error,
        }
    }
}

/// Resolves coordinates to tiles and reads classified elevations.
///
/// The engine is shared by reference between threads. The tile index is an
/// immutable snapshot behind an `Arc`; [`rescan`](Self::rescan) builds a
/// new snapshot without holding any lock and swaps it in under a short write
/// lock. Lookups already running keep the snapshot they started with.
pub struct LookupEngine {
    index: RwLock<Arc<TileIndex>>,
    source: Arc<dyn RasterSource>,
    config: EngineConfig,
}

impl LookupEngine {
    pub fn new(index: TileIndex, source: Arc<dyn RasterSource>, config: EngineConfig) -> Self {
        Self {
            index: RwLock::new(Arc::new(index)),
            source,
            config,
        }
    }

    /// Scan `root` and build an engine over the result.
    pub fn open<P: AsRef<Path>>(
        root: P,
        source: Arc<dyn RasterSource>,
        config: EngineConfig,
    ) -> Result<Self, ScanError> {
        let index = TileIndex::scan(root, source.as_ref())?;
        Ok(Self::new(index, source, config))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The current index snapshot.
    pub fn index(&self) -> Arc<TileIndex> {
        Arc::clone(&self.index.read())
    }

    /// Swap in a new index, returning the previous one.
    pub fn replace_index(&self, index: TileIndex) -> Arc<TileIndex> {
        std::mem::replace(&mut *self.index.write(), Arc::new(index))
    }

    /// Rebuild the index from `root` and swap it in.
    ///
    /// On error the current index stays in place. Returns the number of
    /// indexed tiles.
    pub fn rescan<P: AsRef<Path>>(&self, root: P) -> Result<usize, ScanError> {
        self.source.clear();
        let index = TileIndex::scan(root, self.source.as_ref())?;
        let tiles = index.len();
        let previous = self.replace_index(index);
        info!(previous = previous.len(), tiles, "tile index replaced");
        Ok(tiles)
    }

    /// Elevation at a decimal coordinate.
    pub fn lookup(&self, lat: f64, lon: f64) -> LookupResult {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return LookupResult::Error(LookupError::OutOfRange);
        }

        let index = self.index();
        let Some(tile) = index.resolve(lat, lon) else {
            debug!(lat, lon, "no covering tile");
            return LookupResult::Error(LookupError::NoTile);
        };

        let handle = match self.source.open(&tile.path) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(path = %tile.path.display(), error = %e, "failed to open tile");
                return LookupResult::Error(LookupError::Open(e.to_string()));
            }
        };

        let (width, height) = handle.dimensions();
        let (row, col) = handle.geo_transform().pixel_at(lat, lon, width, height);
        debug!(lat, lon, path = %tile.path.display(), row, col, "resolved pixel");

        match handle.read_pixel(row, col) {
            Ok(value) => self.classify(value, handle.no_data()),
            Err(e) => {
                warn!(path = %tile.path.display(), row, col, error = %e, "failed to read pixel");
                LookupResult::Error(LookupError::Read(e.to_string()))
            }
        }
    }

    /// Normalize and look up one request.
    pub fn lookup_request(&self, request: &LookupRequest) -> LocationResult {
        match request.normalize() {
            Ok((lat, lon)) => LocationResult::new(lat, lon, &self.lookup(lat, lon)),
            Err(e) => {
                debug!(error = %e, "rejected request");
                LocationResult::invalid()
            }
        }
    }

    /// Look up every request in parallel.
    ///
    /// The output has one entry per request, in request order.
    pub fn lookup_batch(&self, requests: &[LookupRequest]) -> Vec<LocationResult> {
        requests
            .par_iter()
            .map(|request| self.lookup_request(request))
            .collect()
    }

    fn classify(&self, value: PixelValue, tile_no_data: Option<f64>) -> LookupResult {
        let tile_sentinel = self.config.honor_tile_no_data
            && tile_no_data.is_some_and(|no_data| value.matches(no_data));

        if value.is_nan() || value.matches(self.config.no_data_value) || tile_sentinel {
            LookupResult::NoData
        } else {
            LookupResult::Ok { elevation: value }
        }
    }
}
