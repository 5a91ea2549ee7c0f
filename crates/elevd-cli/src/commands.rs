//! The `scan`, `lookup` and `batch` commands, minus argument parsing.

use crate::{Config, Result};
use elevd_coords::parse_locations;
use elevd_dem::{LocationResult, LookupEngine, LookupRequest, TileBounds, TileIndex};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Scan the configured data folder and build an engine over it.
pub fn build_engine(config: &Config) -> Result<LookupEngine> {
    let engine = LookupEngine::open(
        &config.data_folder,
        Arc::new(config.raster_source()),
        config.engine_config(),
    )?;
    info!(
        data_folder = %config.data_folder.display(),
        tiles = engine.index().len(),
        "ready"
    );
    Ok(engine)
}

/// One tile in a scan summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileSummary {
    pub file: PathBuf,
    /// `[min_lat, max_lat, min_lon, max_lon]`
    pub coords: [f64; 4],
    pub width: u32,
    pub height: u32,
    pub source: String,
    pub priority: i64,
}

/// Output of `elevd scan`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanSummary {
    pub data_folder: PathBuf,
    pub tile_count: usize,
    pub coverage: Option<TileBounds>,
    /// Tiles in resolution order: the first tile covering a point answers for it.
    pub tiles: Vec<TileSummary>,
}

impl ScanSummary {
    pub fn new(data_folder: PathBuf, index: &TileIndex) -> Self {
        let tiles = index
            .tiles()
            .iter()
            .map(|tile| TileSummary {
                file: tile.path.clone(),
                coords: [
                    tile.bounds.min_lat,
                    tile.bounds.max_lat,
                    tile.bounds.min_lon,
                    tile.bounds.max_lon,
                ],
                width: tile.width,
                height: tile.height,
                source: tile.source.name.clone(),
                priority: tile.priority,
            })
            .collect();

        Self {
            data_folder,
            tile_count: index.len(),
            coverage: index.total_bounds(),
            tiles,
        }
    }
}

/// Scan the data folder without looking anything up.
pub fn scan(config: &Config) -> Result<ScanSummary> {
    let index = TileIndex::scan(&config.data_folder, &config.raster_source())?;
    Ok(ScanSummary::new(config.data_folder.clone(), &index))
}

/// Split a `lat,lng|lat,lng` query into requests.
///
/// Entries that do not parse stay in place and come back as errors.
pub fn parse_query(text: &str) -> Vec<LookupRequest> {
    text.split('|')
        .zip(parse_locations(text))
        .map(|(raw, parsed)| match parsed {
            Ok((lat, lon)) => LookupRequest::decimal(lat, lon),
            Err(e) => {
                warn!(location = raw, error = %e, "unparseable location");
                LookupRequest::Unrecognized(raw.into())
            }
        })
        .collect()
}

/// Body of a batch request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchRequest {
    pub locations: Vec<LookupRequest>,
}

/// Read a `{"locations": [...]}` request.
pub fn read_batch<R: Read>(reader: R) -> Result<Vec<LookupRequest>> {
    let request: BatchRequest = serde_json::from_reader(reader)?;
    Ok(request.locations)
}

/// Body of every lookup response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupResponse {
    pub results: Vec<LocationResult>,
}

pub fn lookup(engine: &LookupEngine, requests: &[LookupRequest]) -> LookupResponse {
    LookupResponse {
        results: engine.lookup_batch(requests),
    }
}

/// Write `value` as pretty JSON followed by a newline.
pub fn write_json<W: Write, T: Serialize>(mut out: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
