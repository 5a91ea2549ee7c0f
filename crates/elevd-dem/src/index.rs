//! Tile discovery and spatial resolution.
//!
//! [`TileIndex::scan`] walks a data directory (following symbolic links),
//! reads the header of every recognized raster to learn its georeferencing, and
//! records a [`TileDescriptor`] per tile. The resulting index is immutable;
//! a rescan builds a new one.
//!
//! ## Ordering
//!
//! Directory entries are visited in name order, so scan order is stable
//! between runs. Tiles are then stably sorted by source priority (see
//! [`crate::sources`]); with no `metadata.json` anywhere every tile shares
//! the default priority and index order is plain scan order.
//!
//! [`TileIndex::resolve`] returns the *first* tile in index order whose
//! bounds contain the point. Overlapping tiles are not merged or ranked by
//! area: the earlier one always wins, even when its pixel is no-data.

use crate::error::ScanError;
use crate::raster::RasterSource;
use crate::sources::{SourceInfo, SourceMetadata};
use crate::transform::{GeoTransform, TileBounds};
use crate::{DemError, Result};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One discovered DEM file.
#[derive(Debug, Clone, PartialEq)]
pub struct TileDescriptor {
    pub path: PathBuf,
    pub bounds: TileBounds,
    pub width: u32,
    pub height: u32,
    pub transform: GeoTransform,
    /// Effective metadata of the directory holding the tile.
    pub source: Arc<SourceInfo>,
    /// Effective priority at scan time (lower wins).
    pub priority: i64,
}

impl TileDescriptor {
    /// Describe a tile with the default source metadata.
    ///
    /// Fails for empty rasters and for rotated or degenerate transforms.
    pub fn new(
        path: impl Into<PathBuf>,
        transform: GeoTransform,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let path = path.into();
        if width == 0 || height == 0 {
            return Err(DemError::InvalidGeoTiff(format!(
                "{}: empty raster",
                path.display()
            )));
        }
        if !transform.is_north_up() {
            return Err(DemError::RotatedTransform(path.display().to_string()));
        }
        if !transform.is_usable() {
            return Err(DemError::InvalidGeoTiff(format!(
                "{}: degenerate geotransform",
                path.display()
            )));
        }

        let source = Arc::new(SourceInfo::default());
        Ok(Self {
            bounds: transform.bounds(width, height),
            path,
            width,
            height,
            transform,
            priority: source.priority,
            source,
        })
    }

    /// Attach source metadata, computing the priority as of `today`.
    pub fn with_source(mut self, source: Arc<SourceInfo>, today: NaiveDate) -> Self {
        self.priority = source.effective_priority(today);
        self.source = source;
        self
    }

    /// Pixel `(row, col)` for a coordinate inside this tile.
    pub fn pixel_at(&self, lat: f64, lon: f64) -> (u32, u32) {
        self.transform.pixel_at(lat, lon, self.width, self.height)
    }
}

/// Cell key of the one-degree bucket grid.
type Cell = (i32, i32);

fn cell_of(lat: f64, lon: f64) -> Cell {
    (lat.floor() as i32, lon.floor() as i32)
}

/// Immutable set of tiles with a one-degree bucket grid for resolution.
#[derive(Debug, Default)]
pub struct TileIndex {
    tiles: Vec<TileDescriptor>,
    /// Tile indices per cell, ascending, so the first hit is the first in index order.
    grid: HashMap<Cell, Vec<usize>>,
}

impl TileIndex {
    /// An index with no tiles.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build an index from descriptors, keeping their order.
    pub fn from_descriptors(tiles: Vec<TileDescriptor>) -> Self {
        let mut grid: HashMap<Cell, Vec<usize>> = HashMap::new();

        for (i, tile) in tiles.iter().enumerate() {
            let b = &tile.bounds;
            let (lat_lo, lon_lo) = cell_of(b.min_lat.max(-90.0), b.min_lon.max(-180.0));
            let (lat_hi, lon_hi) = cell_of(b.max_lat.min(90.0), b.max_lon.min(180.0));
            for lat in lat_lo..=lat_hi {
                for lon in lon_lo..=lon_hi {
                    grid.entry((lat, lon)).or_default().push(i);
                }
            }
        }

        Self { tiles, grid }
    }

    /// Scan `root` recursively, using today's date for dynamic priorities.
    pub fn scan<P: AsRef<Path>>(
        root: P,
        source: &dyn RasterSource,
    ) -> std::result::Result<Self, ScanError> {
        Self::scan_as_of(root, source, chrono::Local::now().date_naive())
    }

    /// Scan `root` recursively, computing dynamic priorities as of `today`.
    ///
    /// Only a missing or unlistable `root` is an error. Files that fail to
    /// open, unreadable subdirectories, dangling links and symlink cycles
    /// are logged and skipped.
    pub fn scan_as_of<P: AsRef<Path>>(
        root: P,
        source: &dyn RasterSource,
        today: NaiveDate,
    ) -> std::result::Result<Self, ScanError> {
        let root = root.as_ref();
        let meta = std::fs::metadata(root).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ScanError::Missing(root.to_path_buf()),
            _ => ScanError::Unreadable {
                path: root.to_path_buf(),
                source: e,
            },
        })?;
        if !meta.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }
        std::fs::read_dir(root).map_err(|e| ScanError::Unreadable {
            path: root.to_path_buf(),
            source: e,
        })?;

        let mut walker = Walker {
            source,
            today,
            visited: HashSet::new(),
            found: Vec::new(),
            skipped: 0,
        };
        walker.walk(root, &Arc::new(SourceInfo::default()));

        let mut tiles = walker.found;
        tiles.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(a.source.resolution.total_cmp(&b.source.resolution))
        });

        info!(
            root = %root.display(),
            tiles = tiles.len(),
            skipped = walker.skipped,
            "tile index built"
        );
        Ok(Self::from_descriptors(tiles))
    }

    /// First tile in index order whose bounds contain the point.
    pub fn resolve(&self, lat: f64, lon: f64) -> Option<&TileDescriptor> {
        if lat.is_nan() || lon.is_nan() {
            return None;
        }
        self.grid
            .get(&cell_of(lat, lon))?
            .iter()
            .map(|&i| &self.tiles[i])
            .find(|tile| tile.bounds.contains(lat, lon))
    }

    /// All tiles, in index order.
    pub fn tiles(&self) -> &[TileDescriptor] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// The bounding box that covers all indexed tiles.
    pub fn total_bounds(&self) -> Option<TileBounds> {
        let mut tiles = self.tiles.iter();
        let first = tiles.next()?.bounds;
        Some(tiles.fold(first, |acc, tile| acc.union(&tile.bounds)))
    }
}

/// Recursive directory walk state.
struct Walker<'a> {
    source: &'a dyn RasterSource,
    today: NaiveDate,
    /// Canonical paths of directories already walked.
    visited: HashSet<PathBuf>,
    found: Vec<TileDescriptor>,
    skipped: usize,
}

impl Walker<'_> {
    fn walk(&mut self, dir: &Path, inherited: &Arc<SourceInfo>) {
        let real = match std::fs::canonicalize(dir) {
            Ok(real) => real,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unresolvable directory");
                return;
            }
        };
        if !self.visited.insert(real) {
            warn!(dir = %dir.display(), "directory already visited, skipping (symlink cycle or alias)");
            return;
        }

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                return;
            }
        };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        paths.sort();

        let source_info = match SourceMetadata::load_or_warn(dir) {
            Some(meta) => {
                let info = inherited.overlay(&meta);
                debug!(dir = %dir.display(), source = %info.name, "loaded source metadata");
                Arc::new(info)
            }
            None => Arc::clone(inherited),
        };

        for path in paths {
            // Follows symbolic links.
            let meta = match std::fs::metadata(&path) {
                Ok(meta) => meta,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping dangling entry");
                    continue;
                }
            };

            if meta.is_dir() {
                self.walk(&path, &source_info);
            } else if meta.is_file() && self.source.recognizes(&path) {
                self.index_file(path, &source_info);
            }
        }
    }

    fn index_file(&mut self, path: PathBuf, source_info: &Arc<SourceInfo>) {
        let described = self
            .source
            .describe(&path)
            .and_then(|info| TileDescriptor::new(path.clone(), info.transform, info.width, info.height));

        match described {
            Ok(tile) => {
                let tile = tile.with_source(Arc::clone(source_info), self.today);
                debug!(
                    path = %tile.path.display(),
                    min_lat = tile.bounds.min_lat,
                    max_lat = tile.bounds.max_lat,
                    min_lon = tile.bounds.min_lon,
                    max_lon = tile.bounds.max_lon,
                    "indexed tile"
                );
                self.found.push(tile);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable raster");
                self.skipped += 1;
            }
        }
    }
}
