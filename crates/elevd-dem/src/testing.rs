//! In-memory rasters for unit tests.

use crate::raster::{PixelValue, RasterHandle, RasterSource};
use crate::transform::GeoTransform;
use crate::{DemError, Result};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub(crate) struct MemoryRaster {
    pub transform: GeoTransform,
    pub width: u32,
    pub height: u32,
    pub values: Vec<PixelValue>,
    pub no_data: Option<f64>,
    pub fail_reads: bool,
}

impl MemoryRaster {
    pub fn filled(transform: GeoTransform, width: u32, height: u32, value: PixelValue) -> Self {
        Self {
            transform,
            width,
            height,
            values: vec![value; width as usize * height as usize],
            no_data: None,
            fail_reads: false,
        }
    }

    /// A `size` x `size` tile covering one degree south-east of `(north, west)`.
    pub fn one_degree(north: f64, west: f64, size: u32, value: PixelValue) -> Self {
        let step = 1.0 / size as f64;
        Self::filled(GeoTransform::north_up(west, step, north, -step), size, size, value)
    }

    pub fn set(&mut self, row: u32, col: u32, value: PixelValue) {
        self.values[row as usize * self.width as usize + col as usize] = value;
    }
}

impl RasterHandle for MemoryRaster {
    fn geo_transform(&self) -> GeoTransform {
        self.transform
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn no_data(&self) -> Option<f64> {
        self.no_data
    }

    fn read_pixel(&self, row: u32, col: u32) -> Result<PixelValue> {
        if self.fail_reads {
            return Err(DemError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "simulated read failure",
            )));
        }
        if row >= self.height || col >= self.width {
            return Err(DemError::PixelOutOfRange {
                row,
                col,
                width: self.width,
                height: self.height,
            });
        }
        Ok(self.values[row as usize * self.width as usize + col as usize])
    }
}

/// Serves [`MemoryRaster`]s keyed by file name; recognizes `.tif` only.
#[derive(Debug, Default)]
pub(crate) struct MemorySource {
    rasters: Mutex<HashMap<String, Arc<MemoryRaster>>>,
    failing: Mutex<HashSet<String>>,
    opens: AtomicUsize,
}

impl MemorySource {
    pub fn insert(&self, name: &str, raster: MemoryRaster) {
        self.rasters.lock().insert(name.to_string(), Arc::new(raster));
    }

    pub fn set_failing(&self, name: &str, failing: bool) {
        let mut set = self.failing.lock();
        if failing {
            set.insert(name.to_string());
        } else {
            set.remove(name);
        }
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl RasterSource for MemorySource {
    fn recognizes(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == "tif")
    }

    fn open(&self, path: &Path) -> Result<Arc<dyn RasterHandle>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        if self.failing.lock().contains(&name) {
            return Err(DemError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "simulated open failure",
            )));
        }

        let raster = self
            .rasters
            .lock()
            .get(&name)
            .cloned()
            .ok_or_else(|| DemError::InvalidGeoTiff(format!("{name}: not a raster")))?;
        Ok(raster)
    }
}
