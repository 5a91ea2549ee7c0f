//! Raster tile access.
//!
//! The lookup engine only needs three things from a DEM file: its
//! georeferencing, its pixel dimensions, and single-pixel reads. Those are
//! the [`RasterHandle`] trait; [`RasterSource`] opens handles by path.
//!
//! [`FileRasterSource`] is the on-disk implementation. It decodes GeoTIFF
//! (`.tif`, `.tiff`) and SRTM (`.hgt`) tiles and keeps a bounded LRU of
//! open handles. Scans only read tile headers; samples are decoded on the
//! first lookup that needs them.
//!
//! ## Thread Safety
//!
//! A decoded handle is immutable and shared as an `Arc`, so any number of
//! lookups can read the same tile concurrently without a per-tile lock.
//! Only the LRU bookkeeping sits behind a mutex, and tile decoding happens
//! outside it. Two threads missing the cache for the same tile at the same
//! moment may both decode it; the second insert is a no-op.

mod geotiff;
mod hgt;

pub use geotiff::GeoTiffRaster;
pub use hgt::HgtRaster;

use crate::transform::GeoTransform;
use crate::{DemError, Result};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Default number of decoded tiles kept open.
pub const DEFAULT_OPEN_HANDLES: usize = 5;

/// Extensions recognized by [`FileRasterSource`] unless configured otherwise.
pub const DEFAULT_EXTENSIONS: [&str; 3] = ["tif", "tiff", "hgt"];

/// A raw pixel value in the raster's native numeric kind.
///
/// Integer rasters stay integers and float rasters stay floats, so `0`
/// serializes as `0` and `12.75` is never rounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PixelValue {
    Int(i64),
    Float(f64),
}

impl PixelValue {
    pub fn as_f64(self) -> f64 {
        match self {
            PixelValue::Int(v) => v as f64,
            PixelValue::Float(v) => v,
        }
    }

    /// Exact comparison against a no-data value.
    pub fn matches(self, no_data: f64) -> bool {
        self.as_f64() == no_data
    }

    pub fn is_nan(self) -> bool {
        matches!(self, PixelValue::Float(v) if v.is_nan())
    }
}

impl fmt::Display for PixelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelValue::Int(v) => write!(f, "{}", v),
            PixelValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// An open DEM tile.
pub trait RasterHandle: Send + Sync + fmt::Debug {
    /// Affine pixel-to-geographic transform.
    fn geo_transform(&self) -> GeoTransform;

    /// `(width, height)` in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// No-data value declared by the file itself, if any.
    fn no_data(&self) -> Option<f64> {
        None
    }

    /// Read one pixel. Row 0 is the first stored scanline.
    fn read_pixel(&self, row: u32, col: u32) -> Result<PixelValue>;
}

/// Georeferencing and size of a tile, without its samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterInfo {
    pub transform: GeoTransform,
    pub width: u32,
    pub height: u32,
}

/// Opens [`RasterHandle`]s by path.
pub trait RasterSource: Send + Sync {
    /// Whether a file looks like a raster this source can open.
    fn recognizes(&self, path: &Path) -> bool;

    /// Read only what the tile index needs. Defaults to a full open.
    fn describe(&self, path: &Path) -> Result<RasterInfo> {
        let handle = self.open(path)?;
        let (width, height) = handle.dimensions();
        Ok(RasterInfo {
            transform: handle.geo_transform(),
            width,
            height,
        })
    }

    /// Open a tile, possibly returning a cached handle.
    fn open(&self, path: &Path) -> Result<Arc<dyn RasterHandle>>;

    /// Forget any cached handles, e.g. after the files changed on disk.
    fn clear(&self) {}
}

/// Sample storage in the decoded file's own numeric type.
#[derive(Debug)]
pub(crate) enum SampleBuffer {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl SampleBuffer {
    pub(crate) fn len(&self) -> usize {
        match self {
            SampleBuffer::U8(v) => v.len(),
            SampleBuffer::U16(v) => v.len(),
            SampleBuffer::U32(v) => v.len(),
            SampleBuffer::U64(v) => v.len(),
            SampleBuffer::I8(v) => v.len(),
            SampleBuffer::I16(v) => v.len(),
            SampleBuffer::I32(v) => v.len(),
            SampleBuffer::I64(v) => v.len(),
            SampleBuffer::F32(v) => v.len(),
            SampleBuffer::F64(v) => v.len(),
        }
    }

    pub(crate) fn get(&self, index: usize) -> Option<PixelValue> {
        let value = match self {
            SampleBuffer::U8(v) => PixelValue::Int(i64::from(*v.get(index)?)),
            SampleBuffer::U16(v) => PixelValue::Int(i64::from(*v.get(index)?)),
            SampleBuffer::U32(v) => PixelValue::Int(i64::from(*v.get(index)?)),
            SampleBuffer::U64(v) => {
                let raw = *v.get(index)?;
                i64::try_from(raw).map_or(PixelValue::Float(raw as f64), PixelValue::Int)
            }
            SampleBuffer::I8(v) => PixelValue::Int(i64::from(*v.get(index)?)),
            SampleBuffer::I16(v) => PixelValue::Int(i64::from(*v.get(index)?)),
            SampleBuffer::I32(v) => PixelValue::Int(i64::from(*v.get(index)?)),
            SampleBuffer::I64(v) => PixelValue::Int(*v.get(index)?),
            SampleBuffer::F32(v) => PixelValue::Float(f64::from(*v.get(index)?)),
            SampleBuffer::F64(v) => PixelValue::Float(*v.get(index)?),
        };
        Some(value)
    }

    /// Bounds-checked row-major read.
    pub(crate) fn pixel(&self, row: u32, col: u32, width: u32, height: u32) -> Result<PixelValue> {
        let out_of_range = DemError::PixelOutOfRange {
            row,
            col,
            width,
            height,
        };
        if row >= height || col >= width {
            return Err(out_of_range);
        }
        let index = row as usize * width as usize + col as usize;
        self.get(index).ok_or(out_of_range)
    }
}

/// Find a `n48w123` / `N47W123` style corner label in a tile filename.
///
/// Returns the signed `(lat, lon)` exactly as written: `n`/`N` and `e`/`E`
/// are positive, `s`/`S` and `w`/`W` negative. Which corner the label names
/// depends on the product (USGS names the north-west corner, SRTM the
/// south-west one).
pub(crate) fn parse_corner_label(filename: &str) -> Option<(i32, i32)> {
    let bytes = filename.as_bytes();
    (0..bytes.len()).find_map(|start| corner_at(&bytes[start..]))
}

fn corner_at(bytes: &[u8]) -> Option<(i32, i32)> {
    let lat_sign = match bytes.first()?.to_ascii_lowercase() {
        b'n' => 1,
        b's' => -1,
        _ => return None,
    };
    let (lat, rest) = leading_number(&bytes[1..])?;
    let lon_sign = match rest.first()?.to_ascii_lowercase() {
        b'e' => 1,
        b'w' => -1,
        _ => return None,
    };
    let (lon, _) = leading_number(&rest[1..])?;
    Some((lat_sign * lat, lon_sign * lon))
}

fn leading_number(bytes: &[u8]) -> Option<(i32, &[u8])> {
    let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 || digits > 3 {
        return None;
    }
    let value = std::str::from_utf8(&bytes[..digits]).ok()?.parse().ok()?;
    Some((value, &bytes[digits..]))
}

/// LRU cache of open handles.
#[derive(Debug, Default)]
struct HandleCache {
    /// Open handles indexed by path.
    handles: HashMap<PathBuf, Arc<dyn RasterHandle>>,
    /// Access order for LRU eviction (most recently used at the back).
    access_order: Vec<PathBuf>,
}

impl HandleCache {
    fn get(&mut self, path: &Path) -> Option<Arc<dyn RasterHandle>> {
        let handle = self.handles.get(path)?.clone();
        self.touch(path);
        Some(handle)
    }

    /// Mark a path as recently used (move to back of access order).
    fn touch(&mut self, path: &Path) {
        if let Some(pos) = self.access_order.iter().position(|p| p == path) {
            let key = self.access_order.remove(pos);
            self.access_order.push(key);
        }
    }

    fn insert(&mut self, path: PathBuf, handle: Arc<dyn RasterHandle>, max_size: usize) {
        if max_size == 0 {
            return;
        }

        // If already present, just update access order
        if self.handles.contains_key(&path) {
            self.touch(&path);
            return;
        }

        // Evict oldest handles if at capacity
        while self.handles.len() >= max_size && !self.access_order.is_empty() {
            let oldest = self.access_order.remove(0);
            debug!(path = %oldest.display(), "closing least recently used tile");
            self.handles.remove(&oldest);
        }

        self.handles.insert(path.clone(), handle);
        self.access_order.push(path);
    }

    fn len(&self) -> usize {
        self.handles.len()
    }

    fn clear(&mut self) {
        self.handles.clear();
        self.access_order.clear();
    }
}

/// Opens GeoTIFF and SRTM tiles from disk, keeping the most recently used
/// ones decoded in memory.
///
/// A file that fails to open is not cached, so a transient I/O error is
/// retried on the next request.
#[derive(Debug)]
pub struct FileRasterSource {
    /// Lower-case extensions considered during scans.
    extensions: Vec<String>,
    cache: Mutex<HandleCache>,
    max_open: usize,
}

impl Default for FileRasterSource {
    fn default() -> Self {
        Self::new(DEFAULT_OPEN_HANDLES)
    }
}

impl FileRasterSource {
    /// Create a source that keeps at most `max_open` decoded tiles.
    pub fn new(max_open: usize) -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            cache: Mutex::new(HandleCache::default()),
            max_open,
        }
    }

    /// Restrict scans to the given extensions (case-insensitive, no dot).
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Number of tiles currently decoded in memory.
    pub fn open_count(&self) -> usize {
        self.cache.lock().len()
    }

    /// Drop all decoded tiles. They are reopened on demand.
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    /// Decode a tile without touching the cache.
    pub fn open_uncached(path: &Path) -> Result<Arc<dyn RasterHandle>> {
        match extension_of(path).as_deref() {
            Some("tif") | Some("tiff") => Ok(Arc::new(GeoTiffRaster::from_file(path)?)),
            Some("hgt") => Ok(Arc::new(HgtRaster::from_file(path)?)),
            _ => Err(DemError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

impl RasterSource for FileRasterSource {
    fn recognizes(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
    }

    fn describe(&self, path: &Path) -> Result<RasterInfo> {
        match extension_of(path).as_deref() {
            Some("tif") | Some("tiff") => GeoTiffRaster::read_info(path),
            Some("hgt") => HgtRaster::read_info(path),
            _ => Err(DemError::UnsupportedFormat(path.display().to_string())),
        }
    }

    fn open(&self, path: &Path) -> Result<Arc<dyn RasterHandle>> {
        if let Some(handle) = self.cache.lock().get(path) {
            return Ok(handle);
        }

        debug!(path = %path.display(), "opening tile");
        let handle = Self::open_uncached(path)?;
        self.cache
            .lock()
            .insert(path.to_path_buf(), Arc::clone(&handle), self.max_open);
        Ok(handle)
    }

    fn clear(&self) {
        self.clear_cache();
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Constant(i64);

    impl RasterHandle for Constant {
        fn geo_transform(&self) -> GeoTransform {
            GeoTransform::north_up(0.0, 1.0, 1.0, -1.0)
        }

        fn dimensions(&self) -> (u32, u32) {
            (1, 1)
        }

        fn read_pixel(&self, _row: u32, _col: u32) -> Result<PixelValue> {
            Ok(PixelValue::Int(self.0))
        }
    }

    #[test]
    fn test_corner_label_usgs() {
        assert_eq!(parse_corner_label("USGS_13_n48w123_20240327.tif"), Some((48, -123)));
        assert_eq!(parse_corner_label("USGS_1_s05e010.tif"), Some((-5, 10)));
    }

    #[test]
    fn test_corner_label_srtm() {
        assert_eq!(parse_corner_label("N47W123.hgt"), Some((47, -123)));
        assert_eq!(parse_corner_label("S12E044.hgt"), Some((-12, 44)));
        assert_eq!(parse_corner_label("invalid.tif"), None);
        assert_eq!(parse_corner_label("n1234w5.tif"), None);
    }

    #[test]
    fn test_pixel_value_serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&PixelValue::Int(0)).unwrap(), "0");
        assert_eq!(serde_json::to_string(&PixelValue::Int(-12)).unwrap(), "-12");
        assert_eq!(serde_json::to_string(&PixelValue::Float(12.75)).unwrap(), "12.75");
    }

    #[test]
    fn test_pixel_value_matching() {
        assert!(PixelValue::Int(-9999).matches(-9999.0));
        assert!(!PixelValue::Int(0).matches(-9999.0));
        assert!(PixelValue::Float(-9999.0).matches(-9999.0));
        assert!(PixelValue::Float(f64::NAN).is_nan());
        assert!(!PixelValue::Int(0).is_nan());
    }

    #[test]
    fn test_sample_buffer_bounds() {
        let samples = SampleBuffer::I16(vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(samples.pixel(1, 2, 3, 2).unwrap(), PixelValue::Int(6));
        assert!(matches!(
            samples.pixel(2, 0, 3, 2),
            Err(DemError::PixelOutOfRange { .. })
        ));
        assert!(matches!(
            samples.pixel(0, 3, 3, 2),
            Err(DemError::PixelOutOfRange { .. })
        ));
    }

    #[test]
    fn test_u64_beyond_i64_becomes_float() {
        let samples = SampleBuffer::U64(vec![u64::MAX]);
        assert!(matches!(samples.get(0), Some(PixelValue::Float(_))));
    }

    #[test]
    fn test_handle_cache_evicts_least_recently_used() {
        let mut cache = HandleCache::default();
        cache.insert(PathBuf::from("a"), Arc::new(Constant(1)), 2);
        cache.insert(PathBuf::from("b"), Arc::new(Constant(2)), 2);

        // Touch "a" so "b" becomes the eviction candidate.
        assert!(cache.get(Path::new("a")).is_some());
        cache.insert(PathBuf::from("c"), Arc::new(Constant(3)), 2);

        assert_eq!(cache.len(), 2);
        assert!(cache.get(Path::new("a")).is_some());
        assert!(cache.get(Path::new("b")).is_none());
        assert!(cache.get(Path::new("c")).is_some());
    }

    #[test]
    fn test_handle_cache_disabled_with_zero_capacity() {
        let mut cache = HandleCache::default();
        cache.insert(PathBuf::from("a"), Arc::new(Constant(1)), 0);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_recognizes_extensions() {
        let source = FileRasterSource::default();
        assert!(source.recognizes(Path::new("a/b/USGS_13_n48w123.tif")));
        assert!(source.recognizes(Path::new("N47W123.HGT")));
        assert!(!source.recognizes(Path::new("metadata.json")));
        assert!(!source.recognizes(Path::new("noext")));

        let source = FileRasterSource::default().with_extensions([".TIF"]);
        assert!(source.recognizes(Path::new("x.tif")));
        assert!(!source.recognizes(Path::new("x.hgt")));
    }

    #[test]
    fn test_unsupported_format() {
        assert!(matches!(
            FileRasterSource::open_uncached(Path::new("x.png")),
            Err(DemError::UnsupportedFormat(_))
        ));
    }
}
