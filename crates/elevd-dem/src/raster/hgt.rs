//! SRTM `.hgt` height tiles.
//!
//! An HGT file is a square grid of big-endian `i16` samples, north row
//! first, with no header. Its location comes from the filename, which names
//! the south-west corner (`N47W123.hgt` covers 47..48 N, 123..122 W).
//! Samples sit on the grid lines, so the outer pixels straddle the tile edge
//! by half a pixel.

use super::{parse_corner_label, PixelValue, RasterHandle, RasterInfo, SampleBuffer};
use crate::transform::GeoTransform;
use crate::{DemError, Result};
use std::path::Path;

/// Sample value SRTM uses for voids.
pub const HGT_VOID: i16 = -32768;

/// 1 arc-second (3601 x 3601) and 3 arc-second (1201 x 1201) grids.
const HGT_SIZES: [u32; 2] = [3601, 1201];

#[derive(Debug)]
pub struct HgtRaster {
    samples: SampleBuffer,
    size: u32,
    transform: GeoTransform,
}

impl HgtRaster {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let (south, west) = Self::corner(path)?;
        let buffer = std::fs::read(path)?;
        Self::from_bytes(&buffer, south, west)
    }

    /// Georeferencing from the filename and file size alone.
    pub fn read_info<P: AsRef<Path>>(path: P) -> Result<RasterInfo> {
        let path = path.as_ref();
        let (south, west) = Self::corner(path)?;
        let size = grid_size(std::fs::metadata(path)?.len() as usize)?;
        Ok(RasterInfo {
            transform: grid_transform(size, south, west),
            width: size,
            height: size,
        })
    }

    /// Build from raw file contents and the tile's south-west corner.
    pub fn from_bytes(buffer: &[u8], south: i32, west: i32) -> Result<Self> {
        let size = grid_size(buffer.len())?;
        let samples = buffer
            .chunks_exact(2)
            .map(|pair| i16::from_be_bytes([pair[0], pair[1]]))
            .collect();

        Ok(Self {
            samples: SampleBuffer::I16(samples),
            size,
            transform: grid_transform(size, south, west),
        })
    }

    fn corner(path: &Path) -> Result<(i32, i32)> {
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| DemError::InvalidFilename(path.display().to_string()))?;
        parse_corner_label(filename).ok_or_else(|| DemError::InvalidFilename(filename.to_string()))
    }
}

fn grid_size(bytes: usize) -> Result<u32> {
    HGT_SIZES
        .into_iter()
        .find(|&n| bytes == n as usize * n as usize * 2)
        .ok_or_else(|| {
            DemError::InvalidHgt(format!(
                "expected 1 or 3 arc-second resolution, got {} bytes",
                bytes
            ))
        })
}

fn grid_transform(size: u32, south: i32, west: i32) -> GeoTransform {
    let step = 1.0 / (size - 1) as f64;
    GeoTransform::north_up(
        west as f64 - step / 2.0,
        step,
        (south + 1) as f64 + step / 2.0,
        -step,
    )
}

impl RasterHandle for HgtRaster {
    fn geo_transform(&self) -> GeoTransform {
        self.transform
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.size, self.size)
    }

    fn no_data(&self) -> Option<f64> {
        Some(HGT_VOID as f64)
    }

    fn read_pixel(&self, row: u32, col: u32) -> Result<PixelValue> {
        self.samples.pixel(row, col, self.size, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile_bytes(north_west: i16, south_east: i16) -> Vec<u8> {
        let n = 1201usize;
        let mut bytes = vec![0u8; n * n * 2];
        bytes[..2].copy_from_slice(&north_west.to_be_bytes());
        let last = (n * n - 1) * 2;
        bytes[last..].copy_from_slice(&south_east.to_be_bytes());
        bytes
    }

    #[test]
    fn test_three_arc_second_tile() {
        let raster = HgtRaster::from_bytes(&tile_bytes(812, -3), 47, -123).unwrap();
        assert_eq!(raster.dimensions(), (1201, 1201));
        assert_eq!(raster.no_data(), Some(-32768.0));

        // First stored sample is the north-west corner.
        assert_eq!(raster.read_pixel(0, 0).unwrap(), PixelValue::Int(812));
        assert_eq!(raster.read_pixel(1200, 1200).unwrap(), PixelValue::Int(-3));

        let gt = raster.geo_transform();
        assert_eq!(gt.pixel_at(48.0, -123.0, 1201, 1201), (0, 0));
        assert_eq!(gt.pixel_at(47.0, -122.0, 1201, 1201), (1200, 1200));

        let bounds = gt.bounds(1201, 1201);
        assert!(bounds.contains(47.0, -123.0));
        assert!(bounds.contains(48.0, -122.0));
    }

    #[test]
    fn test_rejects_odd_sizes() {
        assert!(matches!(
            HgtRaster::from_bytes(&[0u8; 100], 0, 0),
            Err(DemError::InvalidHgt(_))
        ));
    }

    #[test]
    fn test_filename_is_required() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.hgt");
        std::fs::write(&path, tile_bytes(0, 0)).unwrap();
        assert!(matches!(
            HgtRaster::from_file(&path),
            Err(DemError::InvalidFilename(_))
        ));

        let path = dir.path().join("N47W123.hgt");
        std::fs::write(&path, tile_bytes(5, 0)).unwrap();
        let raster = HgtRaster::from_file(&path).unwrap();
        assert_eq!(raster.read_pixel(0, 0).unwrap(), PixelValue::Int(5));

        let info = HgtRaster::read_info(&path).unwrap();
        assert_eq!(info.width, 1201);
        assert_eq!(info.transform, raster.geo_transform());
    }
}
