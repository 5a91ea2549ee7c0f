//! GeoTIFF DEM tiles.

use super::{parse_corner_label, PixelValue, RasterHandle, RasterInfo, SampleBuffer};
use crate::transform::GeoTransform;
use crate::{DemError, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;

const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const RASTER_PIXEL_IS_POINT: u16 = 2;

/// A single-band GeoTIFF tile decoded into memory.
///
/// USGS 1/3 arc-second tiles are typically 10812 x 10812 pixels covering
/// 1 degree of latitude and longitude.
#[derive(Debug)]
pub struct GeoTiffRaster {
    /// Samples in row-major order (first scanline first), native type.
    samples: SampleBuffer,
    /// Width of the tile in pixels.
    width: u32,
    /// Height of the tile in pixels.
    height: u32,
    transform: GeoTransform,
    /// Value of the `GDAL_NODATA` tag, if present.
    no_data: Option<f64>,
}

impl GeoTiffRaster {
    /// Load a DEM tile from a GeoTIFF file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let (mut decoder, info) = Self::open_header(path)?;

        let no_data = Self::read_nodata_value(&mut decoder);
        let samples = Self::decode_samples(&mut decoder)?;

        let expected = info.width as usize * info.height as usize;
        if samples.len() != expected {
            return Err(DemError::InvalidGeoTiff(format!(
                "{}: expected {} samples for a single-band {}x{} raster, got {}",
                path.display(),
                expected,
                info.width,
                info.height,
                samples.len()
            )));
        }

        Ok(Self {
            samples,
            width: info.width,
            height: info.height,
            transform: info.transform,
            no_data,
        })
    }

    /// Read dimensions and georeferencing without decoding any samples.
    pub fn read_info<P: AsRef<Path>>(path: P) -> Result<RasterInfo> {
        Ok(Self::open_header(path.as_ref())?.1)
    }

    fn open_header(path: &Path) -> Result<(Decoder<BufReader<File>>, RasterInfo)> {
        let file = File::open(path)?;
        let mut decoder = Decoder::new(BufReader::new(file))?;

        // Set limits to allow large DEM files
        // 1/3 arc-second tiles are 10812 x 10812 pixels = ~116 million pixels
        // Each pixel is f32 (4 bytes) = ~466 MB
        let mut limits = Limits::default();
        limits.decoding_buffer_size = 1024 * 1024 * 1024; // 1 GB
        limits.intermediate_buffer_size = 1024 * 1024 * 1024; // 1 GB
        limits.ifd_value_size = 1024 * 1024 * 1024;
        decoder = decoder.with_limits(limits);

        let (width, height) = decoder.dimensions()?;
        if width == 0 || height == 0 {
            return Err(DemError::InvalidGeoTiff(format!(
                "{}: empty raster",
                path.display()
            )));
        }

        let transform = Self::read_geotransform(&mut decoder, path, width, height)?;
        if !transform.is_north_up() {
            return Err(DemError::RotatedTransform(path.display().to_string()));
        }
        if !transform.is_usable() {
            return Err(DemError::InvalidGeoTiff(format!(
                "{}: degenerate geotransform {:?}",
                path.display(),
                transform.to_gdal()
            )));
        }

        Ok((
            decoder,
            RasterInfo {
                transform,
                width,
                height,
            },
        ))
    }

    /// Read the geotransform from GeoTIFF tags.
    ///
    /// Tries `ModelPixelScale` + `ModelTiepoint`, then `ModelTransformation`,
    /// then a USGS-style filename. Tag-based transforms of PixelIsPoint
    /// rasters are moved from the first pixel's centre to its outer corner.
    fn read_geotransform<R: std::io::Read + std::io::Seek>(
        decoder: &mut Decoder<R>,
        path: &Path,
        width: u32,
        height: u32,
    ) -> Result<GeoTransform> {
        let Some(transform) = Self::transform_from_tags(decoder) else {
            return Self::transform_from_filename(path, width, height);
        };
        if Self::is_pixel_is_point(decoder) {
            Ok(Self::point_to_area(transform))
        } else {
            Ok(transform)
        }
    }

    fn transform_from_tags<R: std::io::Read + std::io::Seek>(
        decoder: &mut Decoder<R>,
    ) -> Option<GeoTransform> {
        let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag);
        let pixel_scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag);

        if let (Ok(tiepoint), Ok(scale)) = (tiepoint, pixel_scale) {
            if tiepoint.len() >= 6 && scale.len() >= 2 {
                // Tiepoint format: [i, j, k, x, y, z] where (i,j) is pixel coords and (x,y) is geo coords
                let (tie_i, tie_j) = (tiepoint[0], tiepoint[1]);
                let (tie_x, tie_y) = (tiepoint[3], tiepoint[4]);
                let (scale_x, scale_y) = (scale[0], scale[1]);

                // Data goes south and east from the tie point
                return Some(GeoTransform::north_up(
                    tie_x - tie_i * scale_x,
                    scale_x,
                    tie_y + tie_j * scale_y,
                    -scale_y,
                ));
            }
        }

        if let Ok(matrix) = decoder.get_tag_f64_vec(Tag::ModelTransformationTag) {
            if matrix.len() >= 8 {
                // Row-major 4x4: lon = m0*col + m1*row + m3, lat = m4*col + m5*row + m7
                return Some(GeoTransform::from_gdal([
                    matrix[3], matrix[0], matrix[1], matrix[7], matrix[4], matrix[5],
                ]));
            }
        }

        None
    }

    /// Whether `GTRasterTypeGeoKey` says samples are points rather than areas.
    ///
    /// The key directory is a header `[version, revision, minor, count]`
    /// followed by `count` entries of `[key, location, count, value]`.
    fn is_pixel_is_point<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> bool {
        let Ok(keys) = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag) else {
            return false;
        };
        keys.get(4..)
            .unwrap_or(&[])
            .chunks_exact(4)
            .any(|entry| {
                entry[0] == GT_RASTER_TYPE_GEO_KEY && entry[1] == 0 && entry[3] == RASTER_PIXEL_IS_POINT
            })
    }

    /// Move the origin half a pixel up and left, as GDAL does.
    fn point_to_area(transform: GeoTransform) -> GeoTransform {
        let mut gt = transform.to_gdal();
        gt[0] -= 0.5 * (gt[1] + gt[2]);
        gt[3] -= 0.5 * (gt[4] + gt[5]);
        GeoTransform::from_gdal(gt)
    }

    /// Derive a transform from a USGS filename like "USGS_13_n48w123_*.tif".
    ///
    /// The label names the north-west corner of a 1x1 degree tile.
    fn transform_from_filename(path: &Path, width: u32, height: u32) -> Result<GeoTransform> {
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| DemError::InvalidFilename(path.display().to_string()))?;

        let (max_lat, min_lon) = parse_corner_label(filename)
            .ok_or_else(|| DemError::InvalidFilename(filename.to_string()))?;

        Ok(GeoTransform::north_up(
            min_lon as f64,
            1.0 / width as f64,
            max_lat as f64,
            -1.0 / height as f64,
        ))
    }

    /// Decode the first image, keeping the file's sample type.
    fn decode_samples<R: std::io::Read + std::io::Seek>(
        decoder: &mut Decoder<R>,
    ) -> Result<SampleBuffer> {
        let samples = match decoder.read_image()? {
            DecodingResult::U8(data) => SampleBuffer::U8(data),
            DecodingResult::U16(data) => SampleBuffer::U16(data),
            DecodingResult::U32(data) => SampleBuffer::U32(data),
            DecodingResult::U64(data) => SampleBuffer::U64(data),
            DecodingResult::I8(data) => SampleBuffer::I8(data),
            DecodingResult::I16(data) => SampleBuffer::I16(data),
            DecodingResult::I32(data) => SampleBuffer::I32(data),
            DecodingResult::I64(data) => SampleBuffer::I64(data),
            DecodingResult::F32(data) => SampleBuffer::F32(data),
            DecodingResult::F64(data) => SampleBuffer::F64(data),
        };
        Ok(samples)
    }

    /// Try to read the no-data value from GDAL_NODATA tag.
    fn read_nodata_value<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
        // GDAL_NODATA is stored as an ASCII string, sometimes NUL-padded
        let text = decoder.get_tag_ascii_string(Tag::GdalNodata).ok()?;
        text.trim_matches(char::from(0)).trim().parse().ok()
    }
}

impl RasterHandle for GeoTiffRaster {
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
        self.samples.pixel(row, col, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tiff::encoder::{colortype, TiffEncoder};

    fn write_i16_tile(path: &Path, width: u32, height: u32, data: &[i16], georef: bool) {
        let file = File::create(path).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        let mut image = encoder
            .new_image::<colortype::GrayI16>(width, height)
            .unwrap();
        if georef {
            let dir = image.encoder();
            dir.write_tag(Tag::ModelPixelScaleTag, &[0.5f64, 0.25, 0.0][..])
                .unwrap();
            dir.write_tag(Tag::ModelTiepointTag, &[0.0f64, 0.0, 0.0, 10.0, 50.0, 0.0][..])
                .unwrap();
            dir.write_tag(Tag::GdalNodata, "-9999").unwrap();
        }
        image.write_data(data).unwrap();
    }

    fn scratch(name: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        (dir, path)
    }

    #[test]
    fn test_reads_tags_and_native_samples() {
        let (_dir, path) = scratch("tile.tif");
        write_i16_tile(&path, 3, 2, &[1, 2, 3, 4, -9999, 6], true);

        let raster = GeoTiffRaster::from_file(&path).unwrap();
        assert_eq!(raster.dimensions(), (3, 2));
        assert_eq!(
            raster.geo_transform(),
            GeoTransform::north_up(10.0, 0.5, 50.0, -0.25)
        );
        assert_eq!(raster.no_data(), Some(-9999.0));
        assert_eq!(raster.read_pixel(0, 2).unwrap(), PixelValue::Int(3));
        assert_eq!(raster.read_pixel(1, 1).unwrap(), PixelValue::Int(-9999));
        assert!(raster.read_pixel(2, 0).is_err());

        let bounds = raster.geo_transform().bounds(3, 2);
        assert_eq!(bounds.min_lat, 49.5);
        assert_eq!(bounds.max_lat, 50.0);
        assert_eq!(bounds.min_lon, 10.0);
        assert_eq!(bounds.max_lon, 11.5);
    }

    #[test]
    fn test_read_info_matches_full_decode() {
        let (_dir, path) = scratch("tile.tif");
        write_i16_tile(&path, 3, 2, &[1, 2, 3, 4, 5, 6], true);

        let info = GeoTiffRaster::read_info(&path).unwrap();
        let raster = GeoTiffRaster::from_file(&path).unwrap();
        assert_eq!((info.width, info.height), raster.dimensions());
        assert_eq!(info.transform, raster.geo_transform());
    }

    #[test]
    fn test_pixel_is_point_moves_origin_to_corner() {
        let (_dir, path) = scratch("point.tif");
        let file = File::create(&path).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        let mut image = encoder.new_image::<colortype::GrayI16>(2, 2).unwrap();
        let dir = image.encoder();
        dir.write_tag(Tag::ModelPixelScaleTag, &[1.0f64, 1.0, 0.0][..])
            .unwrap();
        dir.write_tag(Tag::ModelTiepointTag, &[0.0f64, 0.0, 0.0, 10.0, 50.0, 0.0][..])
            .unwrap();
        // GTModelType = geographic, GTRasterType = PixelIsPoint
        let keys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 2, 1025, 0, 1, 2];
        dir.write_tag(Tag::GeoKeyDirectoryTag, &keys[..]).unwrap();
        image.write_data(&[1i16, 2, 3, 4][..]).unwrap();

        let raster = GeoTiffRaster::from_file(&path).unwrap();
        assert_eq!(
            raster.geo_transform(),
            GeoTransform::north_up(9.5, 1.0, 50.5, -1.0)
        );
        assert_eq!(GeoTiffRaster::read_info(&path).unwrap().transform, raster.geo_transform());

        let bounds = raster.geo_transform().bounds(2, 2);
        assert!(bounds.contains(50.2, 9.7));
        assert_eq!(raster.geo_transform().pixel_at(50.2, 9.7, 2, 2), (0, 0));
        assert_eq!(raster.geo_transform().pixel_at(49.0, 11.0, 2, 2), (1, 1));
    }

    #[test]
    fn test_pixel_is_area_keeps_tiepoint_origin() {
        let (_dir, path) = scratch("area.tif");
        let file = File::create(&path).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        let mut image = encoder.new_image::<colortype::GrayI16>(2, 2).unwrap();
        let dir = image.encoder();
        dir.write_tag(Tag::ModelPixelScaleTag, &[1.0f64, 1.0, 0.0][..])
            .unwrap();
        dir.write_tag(Tag::ModelTiepointTag, &[0.0f64, 0.0, 0.0, 10.0, 50.0, 0.0][..])
            .unwrap();
        let keys: [u16; 8] = [1, 1, 0, 1, 1025, 0, 1, 1];
        dir.write_tag(Tag::GeoKeyDirectoryTag, &keys[..]).unwrap();
        image.write_data(&[1i16, 2, 3, 4][..]).unwrap();

        let raster = GeoTiffRaster::from_file(&path).unwrap();
        assert_eq!(
            raster.geo_transform(),
            GeoTransform::north_up(10.0, 1.0, 50.0, -1.0)
        );
    }

    #[test]
    fn test_falls_back_to_usgs_filename() {
        let (_dir, path) = scratch("USGS_13_n48w123_20240327.tif");
        write_i16_tile(&path, 4, 4, &[0; 16], false);

        let raster = GeoTiffRaster::from_file(&path).unwrap();
        let bounds = raster.geo_transform().bounds(4, 4);
        assert_eq!(bounds.min_lat, 47.0);
        assert_eq!(bounds.max_lat, 48.0);
        assert_eq!(bounds.min_lon, -123.0);
        assert_eq!(bounds.max_lon, -122.0);
        assert_eq!(raster.no_data(), None);
    }

    #[test]
    fn test_no_georeferencing_is_an_error() {
        let (_dir, path) = scratch("plain.tif");
        write_i16_tile(&path, 2, 2, &[0; 4], false);

        assert!(matches!(
            GeoTiffRaster::from_file(&path),
            Err(DemError::InvalidFilename(_))
        ));
    }

    #[test]
    fn test_garbage_file_is_an_error() {
        let (_dir, path) = scratch("broken.tif");
        std::fs::write(&path, b"not a tiff at all").unwrap();
        assert!(GeoTiffRaster::from_file(&path).is_err());
    }
}
