//! Georeferencing: tile bounds and the pixel/geographic affine transform.

use serde::Serialize;

/// Geographic bounds of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TileBounds {
    /// Minimum latitude (south edge).
    pub min_lat: f64,
    /// Maximum latitude (north edge).
    pub max_lat: f64,
    /// Minimum longitude (west edge).
    pub min_lon: f64,
    /// Maximum longitude (east edge).
    pub max_lon: f64,
}

impl TileBounds {
    /// Check if a coordinate is within the bounds. Edges are inclusive.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    /// Smallest bounds covering both `self` and `other`.
    pub fn union(&self, other: &TileBounds) -> TileBounds {
        TileBounds {
            min_lat: self.min_lat.min(other.min_lat),
            max_lat: self.max_lat.max(other.max_lat),
            min_lon: self.min_lon.min(other.min_lon),
            max_lon: self.max_lon.max(other.max_lon),
        }
    }
}

/// Six-parameter affine transform between pixel and geographic coordinates,
/// in GDAL order:
///
/// ```text
/// lon = origin_x + col * pixel_width  + row * row_rotation
/// lat = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// `pixel_height` is negative for the usual north-up raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub col_rotation: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// A transform without rotation terms.
    pub fn north_up(origin_x: f64, pixel_width: f64, origin_y: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            pixel_width,
            row_rotation: 0.0,
            origin_y,
            col_rotation: 0.0,
            pixel_height,
        }
    }

    /// Build from the GDAL `GetGeoTransform` array layout.
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            origin_x: gt[0],
            pixel_width: gt[1],
            row_rotation: gt[2],
            origin_y: gt[3],
            col_rotation: gt[4],
            pixel_height: gt[5],
        }
    }

    /// The GDAL `GetGeoTransform` array layout.
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// True when the raster axes are aligned with longitude and latitude.
    pub fn is_north_up(&self) -> bool {
        self.row_rotation == 0.0 && self.col_rotation == 0.0
    }

    /// True when every term is finite and both pixel sizes are non-zero.
    pub fn is_usable(&self) -> bool {
        self.to_gdal().iter().all(|v| v.is_finite())
            && self.pixel_width != 0.0
            && self.pixel_height != 0.0
    }

    /// Bounding box covered by a `width` x `height` raster.
    ///
    /// With the usual negative `pixel_height` this is
    /// `max_lat = origin_y`, `min_lat = origin_y + height * pixel_height`.
    pub fn bounds(&self, width: u32, height: u32) -> TileBounds {
        let x0 = self.origin_x;
        let x1 = self.origin_x + width as f64 * self.pixel_width;
        let y0 = self.origin_y;
        let y1 = self.origin_y + height as f64 * self.pixel_height;

        TileBounds {
            min_lat: y0.min(y1),
            max_lat: y0.max(y1),
            min_lon: x0.min(x1),
            max_lon: x0.max(x1),
        }
    }

    /// Pixel `(row, col)` containing a coordinate, clamped into the grid.
    ///
    /// Points on the far edges of a tile land one past the last pixel; they
    /// are clamped to the edge pixel instead of being rejected.
    pub fn pixel_at(&self, lat: f64, lon: f64, width: u32, height: u32) -> (u32, u32) {
        let col = ((lon - self.origin_x) / self.pixel_width).floor();
        let row = ((lat - self.origin_y) / self.pixel_height).floor();
        (clamp_index(row, height), clamp_index(col, width))
    }
}

fn clamp_index(index: f64, len: u32) -> u32 {
    let last = len.saturating_sub(1);
    if index.is_nan() || index <= 0.0 {
        0
    } else if index >= last as f64 {
        last
    } else {
        index as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn one_degree_tile() -> GeoTransform {
        // 10x10 pixels over lat 47..48, lon -123..-122
        GeoTransform::north_up(-123.0, 0.1, 48.0, -0.1)
    }

    #[test]
    fn test_bounds_contains() {
        let bounds = TileBounds {
            min_lat: 47.0,
            max_lat: 48.0,
            min_lon: -123.0,
            max_lon: -122.0,
        };

        assert!(bounds.contains(47.5, -122.5));
        assert!(bounds.contains(47.0, -123.0)); // Corner
        assert!(bounds.contains(48.0, -122.0)); // Corner
        assert!(!bounds.contains(46.5, -122.5)); // Too far south
        assert!(!bounds.contains(48.5, -122.5)); // Too far north
        assert!(!bounds.contains(47.5, -121.5)); // Too far east
        assert!(!bounds.contains(47.5, -123.5)); // Too far west
    }

    #[test]
    fn test_bounds_from_transform() {
        let bounds = one_degree_tile().bounds(10, 10);
        assert_eq!(bounds.max_lat, 48.0);
        assert_eq!(bounds.min_lon, -123.0);
        assert_abs_diff_eq!(bounds.min_lat, 47.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bounds.max_lon, -122.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bounds_with_south_up_raster() {
        let bounds = GeoTransform::north_up(10.0, 0.5, -5.0, 0.5).bounds(4, 4);
        assert_eq!(bounds.min_lat, -5.0);
        assert_eq!(bounds.max_lat, -3.0);
        assert_eq!(bounds.min_lon, 10.0);
        assert_eq!(bounds.max_lon, 12.0);
    }

    #[test]
    fn test_pixel_at_interior() {
        let gt = one_degree_tile();
        assert_eq!(gt.pixel_at(47.95, -122.95, 10, 10), (0, 0));
        assert_eq!(gt.pixel_at(47.55, -122.45, 10, 10), (4, 5));
    }

    #[test]
    fn test_pixel_at_far_edges_is_clamped() {
        let gt = one_degree_tile();
        // South-east corner sits exactly one pixel past the grid.
        assert_eq!(gt.pixel_at(47.0, -122.0, 10, 10), (9, 9));
        // North-west corner is pixel (0, 0).
        assert_eq!(gt.pixel_at(48.0, -123.0, 10, 10), (0, 0));
    }

    #[test]
    fn test_gdal_round_trip_and_checks() {
        let gt = GeoTransform::from_gdal([1.0, 0.5, 0.0, 2.0, 0.0, -0.5]);
        assert_eq!(gt.to_gdal(), [1.0, 0.5, 0.0, 2.0, 0.0, -0.5]);
        assert!(gt.is_north_up());
        assert!(gt.is_usable());

        assert!(!GeoTransform::from_gdal([1.0, 0.5, 0.1, 2.0, 0.0, -0.5]).is_north_up());
        assert!(!GeoTransform::north_up(0.0, 0.0, 0.0, -1.0).is_usable());
        assert!(!GeoTransform::north_up(f64::NAN, 1.0, 0.0, -1.0).is_usable());
    }
}
