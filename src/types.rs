use geo::{Coord, MultiPolygon, Point, Rect};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct District {
    pub name: String,
    // WGS84, x = lon, y = lat
    pub boundary: MultiPolygon<f64>,
}

/// A longitude/latitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        LonLat { lon, lat }
    }

    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }
}

impl From<Point<f64>> for LonLat {
    fn from(p: Point<f64>) -> Self {
        LonLat { lon: p.x(), lat: p.y() }
    }
}

impl From<LonLat> for Point<f64> {
    fn from(p: LonLat) -> Self {
        Point::new(p.lon, p.lat)
    }
}

impl From<LonLat> for Coord<f64> {
    fn from(p: LonLat) -> Self {
        Coord { x: p.lon, y: p.lat }
    }
}

/// `[min_lon, min_lat, max_lon, max_lat]`, the order map widgets expect.
pub type Bounds = [f64; 4];

pub(crate) fn bounds_of(rect: Rect<f64>) -> Bounds {
    [rect.min().x, rect.min().y, rect.max().x, rect.max().y]
}
