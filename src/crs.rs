//! Source coordinate reference systems and reprojection into WGS84.
//!
//! Boundaries come either as GeoJSON (always WGS84) or as shapefiles in
//! whatever projection the municipality publishes, usually the Dutch
//! RD New grid. Everything the registry stores is lon/lat in degrees.

use geo::{Coord, MapCoords, MultiPolygon};
use proj4rs::proj::Proj;
use thiserror::Error;

const WGS84: &str = "+proj=longlat +datum=WGS84 +no_defs";

const KNOWN_EPSG: &[(u32, &str)] = &[
    (4326, WGS84),
    (
        28992,
        "+proj=sterea +lat_0=52.15616055555555 +lon_0=5.38763888888889 +k=0.9999079 \
         +x_0=155000 +y_0=463000 +ellps=bessel \
         +towgs84=565.417,50.3319,465.552,-0.398957,0.343988,-1.8774,4.0725 +units=m +no_defs",
    ),
    (
        3857,
        "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs",
    ),
    (
        2157,
        "+proj=tmerc +lat_0=53.5 +lon_0=-8 +k=0.99982 +x_0=600000 +y_0=750000 \
         +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
    ),
    (
        25832,
        "+proj=utm +zone=32 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
    ),
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CrsError {
    #[error("Unsupported CRS '{0}'")]
    Unsupported(String),

    #[error("Unrecognised .prj projection: {0}")]
    UnknownPrj(String),

    #[error("Invalid projection definition: {0}")]
    Definition(String),

    #[error("Failed to reproject ({x}, {y}): {reason}")]
    Transform { x: f64, y: f64, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceCrs {
    Epsg(u32),
    Proj(String),
}

impl SourceCrs {
    pub const WGS84: SourceCrs = SourceCrs::Epsg(4326);

    /// Accepts `EPSG:<code>` for the codes in the built-in table, or a raw
    /// proj string starting with `+proj=`.
    pub fn parse(value: &str) -> Result<Self, CrsError> {
        let value = value.trim();
        if value.starts_with("+proj=") {
            return Ok(SourceCrs::Proj(value.to_string()));
        }

        let code = value
            .strip_prefix("EPSG:")
            .or_else(|| value.strip_prefix("epsg:"))
            .and_then(|c| c.parse::<u32>().ok())
            .ok_or_else(|| CrsError::Unsupported(value.to_string()))?;

        if KNOWN_EPSG.iter().any(|(known, _)| *known == code) {
            Ok(SourceCrs::Epsg(code))
        } else {
            Err(CrsError::Unsupported(value.to_string()))
        }
    }

    /// Identifies the CRS from the WKT in a shapefile's `.prj` sidecar.
    /// Only the projections in the built-in table are recognised.
    pub fn from_prj(wkt: &str) -> Result<Self, CrsError> {
        // Some GIS tools write a UTF-8 BOM or leading blank lines.
        let normalized = wkt
            .trim_start_matches('\u{feff}')
            .trim_start()
            .to_ascii_lowercase();

        if normalized.starts_with("projcs") {
            if normalized.contains("amersfoort") || normalized.contains("rd_new") {
                return Ok(SourceCrs::Epsg(28992));
            }
            if normalized.contains("pseudo-mercator")
                || normalized.contains("mercator_auxiliary_sphere")
            {
                return Ok(SourceCrs::Epsg(3857));
            }
            if normalized.contains("irenet95") || normalized.contains("irish_transverse_mercator") {
                return Ok(SourceCrs::Epsg(2157));
            }
            if normalized.contains("utm_zone_32n") || normalized.contains("utm zone 32n") {
                return Ok(SourceCrs::Epsg(25832));
            }
        } else if normalized.starts_with("geogcs") && normalized.contains("wgs") {
            return Ok(SourceCrs::WGS84);
        }

        let head: String = wkt.chars().take(60).collect();
        Err(CrsError::UnknownPrj(head))
    }

    fn definition(&self) -> &str {
        match self {
            SourceCrs::Epsg(code) => KNOWN_EPSG
                .iter()
                .find(|(known, _)| known == code)
                .map(|(_, def)| *def)
                .unwrap_or(WGS84),
            SourceCrs::Proj(def) => def,
        }
    }

    fn is_geographic(&self) -> bool {
        let def = self.definition();
        def.contains("+proj=longlat") || def.contains("+proj=latlong")
    }
}

/// Converts coordinates from one source CRS into WGS84 degrees.
///
/// Holds parsed projections, so build one per worker rather than sharing.
pub struct Reprojector {
    source: SourceCrs,
    projections: Option<(Proj, Proj)>,
}

impl Reprojector {
    pub fn new(source: &SourceCrs) -> Result<Self, CrsError> {
        if *source == SourceCrs::WGS84 {
            return Ok(Reprojector {
                source: source.clone(),
                projections: None,
            });
        }

        let from = Proj::from_proj_string(source.definition())
            .map_err(|e| CrsError::Definition(format!("{e:?}")))?;
        let to = Proj::from_proj_string(WGS84)
            .map_err(|e| CrsError::Definition(format!("{e:?}")))?;

        Ok(Reprojector {
            source: source.clone(),
            projections: Some((from, to)),
        })
    }

    pub fn coord(&self, c: Coord<f64>) -> Result<Coord<f64>, CrsError> {
        let Some((from, to)) = &self.projections else {
            return Ok(c);
        };

        // proj4rs works in radians for geographic systems.
        let mut point = if self.source.is_geographic() {
            (c.x.to_radians(), c.y.to_radians(), 0.0)
        } else {
            (c.x, c.y, 0.0)
        };

        proj4rs::transform::transform(from, to, &mut point).map_err(|e| CrsError::Transform {
            x: c.x,
            y: c.y,
            reason: format!("{e:?}"),
        })?;

        let out = Coord {
            x: point.0.to_degrees(),
            y: point.1.to_degrees(),
        };
        if !out.x.is_finite() || !out.y.is_finite() {
            return Err(CrsError::Transform {
                x: c.x,
                y: c.y,
                reason: "result is not finite".to_string(),
            });
        }
        Ok(out)
    }

    pub fn multi_polygon(&self, geometry: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, CrsError> {
        if self.projections.is_none() {
            return Ok(geometry.clone());
        }
        geometry.try_map_coords(|c| self.coord(c))
    }
}
