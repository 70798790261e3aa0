use crate::config::BoundarySource;
use crate::crs::{Reprojector, SourceCrs};
use crate::error::{RegistryError, RegistryResult};
use crate::types::District;
use geo::{Intersects, Line, LineString, MultiPolygon};
use geojson::GeoJson;
use rayon::prelude::*;
use shapefile::dbase::FieldValue;
use shapefile::{Reader, Shape};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, warn};

/// A named boundary still in the dataset's own coordinate system.
struct RawDistrict {
    name: String,
    geometry: MultiPolygon<f64>,
}

/// Reads every district from the boundary dataset and reprojects it to WGS84.
///
/// Output order is dataset record order.
pub fn load_districts(source: &BoundarySource) -> RegistryResult<Vec<District>> {
    let path = source.path.as_path();
    info!("Loading district boundaries from {:?}", path);

    if !path.is_file() {
        return Err(RegistryError::data_load(path, "file not found"));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .ok_or_else(|| RegistryError::data_load(path, "boundary file has no extension"))?;

    let (raw, crs) = match extension.as_str() {
        "shp" => {
            let crs = match &source.crs {
                Some(crs) => crs.clone(),
                None => crs_from_prj(path)?,
            };
            (load_shapefile(path, &source.name_column)?, crs)
        }
        "json" | "geojson" => {
            // RFC 7946 GeoJSON is always WGS84 unless configured otherwise.
            let crs = source.crs.clone().unwrap_or(SourceCrs::WGS84);
            (load_geojson(path, &source.name_column)?, crs)
        }
        _ => {
            return Err(RegistryError::data_load(
                path,
                format!("unsupported geometry format: {}", extension),
            ))
        }
    };

    debug!("Read {} boundary records, source CRS {:?}", raw.len(), crs);

    ensure_unique_names(path, &raw)?;
    let districts = reproject_all(path, raw, &crs)?;
    for district in &districts {
        validate_boundary(path, district)?;
    }

    info!("Loaded {} districts", districts.len());
    Ok(districts)
}

fn crs_from_prj(shp_path: &Path) -> RegistryResult<SourceCrs> {
    let prj_path = shp_path.with_extension("prj");
    let wkt = fs::read_to_string(&prj_path).map_err(|e| {
        RegistryError::data_load(
            shp_path,
            format!("no source_crs configured and {:?} unreadable: {}", prj_path, e),
        )
    })?;
    SourceCrs::from_prj(&wkt).map_err(|e| RegistryError::data_load(shp_path, e.to_string()))
}

fn load_shapefile(path: &Path, name_column: &str) -> RegistryResult<Vec<RawDistrict>> {
    let mut reader = Reader::from_path(path)
        .map_err(|e| RegistryError::data_load(path, format!("failed to open shapefile: {}", e)))?;

    let mut districts = Vec::new();

    for (index, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result
            .map_err(|e| RegistryError::data_load(path, format!("record {}: {}", index, e)))?;

        let value = record.get(name_column).ok_or_else(|| {
            RegistryError::data_load(path, format!("name attribute '{}' not found", name_column))
        })?;

        let name = match value {
            FieldValue::Character(Some(s)) if !s.trim().is_empty() => s.trim().to_string(),
            FieldValue::Character(_) => {
                warn!("Skipping record {} with empty name", index);
                continue;
            }
            _ => {
                return Err(RegistryError::data_load(
                    path,
                    format!("name attribute '{}' must be text", name_column),
                ))
            }
        };

        match shape_to_multi_polygon(shape) {
            Ok(Some(geometry)) => districts.push(RawDistrict { name, geometry }),
            Ok(None) => warn!("Skipping '{}': not a polygon shape", name),
            Err(reason) => {
                return Err(RegistryError::data_load(path, format!("'{}': {}", name, reason)))
            }
        }
    }

    Ok(districts)
}

/// `Ok(None)` for shapes that are not polygons.
pub(crate) fn shape_to_multi_polygon(shape: Shape) -> Result<Option<MultiPolygon<f64>>, String> {
    let geometry: MultiPolygon<f64> = match shape {
        Shape::Polygon(polygon) => polygon
            .try_into()
            .map_err(|e| format!("failed to convert polygon: {:?}", e))?,
        Shape::PolygonM(polygon) => polygon
            .try_into()
            .map_err(|e| format!("failed to convert polygonM: {:?}", e))?,
        Shape::PolygonZ(polygon) => polygon
            .try_into()
            .map_err(|e| format!("failed to convert polygonZ: {:?}", e))?,
        _ => return Ok(None),
    };
    Ok(Some(geometry))
}

fn load_geojson(path: &Path, name_column: &str) -> RegistryResult<Vec<RawDistrict>> {
    let file = File::open(path)
        .map_err(|e| RegistryError::data_load(path, format!("failed to open GeoJSON: {}", e)))?;
    let geojson = GeoJson::from_reader(BufReader::new(file))
        .map_err(|e| RegistryError::data_load(path, format!("failed to parse GeoJSON: {}", e)))?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => {
            return Err(RegistryError::data_load(
                path,
                "GeoJSON must be a FeatureCollection",
            ))
        }
    };

    let mut districts = Vec::new();

    for (index, feature) in collection.features.into_iter().enumerate() {
        let value = feature
            .properties
            .as_ref()
            .and_then(|props| props.get(name_column))
            .ok_or_else(|| {
                RegistryError::data_load(
                    path,
                    format!("feature {}: name attribute '{}' not found", index, name_column),
                )
            })?;

        let name = match value {
            serde_json::Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            serde_json::Value::String(_) | serde_json::Value::Null => {
                warn!("Skipping feature {} with empty name", index);
                continue;
            }
            _ => {
                return Err(RegistryError::data_load(
                    path,
                    format!("name attribute '{}' must be text", name_column),
                ))
            }
        };

        let Some(geometry) = feature.geometry else {
            warn!("Skipping '{}': no geometry", name);
            continue;
        };

        let geometry: geo::Geometry<f64> = geometry.value.try_into().map_err(|e| {
            RegistryError::data_load(path, format!("'{}': invalid geometry: {:?}", name, e))
        })?;

        let geometry = match geometry {
            geo::Geometry::MultiPolygon(mp) => mp,
            geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
            _ => {
                warn!("Skipping '{}': not a polygon geometry", name);
                continue;
            }
        };

        districts.push(RawDistrict { name, geometry });
    }

    Ok(districts)
}

fn ensure_unique_names(path: &Path, districts: &[RawDistrict]) -> RegistryResult<()> {
    let mut seen = HashSet::new();
    for district in districts {
        if !seen.insert(district.name.as_str()) {
            return Err(RegistryError::data_load(
                path,
                format!("duplicate district name '{}'", district.name),
            ));
        }
    }
    Ok(())
}

fn reproject_all(
    path: &Path,
    raw: Vec<RawDistrict>,
    crs: &SourceCrs,
) -> RegistryResult<Vec<District>> {
    // Fail once up front on a bad definition instead of once per worker.
    Reprojector::new(crs).map_err(|e| RegistryError::data_load(path, e.to_string()))?;

    raw.into_par_iter()
        .map_init(
            || Reprojector::new(crs),
            |reprojector, district| {
                let reprojector = reprojector
                    .as_ref()
                    .map_err(|e| RegistryError::data_load(path, e.to_string()))?;
                let boundary = reprojector.multi_polygon(&district.geometry).map_err(|e| {
                    RegistryError::data_load(path, format!("'{}': {}", district.name, e))
                })?;
                Ok(District {
                    name: district.name,
                    boundary,
                })
            },
        )
        .collect()
}

fn validate_boundary(path: &Path, district: &District) -> RegistryResult<()> {
    if district.boundary.0.is_empty() {
        return Err(RegistryError::data_load(
            path,
            format!("'{}' has an empty boundary", district.name),
        ));
    }

    for polygon in &district.boundary {
        let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
        for ring in rings {
            if let Some(defect) = ring_defect(ring) {
                return Err(RegistryError::data_load(
                    path,
                    format!("'{}' has a ring that {}", district.name, defect),
                ));
            }
        }
    }
    Ok(())
}

fn ring_defect(ring: &LineString<f64>) -> Option<&'static str> {
    if ring.0.len() < 4 || !ring.is_closed() {
        return Some("has fewer than four coordinates");
    }
    if !ring.0.iter().all(|c| c.x.is_finite() && c.y.is_finite()) {
        return Some("has non-finite coordinates");
    }
    if crosses_itself(ring) {
        return Some("crosses itself");
    }
    None
}

/// True when two non-neighbouring segments of a closed ring touch.
fn crosses_itself(ring: &LineString<f64>) -> bool {
    // Repeated vertices give zero-length segments; drop them so neighbours stay adjacent.
    let segments: Vec<Line<f64>> = ring.lines().filter(|l| l.start != l.end).collect();
    let n = segments.len();

    for i in 0..n {
        for j in (i + 2)..n {
            // First and last segments share the closing vertex.
            if i == 0 && j == n - 1 {
                continue;
            }
            if segments[i].intersects(&segments[j]) {
                return true;
            }
        }
    }
    false
}
