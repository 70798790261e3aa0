use crate::config::BoundarySource;
use crate::data;
use crate::error::{RegistryError, RegistryResult};
use crate::types::{bounds_of, Bounds, District, LonLat};
use geo::{Area, BoundingRect, Centroid, InteriorPoint, Intersects, MultiPolygon, Point};
use geojson::{Feature, FeatureCollection, JsonObject};
use rstar::{RTree, RTreeObject, AABB};
use std::collections::HashSet;
use std::path::Path;

// Bounding box of the district at `index` in load order.
struct DistrictEnvelope {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for DistrictEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Immutable set of districts for one boundary dataset.
///
/// Containment is boundary-inclusive and overlaps resolve to the district
/// loaded first, so a point on the edge shared by two neighbours always
/// belongs to whichever comes earlier in the dataset.
pub struct Registry {
    districts: Vec<District>,
    tree: RTree<DistrictEnvelope>,
}

impl Registry {
    pub fn load(source: &BoundarySource) -> RegistryResult<Self> {
        let districts = data::load_districts(source)?;
        Self::build(&source.path, districts)
    }

    /// Builds a registry from boundaries that are already in WGS84.
    pub fn from_districts(districts: Vec<District>) -> RegistryResult<Self> {
        Self::build(Path::new("<in-memory>"), districts)
    }

    // `origin` names the dataset in load errors.
    fn build(origin: &Path, districts: Vec<District>) -> RegistryResult<Self> {
        let mut seen = HashSet::new();
        for district in &districts {
            if district.name.is_empty() {
                return Err(RegistryError::data_load(origin, "empty district name"));
            }
            if !seen.insert(district.name.as_str()) {
                return Err(RegistryError::data_load(
                    origin,
                    format!("duplicate district name '{}'", district.name),
                ));
            }
        }

        let mut envelopes = Vec::with_capacity(districts.len());
        for (index, district) in districts.iter().enumerate() {
            let rect = district.boundary.bounding_rect().ok_or_else(|| {
                RegistryError::data_load(
                    origin,
                    format!("'{}' has an empty boundary", district.name),
                )
            })?;
            envelopes.push(DistrictEnvelope {
                index,
                aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
            });
        }

        Ok(Registry {
            districts,
            tree: RTree::bulk_load(envelopes),
        })
    }

    pub fn len(&self) -> usize {
        self.districts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }

    /// Districts in load order.
    pub fn districts(&self) -> &[District] {
        &self.districts
    }

    /// The first district, in load order, whose boundary contains `point`.
    ///
    /// Finite but out-of-range coordinates simply match nothing.
    pub fn find_containing(&self, point: LonLat) -> RegistryResult<Option<&District>> {
        if !point.is_finite() {
            return Err(RegistryError::InvalidPoint {
                lon: point.lon,
                lat: point.lat,
            });
        }

        let envelope = AABB::from_point([point.lon, point.lat]);
        let mut candidates: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|c| c.index)
            .collect();
        // The tree yields candidates in no particular order.
        candidates.sort_unstable();

        let target = Point::from(point);
        Ok(candidates
            .into_iter()
            .map(|i| &self.districts[i])
            .find(|d| d.boundary.intersects(&target)))
    }

    /// All names, sorted by byte order.
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.districts.iter().map(|d| d.name.clone()).collect();
        names.sort();
        names
    }

    pub fn get(&self, name: &str) -> RegistryResult<&District> {
        self.districts
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })
    }

    pub fn boundary_of(&self, name: &str) -> RegistryResult<&MultiPolygon<f64>> {
        self.get(name).map(|d| &d.boundary)
    }

    pub fn centroid_of(&self, name: &str) -> RegistryResult<LonLat> {
        centroid(name, self.boundary_of(name)?)
    }

    pub fn interior_point_of(&self, name: &str) -> RegistryResult<LonLat> {
        let boundary = self.boundary_of(name)?;
        boundary
            .interior_point()
            .map(LonLat::from)
            .ok_or_else(|| RegistryError::DegenerateGeometry {
                name: name.to_string(),
            })
    }

    pub fn bounds_of(&self, name: &str) -> RegistryResult<Bounds> {
        let boundary = self.boundary_of(name)?;
        boundary
            .bounding_rect()
            .map(bounds_of)
            .ok_or_else(|| RegistryError::DegenerateGeometry {
                name: name.to_string(),
            })
    }

    /// Case-insensitive substring match on names, in load order.
    pub fn search(&self, fragment: &str) -> Vec<&District> {
        let needle = fragment.to_lowercase();
        self.districts
            .iter()
            .filter(|d| d.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn feature_of(&self, name: &str) -> RegistryResult<Feature> {
        self.get(name).map(district_feature)
    }

    /// Every district as one GeoJSON layer, for the overview map.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.districts.iter().map(district_feature).collect(),
            foreign_members: None,
        }
    }
}

/// Area-weighted centroid; a multi-polygon is weighted by member area.
pub fn centroid(name: &str, boundary: &MultiPolygon<f64>) -> RegistryResult<LonLat> {
    let degenerate = || RegistryError::DegenerateGeometry {
        name: name.to_string(),
    };

    let area = boundary.unsigned_area();
    if !area.is_normal() {
        return Err(degenerate());
    }
    boundary.centroid().map(LonLat::from).ok_or_else(degenerate)
}

fn district_feature(district: &District) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("name".to_string(), district.name.clone().into());

    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(&district.boundary))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}
