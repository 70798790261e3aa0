//! Turning a map click or a manual pick into an explicit selection.
//!
//! The dashboard passes the resulting [`Selection`] on to the next page
//! itself; nothing here remembers what was chosen.

use crate::error::RegistryResult;
use crate::registry::Registry;
use crate::types::{Bounds, LonLat};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionRequest {
    Click { lon: f64, lat: f64 },
    Manual { name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub district: String,
    pub centroid: LonLat,
    pub bounds: Bounds,
}

/// `Ok(None)` when a click lands outside every district. An unknown manual
/// name is a `NotFound` error.
pub fn resolve(registry: &Registry, request: &SelectionRequest) -> RegistryResult<Option<Selection>> {
    let name = match request {
        SelectionRequest::Click { lon, lat } => {
            match registry.find_containing(LonLat::new(*lon, *lat))? {
                Some(district) => district.name.as_str(),
                None => return Ok(None),
            }
        }
        SelectionRequest::Manual { name } => registry.get(name)?.name.as_str(),
    };

    Ok(Some(Selection {
        district: name.to_string(),
        centroid: registry.centroid_of(name)?,
        bounds: registry.bounds_of(name)?,
    }))
}
