//! District boundaries for the solar dashboard: load once, then answer
//! "which district was clicked", "list all districts" and "where do I
//! centre the map" for the pages that need it.

pub mod cache;
pub mod config;
pub mod crs;
pub mod data;
pub mod error;
pub mod registry;
pub mod selection;
pub mod server;
pub mod types;

pub use cache::RegistryCache;
pub use config::{AppConfig, BoundarySource};
pub use error::{RegistryError, RegistryResult};
pub use registry::Registry;
pub use selection::{Selection, SelectionRequest};
pub use types::{District, LonLat};
