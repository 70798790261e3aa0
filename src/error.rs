use std::path::PathBuf;
use thiserror::Error;

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to load boundaries from {path:?}: {reason}")]
    DataLoad { path: PathBuf, reason: String },

    #[error("No district named '{name}'")]
    NotFound { name: String },

    #[error("Boundary of '{name}' has no area")]
    DegenerateGeometry { name: String },

    #[error("Non-finite coordinate: lon={lon}, lat={lat}")]
    InvalidPoint { lon: f64, lat: f64 },
}

impl RegistryError {
    pub(crate) fn data_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        RegistryError::DataLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
