use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::crs::SourceCrs;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// `.shp` or `.geojson`/`.json` boundary file.
    pub boundaries: PathBuf,
    pub name_column: String,
    pub source_crs: Option<String>, // "EPSG:28992" or a "+proj=" string
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: Option<PathBuf>,
}

/// Everything the loader needs to build a registry from one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundarySource {
    pub path: PathBuf,
    pub name_column: String,
    pub crs: Option<SourceCrs>,
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    pub fn boundary_source(&self) -> Result<BoundarySource> {
        let crs = self
            .input
            .source_crs
            .as_deref()
            .map(SourceCrs::parse)
            .transpose()
            .with_context(|| "Invalid input.source_crs")?;

        Ok(BoundarySource {
            path: self.input.boundaries.clone(),
            name_column: self.input.name_column.clone(),
            crs,
        })
    }
}
