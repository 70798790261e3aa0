use crate::config::BoundarySource;
use crate::error::RegistryResult;
use crate::registry::Registry;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Hands out shared registries, loading each dataset path at most once.
///
/// Failed loads are not remembered; the next caller tries again. Nothing is
/// ever evicted or reloaded while the process lives.
#[derive(Default)]
pub struct RegistryCache {
    entries: Mutex<HashMap<PathBuf, Arc<Registry>>>,
}

impl RegistryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&self, source: &BoundarySource) -> RegistryResult<Arc<Registry>> {
        // Held across the load so concurrent callers wait for the first one.
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(registry) = entries.get(&source.path) {
            debug!("Registry cache hit for {:?}", source.path);
            return Ok(Arc::clone(registry));
        }

        let registry = Arc::new(Registry::load(source)?);
        info!("Cached registry for {:?}", source.path);
        entries.insert(source.path.clone(), Arc::clone(&registry));
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
