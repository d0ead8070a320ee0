//! In-memory template store used to resolve `extends` / `include` by name

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Name-indexed template sources registered so far in a run
///
/// Cloning yields another handle to the same store, so an engine can hand a
/// clone to its loader callback while keeping one for registration. Each
/// engine instance owns its own store.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    sources: Arc<RwLock<HashMap<String, String>>>,
}

impl TemplateStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a template source, returning true if it replaced one
    pub fn insert(&self, name: &str, source: String) -> bool {
        let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
        sources.insert(normalize(name).to_string(), source).is_some()
    }

    /// Look up a template source by name
    pub fn get(&self, name: &str) -> Option<String> {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        sources.get(normalize(name)).cloned()
    }

    /// Check if a template exists
    pub fn contains(&self, name: &str) -> bool {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        sources.contains_key(normalize(name))
    }

    /// Number of stored templates
    pub fn len(&self) -> usize {
        self.sources.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Template references may be written with a leading slash
fn normalize(name: &str) -> &str {
    name.trim_start_matches('/')
}
