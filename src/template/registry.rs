//! Registry mapping template extensions to engine factories

use std::collections::BTreeMap;

use super::{HandlebarsEngine, JinjaEngine, TemplateEngine};
use crate::error::SproutError;

/// Constructor for a fresh, empty engine instance
pub type EngineFactory = fn() -> Box<dyn TemplateEngine>;

/// Registry for selecting a template engine by file extension
///
/// Extensions include the leading dot (`.hbs`). The registry is a plain
/// value, so independent pipelines can use different sets of engines.
#[derive(Debug, Clone, Default)]
pub struct EngineRegistry {
    factories: BTreeMap<String, EngineFactory>,
}

impl EngineRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the handlebars and jinja engines
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(".hbs", || Box::new(HandlebarsEngine::new()));
        registry.register(".handlebars", || Box::new(HandlebarsEngine::new()));
        registry.register(".jinja", || Box::new(JinjaEngine::new()));
        registry.register(".j2", || Box::new(JinjaEngine::new()));
        registry
    }

    /// Register a factory, replacing any previous one for the extension
    pub fn register(&mut self, extension: impl Into<String>, factory: EngineFactory) {
        self.factories.insert(extension.into(), factory);
    }

    /// Get the factory for an extension
    pub fn get(&self, extension: &str) -> Result<EngineFactory, SproutError> {
        self.factories
            .get(extension)
            .copied()
            .ok_or_else(|| SproutError::UnrecognizedEngine {
                extension: extension.to_string(),
            })
    }

    /// Build a fresh engine for an extension
    pub fn create(&self, extension: &str) -> Result<Box<dyn TemplateEngine>, SproutError> {
        self.get(extension).map(|factory| factory())
    }

    /// Check if an extension has a factory
    pub fn contains(&self, extension: &str) -> bool {
        self.factories.contains_key(extension)
    }

    /// Get all registered extensions, sorted
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_extensions() {
        let registry = EngineRegistry::builtin();
        let extensions: Vec<&str> = registry.extensions().collect();
        assert_eq!(extensions, vec![".handlebars", ".hbs", ".j2", ".jinja"]);
    }

    #[test]
    fn test_unknown_extension_error() {
        let registry = EngineRegistry::builtin();
        let result = registry.create(".gotmpl");
        assert!(matches!(
            result,
            Err(SproutError::UnrecognizedEngine { ref extension }) if extension == ".gotmpl"
        ));
    }

    #[test]
    fn test_registries_are_independent() {
        let mut custom = EngineRegistry::new();
        custom.register(".tmpl", || Box::new(JinjaEngine::new()));

        assert!(custom.contains(".tmpl"));
        assert!(!custom.contains(".hbs"));
        assert!(!EngineRegistry::builtin().contains(".tmpl"));
    }
}
