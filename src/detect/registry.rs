use std::collections::BTreeMap;

use anyhow::Result;

use crate::config::ModelSettings;
use crate::error::ObjectLensError;

use super::backend::DetectorBackend;
use super::backends::StubBackend;

/// Constructs a backend from model settings. Runs on `ModelGateway::load`.
pub type BackendLoader = Box<dyn Fn(&ModelSettings) -> Result<Box<dyn DetectorBackend>>>;

/// Named backend loaders.
///
/// Loading is deferred: registering a backend does not touch model files.
pub struct BackendRegistry {
    loaders: BTreeMap<String, BackendLoader>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            loaders: BTreeMap::new(),
            default_name: None,
        }
    }

    /// Registry with every backend compiled into this build.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("stub", |_settings| {
            Ok(Box::new(StubBackend::new()) as Box<dyn DetectorBackend>)
        });
        #[cfg(feature = "backend-tract")]
        registry.register("tract", |settings| {
            let backend = super::backends::TractBackend::from_settings(settings)?;
            Ok(Box::new(backend) as Box<dyn DetectorBackend>)
        });
        registry
    }

    /// Register a loader. The first registered loader becomes the default.
    pub fn register<F>(&mut self, name: &str, loader: F)
    where
        F: Fn(&ModelSettings) -> Result<Box<dyn DetectorBackend>> + 'static,
    {
        if self.default_name.is_none() {
            self.default_name = Some(name.to_string());
        }
        self.loaders.insert(name.to_string(), Box::new(loader));
    }

    /// Backend used when the configuration names none.
    pub fn default_name(&self) -> Option<&str> {
        self.default_name.as_deref()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.loaders.contains_key(name)
    }

    /// List registered backends.
    pub fn list(&self) -> Vec<String> {
        self.loaders.keys().cloned().collect()
    }

    /// Construct the named backend.
    pub fn load(&self, name: &str, settings: &ModelSettings) -> Result<Box<dyn DetectorBackend>> {
        let loader = self.loaders.get(name).ok_or_else(|| {
            ObjectLensError::ModelLoad(format!(
                "backend '{}' is not available (registered: {})",
                name,
                self.list().join(", ")
            ))
        })?;
        loader(settings)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;

    #[test]
    fn builtin_registry_has_stub_as_default() {
        let registry = BackendRegistry::with_builtin();
        assert!(registry.contains("stub"));
        assert_eq!(registry.default_name(), Some("stub"));
        let backend = registry.load("stub", &ModelSettings::default()).unwrap();
        assert_eq!(backend.name(), "stub");
    }

    #[test]
    fn unknown_backend_is_a_model_load_error() {
        let registry = BackendRegistry::with_builtin();
        let err = registry
            .load("yolo-cloud", &ModelSettings::default())
            .err()
            .unwrap();
        assert!(matches!(classify(&err), Some(ObjectLensError::ModelLoad(_))));
    }

    #[test]
    fn first_registered_backend_is_the_default() {
        let mut registry = BackendRegistry::new();
        assert_eq!(registry.default_name(), None);
        registry.register("stub", |_| Ok(Box::new(StubBackend::new()) as Box<dyn DetectorBackend>));
        registry.register("other", |_| Ok(Box::new(StubBackend::new()) as Box<dyn DetectorBackend>));
        assert_eq!(registry.default_name(), Some("stub"));
        assert_eq!(registry.list(), vec!["other".to_string(), "stub".to_string()]);
    }
}
