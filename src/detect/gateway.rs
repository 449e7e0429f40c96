use anyhow::Result;

use crate::config::ModelSettings;
use crate::error::ObjectLensError;
use crate::frame::FrameView;

use super::backend::DetectorBackend;
use super::registry::BackendRegistry;
use super::result::Detection;

/// Lazily loaded detector, shared by every capture pass of a session.
pub struct ModelGateway {
    registry: BackendRegistry,
    settings: ModelSettings,
    backend: Option<Box<dyn DetectorBackend>>,
    loads: u32,
}

impl ModelGateway {
    pub fn new(registry: BackendRegistry, settings: ModelSettings) -> Self {
        Self {
            registry,
            settings,
            backend: None,
            loads: 0,
        }
    }

    /// Load the configured backend. Returns immediately when already loaded.
    pub fn load(&mut self) -> Result<()> {
        if self.backend.is_some() {
            return Ok(());
        }
        let name = self.backend_choice()?;
        let mut backend = self.registry.load(&name, &self.settings).map_err(|err| {
            ObjectLensError::ModelLoad(format!("failed to load backend '{}': {:#}", name, err))
        })?;
        backend.warm_up().map_err(|err| {
            ObjectLensError::ModelLoad(format!("backend '{}' warm-up failed: {:#}", name, err))
        })?;
        log::info!("model loaded successfully (backend={})", backend.name());
        self.backend = Some(backend);
        self.loads += 1;
        Ok(())
    }

    /// Configured backend, or the registry default when none is configured.
    fn backend_choice(&self) -> Result<String> {
        let configured = self.settings.backend.trim();
        if !configured.is_empty() {
            return Ok(configured.to_string());
        }
        self.registry
            .default_name()
            .map(str::to_string)
            .ok_or_else(|| ObjectLensError::ModelLoad("no detector backend registered".to_string()).into())
    }

    pub fn is_loaded(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend_name(&self) -> Option<&'static str> {
        self.backend.as_ref().map(|backend| backend.name())
    }

    /// Number of times a backend was actually constructed.
    pub fn load_count(&self) -> u32 {
        self.loads
    }

    /// Run one detection pass. No retries.
    pub fn detect(&mut self, frame: FrameView<'_>) -> Result<Vec<Detection>> {
        let backend = self
            .backend
            .as_mut()
            .ok_or_else(|| ObjectLensError::Detection("model is not loaded".to_string()))?;
        let detections = backend
            .detect(frame)
            .map_err(|err| ObjectLensError::Detection(format!("{:#}", err)))?;
        log::trace!("{} detections on {}x{} frame", detections.len(), frame.width(), frame.height());
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backends::StubBackend;
    use crate::error::classify;
    use crate::frame::Frame;
    use anyhow::anyhow;

    fn settings(backend: &str) -> ModelSettings {
        ModelSettings {
            backend: backend.to_string(),
            ..ModelSettings::default()
        }
    }

    #[test]
    fn load_is_idempotent() {
        let mut gateway = ModelGateway::new(BackendRegistry::with_builtin(), settings("stub"));
        assert!(!gateway.is_loaded());
        gateway.load().unwrap();
        gateway.load().unwrap();
        assert!(gateway.is_loaded());
        assert_eq!(gateway.load_count(), 1);
        assert_eq!(gateway.backend_name(), Some("stub"));
    }

    #[test]
    fn empty_backend_uses_registry_default() {
        let mut registry = BackendRegistry::new();
        registry.register("first", |_| {
            Ok(Box::new(StubBackend::new()) as Box<dyn DetectorBackend>)
        });
        registry.register("second", |_| Err(anyhow!("should not be chosen")));
        let mut gateway = ModelGateway::new(registry, settings("  "));
        gateway.load().unwrap();
        assert_eq!(gateway.backend_name(), Some("stub"));
        assert_eq!(gateway.load_count(), 1);
    }

    #[test]
    fn empty_backend_with_empty_registry_is_a_model_load_error() {
        let mut gateway = ModelGateway::new(BackendRegistry::new(), settings(""));
        let err = gateway.load().unwrap_err();
        assert!(matches!(classify(&err), Some(ObjectLensError::ModelLoad(_))));
    }

    #[test]
    fn failed_load_leaves_gateway_unloaded() {
        let mut registry = BackendRegistry::new();
        registry.register("broken", |_| Err(anyhow!("weights unreachable")));
        let mut gateway = ModelGateway::new(registry, settings("broken"));
        let err = gateway.load().unwrap_err();
        assert!(matches!(classify(&err), Some(ObjectLensError::ModelLoad(_))));
        assert!(!gateway.is_loaded());
        assert_eq!(gateway.load_count(), 0);
    }

    #[test]
    fn detect_before_load_is_an_error() {
        let mut gateway = ModelGateway::new(BackendRegistry::with_builtin(), settings("stub"));
        let frame = Frame::from_rgb(vec![0u8; 12], 2, 2).unwrap();
        let err = gateway.detect(frame.view()).unwrap_err();
        assert!(matches!(classify(&err), Some(ObjectLensError::Detection(_))));
    }

    #[test]
    fn detect_leaves_frame_untouched() {
        let mut registry = BackendRegistry::new();
        registry.register("stub", |_| Ok(Box::new(StubBackend::new()) as Box<dyn DetectorBackend>));
        let mut gateway = ModelGateway::new(registry, settings("stub"));
        gateway.load().unwrap();
        let frame = Frame::from_rgb((0..48u8).collect(), 4, 4).unwrap();
        let before = frame.clone();
        gateway.detect(frame.view()).unwrap();
        assert_eq!(frame, before);
    }
}
