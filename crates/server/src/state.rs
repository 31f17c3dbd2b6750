use std::sync::Arc;
use vlibrary_core::{Config, Library, RefreshCoordinator, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    library: Option<Arc<Library>>,
    coordinator: Option<Arc<RefreshCoordinator>>,
}

impl AppState {
    pub fn new(
        config: Config,
        library: Option<Arc<Library>>,
        coordinator: Option<Arc<RefreshCoordinator>>,
    ) -> Self {
        Self {
            config,
            library,
            coordinator,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    /// The library, when enabled in config.
    pub fn library(&self) -> Option<&Arc<Library>> {
        self.library.as_ref()
    }

    /// The refresh coordinator, when it was started.
    pub fn coordinator(&self) -> Option<&Arc<RefreshCoordinator>> {
        self.coordinator.as_ref()
    }
}
