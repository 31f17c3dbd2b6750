use super::{types::Config, ConfigError, HostBackend};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Library path is set when the library is enabled
/// - Metadata provider is configured when the library is enabled
/// - Kodi settings exist when the Kodi backend is selected
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.library.enabled {
        if config.library.path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "library.path is required when the library is enabled".to_string(),
            ));
        }
        if config.tmdb.as_ref().is_none_or(|t| t.api_key.is_empty()) {
            return Err(ConfigError::ValidationError(
                "[tmdb] api_key is required when the library is enabled".to_string(),
            ));
        }
    }

    if config.host.backend == HostBackend::Kodi && config.host.kodi.is_none() {
        return Err(ConfigError::ValidationError(
            "[host.kodi] section is required when host.backend = \"kodi\"".to_string(),
        ));
    }

    Ok(())
}
