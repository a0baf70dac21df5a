use std::io::ErrorKind;
use std::path::Path;

use inlay_common::ConfigError;
use tracing::{debug, info};

use crate::schema::InlayConfig;
use crate::validation;

use super::paths::{create_default_config, default_config_path};

/// Parse `path` without validating it. Missing fields take their defaults.
fn read_config(path: &Path) -> Result<InlayConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
        _ => ConfigError::ParseError(format!("failed to read {}: {e}", path.display())),
    })?;

    toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("{}: {e}", path.display())))
}

/// Load and validate the config at `path`.
pub fn load_from_path(path: &Path) -> Result<InlayConfig, ConfigError> {
    let config = read_config(path)?;
    validation::validate(&config)?;
    info!(path = %path.display(), "config loaded");
    Ok(config)
}

/// Load the config at [`default_config_path`], writing the commented
/// template there first if nothing exists yet.
pub fn load_default() -> Result<InlayConfig, ConfigError> {
    let path = default_config_path()?;
    match load_from_path(&path) {
        Err(ConfigError::FileNotFound(_)) => {
            debug!(path = %path.display(), "no config file yet");
            create_default_config(&path)?;
            Ok(InlayConfig::default())
        }
        other => other,
    }
}
