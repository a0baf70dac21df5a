use std::path::{Path, PathBuf};

use inlay_common::ConfigError;
use tracing::info;

use super::template::default_config_toml;

/// Environment variable that overrides the config location.
pub const CONFIG_PATH_ENV: &str = "INLAY_CONFIG";

/// `$INLAY_CONFIG` if set, else `<config dir>/inlay/config.toml`
/// (`~/.config` on Linux, `~/Library/Application Support` on macOS).
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|dir| dir.join("inlay").join("config.toml"))
        .ok_or_else(|| ConfigError::ParseError("no platform config directory".into()))
}

/// Write the commented default config to `path`, creating parent
/// directories as needed.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    let write = |target: &Path, result: std::io::Result<()>| {
        result.map_err(|e| ConfigError::ParseError(format!("cannot write {}: {e}", target.display())))
    };

    if let Some(parent) = path.parent() {
        write(parent, std::fs::create_dir_all(parent))?;
    }
    write(path, std::fs::write(path, default_config_toml()))?;

    info!(path = %path.display(), "wrote default config");
    Ok(())
}
