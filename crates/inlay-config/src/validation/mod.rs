//! Full configuration validation.
//!
//! Each section has its own submodule; this orchestrator calls them all
//! and collects errors into a single `ConfigError`.

mod helpers;
mod runtime;
mod webview;


use crate::schema::InlayConfig;
use inlay_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &InlayConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    runtime::validate_runtime(&mut errors, config);
    webview::validate_webview(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
