use crate::schema::InlayConfig;

/// Validate webview creation settings.
pub(crate) fn validate_webview(errors: &mut Vec<String>, config: &InlayConfig) {
    if let Some(ua) = &config.webview.user_agent {
        if ua.trim().is_empty() {
            errors.push("webview.user_agent must not be blank (omit it for the engine default)".into());
        }
    }

    for (i, script) in config.webview.initialization_scripts.iter().enumerate() {
        if script.trim().is_empty() {
            errors.push(format!("webview.initialization_scripts[{i}] is empty"));
        }
    }
}
