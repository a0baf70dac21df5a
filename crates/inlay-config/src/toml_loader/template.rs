//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> &'static str {
    r##"# Inlay Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[webview]
# transparent = false
# devtools = false            # on by default in debug builds
# user_agent = "Inlay/0.1"
# clipboard = true
# autoplay = true
# initialization_scripts = [] # run at load start of every page

[runtime]
# worker_threads = 1          # 1-16
# job_queue_capacity = 64     # 1-4096, pending jobs per webview

[logging]
# level = "INFO"              # DEBUG, INFO, WARNING, ERROR
"##
}
