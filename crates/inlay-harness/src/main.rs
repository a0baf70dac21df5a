mod cli;

use std::process::ExitCode;

use inlay_common::ConfigError;
use inlay_config::InlayConfig;
use inlay_harness::Scenario;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Load the config before logging is up; the failure is logged afterwards.
fn load_config(args: &cli::Args) -> (InlayConfig, Option<ConfigError>) {
    let loaded = match &args.config {
        Some(path) => inlay_config::load_from_path(path),
        None => inlay_config::load_config(),
    };
    match loaded {
        Ok(config) => (config, None),
        Err(e) => (InlayConfig::default(), Some(e)),
    }
}

fn main() -> ExitCode {
    let args = cli::parse();

    let (config, config_error) = load_config(&args);

    let log_directive = args
        .log_level
        .clone()
        .unwrap_or_else(|| format!("inlay={}", config.logging.level.as_directive()));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                log_directive
                    .parse()
                    .unwrap_or_else(|_| LevelFilter::INFO.into()),
            ),
        )
        .init();

    tracing::info!("inlay-replay v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Some(ref path) = args.config {
        tracing::info!("Using config override: {}", path.display());
    }
    if let Some(e) = config_error {
        tracing::warn!("Config load failed, using defaults: {e}");
    }

    let journal = match Scenario::load(&args.scenario).and_then(|s| s.replay(&config)) {
        Ok(journal) => journal,
        Err(e) => {
            tracing::error!("Replay failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&journal)
    } else {
        serde_json::to_string(&journal)
    };
    match rendered {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Failed to serialize journal: {e}");
            ExitCode::FAILURE
        }
    }
}
