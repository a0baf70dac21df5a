use std::path::PathBuf;

use clap::Parser;

/// Replay a scripted frame sequence against the webview plugin and print
/// what the mock webviews observed.
#[derive(Parser, Debug)]
#[command(name = "inlay-replay", version, about)]
pub struct Args {
    /// Scenario file (TOML).
    pub scenario: PathBuf,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level override (debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Pretty-print the journal.
    #[arg(long)]
    pub pretty: bool,
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scenario_and_overrides() {
        let args = Args::parse_from([
            "inlay-replay",
            "run.toml",
            "--config",
            "inlay.toml",
            "--log-level",
            "debug",
            "--pretty",
        ]);
        assert_eq!(args.scenario, PathBuf::from("run.toml"));
        assert_eq!(args.config, Some(PathBuf::from("inlay.toml")));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.pretty);
    }

    #[test]
    fn scenario_is_required() {
        assert!(Args::try_parse_from(["inlay-replay"]).is_err());
    }
}
