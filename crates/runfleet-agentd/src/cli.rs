use std::path::PathBuf;

use clap::Parser;

use crate::config::OperationMode;

/// Autoscaler for ephemeral CI job runners.
#[derive(Debug, Parser)]
#[command(name = "runfleetd", version, about)]
pub struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the configured operation mode.
    #[arg(long, value_enum)]
    pub mode: Option<OperationMode>,

    /// Override the configured log filter, e.g. `runfleet_core=debug,info`.
    #[arg(long)]
    pub log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides() {
        let cli = Cli::parse_from([
            "runfleetd",
            "--config",
            "/etc/runfleet.toml",
            "--mode",
            "queue-monitor",
            "--log-level",
            "debug",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/runfleet.toml")));
        assert_eq!(cli.mode, Some(OperationMode::QueueMonitor));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["runfleetd", "--mode", "sideways"]).is_err());
    }
}
