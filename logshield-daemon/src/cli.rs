//! CLI argument definitions for logshield-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use logshield_core::config::{LogshieldConfig, StartPosition};

/// LogShield security log monitor.
///
/// Tails the configured log files, runs the brute-force and path
/// enumeration detectors, and prints alerts as they fire.
#[derive(Parser, Debug)]
#[command(name = "logshield-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to logshield.toml configuration file.
    ///
    /// Defaults are used when the file does not exist.
    #[arg(short, long, default_value = "logshield.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Read every source from the first line instead of the end.
    #[arg(long)]
    pub from_beginning: bool,

    /// Override the report output path.
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Additional source files, directories, or wildcard patterns.
    ///
    /// When given, these replace `ingest.sources` from the config file.
    #[arg(value_name = "SOURCE")]
    pub sources: Vec<String>,
}

impl DaemonCli {
    /// Apply command-line overrides on top of file and environment values.
    pub fn apply_overrides(&self, config: &mut LogshieldConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
        if self.from_beginning {
            config.ingest.start_position = StartPosition::Beginning;
        }
        if let Some(report) = &self.report {
            config.report.path = report.display().to_string();
        }
        if !self.sources.is_empty() {
            config.ingest.sources = self.sources.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_arguments() {
        let cli = DaemonCli::parse_from(["logshield-daemon"]);
        assert_eq!(cli.config, PathBuf::from("logshield.toml"));
        assert!(!cli.validate);
        assert!(!cli.from_beginning);
        assert!(cli.report.is_none());
        assert!(cli.sources.is_empty());
    }

    #[test]
    fn positional_sources_and_flags() {
        let cli = DaemonCli::parse_from([
            "logshield-daemon",
            "--from-beginning",
            "--log-level",
            "debug",
            "--report",
            "/tmp/out.json",
            "./logs/*.log",
            "/var/log/auth.log",
        ]);
        assert!(cli.from_beginning);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.report, Some(PathBuf::from("/tmp/out.json")));
        assert_eq!(cli.sources, vec!["./logs/*.log", "/var/log/auth.log"]);
    }

    #[test]
    fn overrides_replace_config_values() {
        let cli = DaemonCli::parse_from([
            "logshield-daemon",
            "--log-format",
            "json",
            "--from-beginning",
            "--report",
            "out.json",
            "a.log",
        ]);
        let mut config = LogshieldConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.ingest.start_position, StartPosition::Beginning);
        assert_eq!(config.report.path, "out.json");
        assert_eq!(config.ingest.sources, vec!["a.log"]);
    }

    #[test]
    fn no_overrides_keep_config() {
        let cli = DaemonCli::parse_from(["logshield-daemon"]);
        let mut config = LogshieldConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.ingest.sources, vec!["./logs/*.log"]);
        assert_eq!(config.ingest.start_position, StartPosition::End);
    }
}
