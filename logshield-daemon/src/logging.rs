//! Tracing setup for the daemon.
//!
//! Diagnostics go to stderr. Stdout is reserved for the alert stream.

use anyhow::{Context, Result, bail};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use logshield_core::config::GeneralConfig;

/// Install the global subscriber from `[general]`.
///
/// `RUST_LOG`, when set, replaces `log_level`. `log_format` is `json` or `pretty`.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let filter = level_filter(&config.log_level)?;
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format.as_str() {
        "json" => registry.with(layer.json()).try_init(),
        "pretty" => registry.with(layer.pretty()).try_init(),
        other => bail!("unknown log format '{other}', expected 'json' or 'pretty'"),
    }
    .context("tracing subscriber already installed")
}

fn level_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("invalid log level '{level}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_format_is_rejected_before_install() {
        let config = GeneralConfig {
            log_format: "xml".to_owned(),
            ..GeneralConfig::default()
        };
        let err = init_tracing(&config).unwrap_err();
        assert!(err.to_string().contains("unknown log format 'xml'"));
    }

    #[test]
    fn configured_level_builds_filter() {
        assert!(level_filter("debug").is_ok());
    }
}
