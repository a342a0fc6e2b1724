use anyhow::Result;
use clap::Parser;

use logshield_core::config::LogshieldConfig;
use logshield_daemon::cli::DaemonCli;
use logshield_daemon::logging::init_tracing;
use logshield_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // 우선순위: CLI > 환경변수 > 설정 파일 > 기본값
    let config_exists = tokio::fs::try_exists(&cli.config).await.unwrap_or(false);
    let mut config = if config_exists {
        LogshieldConfig::from_file(&cli.config)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?
    } else if cli.validate {
        return Err(anyhow::anyhow!(
            "config file not found: {}",
            cli.config.display()
        ));
    } else {
        LogshieldConfig::default()
    };
    config.apply_env_overrides();
    cli.apply_overrides(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    if cli.validate {
        println!("configuration OK: {}", cli.config.display());
        return Ok(());
    }

    init_tracing(&config.general)?;
    if !config_exists {
        tracing::info!(path = %cli.config.display(), "config file not found, using defaults");
    }
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "logshield-daemon starting");

    let mut orchestrator = Orchestrator::build_from_config(config).await?;
    orchestrator.run().await?;

    tracing::info!("logshield-daemon shut down");
    Ok(())
}
