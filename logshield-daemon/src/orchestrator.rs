//! Daemon orchestration -- assembly, task wiring, and lifecycle management.
//!
//! The [`Orchestrator`] is the central coordinator of `logshield-daemon`.
//! It validates configuration, discovers sources, builds the log pipeline,
//! and runs the main loop until a shutdown trigger.
//!
//! # Startup Order
//!
//! 1. Metrics recorder (if enabled)
//! 2. Log pipeline (sources + alert sink)
//! 3. Presenter, console, and background updaters
//!
//! # Shutdown
//!
//! Triggered by `SIGTERM`, `SIGINT`, or `q` on the console.
//!
//! 1. Snapshot the alert history (if `report.save_on_exit`)
//! 2. Stop the pipeline (source tasks first, then the sink)
//! 3. Broadcast shutdown to presenter/console/updaters and join them
//! 4. Write the report

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use logshield_core::config::LogshieldConfig;
use logshield_core::error::SinkError;
use logshield_core::metrics as m;
use logshield_core::pipeline::{HealthStatus, Pipeline};
use logshield_core::types::Alert;
use logshield_pipeline::{LogPipeline, LogPipelineBuilder, PipelineConfig, SinkOutput};

use crate::console::{self, Console};
use crate::discovery::discover_sources;
use crate::metrics_server;
use crate::presenter::spawn_presenter;
use crate::report::save_report;

/// Interval between pipeline health checks in the main loop.
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Interval between uptime gauge updates.
const UPTIME_UPDATE_INTERVAL: Duration = Duration::from_secs(10);

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: LogshieldConfig,
    /// The log pipeline (sources + detectors).
    pipeline: LogPipeline,
    /// Presentation channel, taken when the presenter starts.
    output_rx: Option<mpsc::Receiver<SinkOutput>>,
    /// Shutdown broadcast sender (signals all background tasks).
    shutdown_tx: broadcast::Sender<()>,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
    /// Whether to read stdin commands.
    interactive: bool,
    /// Presenter, console, and updater tasks.
    background: Vec<(&'static str, JoinHandle<()>)>,
}

impl Orchestrator {
    /// Load configuration from a file and build the orchestrator.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = LogshieldConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    ///
    /// # Errors
    ///
    /// - Configuration validation fails
    /// - No source matches `ingest.sources`
    /// - The pipeline rejects the derived configuration
    pub async fn build_from_config(config: LogshieldConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }

        let sources = discover_sources(&config.ingest.sources).await?;
        for source in &sources {
            tracing::info!(source = %source.display(), "tailing source");
        }

        let pipeline_config = PipelineConfig::from_core(&config);
        let (pipeline, output_rx) = LogPipelineBuilder::new()
            .config(pipeline_config)
            .sources(sources)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build log pipeline: {}", e))?;

        let (shutdown_tx, _) = broadcast::channel(16);

        tracing::info!(
            sources = pipeline.sources().len(),
            start_position = ?config.ingest.start_position,
            "orchestrator initialized"
        );

        Ok(Self {
            config,
            pipeline,
            output_rx,
            shutdown_tx,
            start_time: Instant::now(),
            interactive: true,
            background: Vec::new(),
        })
    }

    /// Disable the stdin console (for non-interactive runs and tests).
    pub fn without_console(mut self) -> Self {
        self.interactive = false;
        self
    }

    /// Start the pipeline and run until a shutdown trigger.
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Like [`run`](Self::run), but also stops when `stop` completes.
    pub async fn run_until(&mut self, stop: impl Future<Output = ()>) -> Result<()> {
        let (quit_tx, quit_rx) = oneshot::channel();
        self.start(quit_tx).await?;

        let trigger = match self.wait_for_shutdown(quit_rx, stop).await {
            Ok(trigger) => trigger,
            Err(e) => {
                if let Err(stop_err) = self.shutdown().await {
                    tracing::error!(error = %stop_err, "shutdown after signal failure also failed");
                }
                return Err(e);
            }
        };
        tracing::info!(trigger = trigger, "shutdown triggered");

        self.shutdown().await
    }

    /// Start the pipeline and all background tasks.
    async fn start(&mut self, quit_tx: oneshot::Sender<()>) -> Result<()> {
        self.pipeline
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start log pipeline: {}", e))?;

        let mut tasks: Vec<(&'static str, JoinHandle<()>)> = Vec::new();

        if let Some(output_rx) = self.output_rx.take() {
            tasks.push((
                "presenter",
                spawn_presenter(output_rx, self.shutdown_tx.subscribe()),
            ));
        }

        if self.interactive {
            let console = Console::new(self.pipeline.control(), self.report_path());
            tasks.push((
                "console",
                console::spawn_console(console, quit_tx, self.shutdown_tx.subscribe()),
            ));
        }

        if self.config.metrics.enabled {
            tasks.push((
                "uptime",
                spawn_uptime_updater(self.start_time, self.shutdown_tx.subscribe()),
            ));
        }

        self.background = tasks;
        Ok(())
    }

    /// Wait for SIGTERM, SIGINT, or a console quit, checking health meanwhile.
    async fn wait_for_shutdown(
        &self,
        mut quit_rx: oneshot::Receiver<()>,
        stop: impl Future<Output = ()>,
    ) -> Result<&'static str> {
        let signal = wait_for_shutdown_signal();
        tokio::pin!(signal);
        tokio::pin!(stop);

        let mut health_tick = tokio::time::interval(HEALTH_CHECK_INTERVAL);
        health_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // 콘솔이 없거나 입력이 닫히면 송신측이 drop됨
        let mut quit_open = true;
        loop {
            tokio::select! {
                result = &mut signal => return result,
                _ = &mut stop => return Ok("external"),
                result = &mut quit_rx, if quit_open => match result {
                    Ok(()) => return Ok("console"),
                    Err(_) => quit_open = false,
                },
                _ = health_tick.tick() => self.log_health().await,
            }
        }
    }

    async fn log_health(&self) {
        match self.pipeline.health_check().await {
            HealthStatus::Healthy => tracing::debug!("pipeline healthy"),
            HealthStatus::Degraded(reason) => {
                tracing::warn!(reason = %reason, "pipeline degraded");
            }
            HealthStatus::Unhealthy(reason) => {
                tracing::error!(reason = %reason, "pipeline unhealthy");
            }
        }
    }

    /// Stop the pipeline, join background tasks, and save the report if configured.
    async fn shutdown(&mut self) -> Result<()> {
        let exit_snapshot = if self.config.report.save_on_exit {
            match self.pipeline.control().snapshot_alerts().await {
                Ok(alerts) => Some(alerts),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to snapshot alerts for exit report");
                    None
                }
            }
        } else {
            None
        };

        let stop_result = self.pipeline.stop().await;

        tracing::info!("broadcasting shutdown signal to all tasks");
        let _ = self.shutdown_tx.send(());
        join_background(std::mem::take(&mut self.background)).await;

        if let Some(stats) = self.pipeline.final_stats() {
            tracing::info!(
                events = stats.events_total,
                parse_errors = stats.parse_errors,
                alerts = stats.alerts_total,
                "final statistics"
            );
        }

        if let Some(alerts) = exit_snapshot {
            self.save_exit_report(&alerts).await;
        }

        stop_result.map_err(|e| anyhow::anyhow!("failed to stop log pipeline: {}", e))
    }

    async fn save_exit_report(&self, alerts: &[Alert]) {
        let path = self.report_path();
        match save_report(&path, alerts).await {
            Ok(()) => println!("saved {} alerts to {}", alerts.len(), path.display()),
            Err(SinkError::Empty) => tracing::info!("no alerts to save on exit"),
            Err(e) => {
                metrics::counter!(m::DAEMON_REPORT_ERRORS_TOTAL).increment(1);
                tracing::error!(error = %e, "failed to save exit report");
            }
        }
    }

    /// Current pipeline health.
    pub async fn health(&self) -> HealthStatus {
        self.pipeline.health_check().await
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &LogshieldConfig {
        &self.config
    }

    /// Discovered source paths.
    pub fn sources(&self) -> &[PathBuf] {
        self.pipeline.sources()
    }

    fn report_path(&self) -> PathBuf {
        PathBuf::from(&self.config.report.path)
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("failed to install Ctrl+C handler: {}", e))?;
    Ok("SIGINT")
}

/// Join background tasks, logging any that panicked or were cancelled.
///
/// Returns the number of tasks that did not finish cleanly.
async fn join_background(tasks: Vec<(&'static str, JoinHandle<()>)>) -> usize {
    let mut failed = 0;
    for (name, task) in tasks {
        if let Err(e) = task.await {
            tracing::error!(task = name, error = %e, "background task failed");
            failed += 1;
        }
    }
    failed
}

/// Spawn a background task that periodically updates the uptime metric.
fn spawn_uptime_updater(
    start_time: Instant,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(UPTIME_UPDATE_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let uptime_secs = start_time.elapsed().as_secs();
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(uptime_secs as f64);
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("uptime updater shutting down");
                    break;
                }
            }
        }
    })
}
