//! Interactive console -- single-letter commands read from stdin.
//!
//! | key      | action                           |
//! |----------|----------------------------------|
//! | `p`      | toggle pause/resume              |
//! | `c`      | clear alert history and counters |
//! | `s`      | save the report                  |
//! | `l`      | list alerts                      |
//! | `d <n>`  | show alert `n` in full           |
//! | `t`      | status                           |
//! | `h`, `?` | help                             |
//! | `q`      | quit                             |
//!
//! Stdin is read on a dedicated thread so a pending read never blocks
//! runtime shutdown.

use std::io::BufRead;
use std::path::PathBuf;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use logshield_core::error::SinkError;
use logshield_core::metrics as m;
use logshield_pipeline::SinkHandle;

use crate::report::save_report;

/// Help text shown for `h` / `?`.
pub const HELP_TEXT: &str = "\
commands
  p: pause/resume   c: clear   s: save report   q: quit
  l: list alerts    d <n>: alert detail   t: status   h/?: help";

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    TogglePause,
    Clear,
    Save,
    List,
    Detail(usize),
    Status,
    Help,
    Quit,
    /// Blank input.
    Empty,
    Unknown(String),
}

impl ConsoleCommand {
    /// Parse one input line.
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else {
            return Self::Empty;
        };

        match head {
            "p" => Self::TogglePause,
            "c" => Self::Clear,
            "s" => Self::Save,
            "l" => Self::List,
            "t" => Self::Status,
            "h" | "?" => Self::Help,
            "q" => Self::Quit,
            "d" => match parts.next().and_then(|n| n.parse::<usize>().ok()) {
                Some(n) if n > 0 => Self::Detail(n),
                _ => Self::Unknown(line.trim().to_owned()),
            },
            _ => Self::Unknown(line.trim().to_owned()),
        }
    }
}

/// Executes console commands against the running pipeline.
pub struct Console {
    control: SinkHandle,
    report_path: PathBuf,
    started: Instant,
}

impl Console {
    /// Create a console bound to a sink control handle.
    pub fn new(control: SinkHandle, report_path: PathBuf) -> Self {
        Self {
            control,
            report_path,
            started: Instant::now(),
        }
    }

    /// Execute a command and return the text to print.
    ///
    /// `Quit` and `Empty` produce no text; the caller handles them.
    pub async fn execute(&self, command: &ConsoleCommand) -> Option<String> {
        let text = match command {
            ConsoleCommand::TogglePause => {
                if self.control.toggle_pause() {
                    "paused: new lines are ignored until resumed".to_owned()
                } else {
                    "resumed".to_owned()
                }
            }
            ConsoleCommand::Clear => match self.control.reset().await {
                Ok(()) => "alert history and counters cleared".to_owned(),
                Err(e) => format!("clear failed: {e}"),
            },
            ConsoleCommand::Save => self.save().await,
            ConsoleCommand::List => self.list().await,
            ConsoleCommand::Detail(n) => self.detail(*n).await,
            ConsoleCommand::Status => self.status().await,
            ConsoleCommand::Help => HELP_TEXT.to_owned(),
            ConsoleCommand::Unknown(input) => {
                format!("unknown command '{input}' (h for help)")
            }
            ConsoleCommand::Quit | ConsoleCommand::Empty => return None,
        };
        Some(text)
    }

    async fn save(&self) -> String {
        let alerts = match self.control.snapshot_alerts().await {
            Ok(alerts) => alerts,
            Err(e) => return format!("save failed: {e}"),
        };

        match save_report(&self.report_path, &alerts).await {
            Ok(()) => format!(
                "saved {} alerts to {}",
                alerts.len(),
                self.report_path.display()
            ),
            Err(SinkError::Empty) => "nothing to save".to_owned(),
            Err(e) => {
                metrics::counter!(m::DAEMON_REPORT_ERRORS_TOTAL).increment(1);
                tracing::warn!(error = %e, "report save failed");
                format!("save failed: {e}")
            }
        }
    }

    async fn list(&self) -> String {
        match self.control.snapshot_alerts().await {
            Ok(alerts) if alerts.is_empty() => "(no alerts yet)".to_owned(),
            Ok(alerts) => alerts
                .iter()
                .enumerate()
                .map(|(i, alert)| format!("{:>3}. {}", i + 1, alert.summary()))
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => format!("list failed: {e}"),
        }
    }

    async fn detail(&self, n: usize) -> String {
        match self.control.snapshot_alerts().await {
            Ok(alerts) => match alerts.get(n - 1) {
                Some(alert) => format!(
                    "{}\nrule: {}\nid: {}\n{}",
                    alert.summary(),
                    alert.rule_id,
                    alert.id,
                    alert.body
                ),
                None => format!("no alert #{n} ({} in history)", alerts.len()),
            },
            Err(e) => format!("detail failed: {e}"),
        }
    }

    async fn status(&self) -> String {
        let stats = match self.control.stats().await {
            Ok(stats) => stats,
            Err(e) => return format!("status failed: {e}"),
        };

        let mut out = format!(
            "state: {}  uptime: {}s\nevents: {}  parse errors: {}  alerts: {}  history: {}  source failures: {}",
            if stats.paused { "paused" } else { "running" },
            self.started.elapsed().as_secs(),
            stats.events_total,
            stats.parse_errors,
            stats.alerts_total,
            stats.history_len,
            stats.source_failures,
        );
        for (rule, keys) in &stats.tracked_keys {
            out.push_str(&format!("\n  {rule}: {keys} tracked keys"));
        }
        out
    }

    /// Process input lines until `q`, input end, or shutdown.
    ///
    /// `quit_tx` fires only on `q`; closed input leaves the daemon running.
    pub async fn run(
        self,
        mut input: mpsc::Receiver<String>,
        quit_tx: oneshot::Sender<()>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        println!("{HELP_TEXT}");
        loop {
            tokio::select! {
                line = input.recv() => {
                    let Some(line) = line else {
                        tracing::debug!("console input closed");
                        break;
                    };
                    let command = ConsoleCommand::parse(&line);
                    if command == ConsoleCommand::Quit {
                        tracing::info!("quit requested from console");
                        let _ = quit_tx.send(());
                        break;
                    }
                    if let Some(text) = self.execute(&command).await {
                        println!("{text}");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("console shutting down");
                    break;
                }
            }
        }
    }
}

/// Spawn the console task fed by a stdin reader thread.
pub fn spawn_console(
    console: Console,
    quit_tx: oneshot::Sender<()>,
    shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    let input = spawn_stdin_reader();
    tokio::spawn(console.run(input, quit_tx, shutdown_rx))
}

/// Read stdin lines on a detached thread.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    let spawned = std::thread::Builder::new()
        .name("logshield-stdin".to_owned())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "failed to spawn stdin reader, console disabled");
    }
    rx
}
