//! Alert presenter -- prints sink output to stdout.
//!
//! Alerts are printed as a summary line followed by the indented body.
//! Advisories (parse errors, source failures) are printed on a single
//! line with a `!` marker.

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use logshield_core::types::Alert;
use logshield_pipeline::SinkOutput;

/// Render one sink output as the text printed to the terminal.
pub fn render_output(output: &SinkOutput) -> String {
    match output {
        SinkOutput::Alert(alert) => render_alert(alert),
        SinkOutput::Advisory(text) => format!("! {text}"),
    }
}

/// Summary line plus the body indented by two spaces.
pub fn render_alert(alert: &Alert) -> String {
    let mut out = alert.summary();
    for line in alert.body.lines() {
        out.push_str("\n  ");
        out.push_str(line);
    }
    out
}

/// Spawn a task that prints every output until shutdown.
///
/// On shutdown, outputs already queued in the channel are still printed.
pub fn spawn_presenter(
    mut output_rx: mpsc::Receiver<SinkOutput>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                output = output_rx.recv() => {
                    match output {
                        Some(output) => println!("{}", render_output(&output)),
                        None => {
                            tracing::debug!("output channel closed, exiting presenter");
                            break;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    while let Ok(output) = output_rx.try_recv() {
                        println!("{}", render_output(&output));
                    }
                    tracing::debug!("presenter shutting down");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use logshield_core::types::Severity;

    use super::*;

    fn alert() -> Alert {
        Alert {
            id: "a-1".to_owned(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 5).unwrap(),
            severity: Severity::High,
            title: "Login brute force suspected".to_owned(),
            body: "IP: 10.0.0.5\nFailed logins: 5 (20s window)".to_owned(),
            rule_id: "BRUTE_FORCE_LOGIN".to_owned(),
            ip: Some("10.0.0.5".to_owned()),
            service: Some("auth".to_owned()),
        }
    }

    #[test]
    fn alert_renders_summary_and_indented_body() {
        let text = render_output(&SinkOutput::Alert(alert()));
        assert_eq!(
            text,
            "[HIGH] Login brute force suspected  (09:30:05)\n  IP: 10.0.0.5\n  Failed logins: 5 (20s window)"
        );
    }

    #[test]
    fn advisory_renders_with_marker() {
        let text = render_output(&SinkOutput::Advisory("source error: boom".to_owned()));
        assert_eq!(text, "! source error: boom");
    }

    #[tokio::test]
    async fn presenter_stops_on_shutdown() {
        let (tx, rx) = mpsc::channel(4);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = spawn_presenter(rx, shutdown_rx);

        tx.send(SinkOutput::Advisory("queued".to_owned())).await.unwrap();
        let _ = shutdown_tx.send(());

        let result = tokio::time::timeout(std::time::Duration::from_secs(1), task).await;
        assert!(result.is_ok(), "presenter should stop after shutdown");
    }
}
