//! Alert report writer.
//!
//! Persists the alert history as a pretty-printed JSON array. Failures are
//! returned as [`SinkError`] and never affect detection.

use std::path::Path;

use logshield_core::error::SinkError;
use logshield_core::types::Alert;

/// Write `alerts` to `path` as pretty JSON, oldest first.
///
/// # Errors
///
/// - [`SinkError::Empty`] when there is nothing to save
/// - [`SinkError::Serialize`] / [`SinkError::Write`] on failure
pub async fn save_report(path: &Path, alerts: &[Alert]) -> Result<(), SinkError> {
    if alerts.is_empty() {
        return Err(SinkError::Empty);
    }

    let json = serde_json::to_string_pretty(alerts)?;
    tokio::fs::write(path, json)
        .await
        .map_err(|source| SinkError::Write {
            path: path.display().to_string(),
            source,
        })?;

    tracing::info!(path = %path.display(), alerts = alerts.len(), "report saved");
    Ok(())
}
