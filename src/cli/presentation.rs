//! CLI presentation: text and json formatters for identity and decode output.

use crate::session::SessionState;
use chrono::{DateTime, Utc};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde::Serialize;

/// Snapshot of the stored identity, as shown by `datatag identity`.
#[derive(Debug, Clone, Serialize)]
pub struct IdentityReport {
    pub session_id: Option<String>,
    pub session_state: SessionState,
    /// Creation time decoded from the session id, epoch millis
    pub session_started_ms: Option<i64>,
    pub session_timeout_minutes: u64,
    pub client_id: Option<String>,
    pub user_id: Option<String>,
    pub braze_id: Option<String>,
}

fn rfc3339(millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.to_rfc3339())
}

fn or_dash(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

pub fn format_identity_text(report: &IdentityReport) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Session id".to_string(), or_dash(&report.session_id)]);
    table.add_row(vec![
        "Session state".to_string(),
        report.session_state.as_str().to_string(),
    ]);
    table.add_row(vec![
        "Session started".to_string(),
        or_dash(&report.session_started_ms.and_then(rfc3339)),
    ]);
    table.add_row(vec![
        "Session timeout".to_string(),
        format!("{} min", report.session_timeout_minutes),
    ]);
    table.add_row(vec!["Client id".to_string(), or_dash(&report.client_id)]);
    table.add_row(vec!["User id".to_string(), or_dash(&report.user_id)]);
    table.add_row(vec!["Braze id".to_string(), or_dash(&report.braze_id)]);
    format!("Identity\n\n{}", table)
}

pub fn format_identity_json(report: &IdentityReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
}

/// Decoded creation time of an identifier. Times outside chrono's range print
/// as raw millis only.
pub fn format_decode_text(identifier: &str, millis: i64) -> String {
    match rfc3339(millis) {
        Some(at) => format!("{}\n  created: {}\n  epoch_ms: {}", identifier, at, millis),
        None => format!("{}\n  epoch_ms: {}", identifier, millis),
    }
}
