//! Scripted host events for the replay command.
//!
//! A scenario is JSON lines, one event per line, each stamped with the number
//! of seconds since the replay started:
//!
//! ```text
//! {"at": 0, "event": "start_monitoring"}
//! {"at": 5, "event": "steps", "total": 12}
//! {"at": 6, "event": "confirm"}
//! {"at": 7, "event": "location", "lat": 48.137, "lon": 11.575}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::io::BufRead;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use pw_core::HostError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptLine {
    /// Seconds since replay start.
    pub at: u64,
    #[serde(flatten)]
    pub event: ScriptEvent,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    StartMonitoring,
    StopMonitoring,
    /// Cumulative pedometer count.
    Steps { total: u64 },
    /// Current acceleration; picked up by the next motion sample.
    Motion { x: f64, y: f64, z: f64 },
    Location { lat: f64, lon: f64 },
    NotificationTapped,
    Confirm,
    Dismiss,
    Pause,
    Resume,
    CollectLitter,
    End,
    NewActivity,
    CloseSummary,
    BackgroundExpiring,
    BackgroundInvalidated,
    Error {
        kind: ErrorKind,
        #[serde(default)]
        detail: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PermissionDenied,
    SensorUnavailable,
    Network,
    BackgroundSessionInvalidated,
}

impl ErrorKind {
    pub fn into_host_error(self, detail: String) -> HostError {
        match self {
            Self::PermissionDenied => HostError::PermissionDenied(detail),
            Self::SensorUnavailable => HostError::SensorUnavailable(detail),
            Self::Network => HostError::Network(detail),
            Self::BackgroundSessionInvalidated => HostError::BackgroundSessionInvalidated,
        }
    }
}

/// Parse a whole scenario. Timestamps must not go backwards.
pub fn parse<R: BufRead>(reader: R) -> Result<Vec<ScriptLine>> {
    let mut lines = Vec::new();
    let mut last_at = 0;
    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("failed to read line {line_no}"))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let parsed: ScriptLine = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid event on line {line_no}"))?;
        if parsed.at < last_at {
            bail!(
                "line {line_no}: time goes backwards ({} < {last_at})",
                parsed.at
            );
        }
        last_at = parsed.at;
        lines.push(parsed);
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_events_and_skips_comments() {
        let input = r#"
# warm up
{"at": 0, "event": "start_monitoring"}
{"at": 5, "event": "steps", "total": 12}

{"at": 7, "event": "location", "lat": 48.0, "lon": 11.5}
{"at": 9, "event": "error", "kind": "network", "detail": "offline"}
"#;
        let lines = parse(input.as_bytes()).unwrap();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].event, ScriptEvent::StartMonitoring);
        assert_eq!(lines[1].event, ScriptEvent::Steps { total: 12 });
        assert_eq!(
            lines[2].event,
            ScriptEvent::Location {
                lat: 48.0,
                lon: 11.5
            }
        );
        assert_eq!(
            lines[3].event,
            ScriptEvent::Error {
                kind: ErrorKind::Network,
                detail: "offline".to_string()
            }
        );
    }

    #[test]
    fn test_reports_line_number_of_bad_event() {
        let input = "{\"at\": 0, \"event\": \"start_monitoring\"}\n{\"at\": 1, \"event\": \"jump\"}\n";
        let err = parse(input.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn test_rejects_time_going_backwards() {
        let input = "{\"at\": 5, \"event\": \"pause\"}\n{\"at\": 3, \"event\": \"resume\"}\n";
        let err = parse(input.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("backwards"), "{err}");
    }

    #[test]
    fn test_error_kind_maps_to_host_error() {
        assert_eq!(
            ErrorKind::SensorUnavailable.into_host_error("gps".to_string()),
            HostError::SensorUnavailable("gps".to_string())
        );
        assert_eq!(
            ErrorKind::BackgroundSessionInvalidated.into_host_error(String::new()),
            HostError::BackgroundSessionInvalidated
        );
    }
}
