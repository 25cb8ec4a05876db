//! Append-only JSONL event log — the experiment's audit trail.
//!
//! One record per event, written to the session's own log file with a
//! shared envelope (timestamp, participant/session ids, condition, avatar
//! state, turn number). A failed write falls back to a recovery file so a
//! turn is never silently dropped from the trail.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::session::Session;

/// Per-session JSONL event writer.
#[derive(Debug, Clone)]
pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    /// Create the logger, making sure the log directory exists.
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let log_dir = log_dir.into();
        if let Err(e) = std::fs::create_dir_all(&log_dir) {
            tracing::error!("could not create log directory {}: {e}", log_dir.display());
        }
        Self { log_dir }
    }

    /// Append one event for a session, merging the shared envelope.
    pub fn append(&self, session: &Session, event_type: &str, data: Value) {
        let mut record = json!({
            "timestamp_utc": chrono::Utc::now().to_rfc3339(),
            "participant_id": session.participant_id,
            "session_id": session.session_id,
            "condition": session.condition,
            "condition_name": session.condition_name,
            "avatar_url": session.avatar_url,
            "avatar_prompt": session.avatar_prompt,
            "turn_number": session.turn_number,
            "event_type": event_type,
        });
        merge(&mut record, data);

        if let Err(e) = append_line(&session.log_file_path, &record) {
            tracing::error!(
                "event log write failed for {} ({event_type}): {e}; using fallback",
                session.log_file_path.display()
            );
            let fallback = self.log_dir.join(format!(
                "participant_{}_{}_event_log_error.jsonl",
                session.participant_id, session.session_id
            ));
            if let Err(e) = append_line(&fallback, &record) {
                tracing::error!("fallback event log write failed ({event_type}): {e}");
            }
        }
    }

    /// Append an event for a participant whose session record is gone or
    /// was never created; lands in a participant-keyed fallback file.
    pub fn append_fallback(
        &self,
        participant_id: &str,
        session_id: Option<&str>,
        event_type: &str,
        data: Value,
    ) {
        let mut record = json!({
            "timestamp_utc": chrono::Utc::now().to_rfc3339(),
            "participant_id": participant_id,
            "session_id": session_id,
            "event_type": event_type,
        });
        merge(&mut record, data);

        let path = self.log_dir.join(format!(
            "participant_{}_{}_fallback.jsonl",
            participant_id,
            session_id.unwrap_or("no_sid")
        ));
        if let Err(e) = append_line(&path, &record) {
            tracing::error!("fallback event log write failed ({event_type}): {e}");
        }
    }

    /// Append an event that has no associated session (early frontend
    /// events, logging-path errors).
    pub fn append_general(&self, event_type: &str, data: Value) {
        let mut record = json!({
            "timestamp_utc": chrono::Utc::now().to_rfc3339(),
            "event_type": event_type,
        });
        merge(&mut record, data);

        let path = self.log_dir.join("general_frontend_events.jsonl");
        if let Err(e) = append_line(&path, &record) {
            tracing::error!("general event log write failed ({event_type}): {e}");
        }
    }
}

/// Merge `data`'s fields into the envelope object.
fn merge(record: &mut Value, data: Value) {
    if let (Some(record_map), Value::Object(data_map)) = (record.as_object_mut(), data) {
        for (k, v) in data_map {
            record_map.insert(k, v);
        }
    }
}

fn append_line(path: &Path, record: &Value) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{record}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{condition_for_name, Session};

    fn session_in(dir: &Path) -> Session {
        Session::new(
            "sid-1".into(),
            "p01".into(),
            condition_for_name("none_adaptive").unwrap(),
            "none_adaptive".into(),
            dir,
        )
    }

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_append_merges_envelope_and_payload() {
        let dir = tempfile::tempdir().unwrap();
        let logger = EventLogger::new(dir.path());
        let mut session = session_in(dir.path());
        session.turn_number = 4;

        logger.append(
            &session,
            "user_message",
            json!({ "content": "hi there", "lsm_score_raw": 0.61 }),
        );
        logger.append(&session, "session_end", json!({}));

        let lines = read_lines(&session.log_file_path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event_type"], "user_message");
        assert_eq!(lines[0]["content"], "hi there");
        assert_eq!(lines[0]["participant_id"], "p01");
        assert_eq!(lines[0]["turn_number"], 4);
        assert_eq!(lines[0]["condition"]["lsm"], true);
        assert!(lines[0]["timestamp_utc"].is_string());
        assert_eq!(lines[1]["event_type"], "session_end");
    }

    #[test]
    fn test_append_fallback_is_participant_keyed() {
        let dir = tempfile::tempdir().unwrap();
        let logger = EventLogger::new(dir.path());
        logger.append_fallback("p09", None, "survey_opened", json!({}));

        let lines = read_lines(&dir.path().join("participant_p09_no_sid_fallback.jsonl"));
        assert_eq!(lines[0]["event_type"], "survey_opened");
        assert_eq!(lines[0]["participant_id"], "p09");
    }

    #[test]
    fn test_append_general_without_session() {
        let dir = tempfile::tempdir().unwrap();
        let logger = EventLogger::new(dir.path());
        logger.append_general("page_view", json!({ "screen": "intro" }));

        let lines = read_lines(&dir.path().join("general_frontend_events.jsonl"));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["screen"], "intro");
    }
}
