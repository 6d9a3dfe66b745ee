//! Per-session step reports and their history on disk.

use crate::config::PipelineMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use uuid::Uuid;

/// Outcome of one Begin-to-Finish session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub device: String,
    pub mode: PipelineMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Process-wide step count at Finish; `None` in collection mode
    pub total_steps: Option<u64>,
    /// Steps gained during this session
    pub session_steps: Option<u64>,
}

impl SessionReport {
    pub fn duration_secs(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

impl std::fmt::Display for SessionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} session {} ({}s)",
            self.finished_at.format("%Y-%m-%d %H:%M:%S"),
            self.mode,
            &self.session_id.to_string()[..8],
            self.duration_secs()
        )?;
        if let (Some(total), Some(delta)) = (self.total_steps, self.session_steps) {
            write!(f, ": {delta} steps (total {total})")?;
        }
        Ok(())
    }
}

/// Name of this device in reports.
pub fn device_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Destination for finished session reports.
pub trait StepReporter: Send {
    fn report(&mut self, report: &SessionReport);
}

impl<R: StepReporter + ?Sized> StepReporter for Box<R> {
    fn report(&mut self, report: &SessionReport) {
        (**self).report(report)
    }
}

/// Session history stored as JSON lines.
#[derive(Debug, Clone)]
pub struct SessionLog {
    path: PathBuf,
}

impl SessionLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append one report.
    pub fn append(&self, report: &SessionReport) -> Result<(), std::io::Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let line = serde_json::to_string(report).map_err(std::io::Error::other)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }

    /// Read every stored report. Lines that fail to parse are skipped.
    pub fn load(&self) -> Result<Vec<SessionReport>, std::io::Error> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let reports = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(report) => Some(report),
                Err(e) => {
                    tracing::warn!("Skipping malformed session record: {e}");
                    None
                }
            })
            .collect();
        Ok(reports)
    }
}

impl StepReporter for SessionLog {
    fn report(&mut self, report: &SessionReport) {
        if let Err(e) = self.append(report) {
            tracing::warn!("Could not save session report to {:?}: {e}", self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn report(steps: Option<(u64, u64)>) -> SessionReport {
        let finished_at = Utc::now();
        SessionReport {
            session_id: Uuid::new_v4(),
            device: "test-device".to_string(),
            mode: PipelineMode::Prediction,
            started_at: finished_at - Duration::seconds(42),
            finished_at,
            total_steps: steps.map(|(total, _)| total),
            session_steps: steps.map(|(_, delta)| delta),
        }
    }

    #[test]
    fn test_display_includes_steps() {
        let r = report(Some((120, 20)));
        let text = r.to_string();
        assert!(text.contains("prediction session"));
        assert!(text.contains("(42s)"));
        assert!(text.contains("20 steps (total 120)"));

        assert!(!report(None).to_string().contains("steps"));
    }

    #[test]
    fn test_session_log_append_and_load() {
        let path = std::env::temp_dir()
            .join(format!("step-counter-sessions-{}", Uuid::new_v4()))
            .join("sessions.jsonl");
        let mut log = SessionLog::new(path.clone());
        assert!(log.load().unwrap().is_empty());

        let first = report(Some((10, 10)));
        let second = report(Some((25, 15)));
        log.report(&first);
        log.report(&second);

        let loaded = log.load().unwrap();
        assert_eq!(loaded, vec![first, second]);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_session_log_skips_malformed_lines() {
        let dir = std::env::temp_dir().join(format!("step-counter-sessions-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sessions.jsonl");

        let good = report(None);
        let content = format!("not json\n{}\n\n", serde_json::to_string(&good).unwrap());
        std::fs::write(&path, content).unwrap();

        let loaded = SessionLog::new(path).load().unwrap();
        assert_eq!(loaded, vec![good]);

        let _ = std::fs::remove_dir_all(dir);
    }
}
