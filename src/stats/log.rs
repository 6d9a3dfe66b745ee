//! Pipeline statistics log.
//!
//! Lock-free counters updated from the sampling, draining, prediction and
//! forwarding loops, with a text summary and optional persistence of the
//! cumulative totals across runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for one process lifetime (plus any loaded totals).
#[derive(Debug)]
pub struct PipelineStats {
    /// Samples pushed into the queue
    samples_produced: AtomicU64,
    /// Windows that wrapped and were handed to the predictor
    windows_completed: AtomicU64,
    /// Windows dropped as warm-up
    windows_discarded: AtomicU64,
    /// Predictor invocations
    predictions: AtomicU64,
    /// Pops that timed out while running
    pop_timeouts: AtomicU64,
    /// Records written to the network sink
    records_forwarded: AtomicU64,
    /// Failed sink writes
    write_failures: AtomicU64,
    /// Sessions finished
    sessions_completed: AtomicU64,
    /// Process start time
    started_at: DateTime<Utc>,
    /// Path for persisting totals
    persist_path: Option<PathBuf>,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self {
            samples_produced: AtomicU64::new(0),
            windows_completed: AtomicU64::new(0),
            windows_discarded: AtomicU64::new(0),
            predictions: AtomicU64::new(0),
            pop_timeouts: AtomicU64::new(0),
            records_forwarded: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            sessions_completed: AtomicU64::new(0),
            started_at: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a log that continues from totals saved at `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            tracing::warn!("Could not load previous pipeline stats: {e}");
        }

        stats
    }

    pub fn record_sample(&self) {
        self.samples_produced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_window_completed(&self) {
        self.windows_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_window_discarded(&self) {
        self.windows_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_prediction(&self) {
        self.predictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pop_timeout(&self) {
        self.pop_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forwarded(&self) {
        self.records_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_completed(&self) {
        self.sessions_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            samples_produced: self.samples_produced.load(Ordering::Relaxed),
            windows_completed: self.windows_completed.load(Ordering::Relaxed),
            windows_discarded: self.windows_discarded.load(Ordering::Relaxed),
            predictions: self.predictions.load(Ordering::Relaxed),
            pop_timeouts: self.pop_timeouts.load(Ordering::Relaxed),
            records_forwarded: self.records_forwarded.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            sessions_completed: self.sessions_completed.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    pub fn summary(&self) -> String {
        let s = self.snapshot();
        format!(
            "Pipeline Statistics:\n\
             - Samples produced: {}\n\
             - Windows completed: {} ({} discarded as warm-up)\n\
             - Predictions: {}\n\
             - Queue pop timeouts: {}\n\
             - Records forwarded: {} ({} write failures)\n\
             - Sessions completed: {}\n\
             - Uptime: {} seconds",
            s.samples_produced,
            s.windows_completed,
            s.windows_discarded,
            s.predictions,
            s.pop_timeouts,
            s.records_forwarded,
            s.write_failures,
            s.sessions_completed,
            s.uptime_secs
        )
    }

    /// Write cumulative totals to disk. No-op without a persist path.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let s = self.snapshot();
            let persisted = PersistedStats {
                samples_produced: s.samples_produced,
                windows_completed: s.windows_completed,
                windows_discarded: s.windows_discarded,
                predictions: s.predictions,
                records_forwarded: s.records_forwarded,
                sessions_completed: s.sessions_completed,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.samples_produced
                    .store(persisted.samples_produced, Ordering::Relaxed);
                self.windows_completed
                    .store(persisted.windows_completed, Ordering::Relaxed);
                self.windows_discarded
                    .store(persisted.windows_discarded, Ordering::Relaxed);
                self.predictions
                    .store(persisted.predictions, Ordering::Relaxed);
                self.records_forwarded
                    .store(persisted.records_forwarded, Ordering::Relaxed);
                self.sessions_completed
                    .store(persisted.sessions_completed, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub samples_produced: u64,
    pub windows_completed: u64,
    pub windows_discarded: u64,
    pub predictions: u64,
    pub pop_timeouts: u64,
    pub records_forwarded: u64,
    pub write_failures: u64,
    pub sessions_completed: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

/// On-disk totals.
#[derive(Debug, Serialize, Deserialize)]
pub struct PersistedStats {
    pub samples_produced: u64,
    pub windows_completed: u64,
    pub windows_discarded: u64,
    pub predictions: u64,
    pub records_forwarded: u64,
    pub sessions_completed: u64,
    pub last_updated: DateTime<Utc>,
}

/// Stats handle shared by every loop.
pub type SharedPipelineStats = Arc<PipelineStats>;

pub fn create_shared_stats() -> SharedPipelineStats {
    Arc::new(PipelineStats::new())
}

pub fn create_shared_stats_with_persistence(path: PathBuf) -> SharedPipelineStats {
    Arc::new(PipelineStats::with_persistence(path))
}
