use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WorkerStatus {
    NotStarted,
    Idle,
    Processing,
    Calling,
    BackingOff,
    Stopped,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerMetrics {
    pub remote_calls: u64,
    pub remote_failures: u64,
    /// Lookups the remote service answered with a final "unknown message"
    pub unknown_messages: u64,
    pub colors_stored: u64,
    pub cache_skips: u64,
    pub unresolvable_skips: u64,
    pub stale_writes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerState {
    pub status: WorkerStatus,
    pub metrics: WorkerMetrics,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl Default for WorkerState {
    fn default() -> Self {
        Self {
            status: WorkerStatus::NotStarted,
            metrics: WorkerMetrics::default(),
            started_at: None,
            stopped_at: None,
            last_error: None,
        }
    }
}

/// Shared view of what the fetch worker is doing.
#[derive(Clone, Default)]
pub struct WorkerTracker {
    state: Arc<Mutex<WorkerState>>,
}

impl WorkerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> WorkerState {
        self.state.lock().clone()
    }

    pub fn status(&self) -> WorkerStatus {
        self.state.lock().status
    }

    pub fn mark_started(&self) {
        let mut state = self.state.lock();
        state.status = WorkerStatus::Idle;
        state.started_at = Some(Utc::now());
        state.stopped_at = None;
    }

    pub fn mark_stopped(&self) {
        let mut state = self.state.lock();
        state.status = WorkerStatus::Stopped;
        state.stopped_at = Some(Utc::now());
    }

    pub fn update_status(&self, status: WorkerStatus) {
        self.state.lock().status = status;
    }

    pub fn record_failure(&self, error: String) {
        let mut state = self.state.lock();
        state.metrics.remote_failures += 1;
        state.last_error = Some(error);
    }

    pub fn update_metrics<F>(&self, updater: F)
    where
        F: FnOnce(&mut WorkerMetrics),
    {
        updater(&mut self.state.lock().metrics);
    }
}
