use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{fmt, sync::Arc};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProgressStage {
    Idle,
    Running,
    Done,
    Cancelled,
    Failed,
}

impl ProgressStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStage::Idle => "Idle",
            ProgressStage::Running => "Running",
            ProgressStage::Done => "Done",
            ProgressStage::Cancelled => "Cancelled",
            ProgressStage::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressStage::Done | ProgressStage::Cancelled | ProgressStage::Failed
        )
    }
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one retrieval's progress, owned by the retrieval loop and
/// handed to the observer after every change.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressState {
    pub stage: ProgressStage,
    pub processed: u64,
    /// Expected number of rows, once the backend has reported it.
    pub total: Option<u64>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_update: Option<DateTime<Utc>>,
}

impl Default for ProgressState {
    fn default() -> Self {
        ProgressState {
            stage: ProgressStage::Idle,
            processed: 0,
            total: None,
            started_at: None,
            last_update: None,
        }
    }
}

impl ProgressState {
    /// Completed fraction in `[0, 1]`, when the total is known and non-zero.
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some((self.processed as f64 / total as f64).min(1.0)),
            _ => None,
        }
    }
}

/// Receives progress snapshots. Called from the retrieval task between
/// round-trips, never concurrently with it.
pub trait ProgressObserver: Send + Sync {
    fn on_start(&self, _label: &str, _state: &ProgressState) {}

    fn on_progress(&self, label: &str, state: &ProgressState);

    fn on_finish(&self, _label: &str, _state: &ProgressState) {}
}

/// Reports through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn on_progress(&self, label: &str, state: &ProgressState) {
        match state.total {
            Some(total) => info!("{label} retrieved {}/{total}", state.processed),
            None => info!("{label} retrieved {}", state.processed),
        }
    }

    fn on_finish(&self, label: &str, state: &ProgressState) {
        match state.stage {
            ProgressStage::Done => info!("{label} finished: {} rows", state.processed),
            ProgressStage::Cancelled => warn!("{label} cancelled! Processed {}", state.processed),
            ProgressStage::Failed => warn!("{label} failed! Processed {}", state.processed),
            _ => {}
        }
    }
}

/// Owns the progress state of one retrieval and forwards it to an observer.
pub struct ProgressReporter {
    label: String,
    state: ProgressState,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl ProgressReporter {
    pub fn new(label: impl Into<String>, observer: Option<Arc<dyn ProgressObserver>>) -> Self {
        ProgressReporter {
            label: label.into(),
            state: ProgressState::default(),
            observer,
        }
    }

    pub fn start(&mut self) {
        let now = Utc::now();
        self.state.stage = ProgressStage::Running;
        self.state.started_at = Some(now);
        self.state.last_update = Some(now);
        if let Some(observer) = &self.observer {
            observer.on_start(&self.label, &self.state);
        }
    }

    /// Keeps the first total reported; later pages may omit it.
    pub fn set_total(&mut self, total: Option<u64>) {
        if self.state.total.is_none() {
            self.state.total = total;
        }
    }

    pub fn advance(&mut self, rows: u64) {
        self.state.processed += rows;
        self.state.last_update = Some(Utc::now());
        if let Some(observer) = &self.observer {
            observer.on_progress(&self.label, &self.state);
        }
    }

    pub fn finish(&mut self, stage: ProgressStage) {
        self.state.stage = stage;
        self.state.last_update = Some(Utc::now());
        if let Some(observer) = &self.observer {
            observer.on_finish(&self.label, &self.state);
        }
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }
}
