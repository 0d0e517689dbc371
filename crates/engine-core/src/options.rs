use crate::progress::{LogObserver, ProgressObserver};
use engine_config::settings::RetrievalSettings;
use model::core::identifiers::FieldProjection;
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

/// Per-call options shared by every strategy.
#[derive(Clone)]
pub struct RetrievalOptions {
    pub fields: Option<FieldProjection>,
    pub size: usize,
    pub timeout: Duration,
    pub show_progress: bool,
    /// Checked between round-trips; cancelling ends the retrieval with the
    /// rows gathered so far.
    pub cancel: CancellationToken,
    pub observer: Arc<dyn ProgressObserver>,
}

impl RetrievalOptions {
    pub fn from_settings(settings: &RetrievalSettings) -> Self {
        RetrievalOptions {
            fields: None,
            size: settings.page_size,
            timeout: settings.request_timeout,
            show_progress: settings.show_progress,
            cancel: CancellationToken::new(),
            observer: Arc::new(LogObserver),
        }
    }

    pub fn with_fields(mut self, fields: FieldProjection) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub(crate) fn active_observer(&self) -> Option<Arc<dyn ProgressObserver>> {
        self.show_progress.then(|| self.observer.clone())
    }

    /// Field names as sent to the backend.
    pub(crate) fn request_fields(&self) -> Option<Vec<String>> {
        self.fields
            .as_ref()
            .filter(|f| !f.fields().is_empty())
            .map(|f| f.fields().to_vec())
    }
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self::from_settings(&RetrievalSettings::default())
    }
}
