use crate::{
    error::RetrievalError,
    guard::{validate_indices, validate_page_size},
    mapper::{map_hit, map_hits},
    options::RetrievalOptions,
    progress::{ProgressReporter, ProgressStage},
    query::normalize,
    report::{RetrievalOutcome, RetrievalReport},
    table::assemble,
};
use async_trait::async_trait;
use connectors::{
    backend::{ErrorClass, SearchBackend},
    error::BackendError,
};
use model::{
    core::identifiers::IndexSelector,
    pagination::cursor::Cursor,
    records::{hit::Hit, row::Row},
    search::response::SearchPage,
};
use serde_json::Value;
use tracing::{error, warn};

pub mod scan;
pub mod scroll;
pub mod sorted;

/// Checks shared by every strategy, run before any backend call. Returns the
/// normalized query clause.
pub fn prepare(
    indices: &IndexSelector,
    query: &Value,
    size: usize,
    max_size: usize,
) -> Result<Value, RetrievalError> {
    validate_indices(indices)?;
    validate_page_size(size, max_size)?;
    Ok(normalize(query))
}

/// What to do with a backend error raised inside a retrieval loop.
pub(crate) enum Triage {
    /// Surface to the caller; accumulated rows are dropped.
    Raise(RetrievalError),
    /// Log it and return what was gathered.
    Interrupt(BackendError),
}

pub(crate) fn triage(backend: &dyn SearchBackend, err: BackendError) -> Triage {
    if let BackendError::Scan { failed, failures } = err {
        return Triage::Raise(RetrievalError::PartialShardFailure {
            failed,
            failures,
            resume: Cursor::None,
        });
    }
    match backend.classify(&err) {
        ErrorClass::NotFound => Triage::Raise(RetrievalError::IndexNotFound(err.to_string())),
        ErrorClass::BadRequest => Triage::Raise(RetrievalError::BadRequest(err.to_string())),
        ErrorClass::Other => Triage::Interrupt(err),
    }
}

pub(crate) fn log_unexpected(strategy: &str, err: &BackendError, resume: &Cursor) {
    error!(
        strategy,
        error = %err,
        details = ?err,
        kind = std::any::type_name_of_val(err),
        resume = %resume,
        "Unexpected failure, returning the rows retrieved so far"
    );
}

/// Rows and progress of one retrieval invocation.
pub(crate) struct Collector {
    rows: Vec<Row>,
    progress: ProgressReporter,
    pages: u64,
}

impl Collector {
    pub(crate) fn start(label: &str, options: &RetrievalOptions) -> Self {
        let mut progress = ProgressReporter::new(label, options.active_observer());
        progress.start();
        Collector {
            rows: Vec::new(),
            progress,
            pages: 0,
        }
    }

    pub(crate) fn set_total(&mut self, total: Option<u64>) {
        self.progress.set_total(total);
    }

    /// Maps one page of hits and returns how many it held.
    pub(crate) fn apply_page(&mut self, hits: Vec<Hit>) -> usize {
        let returned = hits.len();
        self.rows.extend(map_hits(hits));
        self.pages += 1;
        self.progress.advance(returned as u64);
        returned
    }

    pub(crate) fn push_hit(&mut self, hit: Hit) {
        self.rows.push(map_hit(hit));
    }

    /// Closes a page of hits pushed one at a time.
    pub(crate) fn close_page(&mut self, returned: usize) {
        self.pages += 1;
        self.progress.advance(returned as u64);
    }

    pub(crate) fn fail(mut self) {
        self.progress.finish(ProgressStage::Failed);
    }

    pub(crate) fn finish(
        mut self,
        outcome: RetrievalOutcome,
        options: &RetrievalOptions,
    ) -> RetrievalReport {
        let stage = match &outcome {
            RetrievalOutcome::Complete => ProgressStage::Done,
            RetrievalOutcome::Cancelled { .. } => ProgressStage::Cancelled,
            RetrievalOutcome::Interrupted { .. } => ProgressStage::Failed,
        };
        self.progress.finish(stage);

        RetrievalReport {
            total: self.progress.state().total,
            pages: self.pages,
            table: assemble(self.rows, options.fields.as_ref()),
            outcome,
        }
    }
}

/// A cursor-driven source of pages: the part that differs between scroll
/// and search-after traversal.
#[async_trait]
pub trait PageSource: Send {
    fn name(&self) -> &'static str;

    /// Performs the next round-trip.
    async fn fetch(&mut self, backend: &dyn SearchBackend) -> Result<SearchPage, BackendError>;

    /// Moves the cursor past an accepted page.
    fn advance(&mut self, page: &SearchPage) -> Result<(), BackendError>;

    /// Whether another round-trip may return more rows after a page of
    /// `returned` hits. A short page always means exhaustion.
    fn has_more(&self, returned: usize) -> bool;

    /// Where a later call could continue from.
    fn resume(&self) -> Cursor;

    /// Releases backend-held state. Attempted at most once; returns the
    /// cursor the backend still holds when the release failed.
    async fn release(&mut self, backend: &dyn SearchBackend) -> Option<String>;
}

/// Pulls pages from `source` until a short page, cancellation or failure,
/// releasing the source on every exit path.
pub async fn drive<S>(
    source: &mut S,
    backend: &dyn SearchBackend,
    options: &RetrievalOptions,
) -> Result<RetrievalReport, RetrievalError>
where
    S: PageSource + ?Sized,
{
    enum Stop {
        Exhausted,
        Cancelled,
        Failed(BackendError),
    }

    let mut collector = Collector::start(source.name(), options);

    let stop = loop {
        if options.cancel.is_cancelled() {
            break Stop::Cancelled;
        }

        let page = match source.fetch(backend).await {
            Ok(page) => page,
            Err(err) => match triage(backend, err) {
                Triage::Raise(err) => {
                    source.release(backend).await;
                    collector.fail();
                    return Err(err);
                }
                Triage::Interrupt(err) => break Stop::Failed(err),
            },
        };

        if page.has_shard_failures() {
            source.release(backend).await;
            collector.fail();
            return Err(RetrievalError::PartialShardFailure {
                failed: page.failed_shards.max(page.shard_failures.len() as u32),
                failures: page.shard_failures,
                resume: source.resume(),
            });
        }

        if let Err(err) = source.advance(&page) {
            break Stop::Failed(err);
        }

        collector.set_total(page.total);
        let returned = collector.apply_page(page.hits);
        if !source.has_more(returned) {
            break Stop::Exhausted;
        }
    };

    let dangling_scroll = source.release(backend).await;
    let resume = source.resume();

    let outcome = match stop {
        Stop::Exhausted => RetrievalOutcome::Complete,
        Stop::Cancelled => {
            warn!(
                "Request cancelled after {} rows, resume from {resume}",
                collector.rows.len()
            );
            RetrievalOutcome::Cancelled {
                resume,
                dangling_scroll,
            }
        }
        Stop::Failed(err) => {
            log_unexpected(source.name(), &err, &resume);
            RetrievalOutcome::Interrupted {
                error: err.to_string(),
                resume,
                dangling_scroll,
            }
        }
    };

    Ok(collector.finish(outcome, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prepare_checks_before_normalizing() {
        let query = json!({"query": {"match_all": {}}});
        assert_eq!(
            prepare(&IndexSelector::single("notes"), &query, 10, 10_000).unwrap(),
            json!({"match_all": {}})
        );
        assert!(matches!(
            prepare(&IndexSelector::single("notes"), &query, 10_001, 10_000),
            Err(RetrievalError::InvalidArgument(_))
        ));
        assert!(matches!(
            prepare(&IndexSelector::new(Vec::<String>::new()), &query, 10, 10_000),
            Err(RetrievalError::InvalidArgument(_))
        ));
    }
}
