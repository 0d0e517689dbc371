use crate::{
    error::RetrievalError,
    options::RetrievalOptions,
    report::{RetrievalOutcome, RetrievalReport},
    strategy::{Collector, Triage, log_unexpected, triage},
};
use connectors::backend::SearchBackend;
use futures::StreamExt;
use model::{pagination::cursor::Cursor, search::request::ScanRequest};
use tracing::warn;

/// Bulk, unordered retrieval through the backend's scan helper.
///
/// The total comes from a separate count and only feeds progress. There is
/// no resume point: a failure mid-drain keeps the rows mapped so far.
/// Cancellation is honoured at page-size boundaries of the drained stream,
/// and the stream is closed on every exit so its scroll is released.
pub async fn run(
    backend: &dyn SearchBackend,
    request: ScanRequest,
    options: &RetrievalOptions,
) -> Result<RetrievalReport, RetrievalError> {
    let page_size = request.page_size;
    let indices = request.indices.clone();
    let query = request.query.clone();

    let mut collector = Collector::start("scan", options);
    let mut hits = backend.scan(request);

    match backend.count(&indices, &query, false).await {
        Ok(total) => collector.set_total(Some(total)),
        Err(err) => match triage(backend, err) {
            Triage::Raise(err) => {
                collector.fail();
                hits.close().await;
                return Err(err);
            }
            Triage::Interrupt(err) => warn!("Could not count matches for progress: {err}"),
        },
    }

    let mut in_page = 0usize;
    let outcome = loop {
        if in_page == 0 && options.cancel.is_cancelled() {
            warn!("Request cancelled after {} rows", collector.rows.len());
            break RetrievalOutcome::Cancelled {
                resume: Cursor::None,
                dangling_scroll: hits.close().await,
            };
        }

        match hits.next().await {
            None => break RetrievalOutcome::Complete,
            Some(Ok(hit)) => {
                collector.push_hit(hit);
                in_page += 1;
                if in_page == page_size {
                    collector.close_page(in_page);
                    in_page = 0;
                }
            }
            Some(Err(err)) => match triage(backend, err) {
                Triage::Raise(err) => {
                    collector.fail();
                    hits.close().await;
                    return Err(err);
                }
                Triage::Interrupt(err) => {
                    log_unexpected("scan", &err, &Cursor::None);
                    break RetrievalOutcome::Interrupted {
                        error: err.to_string(),
                        resume: Cursor::None,
                        dangling_scroll: hits.close().await,
                    };
                }
            },
        }
    };

    if in_page > 0 {
        collector.close_page(in_page);
    }
    Ok(collector.finish(outcome, options))
}
