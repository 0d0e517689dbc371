use crate::{backend::SearchBackend, error::BackendError};
use futures_util::{Stream, StreamExt, stream, stream::BoxStream};
use model::{
    pagination::cursor::KeepAlive, records::hit::Hit, search::request::ScanRequest,
    search::response::SearchPage,
};
use std::{
    collections::VecDeque,
    pin::Pin,
    sync::{Arc, Mutex, PoisonError},
    task::{Context, Poll},
};
use tracing::{debug, warn};

/// The scroll id a scan currently holds open on the backend, if any.
type OpenScroll = Arc<Mutex<Option<String>>>;

/// Lazy, single-pass stream of scan hits.
///
/// Once it has yielded `None` (or an error) it keeps yielding `None`;
/// re-consuming an exhausted stream produces nothing. A consumer that stops
/// early calls [`HitStream::close`] to release the internal scroll.
pub struct HitStream<'a> {
    backend: &'a dyn SearchBackend,
    hits: BoxStream<'a, Result<Hit, BackendError>>,
    open: OpenScroll,
}

impl<'a> HitStream<'a> {
    /// Releases the scroll context if the stream still holds one.
    ///
    /// Returns the scroll id when the clear failed and the backend may
    /// still hold it. Closing a drained stream sends nothing.
    pub async fn close(self) -> Option<String> {
        release(self.backend, &self.open).await
    }

    /// Whether the stream holds a scroll context on the backend.
    pub fn holds_scroll(&self) -> bool {
        slot(&self.open).is_some()
    }
}

impl Stream for HitStream<'_> {
    type Item = Result<Hit, BackendError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.hits.poll_next_unpin(cx)
    }
}

enum ScanState {
    Start(ScanRequest),
    Paging {
        scroll_id: Option<String>,
        keep_alive: KeepAlive,
        buffer: VecDeque<Hit>,
    },
    Done,
}

/// Scan helper built on an internal, unordered scroll.
///
/// Pages are pulled only when the consumer has drained the previous one.
/// The scroll is cleared when the backend runs dry, a page reports failed
/// shards, a fetch fails, or the consumer closes the stream.
pub fn scroll_scan<'a>(backend: &'a dyn SearchBackend, request: ScanRequest) -> HitStream<'a> {
    let open = OpenScroll::default();
    let tracked = open.clone();
    let hits = stream::try_unfold(ScanState::Start(request), move |state| {
        next_hit(backend, tracked.clone(), state)
    })
    .boxed();

    HitStream {
        backend,
        hits,
        open,
    }
}

async fn next_hit(
    backend: &dyn SearchBackend,
    open: OpenScroll,
    mut state: ScanState,
) -> Result<Option<(Hit, ScanState)>, BackendError> {
    loop {
        state = match state {
            ScanState::Done => return Ok(None),
            ScanState::Start(request) => {
                let page = backend.search(&request.initial_search()).await?;
                let scroll_id = page.scroll_id.clone();
                *slot(&open) = scroll_id.clone();
                let buffer = accept_page(backend, &open, page).await?;
                match scroll_id {
                    Some(_) if buffer.is_empty() => {
                        release(backend, &open).await;
                        ScanState::Done
                    }
                    scroll_id => ScanState::Paging {
                        scroll_id,
                        keep_alive: request.keep_alive,
                        buffer,
                    },
                }
            }
            ScanState::Paging {
                scroll_id,
                keep_alive,
                mut buffer,
            } => {
                if let Some(hit) = buffer.pop_front() {
                    let next = ScanState::Paging {
                        scroll_id,
                        keep_alive,
                        buffer,
                    };
                    return Ok(Some((hit, next)));
                }

                let Some(id) = scroll_id else {
                    return Ok(None);
                };
                let page = match backend.scroll(&id, &keep_alive).await {
                    Ok(page) => page,
                    Err(err) => {
                        release(backend, &open).await;
                        return Err(err);
                    }
                };
                let next_id = page.scroll_id.clone().unwrap_or(id);
                *slot(&open) = Some(next_id.clone());
                let buffer = accept_page(backend, &open, page).await?;
                if buffer.is_empty() {
                    release(backend, &open).await;
                    ScanState::Done
                } else {
                    ScanState::Paging {
                        scroll_id: Some(next_id),
                        keep_alive,
                        buffer,
                    }
                }
            }
        };
    }
}

async fn accept_page(
    backend: &dyn SearchBackend,
    open: &OpenScroll,
    page: SearchPage,
) -> Result<VecDeque<Hit>, BackendError> {
    if page.has_shard_failures() {
        release(backend, open).await;
        return Err(BackendError::Scan {
            failed: page.failed_shards.max(page.shard_failures.len() as u32),
            failures: page.shard_failures,
        });
    }
    debug!(hits = page.hits.len(), "Scan page received");
    Ok(page.hits.into())
}

fn slot(open: &OpenScroll) -> std::sync::MutexGuard<'_, Option<String>> {
    open.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the held scroll at most once; the slot is emptied before the call.
async fn release(backend: &dyn SearchBackend, open: &OpenScroll) -> Option<String> {
    let scroll_id = slot(open).take()?;
    match backend.clear_scroll(&scroll_id).await {
        Ok(()) => None,
        Err(err) => {
            warn!("Failed to clear scan scroll {scroll_id}: {err}");
            Some(scroll_id)
        }
    }
}
