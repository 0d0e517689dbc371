use crate::strategy::PageSource;
use async_trait::async_trait;
use connectors::{
    backend::{ErrorClass, SearchBackend},
    error::BackendError,
};
use model::{
    pagination::cursor::{Cursor, KeepAlive, ScrollCursor},
    search::{request::SearchRequest, response::SearchPage},
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeaseState {
    Held,
    Released,
    /// Release was attempted and failed; the backend still holds the context.
    Dangling,
}

/// Single-owner handle on a backend scroll context.
///
/// `release` clears the context at most once. A lease dropped while still
/// held logs the leaked id; the backend reclaims it when the keep-alive
/// runs out.
#[derive(Debug)]
pub struct ScrollLease {
    scroll_id: Option<String>,
    keep_alive: KeepAlive,
    state: LeaseState,
}

impl ScrollLease {
    pub fn new(scroll_id: Option<String>, keep_alive: KeepAlive) -> Self {
        ScrollLease {
            scroll_id,
            keep_alive,
            state: LeaseState::Held,
        }
    }

    pub fn scroll_id(&self) -> Option<&str> {
        self.scroll_id.as_deref()
    }

    /// Takes the continuation token of a newer page; keeps the old one when
    /// the backend sent none.
    pub fn renew(&mut self, scroll_id: Option<&str>) {
        if let Some(id) = scroll_id {
            if self.scroll_id.as_deref() != Some(id) {
                debug!("Scroll id rotated");
            }
            self.scroll_id = Some(id.to_string());
        }
    }

    pub fn cursor(&self) -> Cursor {
        match (&self.scroll_id, self.state) {
            (Some(id), LeaseState::Held | LeaseState::Dangling) => {
                Cursor::Scroll(ScrollCursor::new(id.clone(), self.keep_alive))
            }
            _ => Cursor::None,
        }
    }

    /// The backend reports the context gone; there is nothing left to clear.
    pub fn expire(&mut self) {
        if self.state == LeaseState::Held {
            debug!("Scroll context no longer exists on the backend");
            self.state = LeaseState::Released;
        }
    }

    pub async fn release(&mut self, backend: &dyn SearchBackend) -> Option<String> {
        if self.state != LeaseState::Held {
            return None;
        }
        let Some(id) = self.scroll_id.clone() else {
            self.state = LeaseState::Released;
            return None;
        };

        match backend.clear_scroll(&id).await {
            Ok(()) => {
                self.state = LeaseState::Released;
                debug!("Scroll context cleared");
                None
            }
            Err(err) => {
                self.state = LeaseState::Dangling;
                warn!("Failed to clear scroll, backend still holds scroll_id={id}: {err}");
                Some(id)
            }
        }
    }
}

impl Drop for ScrollLease {
    fn drop(&mut self) {
        if self.state == LeaseState::Held {
            if let Some(id) = &self.scroll_id {
                warn!(
                    "Scroll {id} dropped without release, it expires after {}",
                    self.keep_alive
                );
            }
        }
    }
}

/// Keep-alive cursor traversal: an initial scroll-opening search, then
/// `scroll` calls while full pages keep coming.
pub struct ScrollSource {
    request: SearchRequest,
    keep_alive: KeepAlive,
    lease: Option<ScrollLease>,
    /// Whether the last page carried a continuation token.
    token_returned: bool,
}

impl ScrollSource {
    /// `request` must already carry the keep-alive in `scroll`.
    pub fn new(request: SearchRequest, keep_alive: KeepAlive) -> Self {
        ScrollSource {
            request,
            keep_alive,
            lease: None,
            token_returned: false,
        }
    }

    /// Continues a scroll the caller kept from an earlier call.
    pub fn resume(request: SearchRequest, keep_alive: KeepAlive, scroll_id: String) -> Self {
        info!("Resuming scroll from a caller-supplied scroll_id");
        ScrollSource {
            request,
            keep_alive,
            lease: Some(ScrollLease::new(Some(scroll_id), keep_alive)),
            token_returned: true,
        }
    }
}

#[async_trait]
impl PageSource for ScrollSource {
    fn name(&self) -> &'static str {
        "scroll"
    }

    async fn fetch(&mut self, backend: &dyn SearchBackend) -> Result<SearchPage, BackendError> {
        let scroll_id = self
            .lease
            .as_ref()
            .and_then(ScrollLease::scroll_id)
            .map(str::to_string);
        let page = match scroll_id {
            Some(id) => match backend.scroll(&id, &self.keep_alive).await {
                Ok(page) => page,
                Err(err) => {
                    if backend.classify(&err) == ErrorClass::NotFound {
                        if let Some(lease) = &mut self.lease {
                            lease.expire();
                        }
                    }
                    return Err(err);
                }
            },
            None => backend.search(&self.request).await?,
        };

        // Record the token before anything can fail so it is always released.
        match &mut self.lease {
            Some(lease) => lease.renew(page.scroll_id.as_deref()),
            None => {
                self.lease = Some(ScrollLease::new(page.scroll_id.clone(), self.keep_alive));
            }
        }
        self.token_returned = page.scroll_id.is_some();
        Ok(page)
    }

    fn advance(&mut self, _page: &SearchPage) -> Result<(), BackendError> {
        Ok(())
    }

    fn has_more(&self, returned: usize) -> bool {
        self.token_returned && returned == self.request.size
    }

    fn resume(&self) -> Cursor {
        self.lease
            .as_ref()
            .map(ScrollLease::cursor)
            .unwrap_or_default()
    }

    async fn release(&mut self, backend: &dyn SearchBackend) -> Option<String> {
        match &mut self.lease {
            Some(lease) => lease.release(backend).await,
            None => None,
        }
    }
}
