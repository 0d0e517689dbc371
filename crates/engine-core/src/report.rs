use model::{pagination::cursor::Cursor, records::table::Table};
use std::fmt;

/// How a retrieval ended when it did not fail outright.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalOutcome {
    Complete,

    /// The caller cancelled between round-trips.
    Cancelled {
        resume: Cursor,
        /// Scroll id whose release failed and is still held by the backend.
        dangling_scroll: Option<String>,
    },

    /// An unclassified backend failure ended the loop early; the rows before
    /// it are kept.
    Interrupted {
        error: String,
        resume: Cursor,
        dangling_scroll: Option<String>,
    },
}

impl RetrievalOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, RetrievalOutcome::Complete)
    }

    pub fn resume(&self) -> Option<&Cursor> {
        match self {
            RetrievalOutcome::Complete => None,
            RetrievalOutcome::Cancelled { resume, .. }
            | RetrievalOutcome::Interrupted { resume, .. } => Some(resume),
        }
    }

    pub fn dangling_scroll(&self) -> Option<&str> {
        match self {
            RetrievalOutcome::Complete => None,
            RetrievalOutcome::Cancelled {
                dangling_scroll, ..
            }
            | RetrievalOutcome::Interrupted {
                dangling_scroll, ..
            } => dangling_scroll.as_deref(),
        }
    }
}

impl fmt::Display for RetrievalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalOutcome::Complete => f.write_str("complete"),
            RetrievalOutcome::Cancelled { resume, .. } => write!(f, "cancelled (resume: {resume})"),
            RetrievalOutcome::Interrupted { error, resume, .. } => {
                write!(f, "interrupted by '{error}' (resume: {resume})")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalReport {
    pub table: Table,
    /// Total matches as reported by the backend, when it reported one.
    pub total: Option<u64>,
    /// Backend round-trips that returned a page.
    pub pages: u64,
    pub outcome: RetrievalOutcome,
}

impl RetrievalReport {
    pub fn rows(&self) -> usize {
        self.table.len()
    }
}
