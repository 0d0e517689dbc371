use crate::{
    error::RetrievalError,
    guard::validate_indices,
    options::RetrievalOptions,
    query::normalize,
    report::RetrievalReport,
    strategy::{
        Triage, drive, prepare, scan,
        scroll::ScrollSource,
        sorted::{SortedSource, effective_sort},
        triage,
    },
};
use connectors::{backend::SearchBackend, error::BackendError};
use engine_config::settings::RetrievalSettings;
use model::{
    core::{identifiers::IndexSelector, value::MULTI_VALUE_SEPARATOR},
    pagination::sort::SortSpec,
    records::table::{Cell, Table},
    search::request::{ScanRequest, SearchRequest},
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Shown for a mapped property without an explicit type (object fields).
const UNTYPED_FIELD: &str = "?";

/// Entry point of the pagination engine over one backend.
#[derive(Clone)]
pub struct Retriever {
    backend: Arc<dyn SearchBackend>,
    settings: RetrievalSettings,
}

impl Retriever {
    pub fn new(backend: Arc<dyn SearchBackend>, settings: RetrievalSettings) -> Self {
        Retriever { backend, settings }
    }

    pub fn backend(&self) -> &dyn SearchBackend {
        self.backend.as_ref()
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    /// Options pre-filled from the retriever's settings.
    pub fn options(&self) -> RetrievalOptions {
        RetrievalOptions::from_settings(&self.settings)
    }

    fn fail_fast(&self, err: BackendError) -> RetrievalError {
        match triage(self.backend(), err) {
            Triage::Raise(err) => err,
            Triage::Interrupt(err) => RetrievalError::Backend(err),
        }
    }

    /// Number of documents matching `query`.
    pub async fn count_matches(
        &self,
        indices: &IndexSelector,
        query: &Value,
    ) -> Result<u64, RetrievalError> {
        validate_indices(indices)?;
        let query = normalize(query);
        self.backend
            .count(indices, &query, false)
            .await
            .map_err(|e| self.fail_fast(e))
    }

    /// Full, unordered dump through the backend's scan helper.
    pub async fn retrieve_by_scan(
        &self,
        indices: &IndexSelector,
        query: &Value,
        options: &RetrievalOptions,
    ) -> Result<RetrievalReport, RetrievalError> {
        let query = prepare(indices, query, options.size, self.settings.max_page_size)?;
        info!(indices = %indices, size = options.size, "Retrieving by scan");

        let request = ScanRequest {
            indices: indices.clone(),
            query,
            fields: options.request_fields(),
            page_size: options.size,
            timeout: options.timeout,
            allow_no_indices: false,
            keep_alive: self.settings.scan_keep_alive,
        };
        scan::run(self.backend(), request, options).await
    }

    /// Keep-alive scroll traversal. `resume` continues a scroll id returned
    /// by an earlier, interrupted call instead of opening a new context.
    pub async fn retrieve_by_scroll(
        &self,
        indices: &IndexSelector,
        query: &Value,
        resume: Option<String>,
        options: &RetrievalOptions,
    ) -> Result<RetrievalReport, RetrievalError> {
        let query = prepare(indices, query, options.size, self.settings.max_page_size)?;
        info!(indices = %indices, size = options.size, "Retrieving by scroll");

        let keep_alive = self.settings.scroll_keep_alive;
        let request = SearchRequest::builder(indices.clone(), query)
            .fields(options.request_fields())
            .size(options.size)
            .scroll(keep_alive)
            .timeout(options.timeout)
            .build();

        let mut source = match resume {
            Some(scroll_id) => ScrollSource::resume(request, keep_alive, scroll_id),
            None => ScrollSource::new(request, keep_alive),
        };
        drive(&mut source, self.backend(), options).await
    }

    /// Sort plus search-after traversal. The configured tiebreaker is
    /// appended to `sort` when missing and is the whole sort when none is
    /// given. `resume_after` is the sort tuple of the last row already seen.
    pub async fn retrieve_by_sorted_pagination(
        &self,
        indices: &IndexSelector,
        query: &Value,
        sort: Option<SortSpec>,
        resume_after: Option<Vec<Value>>,
        options: &RetrievalOptions,
    ) -> Result<RetrievalReport, RetrievalError> {
        let query = prepare(indices, query, options.size, self.settings.max_page_size)?;
        let sort = effective_sort(sort, &self.settings.tiebreaker_field);
        info!(indices = %indices, size = options.size, sort = %sort, "Retrieving by sorted pagination");

        if let Some(after) = &resume_after {
            if after.len() != sort.keys().len() {
                return Err(RetrievalError::invalid(format!(
                    "resume point has {} value(s) but the sort has {} key(s)",
                    after.len(),
                    sort.keys().len()
                )));
            }
        }

        let request = SearchRequest::builder(indices.clone(), query)
            .fields(options.request_fields())
            .size(options.size)
            .sort(Some(sort))
            .search_after(resume_after)
            .track_scores(true)
            .track_total_hits(true)
            .timeout(options.timeout)
            .build();

        let mut source = SortedSource::new(request);
        drive(&mut source, self.backend(), options).await
    }

    /// Every index with the aliases pointing at it, one row per index.
    pub async fn list_aliases(&self) -> Result<Table, RetrievalError> {
        let aliases = self
            .backend
            .get_alias()
            .await
            .map_err(RetrievalError::Backend)?;

        let mut table = Table::new(vec!["Index".to_string(), "Aliases".to_string()]);
        for (index, names) in aliases {
            let joined = names
                .into_iter()
                .collect::<Vec<_>>()
                .join(MULTI_VALUE_SEPARATOR);
            table.push_row(vec![Cell::Text(index), Cell::Text(joined)]);
        }
        debug!("Listed {} indices", table.len());
        Ok(table)
    }

    /// Mapped top-level fields and their types. The `Index` column is only
    /// present when more than one index was asked for.
    pub async fn index_fields(&self, indices: &IndexSelector) -> Result<Table, RetrievalError> {
        validate_indices(indices)?;
        let mappings = self
            .backend
            .get_mapping(indices, false)
            .await
            .map_err(RetrievalError::Backend)?;

        let with_index = indices.is_multi();
        let mut columns = Vec::with_capacity(3);
        if with_index {
            columns.push("Index".to_string());
        }
        columns.extend(["Field".to_string(), "Type".to_string()]);

        let mut table = Table::new(columns);
        for (index, fields) in mappings {
            for field in fields {
                let mut cells = Vec::with_capacity(3);
                if with_index {
                    cells.push(Cell::Text(index.clone()));
                }
                cells.push(Cell::Text(field.name));
                cells.push(Cell::Text(
                    field.field_type.unwrap_or_else(|| UNTYPED_FIELD.to_string()),
                ));
                table.push_row(cells);
            }
        }
        Ok(table)
    }
}
