#![allow(dead_code)]

use connectors::memory::MemoryBackend;
use engine_config::settings::RetrievalSettings;
use engine_core::{options::RetrievalOptions, retriever::Retriever};
use model::{core::identifiers::IndexSelector, records::table::Table};
use serde_json::{Value, json};
use std::{collections::HashSet, sync::Arc};

pub mod failures;
pub mod pagination;

pub const INDEX: &str = "articles";
const CATEGORIES: [&str; 4] = ["cardio", "neuro", "onco", "derma"];

/// `n` articles with zero-padded ids so the string order matches the
/// numeric one. Every fifth article has no category; `rank` repeats every
/// seven documents so sorting on it alone is ambiguous.
pub fn articles(n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| {
            let mut doc = json!({
                "id": format!("{i:05}"),
                "title": format!("Article {i}"),
                "rank": i % 7,
                "tags": ["a", "b"],
            });
            if i % 5 != 0 {
                doc["category"] = json!(CATEGORIES[i % CATEGORIES.len()]);
            }
            doc
        })
        .collect()
}

pub fn backend(n: usize) -> MemoryBackend {
    MemoryBackend::new().with_documents(INDEX, articles(n))
}

pub fn retriever(backend: &MemoryBackend) -> Retriever {
    Retriever::new(Arc::new(backend.clone()), RetrievalSettings::default())
}

pub fn options(retriever: &Retriever, size: usize) -> RetrievalOptions {
    retriever.options().with_size(size).with_progress(false)
}

pub fn index() -> IndexSelector {
    IndexSelector::single(INDEX)
}

pub fn match_all() -> Value {
    json!({"query": {"match_all": {}}})
}

/// The `_id` column, top to bottom.
pub fn ids(table: &Table) -> Vec<String> {
    table
        .column("_id")
        .unwrap_or_default()
        .into_iter()
        .map(ToString::to_string)
        .collect()
}

pub fn assert_no_duplicates(table: &Table) {
    let ids = ids(table);
    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len(), "duplicate _id values in {ids:?}");
}
