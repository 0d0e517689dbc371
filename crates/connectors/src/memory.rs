use crate::{
    backend::{HitStream, SearchBackend},
    error::{AdapterError, BackendError},
    scan::scroll_scan,
};
use async_trait::async_trait;
use model::{
    core::{identifiers::IndexSelector, value::display_value},
    pagination::{
        cursor::KeepAlive,
        sort::{SortOrder, SortSpec},
    },
    records::hit::Hit,
    search::{
        metadata::{AliasMap, FieldMapping, IndexMappings},
        request::{ScanRequest, SearchRequest},
        response::{SearchPage, ShardFailure},
    },
};
use serde_json::{Map, Value, json};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet, HashMap, VecDeque},
    fmt,
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tracing::{debug, info};

/// Largest `size` a single search accepts, as on a default cluster.
const MAX_RESULT_WINDOW: usize = 10_000;

/// Backend operations, for call accounting and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Ping,
    GetAlias,
    GetMapping,
    Count,
    Search,
    Scroll,
    ClearScroll,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Ping => "ping",
            Operation::GetAlias => "get_alias",
            Operation::GetMapping => "get_mapping",
            Operation::Count => "count",
            Operation::Search => "search",
            Operation::Scroll => "scroll",
            Operation::ClearScroll => "clear_scroll",
        };
        f.write_str(name)
    }
}

/// A failure the backend produces instead of (or alongside) its answer.
#[derive(Debug, Clone, PartialEq)]
pub enum FaultKind {
    /// Fails the call as if the connection broke.
    Transport(String),
    /// Answers a search or scroll with one failed shard.
    ShardFailure(String),
    NotFound,
    BadRequest,
}

#[derive(Debug, Clone)]
struct Fault {
    op: Operation,
    nth: usize,
    kind: FaultKind,
}

/// Invoked after every call is counted, with the call's ordinal.
pub type CallHook = Arc<dyn Fn(Operation, usize) + Send + Sync>;

#[derive(Debug, Clone)]
struct Document {
    id: String,
    source: Map<String, Value>,
}

struct ScrollContext {
    remaining: VecDeque<Hit>,
    page_size: usize,
    total: u64,
}

#[derive(Default)]
struct State {
    /// Index name to documents in insertion (`_doc`) order.
    indices: BTreeMap<String, Vec<Document>>,
    /// Index name to the aliases pointing at it.
    aliases: AliasMap,
    scrolls: HashMap<String, ScrollContext>,
    next_scroll: u64,
    calls: HashMap<Operation, usize>,
    faults: Vec<Fault>,
}

/// Search backend over documents held in memory.
///
/// Evaluates the common query clauses, sorts with `search_after` and keeps
/// real scroll contexts, so pagination behaves as against a cluster. Every
/// call is counted and any call can be made to fail.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
    hook: Option<CallHook>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds documents to `index`. A document's `_id` is its `id` field when
    /// present, its position in the index otherwise.
    pub fn with_documents(self, index: &str, documents: Vec<Value>) -> Self {
        {
            let mut state = self.state();
            let docs = state.indices.entry(index.to_string()).or_default();
            for doc in documents {
                let source = match doc {
                    Value::Object(map) => map,
                    other => {
                        let mut map = Map::new();
                        map.insert("value".into(), other);
                        map
                    }
                };
                let id = source
                    .get("id")
                    .filter(|v| !v.is_null())
                    .map(display_value)
                    .unwrap_or_else(|| docs.len().to_string());
                docs.push(Document { id, source });
            }
        }
        self
    }

    pub fn with_document(self, index: &str, id: &str, source: Value) -> Self {
        {
            let mut state = self.state();
            let source = source.as_object().cloned().unwrap_or_default();
            state
                .indices
                .entry(index.to_string())
                .or_default()
                .push(Document {
                    id: id.to_string(),
                    source,
                });
        }
        self
    }

    pub fn with_alias(self, alias: &str, index: &str) -> Self {
        self.state()
            .aliases
            .entry(index.to_string())
            .or_default()
            .insert(alias.to_string());
        self
    }

    pub fn with_call_hook(mut self, hook: CallHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Loads a JSON-lines file. Each line is either a document
    /// `{"_index": .., "_id": .., "_source": {..}}` (a line without
    /// `_source` is the source itself) or an alias `{"_alias": .., "_index": ..}`.
    pub fn from_json_lines(path: impl AsRef<Path>) -> Result<Self, AdapterError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AdapterError::Load(format!("{}: {e}", path.display())))?;

        let mut backend = MemoryBackend::new();
        let mut loaded = 0usize;
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut entry: Map<String, Value> = serde_json::from_str(line).map_err(|e| {
                AdapterError::Load(format!("{}:{}: {e}", path.display(), lineno + 1))
            })?;

            let index = match entry.remove("_index") {
                Some(Value::String(index)) => index,
                _ => {
                    return Err(AdapterError::Load(format!(
                        "{}:{}: missing '_index'",
                        path.display(),
                        lineno + 1
                    )));
                }
            };

            if let Some(alias) = entry.remove("_alias") {
                backend = backend.with_alias(&display_value(&alias), &index);
                continue;
            }

            let id = entry.remove("_id").map(|v| display_value(&v));
            let source = match entry.remove("_source") {
                Some(source) => source,
                None => Value::Object(entry),
            };
            backend = match id {
                Some(id) => backend.with_document(&index, &id, source),
                None => backend.with_documents(&index, vec![source]),
            };
            loaded += 1;
        }

        info!("Loaded {loaded} documents from {}", path.display());
        Ok(backend)
    }

    /// Makes the `nth` call (1-based) of `op` fail with `kind`.
    pub fn inject(&self, op: Operation, nth: usize, kind: FaultKind) {
        self.state().faults.push(Fault { op, nth, kind });
    }

    pub fn calls(&self, op: Operation) -> usize {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state().calls.values().sum()
    }

    pub fn open_scrolls(&self) -> usize {
        self.state().scrolls.len()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts the call and returns the fault scheduled for it, if any.
    fn record(&self, op: Operation) -> Option<FaultKind> {
        let (nth, fault) = {
            let mut state = self.state();
            let counter = state.calls.entry(op).or_insert(0);
            *counter += 1;
            let nth = *counter;
            let fault = state
                .faults
                .iter()
                .find(|f| f.op == op && f.nth == nth)
                .map(|f| f.kind.clone());
            (nth, fault)
        };
        debug!(op = %op, nth, "Memory backend call");
        if let Some(hook) = &self.hook {
            hook(op, nth);
        }
        fault
    }
}

fn fault_error(kind: FaultKind) -> Option<BackendError> {
    match kind {
        FaultKind::Transport(msg) => Some(BackendError::Injected(msg)),
        FaultKind::NotFound => Some(BackendError::not_found("no such index")),
        FaultKind::BadRequest => Some(BackendError::bad_request("failed to parse query")),
        FaultKind::ShardFailure(_) => None,
    }
}

fn mark_shard_failure(page: &mut SearchPage, reason: String) {
    page.failed_shards = 1;
    page.shard_failures.push(ShardFailure {
        shard: Some(0),
        index: page.hits.first().map(|h| h.index.clone()),
        node: Some("memory".into()),
        reason: json!({ "type": "injected_exception", "reason": reason }),
    });
}

impl State {
    fn resolve(
        &self,
        selector: &IndexSelector,
        allow_no_indices: bool,
    ) -> Result<Vec<String>, BackendError> {
        if selector.is_empty() {
            if allow_no_indices {
                return Ok(self.indices.keys().cloned().collect());
            }
            return Err(BackendError::NoIndices);
        }

        let mut resolved: Vec<String> = Vec::new();
        let mut push = |name: &String| {
            if !resolved.contains(name) {
                resolved.push(name.clone());
            }
        };

        for name in selector.names() {
            if name.contains('*') {
                let mut matched = false;
                for index in self.indices.keys() {
                    let aliased = self
                        .aliases
                        .get(index)
                        .is_some_and(|a| a.iter().any(|alias| glob_match(name, alias)));
                    if glob_match(name, index) || aliased {
                        push(index);
                        matched = true;
                    }
                }
                if !matched && !allow_no_indices {
                    return Err(BackendError::not_found(format!("no such index [{name}]")));
                }
            } else if self.indices.contains_key(name) {
                push(name);
            } else {
                let targets: Vec<&String> = self
                    .aliases
                    .iter()
                    .filter(|(_, aliases)| aliases.contains(name))
                    .map(|(index, _)| index)
                    .collect();
                if targets.is_empty() {
                    return Err(BackendError::not_found(format!("no such index [{name}]")));
                }
                targets.into_iter().for_each(&mut push);
            }
        }
        Ok(resolved)
    }

    /// Matching documents of the resolved indices, in `_doc` order, each with
    /// its global position.
    fn matching<'s>(
        &'s self,
        indices: &[String],
        query: &Value,
    ) -> Result<Vec<(usize, &'s str, &'s Document)>, BackendError> {
        let mut position = 0usize;
        let mut out = Vec::new();
        for index in indices {
            let Some((index, docs)) = self.indices.get_key_value(index) else {
                continue;
            };
            for doc in docs {
                let view = DocView { index, doc };
                if evaluate(query, &view)? {
                    out.push((position, index.as_str(), doc));
                }
                position += 1;
            }
        }
        Ok(out)
    }

    fn search(&mut self, request: &SearchRequest) -> Result<SearchPage, BackendError> {
        if request.size > MAX_RESULT_WINDOW {
            return Err(BackendError::bad_request(format!(
                "Result window is too large, size must be less than or equal to [{MAX_RESULT_WINDOW}] but was [{}]",
                request.size
            )));
        }
        if request.scroll.is_some() && request.search_after.is_some() {
            return Err(BackendError::bad_request(
                "[search_after] cannot be used in a scroll context",
            ));
        }

        let indices = self.resolve(&request.indices, request.allow_no_indices)?;
        let matches = self.matching(&indices, &request.query)?;
        let total = matches.len() as u64;

        let scored = request.sort.is_none() || request.track_scores == Some(true);
        let mut hits: Vec<Hit> = match &request.sort {
            None => matches
                .iter()
                .map(|(_, index, doc)| to_hit(index, doc, request.fields.as_deref(), scored, None))
                .collect(),
            Some(sort) => {
                let mut keyed: Vec<(Vec<Value>, Hit)> = matches
                    .iter()
                    .map(|(pos, index, doc)| {
                        let values = sort_values(sort, *pos, index, doc);
                        let hit = to_hit(
                            index,
                            doc,
                            request.fields.as_deref(),
                            scored,
                            Some(values.clone()),
                        );
                        (values, hit)
                    })
                    .collect();
                keyed.sort_by(|a, b| compare_tuples(&a.0, &b.0, sort));
                if let Some(after) = &request.search_after {
                    if after.len() != sort.keys().len() {
                        return Err(BackendError::bad_request(format!(
                            "search_after has {} value(s) but sort has {}",
                            after.len(),
                            sort.keys().len()
                        )));
                    }
                    keyed.retain(|(values, _)| {
                        compare_tuples(values, after, sort) == Ordering::Greater
                    });
                }
                keyed.into_iter().map(|(_, hit)| hit).collect()
            }
        };

        let mut page = SearchPage {
            total: Some(total),
            ..SearchPage::default()
        };

        if request.scroll.is_some() {
            let rest = hits.split_off(request.size.min(hits.len()));
            self.next_scroll += 1;
            let id = format!("scroll-{}", self.next_scroll);
            self.scrolls.insert(
                id.clone(),
                ScrollContext {
                    remaining: rest.into(),
                    page_size: request.size,
                    total,
                },
            );
            page.scroll_id = Some(id);
        } else {
            hits.truncate(request.size);
        }

        page.hits = hits;
        Ok(page)
    }

    fn scroll(&mut self, scroll_id: &str) -> Result<SearchPage, BackendError> {
        let context = self.scrolls.get_mut(scroll_id).ok_or_else(|| {
            BackendError::not_found(format!("No search context found for id [{scroll_id}]"))
        })?;
        let take = context.page_size.min(context.remaining.len());
        let hits: Vec<Hit> = context.remaining.drain(..take).collect();
        Ok(SearchPage {
            hits,
            total: Some(context.total),
            scroll_id: Some(scroll_id.to_string()),
            ..SearchPage::default()
        })
    }

    fn mappings(&self, indices: &[String]) -> IndexMappings {
        let mut mappings = IndexMappings::new();
        for index in indices {
            let mut fields: Vec<FieldMapping> = Vec::new();
            for doc in self.indices.get(index).into_iter().flatten() {
                for (name, value) in &doc.source {
                    let Some(field_type) = infer_type(value) else {
                        continue;
                    };
                    match fields.iter_mut().find(|f| &f.name == name) {
                        Some(existing) if existing.field_type.is_none() => {
                            existing.field_type = field_type;
                        }
                        Some(_) => {}
                        None => fields.push(FieldMapping {
                            name: name.clone(),
                            field_type,
                        }),
                    }
                }
            }
            mappings.insert(index.clone(), fields);
        }
        mappings
    }
}

/// `None` for nulls (not mapped), `Some(None)` for objects (properties
/// without a type).
fn infer_type(value: &Value) -> Option<Option<String>> {
    let ty = match value {
        Value::Null => return None,
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "long",
        Value::String(_) => "keyword",
        Value::Object(_) => return Some(None),
        Value::Array(items) => return items.iter().find_map(infer_type),
    };
    Some(Some(ty.to_string()))
}

fn to_hit(
    index: &str,
    doc: &Document,
    fields: Option<&[String]>,
    scored: bool,
    sort: Option<Vec<Value>>,
) -> Hit {
    let mut hit = Hit::new(index, doc.id.clone(), scored.then_some(1.0));
    if let Some(patterns) = fields {
        let mut projected = Map::new();
        for (name, value) in &doc.source {
            if !patterns.iter().any(|p| glob_match(p, name)) {
                continue;
            }
            let values = match value {
                Value::Null => continue,
                Value::Array(items) => items.iter().filter(|v| !v.is_null()).cloned().collect(),
                other => vec![other.clone()],
            };
            projected.insert(name.clone(), Value::Array(values));
        }
        if !projected.is_empty() {
            hit.fields = Some(projected);
        }
    }
    hit.sort = sort;
    hit
}

struct DocView<'d> {
    index: &'d str,
    doc: &'d Document,
}

impl DocView<'_> {
    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "_id" => Some(Value::String(self.doc.id.clone())),
            "_index" => Some(Value::String(self.index.to_string())),
            path => {
                let mut parts = path.split('.');
                let first = parts.next()?;
                let mut current = self.doc.source.get(first)?;
                for part in parts {
                    current = current.get(part)?;
                }
                Some(current.clone())
            }
        }
    }

    /// Flattened non-null values of a field.
    fn values(&self, field: &str) -> Vec<Value> {
        match self.get(field) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.into_iter().filter(|v| !v.is_null()).collect(),
            Some(v) => vec![v],
        }
    }
}

/// Splits a `{"<clause>": <body>}` object.
fn single_clause(query: &Value) -> Result<(&str, &Value), BackendError> {
    match query.as_object() {
        Some(map) if map.len() == 1 => {
            let (name, body) = map.iter().next().ok_or_else(|| {
                BackendError::bad_request("query malformed, empty clause")
            })?;
            Ok((name.as_str(), body))
        }
        _ => Err(BackendError::bad_request(format!(
            "query malformed, must be an object with a single clause: {query}"
        ))),
    }
}

/// Splits a `{"<field>": <params>}` object.
fn field_clause<'q>(clause: &str, body: &'q Value) -> Result<(&'q str, &'q Value), BackendError> {
    match body.as_object() {
        Some(map) if map.len() == 1 => map
            .iter()
            .next()
            .map(|(f, v)| (f.as_str(), v))
            .ok_or_else(|| BackendError::bad_request(format!("[{clause}] query malformed"))),
        _ => Err(BackendError::bad_request(format!(
            "[{clause}] query malformed, expected a single field"
        ))),
    }
}

fn evaluate(query: &Value, view: &DocView<'_>) -> Result<bool, BackendError> {
    let (clause, body) = single_clause(query)?;
    match clause {
        "match_all" => Ok(true),
        "match_none" => Ok(false),
        "term" => {
            let (field, param) = field_clause(clause, body)?;
            let expected = param.get("value").unwrap_or(param);
            Ok(view.values(field).iter().any(|v| values_equal(v, expected)))
        }
        "terms" => {
            let (field, param) = field_clause(clause, body)?;
            let expected = param.as_array().ok_or_else(|| {
                BackendError::bad_request(format!("[terms] query on [{field}] needs an array"))
            })?;
            let values = view.values(field);
            Ok(expected
                .iter()
                .any(|e| values.iter().any(|v| values_equal(v, e))))
        }
        "ids" => {
            let ids = body
                .get("values")
                .and_then(Value::as_array)
                .ok_or_else(|| BackendError::bad_request("[ids] query needs [values]"))?;
            Ok(ids.iter().any(|id| display_value(id) == view.doc.id))
        }
        "exists" => {
            let field = body
                .get("field")
                .and_then(Value::as_str)
                .ok_or_else(|| BackendError::bad_request("[exists] query needs [field]"))?;
            Ok(!view.values(field).is_empty())
        }
        "match" => {
            let (field, param) = field_clause(clause, body)?;
            let (text, and) = match param {
                Value::Object(opts) => (
                    opts.get("query").map(display_value).unwrap_or_default(),
                    opts.get("operator")
                        .and_then(Value::as_str)
                        .is_some_and(|op| op.eq_ignore_ascii_case("and")),
                ),
                other => (display_value(other), false),
            };
            let wanted = tokens(&text);
            let present: BTreeSet<String> = view
                .values(field)
                .iter()
                .flat_map(|v| tokens(&display_value(v)))
                .collect();
            Ok(if and {
                !wanted.is_empty() && wanted.iter().all(|t| present.contains(t))
            } else {
                wanted.iter().any(|t| present.contains(t))
            })
        }
        "range" => {
            let (field, bounds) = field_clause(clause, body)?;
            let bounds = bounds.as_object().ok_or_else(|| {
                BackendError::bad_request(format!("[range] query on [{field}] needs bounds"))
            })?;
            Ok(view.values(field).iter().any(|v| {
                bounds.iter().all(|(op, bound)| {
                    let ord = compare_values(v, bound);
                    match op.as_str() {
                        "gt" => ord == Ordering::Greater,
                        "gte" => ord != Ordering::Less,
                        "lt" => ord == Ordering::Less,
                        "lte" => ord != Ordering::Greater,
                        _ => true,
                    }
                })
            }))
        }
        "bool" => evaluate_bool(body, view),
        other => Err(BackendError::bad_request(format!(
            "unknown query [{other}]"
        ))),
    }
}

fn evaluate_bool(body: &Value, view: &DocView<'_>) -> Result<bool, BackendError> {
    fn clauses<'b>(body: &'b Value, key: &str) -> Vec<&'b Value> {
        match body.get(key) {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(single) => vec![single],
            None => Vec::new(),
        }
    }

    for q in clauses(body, "must").into_iter().chain(clauses(body, "filter")) {
        if !evaluate(q, view)? {
            return Ok(false);
        }
    }
    for q in clauses(body, "must_not") {
        if evaluate(q, view)? {
            return Ok(false);
        }
    }

    let should = clauses(body, "should");
    let required = body
        .get("minimum_should_match")
        .and_then(Value::as_u64)
        .unwrap_or_else(|| {
            let scoring = body.get("must").is_some() || body.get("filter").is_some();
            if should.is_empty() || scoring { 0 } else { 1 }
        });
    let mut satisfied = 0u64;
    for q in should {
        if evaluate(q, view)? {
            satisfied += 1;
        }
    }
    Ok(satisfied >= required)
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => display_value(a) == display_value(b),
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Compares sort tuples under `sort`; missing values (null) sort last in
/// either direction.
fn compare_tuples(a: &[Value], b: &[Value], sort: &SortSpec) -> Ordering {
    for ((x, y), key) in a.iter().zip(b).zip(sort.keys()) {
        let ord = match (x.is_null(), y.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match key.order {
                SortOrder::Asc => compare_values(x, y),
                SortOrder::Desc => compare_values(x, y).reverse(),
            },
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn sort_values(sort: &SortSpec, position: usize, index: &str, doc: &Document) -> Vec<Value> {
    let view = DocView { index, doc };
    sort.keys()
        .iter()
        .map(|key| match key.field.as_str() {
            "_doc" => json!(position),
            "_score" => json!(1.0),
            field => {
                let values = view.values(field);
                let pick = match key.order {
                    SortOrder::Asc => values.iter().min_by(|a, b| compare_values(a, b)),
                    SortOrder::Desc => values.iter().max_by(|a, b| compare_values(a, b)),
                };
                pick.cloned().unwrap_or(Value::Null)
            }
        })
        .collect()
}

/// `*` matches any run of characters; everything else is literal.
fn glob_match(pattern: &str, name: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == name;
    }
    let parts: Vec<&str> = pattern.split('*').collect();
    let (first, last) = (parts[0], parts[parts.len() - 1]);
    if !name.starts_with(first) || name.len() < first.len() + last.len() || !name.ends_with(last)
    {
        return false;
    }
    let mut rest = &name[first.len()..name.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(at) => rest = &rest[at + part.len()..],
            None => return false,
        }
    }
    true
}

#[async_trait]
impl SearchBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<bool, BackendError> {
        if let Some(kind) = self.record(Operation::Ping) {
            return match fault_error(kind) {
                Some(BackendError::Injected(_)) => Ok(false),
                Some(err) => Err(err),
                None => Ok(true),
            };
        }
        Ok(true)
    }

    async fn get_alias(&self) -> Result<AliasMap, BackendError> {
        if let Some(err) = self.record(Operation::GetAlias).and_then(fault_error) {
            return Err(err);
        }
        let state = self.state();
        let mut aliases: AliasMap = state
            .indices
            .keys()
            .map(|index| (index.clone(), BTreeSet::new()))
            .collect();
        for (index, names) in &state.aliases {
            aliases
                .entry(index.clone())
                .or_default()
                .extend(names.iter().cloned());
        }
        Ok(aliases)
    }

    async fn get_mapping(
        &self,
        indices: &IndexSelector,
        allow_no_indices: bool,
    ) -> Result<IndexMappings, BackendError> {
        if let Some(err) = self.record(Operation::GetMapping).and_then(fault_error) {
            return Err(err);
        }
        let state = self.state();
        let resolved = state.resolve(indices, allow_no_indices)?;
        Ok(state.mappings(&resolved))
    }

    async fn count(
        &self,
        indices: &IndexSelector,
        query: &Value,
        allow_no_indices: bool,
    ) -> Result<u64, BackendError> {
        if let Some(err) = self.record(Operation::Count).and_then(fault_error) {
            return Err(err);
        }
        let state = self.state();
        let resolved = state.resolve(indices, allow_no_indices)?;
        Ok(state.matching(&resolved, query)?.len() as u64)
    }

    fn scan(&self, request: ScanRequest) -> HitStream<'_> {
        scroll_scan(self, request)
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, BackendError> {
        let fault = self.record(Operation::Search);
        if let Some(err) = fault.clone().and_then(fault_error) {
            return Err(err);
        }
        let mut page = self.state().search(request)?;
        if let Some(FaultKind::ShardFailure(reason)) = fault {
            mark_shard_failure(&mut page, reason);
        }
        Ok(page)
    }

    async fn scroll(
        &self,
        scroll_id: &str,
        _keep_alive: &KeepAlive,
    ) -> Result<SearchPage, BackendError> {
        let fault = self.record(Operation::Scroll);
        if let Some(err) = fault.clone().and_then(fault_error) {
            return Err(err);
        }
        let mut page = self.state().scroll(scroll_id)?;
        if let Some(FaultKind::ShardFailure(reason)) = fault {
            mark_shard_failure(&mut page, reason);
        }
        Ok(page)
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), BackendError> {
        if let Some(err) = self.record(Operation::ClearScroll).and_then(fault_error) {
            return Err(err);
        }
        match self.state().scrolls.remove(scroll_id) {
            Some(_) => Ok(()),
            None => Err(BackendError::not_found(format!(
                "No search context found for id [{scroll_id}]"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;
    use model::pagination::sort::SortKey;

    fn notes() -> MemoryBackend {
        MemoryBackend::new()
            .with_documents(
                "notes",
                vec![
                    json!({"id": "3", "title": "Chest pain", "category": "cardio", "tags": ["a", "b"]}),
                    json!({"id": "1", "title": "Headache", "category": "neuro"}),
                    json!({"id": "2", "title": "Chest x-ray", "meta": {"k": 1}}),
                ],
            )
            .with_alias("clinical", "notes")
    }

    fn request(query: Value) -> SearchRequest {
        SearchRequest::builder(IndexSelector::single("notes"), query)
            .size(10)
            .build()
    }

    #[tokio::test]
    async fn evaluates_common_clauses() {
        let backend = notes();
        let cases = [
            (json!({"match_all": {}}), 3),
            (json!({"term": {"category": "cardio"}}), 1),
            (json!({"terms": {"id": ["1", "2"]}}), 2),
            (json!({"match": {"title": "chest"}}), 2),
            (json!({"ids": {"values": ["1"]}}), 1),
            (json!({"exists": {"field": "category"}}), 2),
            (json!({"bool": {"must": [{"match": {"title": "chest"}}], "must_not": [{"term": {"id": "2"}}]}}), 1),
            (json!({"bool": {"should": [{"term": {"id": "1"}}, {"term": {"id": "2"}}]}}), 2),
        ];
        for (query, expected) in cases {
            let page = backend.search(&request(query.clone())).await.unwrap();
            assert_eq!(page.hits.len(), expected, "query {query}");
        }
    }

    #[tokio::test]
    async fn unknown_clause_is_bad_request() {
        let err = notes()
            .search(&request(json!({"fuzzy_thing": {}})))
            .await
            .unwrap_err();
        assert_eq!(err.class(), crate::backend::ErrorClass::BadRequest);
    }

    #[tokio::test]
    async fn missing_index_is_not_found_and_alias_resolves() {
        let backend = notes();
        let missing = SearchRequest::builder(IndexSelector::single("nope"), json!({"match_all": {}}))
            .build();
        let err = backend.search(&missing).await.unwrap_err();
        assert_eq!(err.class(), crate::backend::ErrorClass::NotFound);

        let count = backend
            .count(&IndexSelector::single("clinical"), &json!({"match_all": {}}), false)
            .await
            .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn sorts_and_resumes_after() {
        let backend = notes();
        let sort = SortSpec::new(vec![SortKey::asc("id")]);
        let mut req = request(json!({"match_all": {}}));
        req.sort = Some(sort);
        req.size = 2;

        let first = backend.search(&req).await.unwrap();
        let ids: Vec<_> = first.hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["1", "2"]);
        assert_eq!(first.hits[0].score, None);

        req.search_after = first.hits[1].sort.clone();
        let second = backend.search(&req).await.unwrap();
        assert_eq!(second.hits.len(), 1);
        assert_eq!(second.hits[0].id, "3");
    }

    #[tokio::test]
    async fn scroll_context_lives_until_cleared() {
        let backend = notes();
        let mut req = request(json!({"match_all": {}}));
        req.size = 2;
        req.scroll = Some(KeepAlive::from_mins(10));

        let first = backend.search(&req).await.unwrap();
        let id = first.scroll_id.clone().unwrap();
        let second = backend.scroll(&id, &KeepAlive::from_mins(10)).await.unwrap();
        let third = backend.scroll(&id, &KeepAlive::from_mins(10)).await.unwrap();

        assert_eq!((first.hits.len(), second.hits.len(), third.hits.len()), (2, 1, 0));
        assert_eq!(backend.open_scrolls(), 1);
        backend.clear_scroll(&id).await.unwrap();
        assert_eq!(backend.open_scrolls(), 0);
        assert!(backend.scroll(&id, &KeepAlive::from_mins(10)).await.is_err());
    }

    #[tokio::test]
    async fn projects_fields_as_arrays() {
        let mut req = request(json!({"ids": {"values": ["3"]}}));
        req.fields = Some(vec!["title".into(), "tags".into(), "missing".into()]);
        let page = notes().search(&req).await.unwrap();
        let fields = page.hits[0].fields.clone().unwrap();
        assert_eq!(fields["title"], json!(["Chest pain"]));
        assert_eq!(fields["tags"], json!(["a", "b"]));
        assert!(!fields.contains_key("missing"));
    }

    #[tokio::test]
    async fn injected_faults_fire_on_the_nth_call() {
        let backend = notes();
        backend.inject(Operation::Search, 2, FaultKind::Transport("reset".into()));
        let req = request(json!({"match_all": {}}));

        assert!(backend.search(&req).await.is_ok());
        assert!(matches!(
            backend.search(&req).await,
            Err(BackendError::Injected(_))
        ));
        assert!(backend.search(&req).await.is_ok());
        assert_eq!(backend.calls(Operation::Search), 3);
    }

    #[tokio::test]
    async fn scan_drains_and_clears() {
        let backend = notes();
        let request = ScanRequest {
            indices: IndexSelector::single("notes"),
            query: json!({"match_all": {}}),
            fields: None,
            page_size: 2,
            timeout: std::time::Duration::from_secs(30),
            allow_no_indices: false,
            keep_alive: KeepAlive::from_mins(5),
        };
        let hits: Vec<Hit> = backend.scan(request).try_collect().await.unwrap();

        assert_eq!(hits.len(), 3);
        assert_eq!(backend.calls(Operation::ClearScroll), 1);
        assert_eq!(backend.open_scrolls(), 0);
    }

    #[tokio::test]
    async fn closing_a_scan_early_clears_its_scroll() {
        use futures_util::StreamExt;

        let backend = notes();
        let request = ScanRequest {
            indices: IndexSelector::single("notes"),
            query: json!({"match_all": {}}),
            fields: None,
            page_size: 2,
            timeout: std::time::Duration::from_secs(30),
            allow_no_indices: false,
            keep_alive: KeepAlive::from_mins(5),
        };
        let mut hits = backend.scan(request);
        assert!(!hits.holds_scroll());
        assert!(hits.next().await.unwrap().is_ok());
        assert!(hits.holds_scroll());
        assert_eq!(backend.open_scrolls(), 1);

        assert_eq!(hits.close().await, None);
        assert_eq!(backend.calls(Operation::ClearScroll), 1);
        assert_eq!(backend.open_scrolls(), 0);
    }

    #[tokio::test]
    async fn scan_reports_shard_failure_and_clears() {
        let backend = notes();
        backend.inject(Operation::Scroll, 1, FaultKind::ShardFailure("node left".into()));
        let request = ScanRequest {
            indices: IndexSelector::single("notes"),
            query: json!({"match_all": {}}),
            fields: None,
            page_size: 2,
            timeout: std::time::Duration::from_secs(30),
            allow_no_indices: false,
            keep_alive: KeepAlive::from_mins(5),
        };
        let result: Result<Vec<Hit>, _> = backend.scan(request).try_collect().await;

        assert!(matches!(result, Err(BackendError::Scan { failed: 1, .. })));
        assert_eq!(backend.open_scrolls(), 0);
    }

    #[test]
    fn infers_mappings() {
        let backend = notes();
        let state = backend.state();
        let mappings = state.mappings(&["notes".to_string()]);
        let fields = &mappings["notes"];
        let meta = fields.iter().find(|f| f.name == "meta").unwrap();
        assert_eq!(meta.field_type, None);
        let title = fields.iter().find(|f| f.name == "title").unwrap();
        assert_eq!(title.field_type.as_deref(), Some("keyword"));
    }

    #[test]
    fn glob_patterns() {
        assert!(glob_match("notes-*", "notes-2024"));
        assert!(glob_match("*", "anything"));
        assert!(glob_match("a*c*e", "abcde"));
        assert!(!glob_match("notes-*", "letters"));
    }
}
