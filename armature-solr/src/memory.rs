//! In-memory Solr backend for tests and local development.

use crate::{
    error::{Result, SolrError},
    operations::SolrOperations,
    page::{Direction, Order},
    query::{Bound, Query, RangeQuery},
    search::{SearchQuery, SelectResponse},
    value::FieldValue,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};

type Collection = BTreeMap<String, Map<String, Value>>;

/// In-memory implementation of [`SolrOperations`].
///
/// Writes are visible immediately. Typed queries are evaluated directly.
/// Raw query strings are limited to `*:*` and a single `field:value` term;
/// wildcards, boosts, fuzzy terms, phrases and ranges in raw text are
/// rejected with [`SolrError::Query`].
/// String terms match case-insensitively against whole values or their
/// words, approximating a tokenized text field.
#[derive(Clone)]
pub struct InMemorySolr {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
    default_collection: String,
    unique_key: String,
    version: Arc<AtomicI64>,
}

impl InMemorySolr {
    /// Create an empty store with the default collection name.
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            default_collection: crate::SolrConfig::DEFAULT_COLLECTION.to_string(),
            unique_key: "id".to_string(),
            version: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Set the default collection.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.default_collection = collection.into();
        self
    }

    /// Set the unique key field.
    pub fn with_unique_key(mut self, field: impl Into<String>) -> Self {
        self.unique_key = field.into();
        self
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    /// Check if a collection holds no documents.
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Remove every document from every collection.
    pub fn clear(&self) {
        self.collections.write().clear();
    }

    fn key_of(&self, doc: &Map<String, Value>) -> Result<String> {
        match doc.get(&self.unique_key) {
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            _ => Err(SolrError::Solr {
                status: 400,
                message: format!("Document is missing mandatory uniqueKey field: {}", self.unique_key),
            }),
        }
    }
}

impl Default for InMemorySolr {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SolrOperations for InMemorySolr {
    fn default_collection(&self) -> &str {
        &self.default_collection
    }

    async fn add(&self, collection: &str, docs: &[Value]) -> Result<()> {
        let mut prepared = Vec::with_capacity(docs.len());
        for doc in docs {
            let Value::Object(fields) = doc else {
                return Err(SolrError::Solr {
                    status: 400,
                    message: "Document must be a JSON object".to_string(),
                });
            };
            let mut fields = fields.clone();
            let key = self.key_of(&fields)?;
            let version = self.version.fetch_add(1, AtomicOrdering::SeqCst) + 1;
            fields.insert("_version_".to_string(), Value::from(version));
            prepared.push((key, fields));
        }

        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();
        docs.extend(prepared);
        Ok(())
    }

    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|doc| Value::Object(doc.clone())))
    }

    async fn select(&self, collection: &str, query: &SearchQuery) -> Result<SelectResponse> {
        let mut matched = Vec::new();
        {
            let collections = self.collections.read();
            if let Some(docs) = collections.get(collection) {
                for doc in docs.values() {
                    if matches(doc, query.query())? && matches_all(doc, query.filters())? {
                        matched.push(doc.clone());
                    }
                }
            }
        }

        let orders = query.page_request().sort().orders();
        if !orders.is_empty() {
            matched.sort_by(|a, b| compare_docs(a, b, orders));
        }

        let total = matched.len() as u64;
        let start = query.page_request().offset();
        let rows = if query.is_count_only() {
            0
        } else {
            query.page_request().size() as usize
        };
        let fields = query.field_list();

        let docs = matched
            .into_iter()
            .skip(start as usize)
            .take(rows)
            .map(|doc| Value::Object(project(doc, fields)))
            .collect();

        Ok(SelectResponse::new(total, start, docs))
    }

    async fn delete_by_ids(&self, collection: &str, ids: &[String]) -> Result<()> {
        let mut collections = self.collections.write();
        if let Some(docs) = collections.get_mut(collection) {
            for id in ids {
                docs.remove(id);
            }
        }
        Ok(())
    }

    async fn delete_by_query(&self, collection: &str, query: &Query) -> Result<()> {
        let mut collections = self.collections.write();
        if let Some(docs) = collections.get_mut(collection) {
            let mut doomed = Vec::new();
            for (id, doc) in docs.iter() {
                if matches(doc, query)? {
                    doomed.push(id.clone());
                }
            }
            for id in doomed {
                docs.remove(&id);
            }
        }
        Ok(())
    }

    async fn commit(&self, _collection: &str) -> Result<()> {
        Ok(())
    }

    async fn ping(&self, _collection: &str) -> Result<bool> {
        Ok(true)
    }
}

fn matches_all(doc: &Map<String, Value>, queries: &[Query]) -> Result<bool> {
    for query in queries {
        if !matches(doc, query)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn matches(doc: &Map<String, Value>, query: &Query) -> Result<bool> {
    Ok(match query {
        Query::MatchAll => true,
        Query::Term(term) => term_matches(doc, &term.field, &term.value, term.is_wildcard()),
        Query::Range(range) => range_matches(doc, range),
        Query::Or(clauses) => {
            for clause in clauses {
                if matches(doc, clause)? {
                    return Ok(true);
                }
            }
            false
        }
        Query::And(clauses) => matches_all(doc, clauses)?,
        Query::Not(inner) => !matches(doc, inner)?,
        Query::Raw(raw) => raw_matches(doc, raw)?,
    })
}

fn raw_matches(doc: &Map<String, Value>, raw: &str) -> Result<bool> {
    let raw = raw.trim();
    if raw == "*:*" {
        return Ok(true);
    }

    let unsupported = || SolrError::Query(format!("Unsupported raw query for in-memory store: {}", raw));
    let (field, value) = split_term(raw).ok_or_else(unsupported)?;
    let is_field = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if !is_field || value.is_empty() {
        return Err(unsupported());
    }

    Ok(term_matches(doc, field, &FieldValue::Str(unescape(value)), value == "*"))
}

/// Query syntax the in-memory matcher does not evaluate.
const QUERY_SYNTAX: &[char] = &['*', '?', '^', '~', '[', ']', '{', '}', '(', ')', '"'];

// Splits on the first colon. Values holding unescaped whitespace or query
// syntax are rejected; a lone `*` is an existence check.
fn split_term(raw: &str) -> Option<(&str, &str)> {
    let (field, value) = raw.split_once(':')?;
    if value == "*" {
        return Some((field, value));
    }
    let mut escaped = false;
    for c in value.chars() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c.is_whitespace() || QUERY_SYNTAX.contains(&c) {
            return None;
        }
    }
    Some((field, value))
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn field_values<'a>(doc: &'a Map<String, Value>, field: &str) -> Vec<&'a Value> {
    match doc.get(field) {
        Some(Value::Array(values)) => values.iter().collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(value) => vec![value],
    }
}

fn term_matches(
    doc: &Map<String, Value>,
    field: &str,
    expected: &FieldValue,
    wildcard: bool,
) -> bool {
    let values = field_values(doc, field);
    if wildcard {
        return !values.is_empty();
    }
    values.into_iter().any(|v| value_matches(v, expected))
}

fn value_matches(value: &Value, expected: &FieldValue) -> bool {
    match (value, expected) {
        (Value::String(s), FieldValue::Str(e)) => {
            s.eq_ignore_ascii_case(e)
                || s.split(|c: char| !c.is_alphanumeric())
                    .any(|word| word.eq_ignore_ascii_case(e))
        }
        (Value::String(s), other) => *s == other.to_string(),
        (Value::Number(n), other) => match (n.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        (Value::Bool(b), FieldValue::Bool(e)) => b == e,
        (Value::Bool(b), FieldValue::Str(s)) => s.parse::<bool>().is_ok_and(|e| *b == e),
        _ => false,
    }
}

fn range_matches(doc: &Map<String, Value>, range: &RangeQuery) -> bool {
    field_values(doc, &range.field).into_iter().any(|v| {
        within(v, range.lower.as_ref(), Ordering::Greater)
            && within(v, range.upper.as_ref(), Ordering::Less)
    })
}

fn within(value: &Value, bound: Option<&Bound>, side: Ordering) -> bool {
    let Some(bound) = bound else {
        return true;
    };
    match compare_to(value, &bound.value) {
        Some(Ordering::Equal) => bound.inclusive,
        Some(ord) => ord == side,
        None => false,
    }
}

fn compare_to(value: &Value, bound: &FieldValue) -> Option<Ordering> {
    match value {
        Value::Number(n) => n.as_f64()?.partial_cmp(&bound.as_f64()?),
        Value::String(s) => Some(s.as_str().cmp(bound.to_string().as_str())),
        _ => None,
    }
}

fn compare_docs(a: &Map<String, Value>, b: &Map<String, Value>, orders: &[Order]) -> Ordering {
    for order in orders {
        let left = field_values(a, &order.field).into_iter().next();
        let right = field_values(b, &order.field).into_iter().next();
        let ord = match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => return Ordering::Greater,
            (Some(_), None) => return Ordering::Less,
            (Some(l), Some(r)) => {
                let ord = compare_values(l, r);
                match order.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(l), Value::Number(r)) => l
            .as_f64()
            .partial_cmp(&r.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(l), Value::String(r)) => l.cmp(r),
        (Value::Bool(l), Value::Bool(r)) => l.cmp(r),
        (l, r) => l.to_string().cmp(&r.to_string()),
    }
}

fn project(doc: Map<String, Value>, fields: &[String]) -> Map<String, Value> {
    if fields.is_empty() || fields.iter().any(|f| f == "*") {
        return doc;
    }
    doc.into_iter()
        .filter(|(name, _)| fields.iter().any(|f| f == name))
        .collect()
}
