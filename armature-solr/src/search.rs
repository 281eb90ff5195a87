//! Search requests and results.

use crate::{
    document::{Document, DocumentMeta, DocumentWithMeta},
    error::Result,
    page::{Page, PageRequest, Sort},
    query::Query,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A select request: main query, filters, paging and field list.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    query: Query,
    filters: Vec<Query>,
    page: PageRequest,
    fields: Vec<String>,
    include_score: bool,
    count_only: bool,
}

impl SearchQuery {
    /// Row limit used when a caller asks for a plain list.
    pub const DEFAULT_LIST_LIMIT: u32 = 1000;

    /// Create a search for a query, first page of default size.
    pub fn new(query: Query) -> Self {
        Self {
            query,
            filters: Vec::new(),
            page: PageRequest::default(),
            fields: Vec::new(),
            include_score: false,
            count_only: false,
        }
    }

    /// Search for every document.
    pub fn match_all() -> Self {
        Self::new(Query::MatchAll)
    }

    /// Add a filter query (`fq`).
    pub fn filter(mut self, filter: Query) -> Self {
        self.filters.push(filter);
        self
    }

    /// Set the page to fetch.
    pub fn page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }

    /// Set the sort, keeping the current page and size.
    pub fn sort(mut self, sort: Sort) -> Self {
        self.page = self.page.with_sort(sort);
        self
    }

    /// Restrict returned fields (`fl`).
    pub fn fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    /// Ask Solr to return the relevance score.
    pub fn with_score(mut self) -> Self {
        self.include_score = true;
        self
    }

    /// Only fetch the match count (`rows=0`).
    pub fn count_only(mut self) -> Self {
        self.count_only = true;
        self
    }

    /// Main query.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Filter queries.
    pub fn filters(&self) -> &[Query] {
        &self.filters
    }

    /// Requested page.
    pub fn page_request(&self) -> &PageRequest {
        &self.page
    }

    /// Whether only the match count is wanted.
    pub fn is_count_only(&self) -> bool {
        self.count_only
    }

    /// Requested fields.
    pub fn field_list(&self) -> &[String] {
        &self.fields
    }

    /// Request parameters for the select handler.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("q".to_string(), self.query.to_solr())];

        for filter in &self.filters {
            params.push(("fq".to_string(), filter.to_solr()));
        }

        params.push(("start".to_string(), self.page.offset().to_string()));
        let rows = if self.count_only { 0 } else { self.page.size() };
        params.push(("rows".to_string(), rows.to_string()));

        if let Some(sort) = self.page.sort().to_param() {
            params.push(("sort".to_string(), sort));
        }

        if !self.fields.is_empty() || self.include_score {
            let mut fl = if self.fields.is_empty() {
                vec!["*".to_string()]
            } else {
                self.fields.clone()
            };
            if self.include_score {
                fl.push("score".to_string());
            }
            params.push(("fl".to_string(), fl.join(",")));
        }

        params.push(("wt".to_string(), "json".to_string()));
        params
    }
}

/// Raw select handler response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectResponse {
    /// Result set.
    pub response: ResultSet,
}

/// Result set section of a select response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultSet {
    /// Total matching documents.
    #[serde(rename = "numFound")]
    pub num_found: u64,
    /// Offset of the first returned document.
    #[serde(default)]
    pub start: u64,
    /// Highest score, when scores were requested.
    #[serde(rename = "maxScore", default, skip_serializing_if = "Option::is_none")]
    pub max_score: Option<f64>,
    /// Returned documents.
    #[serde(default)]
    pub docs: Vec<Value>,
}

impl SelectResponse {
    /// Wrap documents in a response.
    pub fn new(num_found: u64, start: u64, docs: Vec<Value>) -> Self {
        Self {
            response: ResultSet {
                num_found,
                start,
                max_score: None,
                docs,
            },
        }
    }

    /// Deserialize documents together with their metadata.
    pub fn into_result<T: Document>(self) -> Result<SearchResult<T>> {
        let ResultSet {
            num_found,
            start,
            max_score,
            docs,
        } = self.response;

        let hits = docs
            .into_iter()
            .map(|doc| {
                let meta = DocumentMeta {
                    id: id_of(&doc, T::ID_FIELD),
                    score: doc.get("score").and_then(Value::as_f64),
                    version: doc.get("_version_").and_then(Value::as_i64),
                };
                let doc: T = serde_json::from_value(doc)?;
                Ok(DocumentWithMeta { doc, meta })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SearchResult {
            total: num_found,
            start,
            max_score,
            hits,
        })
    }

    /// Deserialize documents into a page.
    pub fn into_page<T: Document>(self, request: PageRequest) -> Result<Page<T>> {
        let result = self.into_result::<T>()?;
        let total = result.total;
        Ok(Page::new(result.into_docs(), total, request))
    }
}

fn id_of(doc: &Value, field: &str) -> String {
    match doc.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Typed search result.
#[derive(Debug, Clone)]
pub struct SearchResult<T> {
    /// Total matching documents.
    pub total: u64,
    /// Offset of the first hit.
    pub start: u64,
    /// Maximum score.
    pub max_score: Option<f64>,
    /// Matching documents with metadata.
    pub hits: Vec<Hit<T>>,
}

impl<T> SearchResult<T> {
    /// Drop metadata, keeping the documents.
    pub fn into_docs(self) -> Vec<T> {
        self.hits.into_iter().map(|h| h.doc).collect()
    }
}

/// A search hit.
pub type Hit<T> = DocumentWithMeta<T>;
