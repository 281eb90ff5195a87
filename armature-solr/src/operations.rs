//! Operations facade: the seam between repositories and a Solr backend.

use crate::{
    document::Document,
    error::Result,
    page::Page,
    query::Query,
    search::{SearchQuery, SearchResult, SelectResponse},
};
use async_trait::async_trait;
use serde_json::Value;

/// Low-level operations against a Solr backend, on JSON documents.
///
/// Implemented by [`SolrClient`](crate::SolrClient) over HTTP and by
/// [`InMemorySolr`](crate::InMemorySolr) for tests.
#[async_trait]
pub trait SolrOperations: Send + Sync {
    /// Collection used when a document type does not name one.
    fn default_collection(&self) -> &str;

    /// Add or replace documents by unique key.
    async fn add(&self, collection: &str, docs: &[Value]) -> Result<()>;

    /// Real-time get of a single document.
    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Run a select request.
    async fn select(&self, collection: &str, query: &SearchQuery) -> Result<SelectResponse>;

    /// Delete documents by unique key.
    async fn delete_by_ids(&self, collection: &str, ids: &[String]) -> Result<()>;

    /// Delete every document matching a query.
    async fn delete_by_query(&self, collection: &str, query: &Query) -> Result<()>;

    /// Make pending writes visible.
    async fn commit(&self, collection: &str) -> Result<()>;

    /// Check that the collection answers.
    async fn ping(&self, collection: &str) -> Result<bool>;
}

/// Typed helpers over [`SolrOperations`] for any [`Document`] type.
#[async_trait]
pub trait DocumentOperations: SolrOperations {
    /// Collection holding `T`.
    fn collection_for<T: Document>(&self) -> String {
        T::collection()
            .unwrap_or_else(|| self.default_collection())
            .to_string()
    }

    /// Add or replace a single document.
    async fn save_bean<T: Document>(&self, doc: &T) -> Result<()> {
        let value = serde_json::to_value(doc)?;
        self.add(&self.collection_for::<T>(), &[value]).await
    }

    /// Add or replace a batch of documents in one request.
    async fn save_beans<T: Document>(&self, docs: &[T]) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }
        let values = docs
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.add(&self.collection_for::<T>(), &values).await
    }

    /// Fetch a document by id.
    async fn get_bean<T: Document>(&self, id: &str) -> Result<Option<T>> {
        match self.get_by_id(&self.collection_for::<T>(), id).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Run a search restricted to `T` and return hits with metadata.
    async fn query_for_result<T: Document>(&self, query: &SearchQuery) -> Result<SearchResult<T>> {
        let query = restrict_to::<T>(query);
        let response = self.select(&self.collection_for::<T>(), &query).await?;
        response.into_result()
    }

    /// Run a search restricted to `T` and return a page.
    async fn query_for_page<T: Document>(&self, query: &SearchQuery) -> Result<Page<T>> {
        let query = restrict_to::<T>(query);
        let response = self.select(&self.collection_for::<T>(), &query).await?;
        response.into_page(query.page_request().clone())
    }

    /// Run a search restricted to `T` and return only the documents.
    async fn query_for_list<T: Document>(&self, query: &SearchQuery) -> Result<Vec<T>> {
        Ok(self.query_for_page::<T>(query).await?.into_content())
    }

    /// Count documents of `T` matching a query.
    async fn count<T: Document>(&self, query: &Query) -> Result<u64> {
        let search = restrict_to::<T>(&SearchQuery::new(query.clone())).count_only();
        let response = self.select(&self.collection_for::<T>(), &search).await?;
        Ok(response.response.num_found)
    }

    /// Delete documents of `T` matching a query.
    async fn delete_matching<T: Document>(&self, query: &Query) -> Result<()> {
        let query = match T::type_query() {
            Query::MatchAll => query.clone(),
            type_query => Query::all_of(vec![type_query, query.clone()]),
        };
        self.delete_by_query(&self.collection_for::<T>(), &query).await
    }
}

impl<O: SolrOperations> DocumentOperations for O {}

pub(crate) fn restrict_to<T: Document>(query: &SearchQuery) -> SearchQuery {
    match T::type_query() {
        Query::MatchAll => query.clone(),
        type_query if query.filters().contains(&type_query) => query.clone(),
        type_query => query.clone().filter(type_query),
    }
}
