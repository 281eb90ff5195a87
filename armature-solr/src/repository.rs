//! Generic document repository.

use crate::{
    document::Document,
    error::Result,
    named::NamedQueries,
    operations::{SolrOperations, restrict_to},
    page::{Page, PageRequest, Sort},
    query::Query,
    search::{SearchQuery, SearchResult},
    value::FieldValue,
};
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// CRUD operations over documents of one type.
#[async_trait]
pub trait CrudRepository<T: Document>: Send + Sync {
    /// Insert or replace a document, returning it.
    async fn save(&self, doc: T) -> Result<T>;

    /// Insert or replace a batch of documents in one request.
    async fn save_all(&self, docs: Vec<T>) -> Result<Vec<T>>;

    /// Find a document by exact id.
    async fn find_one(&self, id: &str) -> Result<Option<T>>;

    /// Check whether a document exists.
    async fn exists(&self, id: &str) -> Result<bool>;

    /// Count documents of this type.
    async fn count(&self) -> Result<u64>;

    /// Page through every document of this type.
    async fn find_all(&self, page: PageRequest) -> Result<Page<T>>;

    /// Delete a document.
    async fn delete(&self, doc: &T) -> Result<()>;

    /// Delete a document by id.
    async fn delete_by_id(&self, id: &str) -> Result<()>;

    /// Delete every document of this type.
    async fn delete_all(&self) -> Result<()>;
}

/// Repository backed by any [`SolrOperations`] implementation.
///
/// Searches are restricted to [`Document::type_query`], so several document
/// types can share a collection.
pub struct SolrRepository<T, O>
where
    T: Document,
    O: SolrOperations,
{
    operations: Arc<O>,
    collection: String,
    named_queries: Arc<NamedQueries>,
    _phantom: PhantomData<T>,
}

impl<T, O> SolrRepository<T, O>
where
    T: Document,
    O: SolrOperations,
{
    /// Create a repository on the document type's collection.
    pub fn new(operations: Arc<O>) -> Self {
        let collection = T::collection()
            .unwrap_or_else(|| operations.default_collection())
            .to_string();
        Self {
            operations,
            collection,
            named_queries: Arc::new(NamedQueries::new()),
            _phantom: PhantomData,
        }
    }

    /// Use a different collection.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Use a named query mapping.
    pub fn with_named_queries(mut self, named_queries: NamedQueries) -> Self {
        self.named_queries = Arc::new(named_queries);
        self
    }

    /// Collection this repository works on.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Named query mapping.
    pub fn named_queries(&self) -> &NamedQueries {
        &self.named_queries
    }

    /// Underlying operations.
    pub fn operations(&self) -> &Arc<O> {
        &self.operations
    }

    /// Run a search and keep hit metadata.
    pub async fn search(&self, search: &SearchQuery) -> Result<SearchResult<T>> {
        let search = restrict_to::<T>(search);
        self.operations
            .select(&self.collection, &search)
            .await?
            .into_result()
    }

    /// Run a query, paginated.
    pub async fn find(&self, query: Query, page: PageRequest) -> Result<Page<T>> {
        debug!(collection = %self.collection, q = %query, page = page.page(), "Finding documents");
        let search = restrict_to::<T>(&SearchQuery::new(query).page(page));
        self.operations
            .select(&self.collection, &search)
            .await?
            .into_page(search.page_request().clone())
    }

    /// Resolve a named query with positional arguments and run it, paginated.
    pub async fn find_named(
        &self,
        name: &str,
        args: &[FieldValue],
        page: PageRequest,
    ) -> Result<Page<T>> {
        let query = self.named_queries.resolve(name, args)?;
        debug!(name, "Resolved named query");
        self.find(query, page).await
    }

    /// Resolve a named query and return up to
    /// [`SearchQuery::DEFAULT_LIST_LIMIT`] sorted documents.
    pub async fn find_named_sorted(
        &self,
        name: &str,
        args: &[FieldValue],
        sort: Sort,
    ) -> Result<Vec<T>> {
        let page = PageRequest::sorted(0, SearchQuery::DEFAULT_LIST_LIMIT, sort);
        Ok(self.find_named(name, args, page).await?.into_content())
    }

    /// Count documents of this type matching a query.
    pub async fn count_matching(&self, query: Query) -> Result<u64> {
        let search = restrict_to::<T>(&SearchQuery::new(query)).count_only();
        let response = self.operations.select(&self.collection, &search).await?;
        Ok(response.response.num_found)
    }

    /// Delete documents of this type matching a query.
    pub async fn delete_by_query(&self, query: Query) -> Result<()> {
        let query = match T::type_query() {
            Query::MatchAll => query,
            type_query => Query::all_of(vec![type_query, query]),
        };
        debug!(collection = %self.collection, q = %query, "Deleting by query");
        self.operations
            .delete_by_query(&self.collection, &query)
            .await
    }
}

impl<T, O> Clone for SolrRepository<T, O>
where
    T: Document,
    O: SolrOperations,
{
    fn clone(&self) -> Self {
        Self {
            operations: self.operations.clone(),
            collection: self.collection.clone(),
            named_queries: self.named_queries.clone(),
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<T, O> CrudRepository<T> for SolrRepository<T, O>
where
    T: Document,
    O: SolrOperations,
{
    async fn save(&self, doc: T) -> Result<T> {
        debug!(collection = %self.collection, id = %doc.id(), "Saving document");
        let value = serde_json::to_value(&doc)?;
        self.operations.add(&self.collection, &[value]).await?;
        Ok(doc)
    }

    async fn save_all(&self, docs: Vec<T>) -> Result<Vec<T>> {
        if docs.is_empty() {
            return Ok(docs);
        }
        debug!(collection = %self.collection, count = docs.len(), "Saving documents");
        let values = docs
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.operations.add(&self.collection, &values).await?;
        Ok(docs)
    }

    async fn find_one(&self, id: &str) -> Result<Option<T>> {
        match self.operations.get_by_id(&self.collection, id).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        Ok(self
            .operations
            .get_by_id(&self.collection, id)
            .await?
            .is_some())
    }

    async fn count(&self) -> Result<u64> {
        self.count_matching(Query::MatchAll).await
    }

    async fn find_all(&self, page: PageRequest) -> Result<Page<T>> {
        self.find(Query::MatchAll, page).await
    }

    async fn delete(&self, doc: &T) -> Result<()> {
        self.delete_by_id(&doc.id()).await
    }

    async fn delete_by_id(&self, id: &str) -> Result<()> {
        debug!(collection = %self.collection, id, "Deleting document");
        self.operations
            .delete_by_ids(&self.collection, &[id.to_string()])
            .await
    }

    async fn delete_all(&self) -> Result<()> {
        self.delete_by_query(Query::MatchAll).await
    }
}
