//! Product documents and their repository.

use crate::{
    document::Document,
    error::Result,
    named::{NamedQueries, QueryTemplate, TemplateValue},
    operations::SolrOperations,
    page::{Page, PageRequest, Sort},
    query::{Query, RangeQuery},
    repository::{CrudRepository, SolrRepository},
};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A product in the Solr example catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique key. Numeric ids from the index are read as their decimal text.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Product name.
    #[serde(default, deserialize_with = "first_of_many")]
    pub name: String,
    /// Categories (`cat`).
    #[serde(rename = "cat", default, deserialize_with = "one_or_many")]
    pub categories: Vec<String>,
    /// Popularity rank.
    #[serde(default)]
    pub popularity: i32,
    /// Price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f32>,
    /// Availability (`inStock`).
    #[serde(rename = "inStock", default, skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
}

impl Product {
    /// Name field.
    pub const NAME_FIELD: &'static str = "name";
    /// Category field.
    pub const CATEGORY_FIELD: &'static str = "cat";
    /// Popularity field.
    pub const POPULARITY_FIELD: &'static str = "popularity";

    /// Named query matching a term against name or category.
    pub const FIND_BY_NAME_OR_CATEGORY: &'static str = "Product.findByNameOrCategory";

    /// Create a product with an id and a name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            categories: Vec::new(),
            popularity: 0,
            price: None,
            available: None,
        }
    }

    /// Add a category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    /// Set the popularity.
    pub fn with_popularity(mut self, popularity: i32) -> Self {
        self.popularity = popularity;
        self
    }

    /// Set the price.
    pub fn with_price(mut self, price: f32) -> Self {
        self.price = Some(price);
        self
    }

    /// Set availability.
    pub fn with_available(mut self, available: bool) -> Self {
        self.available = Some(available);
        self
    }
}

impl Document for Product {
    fn id(&self) -> String {
        self.id.clone()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, found {}",
            other
        ))),
    }
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
        None => Vec::new(),
    })
}

fn first_of_many<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(one_or_many(deserializer)?.into_iter().next().unwrap_or_default())
}

/// Named queries every [`ProductRepository`] starts with.
pub fn default_named_queries() -> NamedQueries {
    let term = |field: &str| QueryTemplate::Term {
        field: field.to_string(),
        value: TemplateValue::Param { param: 0 },
    };
    NamedQueries::new().with(
        Product::FIND_BY_NAME_OR_CATEGORY,
        QueryTemplate::Or {
            clauses: vec![term(Product::NAME_FIELD), term(Product::CATEGORY_FIELD)],
        },
    )
}

/// Repository for [`Product`] documents.
pub struct ProductRepository<O: SolrOperations> {
    inner: SolrRepository<Product, O>,
}

impl<O: SolrOperations> ProductRepository<O> {
    /// Create a repository with the default named queries.
    pub fn new(operations: Arc<O>) -> Self {
        Self {
            inner: SolrRepository::new(operations).with_named_queries(default_named_queries()),
        }
    }

    /// Add named queries, overriding defaults with the same name.
    pub fn with_named_queries(self, named_queries: NamedQueries) -> Self {
        let mut merged = self.inner.named_queries().clone();
        merged.merge(named_queries);
        Self {
            inner: self.inner.with_named_queries(merged),
        }
    }

    /// Use a different collection.
    pub fn with_collection(self, collection: impl Into<String>) -> Self {
        Self {
            inner: self.inner.with_collection(collection),
        }
    }

    /// Generic repository underneath.
    pub fn repository(&self) -> &SolrRepository<Product, O> {
        &self.inner
    }

    /// Products whose name or category matches `term`, sorted.
    pub async fn find_by_name_or_category(
        &self,
        term: &str,
        sort: Sort,
    ) -> Result<Vec<Product>> {
        self.inner
            .find_named_sorted(Product::FIND_BY_NAME_OR_CATEGORY, &[term.into()], sort)
            .await
    }

    /// Products with popularity at or above `threshold`.
    pub async fn find_by_popularity_greater_than_equal(
        &self,
        threshold: i32,
        page: PageRequest,
    ) -> Result<Page<Product>> {
        let query = RangeQuery::new(Product::POPULARITY_FIELD).gte(threshold);
        self.inner.find(query.into(), page).await
    }

    /// Products in a category.
    pub async fn find_by_category(
        &self,
        category: &str,
        page: PageRequest,
    ) -> Result<Page<Product>> {
        self.inner
            .find(Query::term(Product::CATEGORY_FIELD, category), page)
            .await
    }
}

impl<O: SolrOperations> Clone for ProductRepository<O> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

#[async_trait]
impl<O: SolrOperations> CrudRepository<Product> for ProductRepository<O> {
    async fn save(&self, doc: Product) -> Result<Product> {
        self.inner.save(doc).await
    }

    async fn save_all(&self, docs: Vec<Product>) -> Result<Vec<Product>> {
        self.inner.save_all(docs).await
    }

    async fn find_one(&self, id: &str) -> Result<Option<Product>> {
        self.inner.find_one(id).await
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        self.inner.exists(id).await
    }

    async fn count(&self) -> Result<u64> {
        self.inner.count().await
    }

    async fn find_all(&self, page: PageRequest) -> Result<Page<Product>> {
        self.inner.find_all(page).await
    }

    async fn delete(&self, doc: &Product) -> Result<()> {
        self.inner.delete(doc).await
    }

    async fn delete_by_id(&self, id: &str) -> Result<()> {
        self.inner.delete_by_id(id).await
    }

    async fn delete_all(&self) -> Result<()> {
        self.inner.delete_all().await
    }
}
