//! Apache Solr integration for the Armature framework.
//!
//! This crate provides a repository layer over Solr with support for:
//! - Document CRUD through a generic [`CrudRepository`]
//! - Typed query building (terms, ranges, boolean composition)
//! - Named queries loaded from TOML, JSON or `.properties` files
//! - Paged and sorted searches
//! - An operations facade for raw queries and delete-by-query
//! - An in-memory backend for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use armature_solr::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SolrConfig::new("http://localhost:8983/solr").with_collection("collection1");
//!     let client = Arc::new(SolrClient::new(config)?);
//!     let products = ProductRepository::new(client);
//!
//!     products
//!         .save(Product::new("1000", "Sample").with_category("test").with_popularity(10000))
//!         .await?;
//!
//!     let popular = products
//!         .find_by_popularity_greater_than_equal(10000, PageRequest::of(0, 10))
//!         .await?;
//!     println!("{} popular products", popular.total_elements());
//!
//!     let solr = products.find_by_name_or_category("solr", Sort::desc("id")).await?;
//!     println!("{} products about solr", solr.len());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod client;
mod config;
mod document;
mod error;
pub mod logging;
mod memory;
mod named;
mod operations;
mod page;
mod product;
mod query;
mod repository;
mod retry;
mod search;
mod value;

pub use client::SolrClient;
pub use config::{CommitPolicy, SolrConfig};
pub use document::{Document, DocumentMeta, DocumentWithMeta};
pub use error::{Result, SolrError};
pub use memory::InMemorySolr;
pub use named::{FileFormat, NamedQueries, QueryTemplate, TemplateValue};
pub use operations::{DocumentOperations, SolrOperations};
pub use page::{Direction, Order, Page, PageRequest, Sort};
pub use product::{Product, ProductRepository, default_named_queries};
pub use query::{Bound, Query, QueryBuilder, RangeQuery, TermQuery, escape};
pub use repository::{CrudRepository, SolrRepository};
pub use retry::{BackoffStrategy, RetryPolicy};
pub use search::{Hit, ResultSet, SearchQuery, SearchResult, SelectResponse};
pub use value::FieldValue;

/// Prelude for common imports.
///
/// ```
/// use armature_solr::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::SolrClient;
    pub use crate::config::{CommitPolicy, SolrConfig};
    pub use crate::document::Document;
    pub use crate::error::SolrError;
    pub use crate::memory::InMemorySolr;
    pub use crate::named::NamedQueries;
    pub use crate::operations::{DocumentOperations, SolrOperations};
    pub use crate::page::{Page, PageRequest, Sort};
    pub use crate::product::{Product, ProductRepository};
    pub use crate::query::{Query, QueryBuilder, RangeQuery};
    pub use crate::repository::{CrudRepository, SolrRepository};
    pub use crate::search::SearchQuery;
    pub use crate::value::FieldValue;
}
