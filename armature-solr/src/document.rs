//! Document trait and helpers.

use crate::query::Query;
use serde::{Serialize, de::DeserializeOwned};

/// Trait for documents that can be stored in a Solr collection.
///
/// # Example
///
/// ```rust
/// use armature_solr::Document;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct Book {
///     id: String,
///     title: String,
/// }
///
/// impl Document for Book {
///     fn id(&self) -> String {
///         self.id.clone()
///     }
///
///     fn collection() -> Option<&'static str> {
///         Some("books")
///     }
/// }
/// ```
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name of the unique key field.
    const ID_FIELD: &'static str = "id";

    /// Unique key of this document.
    fn id(&self) -> String;

    /// Collection (core) holding this type. `None` uses the client default.
    fn collection() -> Option<&'static str> {
        None
    }

    /// Query selecting every document of this type.
    fn type_query() -> Query {
        Query::MatchAll
    }
}

/// Document metadata returned with search results.
#[derive(Debug, Clone, Default)]
pub struct DocumentMeta {
    /// Document ID.
    pub id: String,
    /// Relevance score, when `score` was requested.
    pub score: Option<f64>,
    /// Optimistic concurrency version (`_version_`).
    pub version: Option<i64>,
}

/// A document with its metadata.
#[derive(Debug, Clone)]
pub struct DocumentWithMeta<T> {
    /// The document data.
    pub doc: T,
    /// Document metadata.
    pub meta: DocumentMeta,
}
