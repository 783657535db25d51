//! Access to the headless CMS
//!
//! [`Cms`] is the seam between page generation and the content backend. The
//! production implementation is [`PrismicClient`]; tests use an in-memory
//! store.

mod document;
#[cfg(test)]
pub(crate) mod memory;
mod predicate;
mod prismic;

use async_trait::async_trait;

use crate::error::Result;

pub use document::{ContentSlice, Document, DocumentData, ImageField, QueryResponse};
pub use predicate::{query_string, Predicate};
pub use prismic::PrismicClient;

/// Field projection and page size of a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// Fields to return, e.g. `posts.title`; empty returns every field
    pub fetch: Vec<String>,
    pub page_size: usize,
}

impl QueryOptions {
    pub fn new(fetch: Vec<String>, page_size: usize) -> Self {
        Self { fetch, page_size }
    }
}

/// Content backend operations used by the site
#[async_trait]
pub trait Cms: Send + Sync {
    /// Run a query and return its first page
    async fn query(&self, predicates: &[Predicate], options: &QueryOptions)
        -> Result<QueryResponse>;

    /// Look a document up by UID; `None` when no such document exists
    async fn get_by_uid(&self, document_type: &str, uid: &str) -> Result<Option<Document>>;

    /// Fetch the page behind an opaque `next_page` cursor
    ///
    /// The cursor is requested exactly as the backend returned it.
    async fn fetch_page(&self, url: &str) -> Result<QueryResponse>;
}
