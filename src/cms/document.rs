//! Raw CMS payloads
//!
//! These mirror the JSON returned by the query API closely and keep every
//! field optional; the listing and article modules decide which absences are
//! tolerated.

use serde::Deserialize;

use crate::richtext::RichTextNode;

/// A document as returned by the query API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub uid: Option<String>,

    #[serde(default, rename = "type")]
    pub document_type: Option<String>,

    #[serde(default)]
    pub first_publication_date: Option<String>,

    #[serde(default)]
    pub last_publication_date: Option<String>,

    #[serde(default)]
    pub data: DocumentData,
}

/// Custom fields of a `posts` document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentData {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub subtitle: Option<String>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub banner: Option<ImageField>,

    #[serde(default)]
    pub content: Option<Vec<ContentSlice>>,
}

/// Image field; empty images come back as `{}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageField {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub alt: Option<String>,
}

/// One entry of the `content` group field
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentSlice {
    #[serde(default)]
    pub heading: Option<String>,

    #[serde(default)]
    pub body: Vec<RichTextNode>,
}

/// One page of query results
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub page: u32,

    #[serde(default)]
    pub results_per_page: u32,

    #[serde(default)]
    pub total_results_size: u32,

    #[serde(default)]
    pub total_pages: u32,

    /// Cursor to the following page, `None` once exhausted
    #[serde(default)]
    pub next_page: Option<String>,

    #[serde(default)]
    pub prev_page: Option<String>,

    pub results: Vec<Document>,
}
