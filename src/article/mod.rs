//! Article renderer - single post content and reading time

mod read_time;

use chrono::{DateTime, FixedOffset};

use crate::cms::{Cms, Document};
use crate::error::{Error, Result};
use crate::listing::{document_uid, publication_date};
use crate::richtext::{self, RichTextNode};

pub use read_time::{compute_read_time, read_time_for_words, word_count};

/// A post normalized for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleContent {
    pub uid: String,
    pub first_publication_date: Option<DateTime<FixedOffset>>,
    pub title: String,
    pub banner_url: String,
    pub author: String,
    /// Sections in source order
    pub content: Vec<ContentBlock>,
}

/// One section of an article
#[derive(Debug, Clone, PartialEq)]
pub struct ContentBlock {
    pub heading: String,
    pub body: Vec<RichTextNode>,
}

impl ArticleContent {
    /// Normalize a raw document
    ///
    /// `title`, `author` and `banner.url` are required. A missing `content`
    /// group reads as no sections and a missing heading as an empty one;
    /// bodies are carried over untouched.
    pub fn from_document(doc: &Document) -> Result<Self> {
        let uid = document_uid(doc)?;
        let data = &doc.data;

        let title = data
            .title
            .clone()
            .ok_or_else(|| Error::malformed(Some(&uid), "title"))?;
        let author = data
            .author
            .clone()
            .ok_or_else(|| Error::malformed(Some(&uid), "author"))?;
        let banner_url = data
            .banner
            .as_ref()
            .and_then(|banner| banner.url.clone())
            .ok_or_else(|| Error::malformed(Some(&uid), "banner.url"))?;

        let content = data
            .content
            .iter()
            .flatten()
            .map(|slice| ContentBlock {
                heading: slice.heading.clone().unwrap_or_default(),
                body: slice.body.clone(),
            })
            .collect();

        Ok(Self {
            first_publication_date: publication_date(doc, &uid)?,
            uid,
            title,
            banner_url,
            author,
            content,
        })
    }
}

/// Fetch and normalize the article `uid`
///
/// `Ok(None)` means there is no such article, including for an empty uid.
pub async fn fetch_article(
    cms: &dyn Cms,
    document_type: &str,
    uid: &str,
) -> Result<Option<ArticleContent>> {
    if uid.trim().is_empty() {
        return Ok(None);
    }

    match cms.get_by_uid(document_type, uid).await? {
        Some(doc) => ArticleContent::from_document(&doc).map(Some),
        None => {
            tracing::debug!("No {} document with uid {:?}", document_type, uid);
            Ok(None)
        }
    }
}

/// HTML of a block body, inserted into the page as-is
pub fn render_block_html(body: &[RichTextNode]) -> String {
    richtext::as_html(body)
}
