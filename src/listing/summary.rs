//! Post summaries shown on the listing page

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::cms::Document;
use crate::error::{Error, Result};
use crate::helpers::parse_publication_date;

/// A post as listed on the home page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummary {
    /// Routing key and list-membership key
    pub uid: String,
    pub first_publication_date: Option<DateTime<FixedOffset>>,
    pub title: String,
    /// Empty when the document has no subtitle
    pub subtitle: String,
    pub author: String,
}

impl PostSummary {
    /// Normalize a raw document
    ///
    /// `subtitle` defaults to an empty string; a missing or unroutable `uid`,
    /// a missing `title` or `author`, or an unreadable publication date, is
    /// rejected.
    pub fn from_document(doc: &Document) -> Result<Self> {
        let uid = document_uid(doc)?;
        let first_publication_date = publication_date(doc, &uid)?;
        let title = doc
            .data
            .title
            .clone()
            .ok_or_else(|| Error::malformed(Some(&uid), "title"))?;
        let author = doc
            .data
            .author
            .clone()
            .ok_or_else(|| Error::malformed(Some(&uid), "author"))?;

        Ok(Self {
            first_publication_date,
            title,
            subtitle: doc.data.subtitle.clone().unwrap_or_default(),
            author,
            uid,
        })
    }
}

/// The document uid, which must be usable as a single path segment
pub(crate) fn document_uid(doc: &Document) -> Result<String> {
    match doc.uid.as_deref() {
        Some(uid) if !matches!(uid.trim(), "" | "." | "..") => Ok(uid.to_string()),
        _ => Err(Error::malformed(doc.id.as_deref(), "uid")),
    }
}

/// Parsed `first_publication_date`; `None` for unpublished documents
pub(crate) fn publication_date(doc: &Document, uid: &str) -> Result<Option<DateTime<FixedOffset>>> {
    match doc.first_publication_date.as_deref() {
        None => Ok(None),
        Some(raw) => parse_publication_date(raw)
            .map(Some)
            .ok_or_else(|| Error::malformed(Some(uid), "first_publication_date")),
    }
}
