//! Error types shared by the CMS client, the aggregators and the generator.

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the library.
///
/// A document that does not exist is not an error: lookups return `Option`
/// and page generation returns [`crate::cache::PageBody::NotFound`].
#[derive(Error, Debug)]
pub enum Error {
    /// Network failure or non-success status while talking to the CMS.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Response body did not have the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A required document field is absent.
    #[error("Document {uid:?} is missing required field `{field}`")]
    MalformedField { uid: Option<String>, field: &'static str },

    /// Pagination cursor that cannot be followed.
    #[error("Invalid cursor {cursor:?}: {reason}")]
    InvalidCursor { cursor: String, reason: String },

    /// A page generation task died before producing a result.
    #[error("Generation error: {0}")]
    Generation(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    /// File system I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a missing-field error for a document.
    pub fn malformed(uid: Option<&str>, field: &'static str) -> Self {
        Self::MalformedField {
            uid: uid.map(str::to_string),
            field,
        }
    }

    /// Create an invalid-cursor error.
    pub fn invalid_cursor(cursor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCursor {
            cursor: cursor.into(),
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Fetch(err.to_string())
        }
    }
}
