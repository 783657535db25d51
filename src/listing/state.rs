//! Listing state values

use serde::Serialize;

use super::PostSummary;

/// Opaque pointer to the next page of results
///
/// Absent (or empty) once the listing is exhausted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaginationCursor(Option<String>);

impl PaginationCursor {
    pub fn new(next_page: Option<String>) -> Self {
        Self(next_page.filter(|url| !url.is_empty()))
    }

    pub fn exhausted() -> Self {
        Self(None)
    }

    /// URL of the next page, exactly as the backend returned it
    pub fn next_page(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_exhausted(&self) -> bool {
        self.0.is_none()
    }
}

/// One fetched page of summaries with the cursor that followed it
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryPage {
    pub posts: Vec<PostSummary>,
    pub cursor: PaginationCursor,
}

/// The summaries loaded so far, in backend order, and the current cursor
///
/// A value type: loading more produces a new state through [`extended`],
/// existing entries are never reordered, deduplicated or removed.
///
/// [`extended`]: ListingState::extended
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingState {
    posts: Vec<PostSummary>,
    cursor: PaginationCursor,
}

impl ListingState {
    pub fn new(posts: Vec<PostSummary>, cursor: PaginationCursor) -> Self {
        Self { posts, cursor }
    }

    pub fn posts(&self) -> &[PostSummary] {
        &self.posts
    }

    pub fn cursor(&self) -> &PaginationCursor {
        &self.cursor
    }

    /// Whether the "load more" control should be offered
    pub fn can_load_more(&self) -> bool {
        !self.cursor.is_exhausted()
    }

    /// This state with `page` appended and its cursor taking over
    pub fn extended(&self, page: SummaryPage) -> Self {
        let mut posts = Vec::with_capacity(self.posts.len() + page.posts.len());
        posts.extend_from_slice(&self.posts);
        posts.extend(page.posts);
        Self {
            posts,
            cursor: page.cursor,
        }
    }
}

impl From<SummaryPage> for ListingState {
    fn from(page: SummaryPage) -> Self {
        Self::new(page.posts, page.cursor)
    }
}
