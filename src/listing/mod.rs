//! Listing aggregator - the home page list of posts
//!
//! The first page is materialized at generation time by [`initialize`]. More
//! pages are appended on demand by following the backend's `next_page`
//! cursor, either through [`Listing::load_more`] or, for the browser, through
//! the `/api/posts` endpoint which calls [`fetch_page`].

mod state;
mod summary;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use url::Url;

use crate::cms::{Cms, Predicate, QueryOptions, QueryResponse};
use crate::config::ListingConfig;
use crate::error::{Error, Result};

pub use state::{ListingState, PaginationCursor, SummaryPage};
pub use summary::PostSummary;
pub(crate) use summary::{document_uid, publication_date};

/// Query the first page of posts
///
/// CMS failures propagate: they decide whether generation of the listing
/// page fails.
pub async fn initialize(
    cms: &dyn Cms,
    document_type: &str,
    config: &ListingConfig,
) -> Result<ListingState> {
    let response = cms
        .query(
            &[Predicate::document_type(document_type)],
            &QueryOptions::new(config.fetch.clone(), config.page_size),
        )
        .await?;
    let page = summary_page(response)?;
    tracing::debug!(
        "Listing initialized with {} posts (more: {})",
        page.posts.len(),
        !page.cursor.is_exhausted()
    );
    Ok(page.into())
}

/// Fetch and normalize the page behind `cursor`
///
/// One malformed document fails the whole page; nothing is partially merged.
pub async fn fetch_page(cms: &dyn Cms, cursor: &str) -> Result<SummaryPage> {
    summary_page(cms.fetch_page(cursor).await?)
}

fn summary_page(response: QueryResponse) -> Result<SummaryPage> {
    let posts = response
        .results
        .iter()
        .map(PostSummary::from_document)
        .collect::<Result<Vec<_>>>()?;
    Ok(SummaryPage {
        posts,
        cursor: PaginationCursor::new(response.next_page),
    })
}

/// Check that a cursor received from a client points at the CMS
///
/// Cursors are followed verbatim, so only URLs on the endpoint's origin are
/// accepted.
pub fn validate_cursor(endpoint: &Url, cursor: &str) -> Result<()> {
    let url = Url::parse(cursor).map_err(|e| Error::invalid_cursor(cursor, e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::invalid_cursor(cursor, "unsupported scheme"));
    }
    if url.origin() != endpoint.origin() {
        return Err(Error::invalid_cursor(cursor, "not on the CMS origin"));
    }
    Ok(())
}

/// Outcome of [`Listing::load_more`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMore {
    /// A page was fetched and this many posts were appended
    Appended(usize),
    /// The cursor is exhausted; nothing was fetched
    Exhausted,
    /// Another load is still running; nothing was fetched
    InFlight,
    /// The fetch failed; the state is unchanged and the load can be retried
    Failed,
}

/// Holder of the current [`ListingState`] for one viewer
///
/// It is the single writer of the state: every successful load swaps in a
/// new immutable value. At most one load runs at a time.
#[derive(Debug, Default)]
pub struct Listing {
    state: RwLock<Arc<ListingState>>,
    loading: AtomicBool,
}

impl Listing {
    pub fn new(state: ListingState) -> Self {
        Self {
            state: RwLock::new(Arc::new(state)),
            loading: AtomicBool::new(false),
        }
    }

    /// The current state
    pub fn snapshot(&self) -> Arc<ListingState> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether the "load more" control should be offered
    pub fn can_load_more(&self) -> bool {
        self.snapshot().can_load_more()
    }

    /// Whether a load is running
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Append the next page
    ///
    /// Failures are logged and otherwise swallowed: the visible list stays as
    /// it was.
    pub async fn load_more(&self, cms: &dyn Cms) -> LoadMore {
        if !self.can_load_more() {
            return LoadMore::Exhausted;
        }
        let Some(_guard) = LoadGuard::acquire(&self.loading) else {
            tracing::debug!("Load more ignored, a request is already in flight");
            return LoadMore::InFlight;
        };

        // re-read under the guard, a load may have finished meanwhile
        let current = self.snapshot();
        let Some(cursor) = current.cursor().next_page().map(str::to_string) else {
            return LoadMore::Exhausted;
        };

        match fetch_page(cms, &cursor).await {
            Ok(page) => {
                let added = page.posts.len();
                let next = Arc::new(current.extended(page));
                *self.state.write().unwrap_or_else(PoisonError::into_inner) = next;
                tracing::debug!("Loaded {} more posts", added);
                LoadMore::Appended(added)
            }
            Err(e) => {
                tracing::warn!("Unexpected error loading more posts: {}", e);
                LoadMore::Failed
            }
        }
    }
}

/// Clears the in-flight flag when dropped
struct LoadGuard<'a>(&'a AtomicBool);

impl<'a> LoadGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::memory::MemoryCms;
    use serde_json::json;

    const PAGE_2: &str = "https://blog.cdn.prismic.io/api/v2/documents/search?page=2";
    const PAGE_3: &str = "https://blog.cdn.prismic.io/api/v2/documents/search?page=3";

    fn post(uid: &str) -> serde_json::Value {
        json!({
            "uid": uid,
            "type": "posts",
            "first_publication_date": "2021-03-15T19:25:28+0000",
            "data": {"title": format!("Post {}", uid), "subtitle": "Sub", "author": "Ana"}
        })
    }

    fn uids(state: &ListingState) -> Vec<String> {
        state.posts().iter().map(|p| p.uid.clone()).collect()
    }

    async fn first_page(cms: &MemoryCms) -> Listing {
        Listing::new(
            initialize(cms, "posts", &ListingConfig::default())
                .await
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_initialize_takes_first_five() {
        let cms = MemoryCms::new()
            .with_documents(json!([
                post("p1"), post("p2"), post("p3"), post("p4"), post("p5"), post("p6")
            ]))
            .with_first_cursor(PAGE_2);

        let state = initialize(&cms, "posts", &ListingConfig::default())
            .await
            .unwrap();

        assert_eq!(uids(&state), ["p1", "p2", "p3", "p4", "p5"]);
        assert_eq!(state.cursor().next_page(), Some(PAGE_2));
        assert!(state.can_load_more());
    }

    #[tokio::test]
    async fn test_initialize_propagates_cms_failure() {
        let cms = MemoryCms::new();
        cms.set_failing(true);
        let err = initialize(&cms, "posts", &ListingConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
    }

    #[tokio::test]
    async fn test_load_more_until_exhausted() {
        let cms = MemoryCms::new()
            .with_documents(json!([post("p1"), post("p2"), post("p3"), post("p4"), post("p5")]))
            .with_first_cursor(PAGE_2)
            .with_page(
                PAGE_2,
                json!({"next_page": null, "results": [post("p6"), post("p7"), post("p8")]}),
            );
        let listing = first_page(&cms).await;
        assert!(listing.can_load_more());

        assert_eq!(listing.load_more(&cms).await, LoadMore::Appended(3));

        let state = listing.snapshot();
        assert_eq!(
            uids(&state),
            ["p1", "p2", "p3", "p4", "p5", "p6", "p7", "p8"]
        );
        assert!(!listing.can_load_more());

        let requests_before = cms.requests().len();
        assert_eq!(listing.load_more(&cms).await, LoadMore::Exhausted);
        assert_eq!(cms.requests().len(), requests_before);
    }

    #[tokio::test]
    async fn test_pages_concatenate_in_fetch_order_without_dedup() {
        let cms = MemoryCms::new()
            .with_documents(json!([post("a"), post("b")]))
            .with_first_cursor(PAGE_2)
            .with_page(PAGE_2, json!({"next_page": PAGE_3, "results": [post("c"), post("b")]}))
            .with_page(PAGE_3, json!({"next_page": null, "results": [post("d")]}));
        let listing = first_page(&cms).await;

        assert_eq!(listing.load_more(&cms).await, LoadMore::Appended(2));
        assert_eq!(listing.load_more(&cms).await, LoadMore::Appended(1));
        assert_eq!(uids(&listing.snapshot()), ["a", "b", "c", "b", "d"]);
        assert_eq!(
            cms.requests(),
            ["query".to_string(), format!("page:{}", PAGE_2), format!("page:{}", PAGE_3)]
        );
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_state_and_allows_retry() {
        let cms = MemoryCms::new()
            .with_documents(json!([post("a")]))
            .with_first_cursor(PAGE_2)
            .with_page(PAGE_2, json!({"next_page": null, "results": [post("b")]}));
        let listing = first_page(&cms).await;
        let before = listing.snapshot();

        cms.set_failing(true);
        assert_eq!(listing.load_more(&cms).await, LoadMore::Failed);
        assert!(Arc::ptr_eq(&before, &listing.snapshot()));
        assert!(listing.can_load_more());
        assert!(!listing.is_loading());

        cms.set_failing(false);
        assert_eq!(listing.load_more(&cms).await, LoadMore::Appended(1));
        assert_eq!(uids(&listing.snapshot()), ["a", "b"]);
    }

    #[tokio::test]
    async fn test_unparsable_page_is_not_merged() {
        let cms = MemoryCms::new()
            .with_documents(json!([post("a")]))
            .with_first_cursor(PAGE_2)
            .with_page(PAGE_2, json!({"next_page": PAGE_3}));
        let listing = first_page(&cms).await;

        assert_eq!(listing.load_more(&cms).await, LoadMore::Failed);
        assert_eq!(uids(&listing.snapshot()), ["a"]);
        assert_eq!(listing.snapshot().cursor().next_page(), Some(PAGE_2));
    }

    #[tokio::test]
    async fn test_malformed_entry_fails_whole_page() {
        let cms = MemoryCms::new()
            .with_documents(json!([post("a")]))
            .with_first_cursor(PAGE_2)
            .with_page(
                PAGE_2,
                json!({"next_page": null, "results": [post("b"), {"uid": "c", "data": {"title": "C"}}]}),
            );
        let listing = first_page(&cms).await;

        assert_eq!(listing.load_more(&cms).await, LoadMore::Failed);
        assert_eq!(uids(&listing.snapshot()), ["a"]);
    }

    #[tokio::test]
    async fn test_concurrent_load_is_rejected() {
        let cms = Arc::new(
            MemoryCms::new()
                .with_documents(json!([post("a")]))
                .with_first_cursor(PAGE_2)
                .with_page(PAGE_2, json!({"next_page": null, "results": [post("b")]})),
        );
        let listing = Arc::new(first_page(&cms).await);
        let gate = cms.gate();

        let first = {
            let (listing, cms) = (listing.clone(), cms.clone());
            tokio::spawn(async move { listing.load_more(cms.as_ref()).await })
        };
        while cms.requests().len() < 2 {
            tokio::task::yield_now().await;
        }
        assert!(listing.is_loading());

        assert_eq!(listing.load_more(cms.as_ref()).await, LoadMore::InFlight);
        assert_eq!(cms.requests().len(), 2);

        gate.notify_one();
        assert_eq!(first.await.unwrap(), LoadMore::Appended(1));
        assert!(!listing.is_loading());
        assert_eq!(uids(&listing.snapshot()), ["a", "b"]);
    }

    #[test]
    fn test_validate_cursor() {
        let endpoint = Url::parse("https://blog.cdn.prismic.io/api/v2").unwrap();
        assert!(validate_cursor(&endpoint, PAGE_2).is_ok());
        assert!(validate_cursor(&endpoint, "https://evil.example/api").is_err());
        assert!(validate_cursor(&endpoint, "file:///etc/passwd").is_err());
        assert!(validate_cursor(&endpoint, "not a url").is_err());
    }
}
