//! Page cache for on-demand generation and regeneration
//!
//! Each route moves through
//! `NOT_GENERATED -> GENERATING -> READY -> STALE -> REGENERATING -> READY`.
//! A page stays fresh for its regeneration window; the first access after
//! that serves the stale page and regenerates it in the background. At most
//! one generation runs per route.

mod manifest;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{Error, Result};

pub use manifest::{seed_cache, Manifest, ManifestEntry};

/// Generated output of a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageBody {
    Html(String),
    /// The route resolves to no document
    NotFound,
}

/// A page together with the time it was produced
#[derive(Debug)]
pub struct GeneratedPage {
    pub body: PageBody,
    pub generated_at: Instant,
}

/// Lifecycle state of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    NotGenerated,
    Generating,
    Ready,
    Stale,
    Regenerating,
}

/// What to serve for a route that has never been generated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Serve a placeholder and generate in the background
    Placeholder,
    /// Generate before answering; failures reach the caller
    Blocking,
}

/// Result of [`PageCache::serve`]
#[derive(Debug, Clone)]
pub enum Served {
    Fresh(Arc<GeneratedPage>),
    /// Past its window; a regeneration is running
    Stale(Arc<GeneratedPage>),
    /// First generation still running
    Placeholder,
}

/// Result of a first generation, shared with the requests waiting on it
type Outcome = Option<std::result::Result<Arc<GeneratedPage>, String>>;

/// Routes kept before idle entries are evicted
const DEFAULT_CAPACITY: usize = 4096;

#[derive(Debug, Default)]
struct Entry {
    page: Option<Arc<GeneratedPage>>,
    /// A generation or regeneration is in flight
    busy: bool,
    /// Completion of the first generation
    pending: Option<watch::Receiver<Outcome>>,
}

impl Entry {
    fn idle(page: Arc<GeneratedPage>) -> Self {
        Self {
            page: Some(page),
            busy: false,
            pending: None,
        }
    }
}

enum Action {
    Serve(Served),
    Wait(watch::Receiver<Outcome>),
    Generate(watch::Sender<Outcome>),
    Regenerate(Arc<GeneratedPage>),
}

/// Generated pages keyed by route
///
/// Holds at most `capacity` routes; past that, not-found pages and then the
/// oldest idle pages are dropped to make room.
#[derive(Debug)]
pub struct PageCache {
    entries: Mutex<HashMap<String, Entry>>,
    capacity: usize,
}

impl Default for PageCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Number of routes held
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Store a page generated just now
    pub fn insert(&self, route: &str, body: PageBody) {
        self.seed(route, body, Instant::now());
    }

    /// Store a page generated at `generated_at`, e.g. by a previous build
    pub fn seed(&self, route: &str, body: PageBody, generated_at: Instant) {
        self.lock().insert(
            route.to_string(),
            Entry::idle(Arc::new(GeneratedPage { body, generated_at })),
        );
    }

    /// Current state of `route` for a regeneration `window`
    pub fn state(&self, route: &str, window: Duration) -> PageState {
        match self.lock().get(route) {
            None => PageState::NotGenerated,
            Some(Entry { page: None, .. }) => PageState::Generating,
            Some(Entry {
                page: Some(page),
                busy,
                ..
            }) => {
                if page.generated_at.elapsed() < window {
                    PageState::Ready
                } else if *busy {
                    PageState::Regenerating
                } else {
                    PageState::Stale
                }
            }
        }
    }

    /// Serve `route`, generating or regenerating it as needed
    ///
    /// `generate` is only called when a generation actually starts. Under
    /// [`Fallback::Blocking`] every request that finds the first generation
    /// running waits for it, and its failure is returned; background
    /// failures are logged.
    pub async fn serve<F, Fut>(
        self: &Arc<Self>,
        route: &str,
        window: Duration,
        fallback: Fallback,
        generate: F,
    ) -> Result<Served>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<PageBody>> + Send + 'static,
    {
        let action = {
            let mut entries = self.lock();
            match entries.get_mut(route) {
                None => {
                    evict(&mut entries, self.capacity);
                    let (done, pending) = watch::channel(None);
                    entries.insert(
                        route.to_string(),
                        Entry {
                            page: None,
                            busy: true,
                            pending: Some(pending),
                        },
                    );
                    Action::Generate(done)
                }
                Some(entry) => match entry.page.clone() {
                    None => match (fallback, &entry.pending) {
                        (Fallback::Blocking, Some(pending)) => Action::Wait(pending.clone()),
                        _ => Action::Serve(Served::Placeholder),
                    },
                    Some(page) if page.generated_at.elapsed() < window => {
                        Action::Serve(Served::Fresh(page))
                    }
                    Some(page) if entry.busy => Action::Serve(Served::Stale(page)),
                    Some(page) => {
                        entry.busy = true;
                        Action::Regenerate(page)
                    }
                },
            }
        };

        match action {
            Action::Serve(served) => Ok(served),
            Action::Wait(pending) => {
                tracing::debug!("Waiting for the generation of {}", route);
                wait_for_generation(pending).await.map(Served::Fresh)
            }
            Action::Generate(done) => {
                tracing::debug!("Generating {} on demand", route);
                let task = self.spawn_generation(route, generate(), Some(done));
                match fallback {
                    Fallback::Placeholder => Ok(Served::Placeholder),
                    Fallback::Blocking => {
                        let page = task
                            .await
                            .map_err(|e| Error::Generation(e.to_string()))??;
                        Ok(Served::Fresh(page))
                    }
                }
            }
            Action::Regenerate(stale) => {
                tracing::debug!("Regenerating stale {}", route);
                self.spawn_generation(route, generate(), None);
                Ok(Served::Stale(stale))
            }
        }
    }

    /// Run a generation to completion even if the requester goes away
    ///
    /// A panicking generation counts as a failed one.
    fn spawn_generation<Fut>(
        self: &Arc<Self>,
        route: &str,
        generation: Fut,
        done: Option<watch::Sender<Outcome>>,
    ) -> tokio::task::JoinHandle<Result<Arc<GeneratedPage>>>
    where
        Fut: Future<Output = Result<PageBody>> + Send + 'static,
    {
        let cache = Arc::clone(self);
        let route = route.to_string();
        tokio::spawn(async move {
            let result = match tokio::spawn(generation).await {
                Ok(result) => result,
                Err(e) => Err(Error::Generation(e.to_string())),
            };
            let result = cache.complete(&route, result);
            if let Some(done) = done {
                done.send_replace(Some(
                    result.as_ref().map(Arc::clone).map_err(|e| e.to_string()),
                ));
            }
            result
        })
    }

    fn complete(&self, route: &str, result: Result<PageBody>) -> Result<Arc<GeneratedPage>> {
        let mut entries = self.lock();
        match result {
            Ok(body) => {
                let page = Arc::new(GeneratedPage {
                    body,
                    generated_at: Instant::now(),
                });
                entries.insert(route.to_string(), Entry::idle(page.clone()));
                tracing::info!("Generated {}", route);
                Ok(page)
            }
            Err(e) => {
                match entries.get_mut(route) {
                    Some(entry) if entry.page.is_some() => {
                        entry.busy = false;
                        tracing::warn!("Regeneration of {} failed, keeping stale page: {}", route, e);
                    }
                    _ => {
                        entries.remove(route);
                        tracing::error!("Generation of {} failed: {}", route, e);
                    }
                }
                Err(e)
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn wait_for_generation(mut pending: watch::Receiver<Outcome>) -> Result<Arc<GeneratedPage>> {
    let outcome = pending
        .wait_for(Option::is_some)
        .await
        .map_err(|_| Error::Generation("generation ended without a result".to_string()))?;
    match &*outcome {
        Some(Ok(page)) => Ok(page.clone()),
        Some(Err(message)) => Err(Error::Generation(message.clone())),
        None => Err(Error::Generation("generation ended without a result".to_string())),
    }
}

/// Make room for one more route
fn evict(entries: &mut HashMap<String, Entry>, capacity: usize) {
    if entries.len() < capacity {
        return;
    }

    entries.retain(|_, entry| {
        entry.busy
            || !matches!(
                entry.page.as_deref(),
                Some(GeneratedPage {
                    body: PageBody::NotFound,
                    ..
                })
            )
    });

    while entries.len() >= capacity {
        let oldest = entries
            .iter()
            .filter(|(_, entry)| !entry.busy)
            .filter_map(|(route, entry)| entry.page.as_ref().map(|p| (route, p.generated_at)))
            .min_by_key(|(_, generated_at)| *generated_at)
            .map(|(route, _)| route.clone());
        match oldest {
            Some(route) => {
                tracing::debug!("Evicting {}", route);
                entries.remove(&route);
            }
            None => break,
        }
    }
}
