//! Site server with on-demand generation
//!
//! The listing and article routes go through the [`PageCache`]; everything
//! else is served from the public directory.

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::cache::{seed_cache, Fallback, Manifest, PageBody, PageCache, Served};
use crate::error::Error;
use crate::generator::{Generator, LISTING_ROUTE};
use crate::helpers::post_path;
use crate::Blog;

/// Shared server state
pub struct AppState {
    pub generator: Arc<Generator>,
    pub cache: Arc<PageCache>,
    pub public_dir: PathBuf,
}

impl AppState {
    pub fn new(generator: Generator, public_dir: PathBuf) -> Self {
        Self {
            generator: Arc::new(generator),
            cache: Arc::new(PageCache::new()),
            public_dir,
        }
    }

    fn listing_window(&self) -> Duration {
        Duration::from_secs(self.generator.config().listing.revalidate_secs)
    }

    fn article_window(&self) -> Duration {
        Duration::from_secs(self.generator.config().article.revalidate_secs)
    }
}

/// Build the router for `state`
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(listing_handler))
        .route("/post/:uid", get(article_handler))
        .route("/api/posts", get(posts_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server, reusing the pages of a previous `generate`
pub async fn start(blog: &Blog, ip: &str, port: u16) -> Result<()> {
    let state = Arc::new(AppState::new(blog.generator()?, blog.public_dir.clone()));

    let manifest = Manifest::load(&blog.base_dir);
    seed_cache(&state.cache, &manifest, &blog.public_dir);

    let app = create_router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn listing_handler(State(state): State<Arc<AppState>>) -> Response {
    let window = state.listing_window();
    let generator = state.generator.clone();
    let served = state
        .cache
        .serve(LISTING_ROUTE, window, Fallback::Blocking, move || async move {
            generator.listing_page().await
        })
        .await;
    page_response(&state, served, window)
}

async fn article_handler(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Response {
    let window = state.article_window();
    let generator = state.generator.clone();
    let served = state
        .cache
        .serve(&post_path(&uid), window, Fallback::Placeholder, move || async move {
            generator.article_page(&uid).await
        })
        .await;
    page_response(&state, served, window)
}

#[derive(Debug, Deserialize)]
struct PostsQuery {
    page: Option<String>,
}

/// Next page of summaries for the load-more control
async fn posts_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PostsQuery>,
) -> Response {
    let Some(cursor) = query.page.filter(|p| !p.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing page cursor").into_response();
    };

    match state.generator.posts_fragment(&cursor).await {
        Ok(fragment) => Json(fragment).into_response(),
        Err(e @ Error::InvalidCursor { .. }) => {
            tracing::debug!("Rejected cursor: {}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e) => {
            tracing::warn!("Failed to load more posts: {}", e);
            (StatusCode::BAD_GATEWAY, "Failed to load posts").into_response()
        }
    }
}

fn page_response(
    state: &AppState,
    served: crate::error::Result<Served>,
    window: Duration,
) -> Response {
    let page = match served {
        Ok(Served::Fresh(page)) | Ok(Served::Stale(page)) => page,
        Ok(Served::Placeholder) => {
            return match state.generator.fallback_page() {
                Ok(html) => ([(header::CACHE_CONTROL, "no-store")], Html(html)).into_response(),
                Err(e) => server_error(e),
            };
        }
        Err(e) => return server_error(e),
    };

    match &page.body {
        PageBody::Html(html) => (
            [(
                header::CACHE_CONTROL,
                format!("s-maxage={}, stale-while-revalidate", window.as_secs()),
            )],
            Html(html.clone()),
        )
            .into_response(),
        PageBody::NotFound => match state.generator.not_found_page() {
            Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
            Err(e) => server_error(e),
        },
    }
}

fn server_error(e: Error) -> Response {
    tracing::error!("Page generation failed: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
}

/// Serve generated files and static assets from the public dir
async fn fallback_handler(State(state): State<Arc<AppState>>, request: Request<Body>) -> Response {
    let mut service = ServeDir::new(&state.public_dir).append_index_html_on_directories(true);
    match service.try_call(request).await {
        Ok(response) => response.into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PageState;
    use crate::cms::memory::MemoryCms;
    use crate::config::SiteConfig;
    use serde_json::json;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const CURSOR: &str = "http://localhost:3001/api/v2/documents/search?page=2";

    fn post(uid: &str) -> serde_json::Value {
        json!({
            "uid": uid,
            "type": "posts",
            "first_publication_date": "2021-03-15T19:25:28+0000",
            "data": {
                "title": format!("Post {}", uid),
                "subtitle": "Sub",
                "author": "Ana",
                "banner": {"url": "https://images.prismic.io/banner.png"},
                "content": []
            }
        })
    }

    fn state(cms: MemoryCms, public_dir: PathBuf) -> Arc<AppState> {
        let generator = Generator::new(SiteConfig::default(), Arc::new(cms)).unwrap();
        Arc::new(AppState::new(generator, public_dir))
    }

    async fn get(state: &Arc<AppState>, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = create_router(state.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let cache_control = response
            .headers()
            .get(header::CACHE_CONTROL)
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, cache_control, String::from_utf8(body.to_vec()).unwrap())
    }

    async fn wait_ready(state: &AppState, route: &str) {
        while state.cache.state(route, state.article_window()) != PageState::Ready {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_listing_route() {
        let dir = TempDir::new().unwrap();
        let cms = MemoryCms::new().with_documents(json!([post("a"), post("b")]));
        let state = state(cms, dir.path().to_path_buf());

        let (status, cache_control, body) = get(&state, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            cache_control.as_deref(),
            Some("s-maxage=3600, stale-while-revalidate")
        );
        assert!(body.contains("Post a"));
    }

    #[tokio::test]
    async fn test_concurrent_first_listing_requests_get_the_listing() {
        let dir = TempDir::new().unwrap();
        let cms = MemoryCms::new().with_documents(json!([post("a")]));
        let gate = cms.gate();
        let state = state(cms, dir.path().to_path_buf());

        let first = tokio::spawn({
            let state = state.clone();
            async move { get(&state, "/").await }
        });
        while state.cache.state(LISTING_ROUTE, state.listing_window()) != PageState::Generating {
            tokio::task::yield_now().await;
        }
        let second = tokio::spawn({
            let state = state.clone();
            async move { get(&state, "/").await }
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!second.is_finished());

        gate.notify_one();
        for response in [first.await.unwrap(), second.await.unwrap()] {
            let (status, cache_control, body) = response;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(
                cache_control.as_deref(),
                Some("s-maxage=3600, stale-while-revalidate")
            );
            assert!(body.contains("Post a"));
            assert!(!body.contains("Carregando..."));
        }
    }

    #[tokio::test]
    async fn test_listing_generation_failure_is_500() {
        let dir = TempDir::new().unwrap();
        let cms = MemoryCms::new();
        cms.set_failing(true);
        let state = state(cms, dir.path().to_path_buf());

        let (status, _, _) = get(&state, "/").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_article_placeholder_then_page() {
        let dir = TempDir::new().unwrap();
        let cms = MemoryCms::new().with_documents(json!([post("a")]));
        let state = state(cms, dir.path().to_path_buf());

        let (status, cache_control, body) = get(&state, "/post/a").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache_control.as_deref(), Some("no-store"));
        assert!(body.contains("Carregando..."));

        wait_ready(&state, "/post/a").await;

        let (status, cache_control, body) = get(&state, "/post/a").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            cache_control.as_deref(),
            Some("s-maxage=86400, stale-while-revalidate")
        );
        assert!(body.contains("Post a"));
    }

    #[tokio::test]
    async fn test_missing_article_is_404() {
        let dir = TempDir::new().unwrap();
        let state = state(MemoryCms::new(), dir.path().to_path_buf());

        get(&state, "/post/missing").await;
        wait_ready(&state, "/post/missing").await;

        let (status, _, body) = get(&state, "/post/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Post não encontrado"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_listing_served_while_regenerating() {
        let dir = TempDir::new().unwrap();
        let cms = MemoryCms::new().with_documents(json!([post("fresh")]));
        let state = state(cms, dir.path().to_path_buf());
        state
            .cache
            .insert(LISTING_ROUTE, PageBody::Html("<p>old listing</p>".to_string()));

        tokio::time::advance(state.listing_window() + Duration::from_secs(1)).await;

        let (status, _, body) = get(&state, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<p>old listing</p>");

        while state.cache.state(LISTING_ROUTE, state.listing_window()) != PageState::Ready {
            tokio::task::yield_now().await;
        }
        let (_, _, body) = get(&state, "/").await;
        assert!(body.contains("Post fresh"));
    }

    #[tokio::test]
    async fn test_posts_api() {
        let dir = TempDir::new().unwrap();
        let cms = MemoryCms::new().with_page(
            CURSOR,
            json!({"next_page": null, "results": [post("c")]}),
        );
        let state = state(cms, dir.path().to_path_buf());

        let uri = format!("/api/posts?page={}", urlencode(CURSOR));
        let (status, _, body) = get(&state, &uri).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(json["html"].as_str().unwrap().contains("Post c"));
        assert!(json["next_page"].is_null());

        let (status, _, _) = get(&state, "/api/posts?page=http%3A%2F%2Fevil.example%2F").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) = get(&state, "/api/posts").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_posts_api_upstream_failure_is_502() {
        let dir = TempDir::new().unwrap();
        let cms = MemoryCms::new();
        cms.set_failing(true);
        let state = state(cms, dir.path().to_path_buf());

        let uri = format!("/api/posts?page={}", urlencode(CURSOR));
        let (status, _, _) = get(&state, &uri).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_static_files_served_from_public_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("css/style.css"), "body{}").unwrap();
        let state = state(MemoryCms::new(), dir.path().to_path_buf());

        let (status, _, body) = get(&state, "/css/style.css").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "body{}");

        let (status, _, _) = get(&state, "/nope.txt").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    fn urlencode(s: &str) -> String {
        url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
    }
}
