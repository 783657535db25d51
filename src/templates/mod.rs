//! Built-in page templates using the Tera template engine
//!
//! Templates are embedded in the binary. HTML autoescaping stays on; only the
//! rich-text block markup is marked safe.

use serde::Serialize;
use tera::{Context, Tera};

use crate::error::Result;

/// Default stylesheet written to `css/style.css`
pub const STYLESHEET: &str = include_str!("space/style.css");

/// Template renderer with the embedded site templates
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("space/layout.html")),
            ("index.html", include_str!("space/index.html")),
            ("post.html", include_str!("space/post.html")),
            ("fallback.html", include_str!("space/fallback.html")),
            ("not_found.html", include_str!("space/not_found.html")),
            // Partials
            (
                "partials/posts.html",
                include_str!("space/partials/posts.html"),
            ),
        ])?;

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }

    /// Home page: first page of posts and the load-more control
    pub fn render_listing(&self, site: &SiteData, listing: &ListingData) -> Result<String> {
        let mut context = Context::new();
        context.insert("site", site);
        context.insert("listing", listing);
        context.insert("posts", &listing.posts);
        self.render("index.html", &context)
    }

    /// Summaries appended by the load-more control
    pub fn render_posts_fragment(&self, posts: &[SummaryData]) -> Result<String> {
        let mut context = Context::new();
        context.insert("posts", posts);
        self.render("partials/posts.html", &context)
    }

    /// Article page
    pub fn render_article(&self, site: &SiteData, article: &ArticleData) -> Result<String> {
        let mut context = Context::new();
        context.insert("site", site);
        context.insert("article", article);
        self.render("post.html", &context)
    }

    /// Placeholder served while a page is generated on demand
    pub fn render_fallback(&self, site: &SiteData, refresh_secs: u64) -> Result<String> {
        let mut context = Context::new();
        context.insert("site", site);
        context.insert("refresh_secs", &refresh_secs);
        self.render("fallback.html", &context)
    }

    /// Definitive not-found page
    pub fn render_not_found(&self, site: &SiteData) -> Result<String> {
        let mut context = Context::new();
        context.insert("site", site);
        self.render("not_found.html", &context)
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub language: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryData {
    pub uid: String,
    pub path: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    /// Display date, `None` for unpublished documents
    pub date: Option<String>,
    pub datetime: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingData {
    pub posts: Vec<SummaryData>,
    pub next_page: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleData {
    pub uid: String,
    pub title: String,
    pub banner_url: String,
    pub author: String,
    pub date: Option<String>,
    pub datetime: Option<String>,
    pub read_time: u32,
    pub blocks: Vec<BlockData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockData {
    pub heading: String,
    /// Trusted rich-text markup
    pub html: String,
}
