//! Generator module - renders pages from CMS content using built-in Tera templates
//!
//! The same rendering paths serve the build-time `generate` command and the
//! server's on-demand generation.

use chrono_tz::Tz;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use url::Url;
use walkdir::WalkDir;

use crate::article::{self, ArticleContent};
use crate::cache::{Manifest, PageBody};
use crate::cms::{Cms, Predicate, QueryOptions};
use crate::config::SiteConfig;
use crate::error::{Error, Result};
use crate::helpers::{format_publication_date, post_output_path, post_path, resolve_timezone};
use crate::listing::{self, PostSummary};
use crate::templates::{
    ArticleData, BlockData, ListingData, SiteData, SummaryData, TemplateRenderer, STYLESHEET,
};

/// Route of the listing page
pub const LISTING_ROUTE: &str = "/";

/// Output file of the listing page
const LISTING_OUTPUT: &str = "index.html";

/// Seconds between refreshes of the on-demand placeholder
const FALLBACK_REFRESH_SECS: u64 = 1;

/// Summaries appended by the browser's load-more control
#[derive(Debug, Clone, Serialize)]
pub struct PostsFragment {
    pub html: String,
    pub next_page: Option<String>,
}

/// Page generator backed by a CMS
pub struct Generator {
    config: SiteConfig,
    cms: Arc<dyn Cms>,
    renderer: TemplateRenderer,
    timezone: Tz,
    cms_origin: Url,
}

impl Generator {
    /// Create a new generator
    pub fn new(config: SiteConfig, cms: Arc<dyn Cms>) -> Result<Self> {
        let cms_origin = Url::parse(&config.cms.endpoint).map_err(|e| {
            Error::Config(format!("invalid cms.endpoint {:?}: {}", config.cms.endpoint, e))
        })?;

        Ok(Self {
            renderer: TemplateRenderer::new()?,
            timezone: resolve_timezone(&config.timezone),
            config,
            cms,
            cms_origin,
        })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Render the listing page with the first page of posts
    pub async fn listing_page(&self) -> Result<PageBody> {
        let state = listing::initialize(
            self.cms.as_ref(),
            &self.config.cms.document_type,
            &self.config.listing,
        )
        .await?;

        let listing = ListingData {
            posts: state.posts().iter().map(|p| self.summary_data(p)).collect(),
            next_page: state.cursor().next_page().map(str::to_string),
        };
        let html = self.renderer.render_listing(&self.site_data(), &listing)?;
        Ok(PageBody::Html(html))
    }

    /// Render the article `uid`, or [`PageBody::NotFound`]
    pub async fn article_page(&self, uid: &str) -> Result<PageBody> {
        let content =
            article::fetch_article(self.cms.as_ref(), &self.config.cms.document_type, uid).await?;
        let Some(content) = content else {
            return Ok(PageBody::NotFound);
        };

        let html = self
            .renderer
            .render_article(&self.site_data(), &self.article_data(&content))?;
        Ok(PageBody::Html(html))
    }

    /// Fetch the page behind a client-supplied cursor and render its summaries
    pub async fn posts_fragment(&self, cursor: &str) -> Result<PostsFragment> {
        listing::validate_cursor(&self.cms_origin, cursor)?;
        let page = listing::fetch_page(self.cms.as_ref(), cursor).await?;

        let posts: Vec<_> = page.posts.iter().map(|p| self.summary_data(p)).collect();
        Ok(PostsFragment {
            html: self.renderer.render_posts_fragment(&posts)?,
            next_page: page.cursor.next_page().map(str::to_string),
        })
    }

    /// Placeholder served while an article is generated on demand
    pub fn fallback_page(&self) -> Result<String> {
        self.renderer
            .render_fallback(&self.site_data(), FALLBACK_REFRESH_SECS)
    }

    pub fn not_found_page(&self) -> Result<String> {
        self.renderer.render_not_found(&self.site_data())
    }

    /// Article uids pre-generated at build time
    ///
    /// A single query with `article.static_paths_page_size` results. Every
    /// other article is generated on first request.
    pub async fn static_paths(&self) -> Result<Vec<String>> {
        let document_type = &self.config.cms.document_type;
        let page_size = self.config.article.static_paths_page_size;
        if page_size == 1 {
            tracing::warn!(
                "article.static_paths_page_size is 1: only one article is pre-generated"
            );
        }

        let response = self
            .cms
            .query(
                &[Predicate::document_type(document_type)],
                &QueryOptions::new(vec![format!("{}.uid", document_type)], page_size),
            )
            .await?;

        Ok(response
            .results
            .into_iter()
            .filter_map(|doc| doc.uid)
            .collect())
    }

    /// Generate the site into `public_dir`
    ///
    /// Writes the listing, the enumerated articles, the stylesheet and the
    /// static assets, and returns the manifest of generated routes. Any
    /// generation failure fails the build.
    pub async fn build(&self, public_dir: &Path, static_dir: &Path) -> Result<Manifest> {
        fs::create_dir_all(public_dir)?;
        let mut manifest = Manifest::new();

        write_output(public_dir, "css/style.css", STYLESHEET)?;
        copy_static_assets(static_dir, public_dir)?;

        if let PageBody::Html(html) = self.listing_page().await? {
            write_output(public_dir, LISTING_OUTPUT, &html)?;
            manifest.record(
                LISTING_ROUTE,
                LISTING_OUTPUT,
                self.config.listing.revalidate_secs,
            );
        }

        for uid in self.static_paths().await? {
            let output = post_output_path(&uid);
            match self.article_page(&uid).await? {
                PageBody::Html(html) => {
                    write_output(public_dir, &output, &html)?;
                    manifest.record(&post_path(&uid), &output, self.config.article.revalidate_secs);
                    tracing::debug!("Generated: {}", output);
                }
                PageBody::NotFound => tracing::warn!("Enumerated article {} not found", uid),
            }
        }

        tracing::info!("Generated {} pages", manifest.pages.len());
        Ok(manifest)
    }

    fn site_data(&self) -> SiteData {
        SiteData {
            title: self.config.title.clone(),
            language: self.config.language.clone(),
        }
    }

    fn summary_data(&self, post: &PostSummary) -> SummaryData {
        SummaryData {
            uid: post.uid.clone(),
            path: post_path(&post.uid),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            date: post.first_publication_date.as_ref().map(|d| self.format_date(d)),
            datetime: post.first_publication_date.map(|d| d.to_rfc3339()),
        }
    }

    fn article_data(&self, content: &ArticleContent) -> ArticleData {
        ArticleData {
            uid: content.uid.clone(),
            title: content.title.clone(),
            banner_url: content.banner_url.clone(),
            author: content.author.clone(),
            date: content.first_publication_date.as_ref().map(|d| self.format_date(d)),
            datetime: content.first_publication_date.map(|d| d.to_rfc3339()),
            read_time: article::compute_read_time(content, &self.config.article),
            blocks: content
                .content
                .iter()
                .map(|block| BlockData {
                    heading: block.heading.clone(),
                    html: article::render_block_html(&block.body),
                })
                .collect(),
        }
    }

    fn format_date(&self, date: &chrono::DateTime<chrono::FixedOffset>) -> String {
        format_publication_date(
            date,
            &self.config.date_format,
            &self.config.language,
            &self.timezone,
        )
    }
}

fn write_output(public_dir: &Path, relative: &str, content: &str) -> Result<()> {
    let dest = public_dir.join(relative);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dest, content)?;
    Ok(())
}

/// Copy static assets (images, favicon...) into the public dir
fn copy_static_assets(static_dir: &Path, public_dir: &Path) -> Result<()> {
    if !static_dir.exists() {
        return Ok(());
    }

    for entry in WalkDir::new(static_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Ok(relative) = path.strip_prefix(static_dir) else {
            continue;
        };
        let dest = public_dir.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(path, &dest)?;
    }

    Ok(())
}
