//! List posts from the CMS

use anyhow::Result;

use crate::cms::Cms;
use crate::config::SiteConfig;
use crate::helpers::{format_publication_date, resolve_timezone, truncate};
use crate::listing::{self, Listing, ListingState, LoadMore, PostSummary};
use crate::Blog;

/// Subtitle width in the terminal listing
const SUBTITLE_WIDTH: usize = 60;

/// Print the listing, following "load more" up to `pages` pages
///
/// `pages == 0` keeps loading until the cursor is exhausted.
pub async fn run(blog: &Blog, pages: usize) -> Result<()> {
    let cms = blog.cms()?;
    let state = load(cms.as_ref(), &blog.config, pages).await?;

    println!("Posts ({}):", state.posts().len());
    for post in state.posts() {
        println!("  {}", summary_line(post, &blog.config));
    }
    if state.can_load_more() {
        println!("  ... more posts available");
    }

    Ok(())
}

/// Initialize the listing and load more pages
///
/// A failed page stops loading; the posts loaded so far are kept.
pub async fn load(cms: &dyn Cms, config: &SiteConfig, pages: usize) -> Result<ListingState> {
    let state = listing::initialize(cms, &config.cms.document_type, &config.listing).await?;
    let listing = Listing::new(state);

    let mut loaded = 1;
    while pages == 0 || loaded < pages {
        match listing.load_more(cms).await {
            LoadMore::Appended(count) => {
                tracing::debug!("Loaded {} more posts", count);
                loaded += 1;
            }
            LoadMore::Exhausted | LoadMore::InFlight | LoadMore::Failed => break,
        }
    }

    Ok(listing.snapshot().as_ref().clone())
}

fn summary_line(post: &PostSummary, config: &SiteConfig) -> String {
    let date = match &post.first_publication_date {
        Some(date) => format_publication_date(
            date,
            &config.date_format,
            &config.language,
            &resolve_timezone(&config.timezone),
        ),
        None => "-".to_string(),
    };
    let subtitle = truncate(&post.subtitle, SUBTITLE_WIDTH, None);
    format!("{} - {} ({}) [{}] {}", date, post.title, post.author, post.uid, subtitle)
}
