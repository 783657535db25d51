//! Show a single post

use anyhow::Result;

use crate::article::{self, ArticleContent};
use crate::config::SiteConfig;
use crate::helpers::{format_publication_date, resolve_timezone};
use crate::richtext;
use crate::Blog;

/// Print the article `uid` with its reading time
pub async fn run(blog: &Blog, uid: &str) -> Result<()> {
    let cms = blog.cms()?;
    let content =
        article::fetch_article(cms.as_ref(), &blog.config.cms.document_type, uid).await?;

    match content {
        Some(content) => print!("{}", render(&content, &blog.config)),
        None => anyhow::bail!("Post não encontrado: {}", uid),
    }
    Ok(())
}

/// Plain-text rendition of an article
pub fn render(content: &ArticleContent, config: &SiteConfig) -> String {
    let date = content
        .first_publication_date
        .as_ref()
        .map(|date| {
            format_publication_date(
                date,
                &config.date_format,
                &config.language,
                &resolve_timezone(&config.timezone),
            )
        })
        .unwrap_or_default();
    let read_time = article::compute_read_time(content, &config.article);

    let mut out = format!(
        "{}\n{} | {} | {} min\n",
        content.title, date, content.author, read_time
    );
    for block in &content.content {
        out.push('\n');
        if !block.heading.is_empty() {
            out.push_str(&format!("## {}\n\n", block.heading));
        }
        out.push_str(&richtext::as_text(&block.body));
        out.push('\n');
    }
    out
}
