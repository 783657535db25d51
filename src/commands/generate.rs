//! Generate static files

use anyhow::Result;

use crate::Blog;

/// Generate the listing and the enumerated articles into the public dir
pub async fn run(blog: &Blog) -> Result<()> {
    let start = std::time::Instant::now();

    let generator = blog.generator()?;
    let manifest = generator.build(&blog.public_dir, &blog.static_dir).await?;
    manifest.save(&blog.base_dir)?;

    tracing::info!(
        "Generated {} pages in {:.2}s",
        manifest.pages.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
