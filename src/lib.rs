//! spacetraveling: a statically generated blog front-end for a headless CMS
//!
//! Posts are fetched from a Prismic-style repository API and rendered with
//! embedded Tera templates. Pages are generated ahead of time by `generate`
//! and regenerated on demand by the server once their window has passed.

pub mod article;
pub mod cache;
pub mod cms;
pub mod commands;
pub mod config;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod listing;
pub mod richtext;
pub mod server;
pub mod templates;

pub use error::{Error, Result};

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The blog application
#[derive(Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Static assets directory
    pub static_dir: PathBuf,
}

impl Blog {
    /// Create a blog from a site directory
    ///
    /// Reads `_config.yml` when present, then applies the CMS environment
    /// overrides.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> anyhow::Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };
        config.apply_env();

        let public_dir = base_dir.join(&config.public_dir);
        let static_dir = base_dir.join(&config.static_dir);

        Ok(Self {
            config,
            base_dir,
            public_dir,
            static_dir,
        })
    }

    /// Client for the configured CMS
    pub fn cms(&self) -> Result<Arc<dyn cms::Cms>> {
        Ok(Arc::new(cms::PrismicClient::new(&self.config.cms)?))
    }

    /// Generator backed by the configured CMS
    pub fn generator(&self) -> Result<generator::Generator> {
        generator::Generator::new(self.config.clone(), self.cms()?)
    }

    /// Generate the site
    pub async fn generate(&self) -> anyhow::Result<()> {
        commands::generate::run(self).await
    }

    /// Clean the public directory and build manifest
    pub fn clean(&self) -> anyhow::Result<()> {
        commands::clean::run(self)
    }
}
