//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable overriding `cms.endpoint`
pub const ENDPOINT_ENV: &str = "PRISMIC_API_ENDPOINT";

/// Environment variable overriding `cms.access_token`
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub language: String,
    pub timezone: String,
    pub date_format: String,

    // Directory
    pub public_dir: String,
    pub static_dir: String,

    #[serde(default)]
    pub cms: CmsConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub article: ArticleConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            language: "pt-BR".to_string(),
            timezone: "America/Sao_Paulo".to_string(),
            date_format: "dd MMM yyyy".to_string(),

            public_dir: "public".to_string(),
            static_dir: "static".to_string(),

            cms: CmsConfig::default(),
            listing: ListingConfig::default(),
            article: ArticleConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `PRISMIC_API_ENDPOINT` / `PRISMIC_ACCESS_TOKEN` overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENDPOINT_ENV).ok(),
            std::env::var(ACCESS_TOKEN_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, endpoint: Option<String>, token: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            tracing::debug!("CMS endpoint overridden from {}", ENDPOINT_ENV);
            self.cms.endpoint = endpoint;
        }
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.cms.access_token = Some(token);
        }
    }
}

/// Headless CMS connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsConfig {
    /// API root, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    /// Custom type of the blog posts
    pub document_type: String,
    /// Request timeout; unset means the client never gives up
    pub timeout_secs: Option<u64>,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3001/api/v2".to_string(),
            access_token: None,
            document_type: "posts".to_string(),
            timeout_secs: None,
        }
    }
}

/// Home page listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub page_size: usize,
    pub revalidate_secs: u64,
    pub fetch: Vec<String>,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: 5,
            revalidate_secs: 60 * 60,
            fetch: vec![
                "posts.title".to_string(),
                "posts.subtitle".to_string(),
                "posts.author".to_string(),
                "posts.content".to_string(),
            ],
        }
    }
}

/// Article pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticleConfig {
    /// Page size of the build-time path enumeration query
    pub static_paths_page_size: usize,
    pub revalidate_secs: u64,
    pub words_per_minute: usize,
    /// Lower bound for the displayed reading time, 0 disables it
    pub min_read_time: u32,
}

impl Default for ArticleConfig {
    fn default() -> Self {
        Self {
            static_paths_page_size: 1,
            revalidate_secs: 60 * 60 * 24,
            words_per_minute: 200,
            min_read_time: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.listing.page_size, 5);
        assert_eq!(config.listing.revalidate_secs, 3600);
        assert_eq!(config.article.revalidate_secs, 86400);
        assert_eq!(config.article.static_paths_page_size, 1);
        assert_eq!(config.article.words_per_minute, 200);
        assert_eq!(config.cms.document_type, "posts");
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
cms:
  endpoint: https://blog.cdn.prismic.io/api/v2
listing:
  page_size: 10
article:
  min_read_time: 1
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.cms.endpoint, "https://blog.cdn.prismic.io/api/v2");
        assert_eq!(config.cms.document_type, "posts");
        assert_eq!(config.listing.page_size, 10);
        assert_eq!(config.listing.revalidate_secs, 3600);
        assert_eq!(config.article.min_read_time, 1);
        assert_eq!(config.article.words_per_minute, 200);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SiteConfig::default();
        config.apply_overrides(
            Some("https://other.cdn.prismic.io/api/v2".to_string()),
            Some("secret".to_string()),
        );
        assert_eq!(config.cms.endpoint, "https://other.cdn.prismic.io/api/v2");
        assert_eq!(config.cms.access_token.as_deref(), Some("secret"));

        config.apply_overrides(Some("  ".to_string()), None);
        assert_eq!(config.cms.endpoint, "https://other.cdn.prismic.io/api/v2");
    }
}
