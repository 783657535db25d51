//! Prismic REST API client

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::{query_string, Cms, Document, Predicate, QueryOptions, QueryResponse};
use crate::config::CmsConfig;
use crate::error::{Error, Result};

const USER_AGENT: &str = concat!("spacetraveling/", env!("CARGO_PKG_VERSION"));

/// Client for a Prismic-style repository API (`.../api/v2`)
///
/// Every query first resolves the current master ref from the API root, so
/// newly published content is visible without restarting the server.
#[derive(Debug, Clone)]
pub struct PrismicClient {
    http: reqwest::Client,
    endpoint: Url,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiRoot {
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(default, rename = "isMasterRef")]
    is_master_ref: bool,
}

impl PrismicClient {
    /// Create a client from the `cms` section of the site configuration
    pub fn new(config: &CmsConfig) -> Result<Self> {
        let endpoint = Url::parse(config.endpoint.trim_end_matches('/'))
            .map_err(|e| Error::Config(format!("invalid cms.endpoint {:?}: {}", config.endpoint, e)))?;

        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint,
            access_token: config.access_token.clone(),
        })
    }

    /// The API root this client talks to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn master_ref(&self) -> Result<String> {
        let mut request = self.http.get(self.endpoint.clone());
        if let Some(token) = &self.access_token {
            request = request.query(&[("access_token", token)]);
        }

        let root: ApiRoot = request.send().await?.error_for_status()?.json().await?;
        root.refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or_else(|| Error::Decode("API root lists no master ref".to_string()))
    }

    fn search_url(&self) -> String {
        format!("{}/documents/search", self.endpoint.as_str().trim_end_matches('/'))
    }
}

#[async_trait]
impl Cms for PrismicClient {
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<QueryResponse> {
        let master_ref = self.master_ref().await?;
        let q = query_string(predicates);
        tracing::debug!("CMS query {} (pageSize={})", q, options.page_size);

        let mut params: Vec<(&str, String)> = vec![
            ("ref", master_ref),
            ("q", q),
            ("pageSize", options.page_size.to_string()),
        ];
        if !options.fetch.is_empty() {
            params.push(("fetch", options.fetch.join(",")));
        }
        if let Some(token) = &self.access_token {
            params.push(("access_token", token.clone()));
        }

        let response = self
            .http
            .get(self.search_url())
            .query(&params)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn get_by_uid(&self, document_type: &str, uid: &str) -> Result<Option<Document>> {
        let response = self
            .query(
                &[Predicate::uid(document_type, uid)],
                &QueryOptions::new(Vec::new(), 1),
            )
            .await?;
        Ok(response.results.into_iter().next())
    }

    async fn fetch_page(&self, url: &str) -> Result<QueryResponse> {
        tracing::debug!("CMS fetch page {}", url);
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}
