use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::config::AppConfig;
use crate::error::ServiceError;

mod article;
mod jsonld;

pub use article::{ExtractedArticle, extract_article};

/// Downloads the HTML of a page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String, ServiceError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        Self::new(config.fetch_timeout, &config.fetch_user_agent)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, ServiceError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}

pub struct ArticleExtractor {
    fetcher: Arc<dyn PageFetcher>,
}

impl ArticleExtractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    pub async fn extract(&self, raw_url: &str) -> Result<ExtractedArticle, ServiceError> {
        let url = parse_url(raw_url)?;
        let html = self.fetcher.fetch(&url).await?;
        let article = extract_article(&html);
        tracing::info!(
            %url,
            html_bytes = html.len(),
            text_chars = article.text.len(),
            "article extracted"
        );
        Ok(article)
    }
}

pub fn parse_url(raw: &str) -> Result<Url, ServiceError> {
    let url = Url::parse(raw.trim()).map_err(|e| ServiceError::InvalidUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ServiceError::InvalidUrl(format!(
            "unsupported scheme '{other}'"
        ))),
    }
}
