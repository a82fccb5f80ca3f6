use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::MetadataConfig;
use crate::error::ServiceError;
use crate::services::{MetadataResolver, ResolvedMetadata};

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    title: Option<String>,
    author_name: Option<String>,
    thumbnail_url: Option<String>,
}

/// Resolves video title, author and thumbnail through an oEmbed endpoint.
#[derive(Debug)]
pub struct OEmbedResolver {
    endpoint: url::Url,
    client: reqwest::Client,
}

impl OEmbedResolver {
    pub fn from_config(config: &MetadataConfig) -> Result<Self> {
        let endpoint = url::Url::parse(&config.endpoint)
            .with_context(|| format!("Invalid [metadata] endpoint: {}", config.endpoint))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client for OEmbedResolver")?;
        Ok(Self { endpoint, client })
    }

    fn request_url(&self, video_url: &str) -> url::Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("url", video_url)
            .append_pair("format", "json");
        url
    }
}

/// All three fields must be present; a partial answer is not applied.
fn into_metadata(response: OEmbedResponse) -> Result<ResolvedMetadata, ServiceError> {
    let missing = |field: &str| ServiceError::InvalidResponse(format!("oEmbed response has no {}", field));
    Ok(ResolvedMetadata {
        title: response.title.ok_or_else(|| missing("title"))?,
        author: response.author_name.ok_or_else(|| missing("author_name"))?,
        thumbnail: response.thumbnail_url.ok_or_else(|| missing("thumbnail_url"))?,
    })
}

#[async_trait]
impl MetadataResolver for OEmbedResolver {
    fn name(&self) -> &str {
        "oembed"
    }

    async fn resolve(&self, url: &str) -> Result<ResolvedMetadata, ServiceError> {
        let request_url = self.request_url(url);
        tracing::debug!("Resolving metadata via {}", request_url);

        let response = self.client.get(request_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ServiceError::ServerError {
                status: status.as_u16(),
                message,
            });
        }

        let body: OEmbedResponse = response.json().await.map_err(|e| {
            ServiceError::InvalidResponse(format!("Failed to parse oEmbed response: {}", e))
        })?;
        into_metadata(body)
    }
}
