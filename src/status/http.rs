use super::{ApiResult, CheckError, PreviewInfo, StatusSource};
use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub struct HttpStatusSource {
    client: Client,
    base_url: Url,
    status_prefix: String,
}

impl HttpStatusSource {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = build_client(cfg)?;
        Self::with_client(client, &cfg.service.base_url, &cfg.service.status_prefix)
    }

    pub fn with_client(client: Client, base_url: &str, status_prefix: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("parsing service.base_url: {base_url}"))?;
        Ok(Self {
            client,
            base_url,
            status_prefix: status_prefix.to_string(),
        })
    }

    /// Appends prefix and id to the base url, keeping any base path.
    pub fn status_url(&self, resource_id: &str) -> Result<Url, CheckError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{}{resource_id}", self.status_prefix))?)
    }
}

pub fn build_client(cfg: &Config) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(cfg.http.request_timeout_seconds))
        .user_agent(cfg.http.user_agent.clone())
        .build()
        .with_context(|| "building HTTP client")
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn check(&self, resource_id: &str) -> Result<ApiResult<PreviewInfo>, CheckError> {
        let url = self.status_url(resource_id)?;
        debug!("status check GET {url}");

        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CheckError::Status(status.as_u16()));
        }

        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| CheckError::Decode(e.to_string()))
    }
}
