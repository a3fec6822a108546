//! HttpBackend: the planning backend over HTTP + JSON.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::traits::PlannerBackend;
use super::types::{OptimizeRequest, OptimizeResponse, ParseRequest, ParseResponse, ScheduleRequest};
use crate::error::ApiError;

const PARSE: &str = "/api/parse";
const OPTIMIZE: &str = "/api/optimize";
const SCHEDULE: &str = "/api/schedule";

/// Client for the planning backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: Url,
    http_client: Client,
}

impl HttpBackend {
    /// Create a client rooted at `base_url` with a per-request timeout.
    ///
    /// Endpoints resolve below any path `base_url` carries, so
    /// `https://host/planner` posts to `https://host/planner/api/parse`.
    pub fn new(mut base_url: Url, timeout: Duration) -> Result<Self, ApiError> {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ApiError::Transport {
                endpoint: "client",
                source,
            })?;
        Ok(Self {
            base_url,
            http_client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn post_json<B, R>(&self, endpoint: &'static str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.base_url.join(endpoint.trim_start_matches('/'))?;
        debug!("POST {url}");

        let resp = self
            .http_client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|source| ApiError::Transport { endpoint, source })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|source| ApiError::Transport { endpoint, source })?;

        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint,
                status: status.as_u16(),
                body: text,
            });
        }

        debug!("{endpoint} responded: {text}");

        // An empty 2xx body decodes like `{}` so the envelope defaults apply.
        let payload = if text.trim().is_empty() { "{}" } else { text.as_str() };
        serde_json::from_str(payload).map_err(|e| ApiError::Decode {
            endpoint,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl PlannerBackend for HttpBackend {
    async fn parse(&self, request: &ParseRequest) -> Result<ParseResponse, ApiError> {
        self.post_json(PARSE, request).await
    }

    async fn optimize(&self, request: &OptimizeRequest) -> Result<OptimizeResponse, ApiError> {
        self.post_json(OPTIMIZE, request).await
    }

    async fn schedule(&self, request: &ScheduleRequest) -> Result<Value, ApiError> {
        self.post_json(SCHEDULE, request).await
    }
}
