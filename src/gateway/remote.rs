//! Remote gateway: JSON over HTTP.
//!
//! ```text
//! GET    {base}/manuscripts          -> [Manuscript]
//! POST   {base}/manuscripts          <- Manuscript  -> Manuscript
//! PUT    {base}/manuscripts/{id}     <- Manuscript  -> Manuscript
//! PATCH  {base}/manuscripts          <- {ids, changes}
//! DELETE {base}/manuscripts/{id}
//! GET    {base}/settings             -> UserSettings (404: none saved)
//! PUT    {base}/settings             <- UserSettings -> UserSettings
//! ```

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{GatewayResult, PersistenceGateway};
use crate::core::{GatewayError, Manuscript, ManuscriptPatch, UserSettings};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Body of the bulk `PATCH /manuscripts` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkUpdateRequest {
    pub ids: Vec<String>,
    pub changes: ManuscriptPatch,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Clone)]
pub struct RemoteGateway {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl RemoteGateway {
    pub fn new(base_url: impl Into<String>) -> GatewayResult<Self> {
        Self::with_options(base_url, None, DEFAULT_TIMEOUT)
    }

    pub fn with_options(
        base_url: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> GatewayResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            api_token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn manuscript_url(&self, id: &str) -> String {
        // Ids are opaque; keep them from breaking the path.
        self.url(&format!("manuscripts/{}", urlencoding::encode(id)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> GatewayResult<Response> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "remote gateway response");
        if status.is_success() {
            return Ok(response);
        }

        let raw = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&raw)
            .map(|body| body.error)
            .unwrap_or_else(|_| {
                if raw.trim().is_empty() {
                    status.canonical_reason().unwrap_or("request failed").to_string()
                } else {
                    raw
                }
            });
        Err(GatewayError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl PersistenceGateway for RemoteGateway {
    async fn list(&self) -> GatewayResult<Vec<Manuscript>> {
        let response = self.send(self.client.get(self.url("manuscripts"))).await?;
        Ok(response.json().await?)
    }

    async fn create(&self, manuscript: Manuscript) -> GatewayResult<Manuscript> {
        let request = self
            .client
            .post(self.url("manuscripts"))
            .json(&manuscript.normalized());
        Ok(self.send(request).await?.json().await?)
    }

    async fn update(&self, manuscript: Manuscript) -> GatewayResult<Manuscript> {
        let request = self
            .client
            .put(self.manuscript_url(&manuscript.id))
            .json(&manuscript.normalized());
        Ok(self.send(request).await?.json().await?)
    }

    async fn update_many(&self, ids: &[String], changes: &ManuscriptPatch) -> GatewayResult<()> {
        let body = BulkUpdateRequest {
            ids: ids.to_vec(),
            changes: changes.clone(),
        };
        self.send(self.client.patch(self.url("manuscripts")).json(&body))
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> GatewayResult<()> {
        self.send(self.client.delete(self.manuscript_url(id))).await?;
        Ok(())
    }

    async fn load_settings(&self) -> GatewayResult<Option<UserSettings>> {
        match self.send(self.client.get(self.url("settings"))).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(GatewayError::Rejected { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn save_settings(&self, settings: UserSettings) -> GatewayResult<UserSettings> {
        let request = self.client.put(self.url("settings")).json(&settings);
        Ok(self.send(request).await?.json().await?)
    }

    fn backend_name(&self) -> &'static str {
        "remote"
    }
}
