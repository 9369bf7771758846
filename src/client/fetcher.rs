/**
 * HTTP Page Fetcher
 *
 * Reads history pages from `GET /api/messages` with an optional bearer
 * token. Non-success responses are decoded from the server's
 * `{error, status}` body when possible.
 */

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::error::ClientError;
use super::store::PageFetcher;
use crate::shared::{Page, PageRequest};

#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpPageFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn url(&self) -> String {
        format!("{}/api/messages", self.base_url)
    }

    fn query(request: &PageRequest) -> Vec<(&'static str, String)> {
        let mut query = vec![("surface", request.surface.to_string())];
        if let Some(cursor) = &request.cursor {
            query.push(("cursor", cursor.to_string()));
        }
        if let Some(limit) = request.limit {
            query.push(("limit", limit.to_string()));
        }
        query
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, request: PageRequest) -> Result<Page, ClientError> {
        let mut builder = self.client.get(self.url()).query(&Self::query(&request));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| status.to_string());
            tracing::debug!("[SyncStore] Page fetch for {} failed: {} {}", request.surface, status, message);
            return Err(ClientError::Http {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<Page>().await?)
    }
}
