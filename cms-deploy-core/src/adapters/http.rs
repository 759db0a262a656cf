use async_trait::async_trait;
use tracing::{error, info};

use crate::contract::{HttpClient, ToolError};

/// [`HttpClient`] backed by `reqwest`.
#[derive(Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<String, ToolError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| {
            error!(error = ?e, "HTTP request failed");
            e
        })?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!(%status, "HTTP request returned an error status");
            return Err(format!("GET returned {status}: {body}").into());
        }
        info!(%status, bytes = body.len(), "HTTP request succeeded");
        Ok(body)
    }
}
