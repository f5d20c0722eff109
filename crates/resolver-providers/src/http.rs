//! Thin HTTP abstraction so provider adapters can be tested without a real
//! network call, mirroring the way this workspace keeps I/O behind a trait
//! rather than hardcoding a client inside each adapter.

use async_trait::async_trait;
use resolver_core::error::ErrorCode;
use resolver_core::error::ProviderError;
use std::time::Duration;

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get_json(&self, url: &str) -> Result<serde_json::Value, ProviderError> {
        self.get_json_with_headers(url, &[]).await
    }

    /// `headers` lets a provider adapter set request headers beyond the
    /// default client configuration, e.g. Wikipedia's required distinctive
    /// User-Agent (§4.C).
    async fn get_json_with_headers(&self, url: &str, headers: &[(&str, &str)]) -> Result<serde_json::Value, ProviderError>;
}

pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client builds with a valid timeout"),
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get_json_with_headers(&self, url: &str, headers: &[(&str, &str)]) -> Result<serde_json::Value, ProviderError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = request.send().await.map_err(classify_reqwest_error)?;
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::new(ErrorCode::MetadataRateLimited, "rate limited by upstream"));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ProviderError::new(ErrorCode::MetadataUnauthorized, "unauthorized"));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::new(ErrorCode::MetadataNotFound, "not found"));
        }
        if status.is_server_error() {
            return Err(ProviderError::new(ErrorCode::MetadataGatewayError, format!("upstream returned {status}")));
        }
        if !status.is_success() {
            return Err(ProviderError::new(ErrorCode::MetadataInvalidInput, format!("unexpected status {status}")));
        }
        response.json::<serde_json::Value>().await.map_err(classify_reqwest_error)
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> ProviderError {
    let detail = resolver_core::logging::scrub_query_string(&err.to_string());
    if err.is_timeout() {
        ProviderError::new(ErrorCode::MetadataTimeout, detail)
    } else if err.is_connect() {
        ProviderError::new(ErrorCode::MetadataNetworkError, detail)
    } else {
        ProviderError::new(ErrorCode::MetadataGatewayError, detail)
    }
}
