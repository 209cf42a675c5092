use anyhow::Context;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::CredentialStore;
use crate::config::Config;
use crate::error::{AuthError, Result};

/// Thin JSON client for the SchoolPick API with retry logic
pub struct ApiClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// `{base}/api`
    api_root: String,

    /// Source of the bearer token
    store: Arc<CredentialStore>,

    /// Maximum number of retries
    max_retries: u32,

    /// Base delay for exponential backoff (milliseconds)
    base_delay_ms: u64,
}

impl ApiClient {
    pub fn new(store: Arc<CredentialStore>, config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.api_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_root: format!("{}/api", config.api_base_url.trim_end_matches('/')),
            store,
            max_retries: config.http_max_retries,
            base_delay_ms: 500,
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.send_json(Method::GET, endpoint, None::<&()>).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, endpoint: &str, body: &B) -> Result<T> {
        self.send_json(Method::POST, endpoint, Some(body)).await
    }

    pub async fn patch<B: Serialize, T: DeserializeOwned>(&self, endpoint: &str, body: &B) -> Result<T> {
        self.send_json(Method::PATCH, endpoint, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.send_json(Method::DELETE, endpoint, None::<&()>).await
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<T> {
        let url = format!("{}{}", self.api_root, endpoint);
        let build = || {
            let mut builder = self
                .client
                .request(method.clone(), &url)
                .header("Content-Type", "application/json");
            if let Some(token) = self.store.token() {
                builder = builder.bearer_auth(token);
            }
            if let Some(body) = body {
                builder = builder.json(body);
            }
            builder
        };

        let response = self.execute_with_retry(build).await?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::transport(&e))?;

        serde_json::from_str(&text).map_err(|e| {
            tracing::warn!(url = %url, "Response is not the expected JSON: {}", e);
            AuthError::UnexpectedResponse {
                status,
                body: text,
            }
        })
    }

    /// Execute a request with retry logic
    /// - 401: fail immediately as a rejected session
    /// - 429 / 5xx / transport errors: exponential backoff
    async fn execute_with_retry<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;

        loop {
            let result = build().send().await;

            match result {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        tracing::debug!(status = %status, "Request successful");
                        return Ok(response);
                    }

                    if matches!(status.as_u16(), 429 | 500..=599) && attempt < self.max_retries {
                        let delay = self.calculate_backoff_delay(attempt);
                        tracing::warn!(
                            "Received {}, retrying after {}ms (attempt {}/{})",
                            status,
                            delay,
                            attempt + 1,
                            self.max_retries
                        );
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        attempt += 1;
                        continue;
                    }

                    let body = response.text().await.unwrap_or_default();
                    let message = error_detail(&body).unwrap_or_else(|| {
                        format!(
                            "API request failed: {}",
                            status.canonical_reason().unwrap_or("unknown status")
                        )
                    });

                    tracing::error!(
                        status = status.as_u16(),
                        attempt = attempt + 1,
                        "API request failed: {}",
                        message
                    );

                    return Err(if status.as_u16() == 401 {
                        AuthError::AuthRejected {
                            status: 401,
                            message,
                        }
                    } else {
                        AuthError::UnexpectedResponse {
                            status: status.as_u16(),
                            body: message,
                        }
                    });
                }

                Err(e) => {
                    let err = AuthError::transport(&e);

                    if attempt < self.max_retries {
                        let delay = self.calculate_backoff_delay(attempt);
                        tracing::warn!(
                            "Request failed: {}, retrying after {}ms (attempt {}/{})",
                            err,
                            delay,
                            attempt + 1,
                            self.max_retries
                        );
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        attempt += 1;
                        continue;
                    }

                    tracing::error!(
                        error = %err,
                        total_attempts = attempt + 1,
                        "HTTP request failed after all retries"
                    );
                    return Err(err);
                }
            }
        }
    }

    /// Calculate exponential backoff delay
    fn calculate_backoff_delay(&self, attempt: u32) -> u64 {
        // Exponential backoff: base_delay * 2^attempt, plus up to 10% jitter
        let delay = self.base_delay_ms * 2_u64.pow(attempt);
        let jitter = (delay as f64 * 0.1 * rand::random::<f64>()) as u64;
        delay + jitter
    }
}

/// `detail` field of a FastAPI error body
fn error_detail(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    match json.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}
