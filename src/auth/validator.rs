// Remote session validation
// whoami probe, logout notification and profile fetch

use anyhow::Context;
use reqwest::Client;
use std::time::Duration;

use super::credentials::decode_profile;
use super::types::{UserProfile, ValidationOutcome};
use crate::config::Config;
use crate::error::{AuthError, Result};

const WHOAMI_PATH: &str = "/api/users/me";
const LOGOUT_PATH: &str = "/api/auth/logout";

/// Asks the server whether a token is still accepted
///
/// Network trouble is never read as a verdict on the session: only a
/// received non-2xx status yields `Invalid`.
pub struct SessionValidator {
    client: Client,
    base_url: String,
    validate_timeout: Duration,
    logout_timeout: Duration,
    profile_timeout: Duration,
}

impl SessionValidator {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            validate_timeout: config.validate_timeout,
            logout_timeout: config.logout_timeout,
            profile_timeout: config.profile_timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Probe `/api/users/me` with the token
    pub async fn validate(&self, token: &str) -> ValidationOutcome {
        let url = self.url(WHOAMI_PATH);
        tracing::debug!(url = %url, "Validating session token");

        let result = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header("Content-Type", "application/json")
            .timeout(self.validate_timeout)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("Session token accepted");
                ValidationOutcome::Valid
            }
            Ok(response) => {
                let status = response.status().as_u16();
                tracing::info!(status, "Session token rejected by server");
                ValidationOutcome::Invalid { status }
            }
            Err(e) => {
                let err = AuthError::transport(&e);
                tracing::warn!(
                    error = %err,
                    "Token validation inconclusive, keeping session"
                );
                ValidationOutcome::Indeterminate(err.to_string())
            }
        }
    }

    /// Best-effort logout notification; callers ignore the error
    pub async fn notify_logout(&self, token: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url(LOGOUT_PATH))
            .bearer_auth(token)
            .header("Content-Type", "application/json")
            .timeout(self.logout_timeout)
            .send()
            .await
            .map_err(|e| AuthError::transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::UnexpectedResponse {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    /// Fetch and strictly decode the profile for a fresh token
    pub async fn fetch_profile(&self, token: &str) -> Result<UserProfile> {
        let response = self
            .client
            .get(self.url(WHOAMI_PATH))
            .bearer_auth(token)
            .header("Content-Type", "application/json")
            .timeout(self.profile_timeout)
            .send()
            .await
            .map_err(|e| AuthError::transport(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read profile response body")?;

        if !status.is_success() {
            return Err(AuthError::AuthRejected {
                status: status.as_u16(),
                message: format!("Failed to load user profile ({})", status.as_u16()),
            });
        }

        decode_profile(&body)
    }
}
