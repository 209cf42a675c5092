// Login procedure
// POST credentials, resolve the profile, persist the session, broadcast

use reqwest::Client;
use std::time::Duration;

use super::credentials::CredentialStore;
use super::events::AuthBus;
use super::types::{LoginRequest, LoginResponse, Session};
use super::validator::SessionValidator;
use crate::config::Config;
use crate::error::{AuthError, Result};

const LOGIN_PATH: &str = "/api/auth/login";

pub struct LoginClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl LoginClient {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            timeout: config.login_timeout,
        }
    }

    /// Exchange credentials for a token; the profile may ride along
    pub async fn request_token(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let url = format!("{}{}", self.base_url, LOGIN_PATH);
        tracing::info!(url = %url, email = %request.email, "Login attempt");

        let response = self
            .client
            .post(&url)
            .json(request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AuthError::transport(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::transport(&e))?;

        let data: LoginResponse = match serde_json::from_str(&body) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(status = status.as_u16(), "Login response is not JSON: {}", e);
                return Err(AuthError::UnexpectedResponse {
                    status: status.as_u16(),
                    body,
                });
            }
        };

        let accepted = status.is_success()
            && data.success != Some(false)
            && data.access_token.as_deref().is_some_and(|t| !t.is_empty());

        if !accepted {
            let message = data.error_text().unwrap_or_else(|| {
                format!("Login failed (status code: {})", status.as_u16())
            });
            tracing::warn!(status = status.as_u16(), "Login rejected: {}", message);
            return Err(AuthError::AuthRejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(data)
    }

    /// Full login: token, profile, atomic save, marker, broadcast
    ///
    /// Nothing is stored unless both the token and a decodable profile
    /// were obtained.
    pub async fn login(
        &self,
        request: &LoginRequest,
        validator: &SessionValidator,
        store: &CredentialStore,
        bus: &AuthBus,
    ) -> Result<Session> {
        let data = self.request_token(request).await?;
        let token = data.access_token.unwrap_or_default();

        let user = match data.user {
            Some(user) => user,
            None => validator.fetch_profile(&token).await.map_err(|e| {
                tracing::error!("Profile lookup after login failed: {}", e);
                e
            })?,
        };

        let session = Session::new(token, user);
        store.save(&session)?;
        store.mark_logged_in();
        bus.notify_state_changed();

        tracing::info!(
            user_id = session.user.id,
            token = %session.token_preview(),
            "Login successful"
        );
        Ok(session)
    }
}
