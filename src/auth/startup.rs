// Startup validator
// Checks the stored session once when the app opens

use std::sync::Arc;

use super::credentials::CredentialStore;
use super::events::AuthBus;
use super::logout;
use super::types::ValidationOutcome;
use super::validator::SessionValidator;
use crate::config::Config;
use crate::routing::paths::{is_auth_entry, is_gated};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupOutcome {
    /// Opened on a login/register page, nothing checked
    Skipped,
    /// No stored session
    NoSession,
    /// Session accepted, or the server could not be reached
    Kept,
    /// Development mode wiped credentials before the first login
    ClearedForDevelopment { login_required: bool },
    /// Server rejected the session and it was logged out
    Cleared { login_required: bool },
}

impl StartupOutcome {
    /// Whether the route guard should re-run its decision now
    pub fn login_required(&self) -> bool {
        matches!(
            self,
            StartupOutcome::ClearedForDevelopment {
                login_required: true
            } | StartupOutcome::Cleared {
                login_required: true
            }
        )
    }
}

pub struct StartupValidator {
    store: Arc<CredentialStore>,
    validator: Arc<SessionValidator>,
    bus: AuthBus,
    config: Config,
}

impl StartupValidator {
    pub fn new(
        store: Arc<CredentialStore>,
        validator: Arc<SessionValidator>,
        bus: AuthBus,
        config: Config,
    ) -> Self {
        Self {
            store,
            validator,
            bus,
            config,
        }
    }

    /// Validate the stored session for an app opened at `path`
    ///
    /// Never redirects by itself: a cleared session on a gated path is
    /// reported through `login_required` and the route guard shows its prompt.
    pub async fn run(&self, path: &str) -> StartupOutcome {
        if is_auth_entry(path) {
            return StartupOutcome::Skipped;
        }

        let Some(session) = self.store.read() else {
            return StartupOutcome::NoSession;
        };

        if self.config.should_clear_on_start(self.store.has_logged_in()) {
            tracing::info!("Development mode: clearing stored session on start");
            self.store.clear();
            self.bus.notify_state_changed();
            return StartupOutcome::ClearedForDevelopment {
                login_required: is_gated(path),
            };
        }

        match self.validator.validate(&session.token).await {
            ValidationOutcome::Valid => StartupOutcome::Kept,
            ValidationOutcome::Invalid { status } => {
                tracing::info!(status, "Stored session is invalid, logging out");
                logout::logout(&self.store, &self.validator, &self.bus).await;
                StartupOutcome::Cleared {
                    login_required: is_gated(path),
                }
            }
            ValidationOutcome::Indeterminate(reason) => {
                tracing::info!("Could not validate session (server may be down): {}", reason);
                StartupOutcome::Kept
            }
        }
    }
}
