// Auth observer
// Per-view auth snapshot with background revalidation and change subscriptions

use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::credentials::CredentialStore;
use super::events::{AuthBus, AuthSubscription};
use super::logout;
use super::types::{AuthSnapshot, ValidationOutcome};
use super::validator::SessionValidator;
use crate::routing::paths::is_gated;

/// Result of the background check started at mount
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revalidation {
    /// No session at mount, nothing to check
    Skipped,
    /// Server accepted the token
    Confirmed,
    /// Server rejected the token; the session was logged out.
    /// `login_required` is set when the view was on a gated path.
    Cleared { login_required: bool },
    /// Network trouble; state left untouched
    Inconclusive(String),
}

/// Live auth state for one consuming view
///
/// The first snapshot is computed synchronously at mount, so the first
/// paint never waits on the network. Dropping the observer aborts its
/// tasks; `unmount` also waits for them so no subscription outlives it.
pub struct AuthObserver {
    snapshot: watch::Receiver<AuthSnapshot>,
    listener: Option<JoinHandle<()>>,
    validation: Option<JoinHandle<Revalidation>>,
}

impl AuthObserver {
    pub fn mount(
        store: Arc<CredentialStore>,
        validator: Arc<SessionValidator>,
        bus: AuthBus,
        current_path: &str,
    ) -> Self {
        let initial = AuthSnapshot::settled(store.is_authenticated());
        let (tx, rx) = watch::channel(initial);
        let tx = Arc::new(tx);

        let listener = tokio::spawn(listen(bus.subscribe(), store.clone(), tx.clone()));

        let validation = match store.token() {
            Some(token) if initial.is_authenticated => Some(tokio::spawn(revalidate(
                token,
                store,
                validator,
                bus,
                tx,
                is_gated(current_path),
            ))),
            _ => None,
        };

        Self {
            snapshot: rx,
            listener: Some(listener),
            validation,
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> AuthSnapshot {
        *self.snapshot.borrow()
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot().is_authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.snapshot().is_loading
    }

    /// Receiver that views can await for changes
    pub fn watch(&self) -> watch::Receiver<AuthSnapshot> {
        self.snapshot.clone()
    }

    /// Wait for the background revalidation; `Skipped` if none was started
    pub async fn settled(&mut self) -> Revalidation {
        match self.validation.take() {
            Some(handle) => handle
                .await
                .unwrap_or_else(|e| Revalidation::Inconclusive(e.to_string())),
            None => Revalidation::Skipped,
        }
    }

    /// Tear down: stop listening on both channels
    pub async fn unmount(mut self) {
        if let Some(handle) = self.validation.take() {
            handle.abort();
            let _ = handle.await;
        }
        if let Some(handle) = self.listener.take() {
            handle.abort();
            let _ = handle.await;
        }
    }
}

impl Drop for AuthObserver {
    fn drop(&mut self) {
        if let Some(handle) = &self.validation {
            handle.abort();
        }
        if let Some(handle) = &self.listener {
            handle.abort();
        }
    }
}

/// Recompute the oracle on every state or storage notification
async fn listen(
    mut subscription: AuthSubscription,
    store: Arc<CredentialStore>,
    tx: Arc<watch::Sender<AuthSnapshot>>,
) {
    loop {
        let closed = tokio::select! {
            result = subscription.state.recv() => {
                matches!(result, Err(broadcast::error::RecvError::Closed))
            }
            result = subscription.storage.recv() => {
                matches!(result, Err(broadcast::error::RecvError::Closed))
            }
        };
        if closed {
            break;
        }

        let authenticated = store.is_authenticated();
        tx.send_replace(AuthSnapshot::settled(authenticated));
        tracing::debug!(authenticated, "Auth observer refreshed");
    }
}

async fn revalidate(
    token: String,
    store: Arc<CredentialStore>,
    validator: Arc<SessionValidator>,
    bus: AuthBus,
    tx: Arc<watch::Sender<AuthSnapshot>>,
    on_gated_path: bool,
) -> Revalidation {
    match validator.validate(&token).await {
        ValidationOutcome::Valid => {
            // The store may have been cleared while the request was in flight
            tx.send_replace(AuthSnapshot::settled(store.is_authenticated()));
            Revalidation::Confirmed
        }
        ValidationOutcome::Invalid { status } => {
            tracing::info!(status, "Stored session is no longer valid, logging out");
            logout::logout(&store, &validator, &bus).await;
            tx.send_replace(AuthSnapshot::settled(store.is_authenticated()));
            Revalidation::Cleared {
                login_required: on_gated_path,
            }
        }
        ValidationOutcome::Indeterminate(reason) => {
            tracing::warn!("Auth check failed, keeping current state: {}", reason);
            Revalidation::Inconclusive(reason)
        }
    }
}
