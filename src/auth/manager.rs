// Authentication manager
// Wires storage, remote calls and the change bus together for every view

use anyhow::{Context, Result};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::credentials::CredentialStore;
use super::events::AuthBus;
use super::login::LoginClient;
use super::logout::{self, LogoutNotice};
use super::observer::AuthObserver;
use super::startup::{StartupOutcome, StartupValidator};
use super::storage::{spawn_change_watcher, FileStorage, KeyValueStorage, MemoryStorage};
use super::types::{LoginRequest, Session, ValidationOutcome};
use super::validator::SessionValidator;
use crate::config::Config;
use crate::error::AuthError;
use crate::routing::RouteGuard;

/// How often the storage file is checked for writes from other processes
const STORAGE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Stops the storage watcher once the last manager clone is dropped
struct WatcherTask(JoinHandle<()>);

impl Drop for WatcherTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Authentication manager
/// Composition root shared by every view: store, remote calls, broadcast bus
#[derive(Clone)]
pub struct AuthManager {
    /// Token + profile persistence
    store: Arc<CredentialStore>,

    /// whoami / logout / profile calls
    validator: Arc<SessionValidator>,

    /// Credential exchange
    login: Arc<LoginClient>,

    /// Auth change notifications
    bus: AuthBus,

    /// Snapshot of configuration (timeouts, startup policy)
    config: Arc<Config>,

    /// Storage file poller, file-backed managers only
    watcher: Option<Arc<WatcherTask>>,
}

impl AuthManager {
    /// Create a manager with durable storage in the configured file and
    /// process-scoped session storage, on the process-wide bus
    ///
    /// Must be called inside a tokio runtime: it starts a task that publishes
    /// storage changes made by other processes sharing the file.
    pub fn new(config: &Config) -> Result<Self> {
        tracing::info!(
            "Using session storage: {}",
            config.storage_file.display()
        );
        let file = FileStorage::new(config.storage_file.clone());
        let bus = AuthBus::global();
        let watcher = spawn_change_watcher(file.clone(), bus.clone(), STORAGE_POLL_INTERVAL);

        let mut manager =
            Self::with_storage(config, Arc::new(file), Arc::new(MemoryStorage::new()), bus)?;
        manager.watcher = Some(Arc::new(WatcherTask(watcher)));
        Ok(manager)
    }

    /// Create a manager with everything in memory and a private bus
    pub fn in_memory(config: &Config) -> Result<Self> {
        Self::with_storage(
            config,
            Arc::new(MemoryStorage::new()),
            Arc::new(MemoryStorage::new()),
            AuthBus::new(),
        )
    }

    pub fn with_storage(
        config: &Config,
        durable: Arc<dyn KeyValueStorage>,
        session: Arc<dyn KeyValueStorage>,
        bus: AuthBus,
    ) -> Result<Self> {
        // Timeouts are set per request, the client only pools connections
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            store: Arc::new(CredentialStore::new(durable, session)),
            validator: Arc::new(SessionValidator::new(client.clone(), config)),
            login: Arc::new(LoginClient::new(client, config)),
            bus,
            config: Arc::new(config.clone()),
            watcher: None,
        })
    }

    pub fn store(&self) -> Arc<CredentialStore> {
        self.store.clone()
    }

    pub fn bus(&self) -> AuthBus {
        self.bus.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether writes by other processes are being picked up
    pub fn watches_storage(&self) -> bool {
        self.watcher.is_some()
    }

    /// Synchronous session presence
    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    pub fn session(&self) -> Option<Session> {
        self.store.read()
    }

    /// Sign in and persist the session
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.login
            .login(&request, &self.validator, &self.store, &self.bus)
            .await
    }

    /// Notify, clear, broadcast; never fails
    pub async fn logout(&self) -> LogoutNotice {
        logout::logout(&self.store, &self.validator, &self.bus).await
    }

    /// Validate the stored token without acting on the result
    pub async fn validate(&self) -> Option<ValidationOutcome> {
        let token = self.store.token()?;
        Some(self.validator.validate(&token).await)
    }

    /// Launch-time check for an app opened at `path`
    pub async fn run_startup_validation(&self, path: &str) -> StartupOutcome {
        StartupValidator::new(
            self.store.clone(),
            self.validator.clone(),
            self.bus.clone(),
            (*self.config).clone(),
        )
        .run(path)
        .await
    }

    /// Mount an observer for a view showing `path`
    pub fn observe(&self, path: &str) -> AuthObserver {
        AuthObserver::mount(
            self.store.clone(),
            self.validator.clone(),
            self.bus.clone(),
            path,
        )
    }

    /// New, unmounted route guard reading this manager's store
    pub fn guard(&self) -> RouteGuard {
        RouteGuard::new(self.store.clone())
    }
}
