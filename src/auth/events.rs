// Auth change broadcast
// Payload-less "session may have changed" notifications plus storage changes

use once_cell::sync::Lazy;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 16;

static GLOBAL_BUS: Lazy<AuthBus> = Lazy::new(AuthBus::new);

/// A storage backend changed underneath us (another process or tab)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    /// Changed key when known, `None` when the whole store may differ
    pub key: Option<String>,
}

/// Fire-and-forget publish/subscribe channel for auth state changes
///
/// Delivery is best effort: only receivers subscribed at publish time get
/// a notification, and a slow receiver may see `Lagged` instead of every
/// message. Receivers only ever re-read the credential store, so a lag is
/// as good as a delivery.
#[derive(Clone, Debug)]
pub struct AuthBus {
    state_tx: broadcast::Sender<()>,
    storage_tx: broadcast::Sender<StorageChange>,
}

/// Receivers for both channels held by one observer
pub struct AuthSubscription {
    pub state: broadcast::Receiver<()>,
    pub storage: broadcast::Receiver<StorageChange>,
}

impl AuthBus {
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (storage_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            state_tx,
            storage_tx,
        }
    }

    /// Process-wide bus shared by every component that does not inject its own
    pub fn global() -> AuthBus {
        GLOBAL_BUS.clone()
    }

    /// Broadcast "auth state changed"
    pub fn notify_state_changed(&self) {
        let delivered = self.state_tx.send(()).unwrap_or(0);
        tracing::debug!(receivers = delivered, "Auth state change broadcast");
    }

    /// Broadcast a storage change
    pub fn notify_storage_changed(&self, key: Option<String>) {
        let delivered = self.storage_tx.send(StorageChange { key }).unwrap_or(0);
        tracing::debug!(receivers = delivered, "Storage change broadcast");
    }

    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            state: self.state_tx.subscribe(),
            storage: self.storage_tx.subscribe(),
        }
    }

    /// Number of live subscriptions on the state channel
    pub fn observer_count(&self) -> usize {
        self.state_tx.receiver_count()
    }
}

impl Default for AuthBus {
    fn default() -> Self {
        Self::new()
    }
}
