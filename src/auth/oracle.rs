// Auth state oracle

use super::credentials::CredentialStore;

/// Synchronous "is a session present" check, safe before any async work
pub trait AuthOracle: Send + Sync {
    fn is_authenticated(&self) -> bool;
}

impl AuthOracle for CredentialStore {
    fn is_authenticated(&self) -> bool {
        CredentialStore::is_authenticated(self)
    }
}
