// Credential store
// Token and profile persistence over durable and session-scoped storage

use std::sync::{Arc, RwLock};

use super::storage::{KeyValueStorage, MemoryStorage};
use super::types::{Session, UserProfile, LOGGED_IN_MARKER_KEY, TOKEN_KEY, USER_INFO_KEY};
use crate::error::{AuthError, Result};

/// Token + profile persistence
///
/// `durable` survives restarts (the browser's localStorage); `session` lives
/// as long as the process (sessionStorage). The lock makes `save` and
/// `clear` appear atomic to readers; concurrent writers resolve last-write-wins.
pub struct CredentialStore {
    durable: Arc<dyn KeyValueStorage>,
    session: Arc<dyn KeyValueStorage>,
    lock: RwLock<()>,
}

impl CredentialStore {
    pub fn new(durable: Arc<dyn KeyValueStorage>, session: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            durable,
            session,
            lock: RwLock::new(()),
        }
    }

    /// Store backed entirely by memory
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), Arc::new(MemoryStorage::new()))
    }

    /// Whether durable storage can be used at all
    pub fn is_available(&self) -> bool {
        self.durable.is_available()
    }

    /// Persist token and profile together
    pub fn save(&self, session: &Session) -> Result<()> {
        let user_json = serde_json::to_string(&session.user)
            .map_err(|e| AuthError::MalformedProfile(e.to_string()))?;

        let _guard = self.lock.write().unwrap_or_else(|e| e.into_inner());
        self.durable.set_items(&[
            (TOKEN_KEY, session.token.as_str()),
            (USER_INFO_KEY, user_json.as_str()),
        ])?;

        tracing::info!(user_id = session.user.id, "Session saved");
        Ok(())
    }

    /// Remove token, profile and the logged-in marker; safe to repeat
    pub fn clear(&self) {
        let _guard = self.lock.write().unwrap_or_else(|e| e.into_inner());

        if let Err(e) = self.durable.remove_items(&[TOKEN_KEY, USER_INFO_KEY]) {
            tracing::warn!("Failed to clear stored credentials: {}", e);
        }
        if let Err(e) = self.session.remove_item(LOGGED_IN_MARKER_KEY) {
            tracing::warn!("Failed to clear login marker: {}", e);
        }
    }

    /// Current session, if both halves are present and decodable
    pub fn read(&self) -> Option<Session> {
        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());
        let token = self.read_token()?;
        let user = self.read_profile()?;
        Some(Session { token, user })
    }

    pub fn token(&self) -> Option<String> {
        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());
        self.read_token()
    }

    /// Stored profile; malformed JSON is logged and treated as absent
    pub fn user_profile(&self) -> Option<UserProfile> {
        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());
        self.read_profile()
    }

    /// Session presence without any network I/O
    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    /// Record that this process logged in successfully
    pub fn mark_logged_in(&self) {
        if let Err(e) = self.session.set_item(LOGGED_IN_MARKER_KEY, "true") {
            tracing::warn!("Failed to set login marker: {}", e);
        }
    }

    pub fn has_logged_in(&self) -> bool {
        matches!(
            self.session.get_item(LOGGED_IN_MARKER_KEY),
            Ok(Some(ref v)) if v == "true"
        )
    }

    fn read_token(&self) -> Option<String> {
        match self.durable.get_item(TOKEN_KEY) {
            Ok(Some(token)) if !token.is_empty() => Some(token),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!("Token read degraded to absent: {}", e);
                None
            }
        }
    }

    fn read_profile(&self) -> Option<UserProfile> {
        let raw = match self.durable.get_item(USER_INFO_KEY) {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => return None,
            Err(e) => {
                tracing::debug!("Profile read degraded to absent: {}", e);
                return None;
            }
        };

        match decode_profile(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::error!("{}", e);
                None
            }
        }
    }
}

/// Strict profile decode
pub fn decode_profile(raw: &str) -> Result<UserProfile> {
    serde_json::from_str(raw).map_err(|e| AuthError::MalformedProfile(e.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::storage::UnavailableStorage;
    use proptest::prelude::*;

    pub(crate) fn sample_profile() -> UserProfile {
        UserProfile {
            id: 42,
            name: "Park Jiwoo".to_string(),
            email: "jiwoo@school.kr".to_string(),
            role: "teacher".to_string(),
            teacher_id: Some("T-0042".to_string()),
            department: Some("Science".to_string()),
            phone: None,
            is_active: Some(true),
            created_at: None,
        }
    }

    #[test]
    fn test_save_then_read_round_trip() {
        let store = CredentialStore::in_memory();
        let session = Session::new("token-abc", sample_profile());

        store.save(&session).unwrap();
        assert_eq!(store.read(), Some(session));
        assert!(store.is_authenticated());
    }

    #[test]
    fn test_clear_then_read_is_absent() {
        let store = CredentialStore::in_memory();
        store.save(&Session::new("token-abc", sample_profile())).unwrap();
        store.mark_logged_in();

        store.clear();
        assert_eq!(store.read(), None);
        assert!(!store.has_logged_in());

        // Idempotent
        store.clear();
        assert_eq!(store.read(), None);
    }

    #[test]
    fn test_malformed_profile_is_absent() {
        let durable = Arc::new(MemoryStorage::new());
        durable.set_item(TOKEN_KEY, "token-abc").unwrap();
        durable.set_item(USER_INFO_KEY, "{not json").unwrap();
        let store = CredentialStore::new(durable, Arc::new(MemoryStorage::new()));

        assert_eq!(store.token().as_deref(), Some("token-abc"));
        assert_eq!(store.user_profile(), None);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_unavailable_storage_degrades() {
        let store = CredentialStore::new(Arc::new(UnavailableStorage), Arc::new(UnavailableStorage));

        assert!(!store.is_available());
        assert_eq!(store.read(), None);
        assert!(!store.is_authenticated());
        assert!(!store.has_logged_in());
        assert!(matches!(
            store.save(&Session::new("t", sample_profile())),
            Err(AuthError::StorageUnavailable(_))
        ));

        // Never panics
        store.clear();
        store.mark_logged_in();
    }

    #[test]
    fn test_logged_in_marker() {
        let store = CredentialStore::in_memory();
        assert!(!store.has_logged_in());
        store.mark_logged_in();
        assert!(store.has_logged_in());
    }

    #[test]
    fn test_last_write_wins() {
        let store = CredentialStore::in_memory();
        store.save(&Session::new("first", sample_profile())).unwrap();
        store.clear();
        store.save(&Session::new("second", sample_profile())).unwrap();
        assert_eq!(store.token().as_deref(), Some("second"));

        store.save(&Session::new("third", sample_profile())).unwrap();
        store.clear();
        assert_eq!(store.read(), None);
    }

    proptest! {
        #[test]
        fn prop_authenticated_iff_token_and_profile(has_token: bool, has_profile: bool) {
            let durable = Arc::new(MemoryStorage::new());
            if has_token {
                durable.set_item(TOKEN_KEY, "token-abc").unwrap();
            }
            if has_profile {
                let json = serde_json::to_string(&sample_profile()).unwrap();
                durable.set_item(USER_INFO_KEY, &json).unwrap();
            }
            let store = CredentialStore::new(durable, Arc::new(MemoryStorage::new()));

            prop_assert_eq!(store.is_authenticated(), has_token && has_profile);
            prop_assert_eq!(store.read().is_some(), store.is_authenticated());
        }

        #[test]
        fn prop_round_trip_any_token(token in "[A-Za-z0-9._-]{1,64}") {
            let store = CredentialStore::in_memory();
            let session = Session::new(token, sample_profile());
            store.save(&session).unwrap();
            prop_assert_eq!(store.read(), Some(session));
        }
    }
}
