// Logout procedure

use super::credentials::CredentialStore;
use super::events::AuthBus;
use super::validator::SessionValidator;

/// What happened to the server-side notification step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutNotice {
    /// Server acknowledged the logout
    Sent,
    /// Notification failed or timed out; local state was cleared anyway
    Failed,
    /// No token was stored, nothing to notify
    Skipped,
}

/// Notify the server (best effort), clear local state, broadcast
///
/// Local clearing runs after the notification settles and is never skipped.
pub async fn logout(
    store: &CredentialStore,
    validator: &SessionValidator,
    bus: &AuthBus,
) -> LogoutNotice {
    let notice = match store.token() {
        Some(token) => match validator.notify_logout(&token).await {
            Ok(()) => LogoutNotice::Sent,
            Err(e) => {
                tracing::warn!("Logout notification failed, clearing locally: {}", e);
                LogoutNotice::Failed
            }
        },
        None => LogoutNotice::Skipped,
    };

    store.clear();
    bus.notify_state_changed();

    tracing::info!(notice = ?notice, "Logged out");
    notice
}
