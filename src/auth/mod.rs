// Authentication module
// Session storage, validation, login/logout and per-view observation

pub(crate) mod credentials;
mod events;
mod login;
mod logout;
mod manager;
mod observer;
mod oracle;
mod startup;
mod storage;
mod types;
pub(crate) mod validator;

pub use credentials::{decode_profile, CredentialStore};
pub use events::{AuthBus, AuthSubscription, StorageChange};
pub use login::LoginClient;
pub use logout::{logout, LogoutNotice};
pub use manager::AuthManager;
pub use observer::{AuthObserver, Revalidation};
pub use oracle::AuthOracle;
pub use startup::{StartupOutcome, StartupValidator};
pub use storage::{spawn_change_watcher, FileStorage, KeyValueStorage, MemoryStorage, UnavailableStorage};
pub use types::{
    token_preview, AuthSnapshot, LoginRequest, LoginResponse, Session, UserProfile,
    ValidationOutcome, LOGGED_IN_MARKER_KEY, TOKEN_KEY, USER_INFO_KEY,
};
pub use validator::SessionValidator;
