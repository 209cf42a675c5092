// Error handling module
// Defines the session error taxonomy and the inline login messages

use thiserror::Error;

/// Coarse category of a failed HTTP exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// The per-request deadline elapsed
    Timeout,
    /// Could not open a connection (DNS, refused, unreachable)
    Connect,
    /// Anything else reqwest reports before a status line arrives
    Other,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Timeout => "timeout",
            TransportKind::Connect => "connection_failed",
            TransportKind::Other => "request_error",
        }
    }
}

/// Errors produced by the session core
#[derive(Error, Debug)]
pub enum AuthError {
    /// Network unreachable, timed out or aborted
    #[error("Transport error ({}): {message}", .kind.as_str())]
    Transport { kind: TransportKind, message: String },

    /// The server answered and refused the credentials or token
    #[error("Authentication rejected: {status} - {message}")]
    AuthRejected { status: u16, message: String },

    /// Storage backend cannot be used in this execution context
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Stored or received profile JSON does not decode
    #[error("Malformed user profile: {0}")]
    MalformedProfile(String),

    /// The server answered with something we cannot interpret
    #[error("Unexpected response: {status} - {body}")]
    UnexpectedResponse { status: u16, body: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// Classify a reqwest failure that happened before any response arrived
    pub fn transport(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportKind::Timeout
        } else if err.is_connect() {
            TransportKind::Connect
        } else {
            TransportKind::Other
        };

        AuthError::Transport {
            kind,
            message: err.to_string(),
        }
    }

    /// True when the failure says nothing about the session itself
    pub fn is_transport(&self) -> bool {
        matches!(self, AuthError::Transport { .. })
    }

    /// Text shown inline under the login form
    pub fn user_message(&self, base_url: &str) -> String {
        match self {
            AuthError::AuthRejected { message, .. } => message.clone(),
            AuthError::Transport {
                kind: TransportKind::Timeout,
                ..
            } => format!(
                "The request timed out. Check that the server ({}) is running.",
                base_url
            ),
            AuthError::Transport {
                kind: TransportKind::Connect,
                ..
            } => format!(
                "Cannot connect to the server ({}). Check that it is running and reachable.",
                base_url
            ),
            AuthError::Transport { message, .. } => format!("Connection error: {}", message),
            AuthError::UnexpectedResponse { status, body } => {
                let preview: String = body.chars().take(200).collect();
                format!("Server response error ({}): {}", status, preview)
            }
            AuthError::MalformedProfile(_) => {
                "Signed in, but the user profile could not be read. Please try again.".to_string()
            }
            AuthError::StorageUnavailable(_) => {
                "Signed in, but the session could not be saved on this device.".to_string()
            }
            AuthError::Config(msg) => format!("Configuration error: {}", msg),
            AuthError::Internal(_) => "Server connection failed.".to_string(),
        }
    }
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, AuthError>;
