// Route guard
// Gates protected paths behind an explicit "login required" prompt

use std::sync::Arc;

use super::paths::{is_gated, LOGIN_PATH, ROOT_PATH};
use crate::auth::AuthOracle;

/// Something that can change the current location
pub trait Navigator {
    fn replace(&self, path: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    NotMounted,
    /// Mounted, no decision yet; children render so first paint matches
    Unchecked,
    /// Children render, no prompt
    Allowed,
    /// Children suppressed, login prompt shown
    Blocked,
}

/// Per-subtree protection state machine
///
/// Never redirects on its own: a blocked path waits for `confirm` (go to
/// login) or `cancel` (go home).
pub struct RouteGuard {
    oracle: Arc<dyn AuthOracle>,
    path: String,
    state: GuardState,
}

impl RouteGuard {
    pub fn new(oracle: Arc<dyn AuthOracle>) -> Self {
        Self {
            oracle,
            path: String::new(),
            state: GuardState::NotMounted,
        }
    }

    /// First mount: render unconditionally, decide afterwards
    pub fn mount(&mut self, path: &str) -> GuardState {
        self.path = path.to_string();
        self.state = GuardState::Unchecked;
        self.state
    }

    /// Post-mount decision for the current path
    pub fn check(&mut self) -> GuardState {
        if self.state == GuardState::NotMounted {
            return self.state;
        }

        self.state = if !is_gated(&self.path) || self.oracle.is_authenticated() {
            GuardState::Allowed
        } else {
            GuardState::Blocked
        };

        tracing::debug!(path = %self.path, state = ?self.state, "Route guard evaluated");
        self.state
    }

    /// Path changed: decide again
    pub fn navigate(&mut self, path: &str) -> GuardState {
        if self.state == GuardState::NotMounted {
            self.mount(path);
        } else {
            self.path = path.to_string();
        }
        self.check()
    }

    /// Session state changed underneath the current view
    pub fn reevaluate(&mut self) -> GuardState {
        self.check()
    }

    /// User accepted the prompt
    pub fn confirm(&self, navigator: &dyn Navigator) {
        if self.state == GuardState::Blocked {
            tracing::info!(from = %self.path, "Login confirmed, navigating to login");
            navigator.replace(LOGIN_PATH);
        }
    }

    /// User dismissed the prompt
    pub fn cancel(&self, navigator: &dyn Navigator) {
        if self.state == GuardState::Blocked {
            navigator.replace(ROOT_PATH);
        }
    }

    pub fn unmount(&mut self) {
        self.state = GuardState::NotMounted;
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn renders_children(&self) -> bool {
        matches!(self.state, GuardState::Unchecked | GuardState::Allowed)
    }

    pub fn shows_login_prompt(&self) -> bool {
        self.state == GuardState::Blocked
    }
}
