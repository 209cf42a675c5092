// Path classification
// Static allow-list and protected-prefix list for the teacher console

/// Login entry point
pub const LOGIN_PATH: &str = "/login";

/// Public root
pub const ROOT_PATH: &str = "/";

/// Paths open to everyone, matched exactly
pub const PUBLIC_PATHS: &[&str] = &["/", "/login", "/register", "/find-account"];

/// Prefixes that require a session
pub const PROTECTED_PREFIXES: &[&str] = &[
    "/dashboard",
    "/night-study",
    "/sae-teuk",
    "/study-room",
    "/subject-survey",
    "/attendance",
    "/content-filter",
];

/// Pages where a session is created rather than checked
pub const AUTH_ENTRY_PATHS: &[&str] = &["/login", "/register", "/find-account"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    Public,
    Protected,
    /// Neither list; not gated
    Unclassified,
}

/// Classify a navigation path; pure and identical on every evaluation
pub fn classify(path: &str) -> PathClass {
    if PUBLIC_PATHS.contains(&path) {
        PathClass::Public
    } else if PROTECTED_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
    {
        PathClass::Protected
    } else {
        PathClass::Unclassified
    }
}

/// Whether visiting `path` requires a session
pub fn is_gated(path: &str) -> bool {
    classify(path) == PathClass::Protected
}

pub fn is_auth_entry(path: &str) -> bool {
    AUTH_ENTRY_PATHS.contains(&path)
}
