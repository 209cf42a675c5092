// Routing module
// Path classification and the route guard

pub mod guard;
pub mod paths;

pub use guard::{GuardState, Navigator, RouteGuard};
pub use paths::{classify, is_gated, PathClass};
