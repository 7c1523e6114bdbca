//! Navigation guarding for Keygate.
//!
//! Decides, before a route is entered, whether the current session may
//! enter it or must be sent elsewhere.
//!
//! # Key types
//!
//! - [`RouteTable`]: the known routes plus the login, register and landing paths
//! - [`NavigationGuard`]: the per-navigation decision
//! - [`Router`]: resolves a path, following redirects up to a hop limit

mod error;
mod guard;
mod route;
mod router;

pub use error::GuardError;
pub use guard::{Navigation, NavigationGuard};
pub use route::{Route, RouteTable};
pub use router::{DEFAULT_MAX_HOPS, Resolved, Router};
