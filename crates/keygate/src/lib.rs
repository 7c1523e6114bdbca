//! # Keygate
//!
//! Session management and authenticated API access for a bond portfolio
//! client.
//!
//! Keygate keeps one session (user plus bearer credential) in memory and
//! in a durable store, recovers it on start, injects the credential into
//! every resource API call, and guards navigation so protected pages are
//! only reached with a session.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use keygate::prelude::*;
//!
//! # async fn run() -> Result<(), KeygateError> {
//! keygate::telemetry::init();
//! let app = Keygate::builder(KeygateConfig::from_env()?).build()?;
//!
//! match app.login("ana@example.com", "secret").await? {
//!     Envelope::Success(user) => println!("signed in as {}", user.email),
//!     Envelope::Failure(failure) => println!("login failed: {failure}"),
//! }
//! let landing = app.navigate("/")?;
//! println!("now at {}", landing.path);
//! # Ok(())
//! # }
//! ```

mod app;
mod config;
mod error;
pub mod telemetry;

pub use app::{Keygate, KeygateBuilder};
pub use config::{
    ConfigError, ENV_API_KEY, ENV_PROVIDER_URL, ENV_STORE_PATH, ENV_TIMEOUT_SECS, KeygateConfig,
};
pub use error::KeygateError;

pub use keygate_gateway as gateway;
pub use keygate_guard as guard;
pub use keygate_protocol as protocol;
pub use keygate_session as session;
pub use keygate_store as store;

/// The types most applications need.
pub mod prelude {
    pub use crate::{ConfigError, Keygate, KeygateBuilder, KeygateConfig, KeygateError};
    pub use keygate_gateway::{AuthClient, BondClient, FlowClient, RequestOptions};
    pub use keygate_guard::{Navigation, Resolved, Route, RouteTable};
    pub use keygate_protocol::{
        Bond, BondFlow, BondId, BondMetric, Envelope, Failure, FailureKind, User, UserId,
    };
    pub use keygate_session::{RecoveryOutcome, SessionState, SessionStatus};
    pub use keygate_store::{FileStore, MemoryStore, SessionStore, Slot};
}
