//! Session state for Keygate.
//!
//! This crate owns the answer to "who is logged in, and with what
//! credential":
//!
//! 1. **Session State**: [`SessionState`], the single writer for the
//!    in-memory session and its persisted slots
//! 2. **Recovery**: rebuilding the session from the store at boot
//!    ([`RecoveryOutcome`])
//! 3. **Identity resolution**: finding the current user id even when
//!    memory and persistence disagree ([`ResolvedIdentity`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Guard / application root (above)  ← read and drive the session
//!     ↕
//! Session Layer (this crate)  ← keeps memory and slots consistent
//!     ↕
//! Store + Protocol (below)  ← durable slots, User / Credential types
//! ```

mod error;
mod resolver;
mod state;

pub use error::SessionError;
pub use resolver::{IdentitySource, ResolvedIdentity};
pub use state::{RecoveryOutcome, Session, SessionState, SessionStatus};
