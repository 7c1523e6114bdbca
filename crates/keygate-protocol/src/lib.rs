//! Wire schemas for Keygate.
//!
//! This crate defines the shapes that cross the network boundary and the
//! persisted-slot boundary:
//!
//! - **Identity** ([`User`], [`UserId`], [`Credential`], [`AuthResponse`],
//!   [`IdentityPayload`], [`SignupResponse`]): what the identity provider
//!   returns and what the session layer keeps.
//! - **Records** ([`Bond`], [`BondFlow`], [`BondMetric`]): the resource
//!   API's rows.
//! - **Envelope** ([`Envelope`], [`Failure`], [`FailureKind`]): the
//!   two-shape outcome of every gateway call.
//! - **Codec** ([`Codec`], [`JsonCodec`]): how records are turned into
//!   the strings that live in persisted slots.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Gateway (HTTP bytes) → Protocol (typed schema) → Session (identity)
//! ```

mod codec;
mod envelope;
mod error;
mod records;
mod types;

pub use codec::{Codec, JsonCodec};
pub use envelope::{Envelope, Failure, FailureKind};
pub use error::ProtocolError;
pub use records::{Bond, BondFlow, BondId, BondMetric};
pub use types::{
    AuthResponse, Credential, IdentityPayload, SignupResponse, User, UserId,
};
