//! Unified error type for the Keygate facade.

use keygate_gateway::TransportError;
use keygate_guard::GuardError;
use keygate_protocol::ProtocolError;
use keygate_session::SessionError;
use keygate_store::StoreError;

use crate::ConfigError;

/// Top-level error wrapping every sub-crate error.
///
/// Remote failures are not here: gateway calls report those inside an
/// [`Envelope`](keygate_protocol::Envelope). These are local problems.
#[derive(Debug, thiserror::Error)]
pub enum KeygateError {
    /// Configuration is missing or unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The session store could not be opened, read or written.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A wire value could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Session State refused an operation.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The HTTP transport could not be set up.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Navigation could not be resolved.
    #[error(transparent)]
    Guard(#[from] GuardError),

    /// The operation needs a signed-in user and there is none.
    #[error("not signed in")]
    NotSignedIn,
}
