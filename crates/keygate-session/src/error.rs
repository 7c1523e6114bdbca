//! Error types for the session layer.

use keygate_protocol::ProtocolError;
use keygate_store::StoreError;

/// Errors that can occur while mutating or recovering the session.
///
/// Corrupt persisted data is deliberately absent: recovery handles it
/// locally by logging out and reports it as
/// [`RecoveryOutcome::Corrupt`](crate::RecoveryOutcome::Corrupt).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A login result was missing the user or the credential.
    /// Nothing was committed.
    #[error("malformed auth response: {0}")]
    MalformedAuthResponse(String),

    /// A user record could not be encoded for persistence.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The persisted store refused a write.
    #[error(transparent)]
    Store(#[from] StoreError),
}
