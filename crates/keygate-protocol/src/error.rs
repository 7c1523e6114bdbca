//! Error types for the protocol layer.
//!
//! Each crate in Keygate defines its own error enum. A `ProtocolError`
//! always means a value did not have the shape we expected, never that
//! the network or the store misbehaved.

/// Errors that can occur while encoding, decoding, or validating payloads.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into text).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning text into a Rust value).
    ///
    /// Common causes: malformed JSON, a persisted slot written by an
    /// older build, or a truncated value.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The payload parsed but is missing fields the caller depends on.
    ///
    /// The identity provider answering a login without a user or
    /// without an access token is the canonical case.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}
