/// Errors where no HTTP response was obtained.
///
/// The gateway never returns these; it turns them into transport
/// failures inside an envelope, keeping the display text as the message.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request could not be assembled (bad URL, invalid header).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The server could not be reached (DNS, refused, TLS).
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request or response did not complete in time.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// Any other transport-level failure.
    #[error("request failed: {0}")]
    Other(String),
}
