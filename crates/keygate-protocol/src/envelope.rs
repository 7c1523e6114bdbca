//! The request envelope: the uniform outcome of every gateway call.
//!
//! A call either succeeded and carries data, or failed and carries a
//! message. There is no third state. Callers never see a transport error
//! or a status code directly; both are folded into [`Failure`].
//!
//! ```text
//! { "success": true,  "data": ... }
//! { "success": false, "error": "..." }
//! ```

use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Why a call failed.
///
/// The message alone is what the wire shape exposes; the kind is kept so
/// callers and logs can tell a dead network from a rejected request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No response arrived (DNS, refused connection, TLS, timeout).
    Transport,

    /// The server answered with a non-2xx status.
    Rejected { status: u16 },

    /// The server answered 2xx but the body did not fit the schema.
    Malformed,
}

/// A failed call: a human-readable message plus its [`FailureKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Failure {
    /// What went wrong.
    pub kind: FailureKind,
    /// The message shown to users, taken from the provider when it sent one.
    pub message: String,
}

/// Outcome of a gateway call.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    /// The call succeeded; here is the payload.
    Success(T),
    /// The call failed; here is why.
    Failure(Failure),
}

impl<T> Envelope<T> {
    /// Wraps a successful payload.
    pub fn success(data: T) -> Self {
        Self::Success(data)
    }

    /// Builds a failure of the given kind.
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure(Failure {
            kind,
            message: message.into(),
        })
    }

    /// Builds a [`FailureKind::Transport`] failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::failure(FailureKind::Transport, message)
    }

    /// Builds a [`FailureKind::Rejected`] failure.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::failure(FailureKind::Rejected { status }, message)
    }

    /// Builds a [`FailureKind::Malformed`] failure.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::failure(FailureKind::Malformed, message)
    }

    /// Returns `true` for [`Envelope::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the payload, if the call succeeded.
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success(data) => Some(data),
            Self::Failure(_) => None,
        }
    }

    /// Returns the error message, if the call failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(&failure.message),
        }
    }

    /// Returns the failure kind, if the call failed.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure.kind),
        }
    }

    /// Converts into a `Result`, for callers that want `?`.
    pub fn into_result(self) -> Result<T, Failure> {
        match self {
            Self::Success(data) => Ok(data),
            Self::Failure(failure) => Err(failure),
        }
    }

    /// Transforms the payload of a successful envelope.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        match self {
            Self::Success(data) => Envelope::Success(f(data)),
            Self::Failure(failure) => Envelope::Failure(failure),
        }
    }

    /// Chains a step that may itself fail.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Envelope<U>) -> Envelope<U> {
        match self {
            Self::Success(data) => f(data),
            Self::Failure(failure) => Envelope::Failure(failure),
        }
    }
}

impl<T> From<Result<T, Failure>> for Envelope<T> {
    fn from(result: Result<T, Failure>) -> Self {
        match result {
            Ok(data) => Self::Success(data),
            Err(failure) => Self::Failure(failure),
        }
    }
}

impl<T: Serialize> Serialize for Envelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Envelope", 2)?;
        match self {
            Self::Success(data) => {
                state.serialize_field("success", &true)?;
                state.serialize_field("data", data)?;
            }
            Self::Failure(failure) => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", &failure.message)?;
            }
        }
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_serializes_with_data() {
        let env = Envelope::success(vec![1, 2]);
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "data": [1, 2]}));
    }

    #[test]
    fn test_failure_serializes_with_error_only() {
        let env: Envelope<()> = Envelope::rejected(404, "not found");
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "error": "not found"})
        );
    }

    #[test]
    fn test_accessors_on_failure() {
        let env: Envelope<u8> = Envelope::transport("dns error");
        assert!(!env.is_success());
        assert_eq!(env.data(), None);
        assert_eq!(env.error(), Some("dns error"));
        assert_eq!(env.failure_kind(), Some(FailureKind::Transport));
    }

    #[test]
    fn test_and_then_short_circuits_on_failure() {
        let env: Envelope<u8> = Envelope::malformed("bad");
        let chained = env.and_then(|n| Envelope::success(n + 1));
        assert_eq!(chained.failure_kind(), Some(FailureKind::Malformed));
    }

    #[test]
    fn test_into_result_roundtrips_failure_message() {
        let env: Envelope<u8> = Envelope::rejected(500, "boom");
        let err = env.into_result().unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.kind, FailureKind::Rejected { status: 500 });
    }
}
