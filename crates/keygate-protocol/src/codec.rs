//! Codec trait and implementation for persisted records.
//!
//! Persisted slots hold strings. A "codec" converts between Rust types and
//! that text form. The session layer only needs something implementing
//! [`Codec`]; [`JsonCodec`] is the one the rest of the stack agrees on,
//! since the same JSON is what the identity provider sent us.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to text and decodes them back.
///
/// `Send + Sync + 'static` lets a codec live inside shared, long-lived
/// state such as the session object behind an `Arc`.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into text.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes text back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the text is malformed or does
    /// not match the expected type.
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use keygate_protocol::{Codec, JsonCodec, User};
///
/// let codec = JsonCodec;
/// let user = User::new("u1", "a@b.com");
///
/// let text = codec.encode(&user).unwrap();
/// let back: User = codec.decode(&text).unwrap();
/// assert_eq!(user, back);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::User;

    #[test]
    fn test_decode_invalid_json_returns_decode_error() {
        let result: Result<User, _> = JsonCodec.decode("{not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_user_without_id_returns_decode_error() {
        let result: Result<User, _> = JsonCodec.decode(r#"{"email":"a@b.com"}"#);
        assert!(
            matches!(result, Err(ProtocolError::Decode(_))),
            "a user record must carry an id"
        );
    }

    #[test]
    fn test_encode_user_is_plain_object() {
        let text = JsonCodec.encode(&User::new("u1", "a@b.com")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["id"], "u1");
        assert_eq!(value["email"], "a@b.com");
    }
}
