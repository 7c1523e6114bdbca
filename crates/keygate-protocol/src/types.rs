//! Identity types: who the user is and what proves it.
//!
//! These are the shapes the identity provider sends back and the shapes
//! the session layer persists. Anything the provider sends that we do not
//! model explicitly is kept verbatim, so a user written to a slot and read
//! back later is the same record.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// UserId
// ---------------------------------------------------------------------------

/// The identity provider's identifier for a user.
///
/// A newtype over `String` so an id cannot be confused with an email or a
/// token in a function signature. `#[serde(transparent)]` keeps it a plain
/// string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Creates a `UserId` from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// The authenticated user's record.
///
/// Only `id` and `email` are required. Every other field the provider
/// returns (`role`, `created_at`, metadata objects, ...) lands in `extra`
/// through `#[serde(flatten)]` and is written back out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Stable identifier; the owner key for resource rows.
    pub id: UserId,

    /// The email the user signed in with.
    pub email: String,

    /// Provider fields we carry but do not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Creates a user with no extra fields.
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: UserId::new(id),
            email: email.into(),
            extra: Map::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// An opaque bearer token issued by the identity provider.
///
/// `Debug` is implemented by hand so a token never ends up in a log line
/// through `{:?}`. Use [`as_str`](Self::as_str) when the raw value is
/// genuinely needed (persisting it, building the `Authorization` header).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Wraps a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the `Authorization` header value for this token.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// AuthResponse / IdentityPayload
// ---------------------------------------------------------------------------

/// The identity provider's answer to a password login, as received.
///
/// Both fields are optional here because the provider does not guarantee
/// them; [`into_identity`](Self::into_identity) is the single place that
/// decides whether the answer is complete enough to become a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// The bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// The authenticated user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,

    /// Token type reported by the provider (normally `"bearer"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Lifetime of the token in seconds, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

impl AuthResponse {
    /// Builds a complete response from a user and a token.
    pub fn new(user: User, access_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            user: Some(user),
            ..Self::default()
        }
    }

    /// Validates the response into a user/credential pair.
    ///
    /// An empty token counts as missing.
    ///
    /// # Errors
    /// Returns [`ProtocolError::MalformedResponse`] naming the first
    /// missing field.
    pub fn into_identity(self) -> Result<IdentityPayload, ProtocolError> {
        let user = self
            .user
            .ok_or_else(|| ProtocolError::MalformedResponse("missing user".into()))?;
        let token = self
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ProtocolError::MalformedResponse("missing access_token".into())
            })?;
        Ok(IdentityPayload {
            user,
            credential: Credential::new(token),
        })
    }

    /// Returns `true` if both the user and a non-empty token are present.
    pub fn is_complete(&self) -> bool {
        self.user.is_some()
            && self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// A validated login result: a user together with their credential.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityPayload {
    /// Who logged in.
    pub user: User,
    /// What proves it.
    pub credential: Credential,
}

// ---------------------------------------------------------------------------
// SignupResponse
// ---------------------------------------------------------------------------

/// The identity provider's answer to a registration.
///
/// Depending on provider settings the new user arrives nested under
/// `user` or as the top-level object; [`user`](Self::user) hides that.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignupResponse {
    /// The nested user, when the provider nests it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,

    /// Top-level id, when the provider returns the user unwrapped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,

    /// Top-level email, when the provider returns the user unwrapped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Provider-reported error text on an otherwise 2xx answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SignupResponse {
    /// Returns the registered user, whichever shape the provider used.
    pub fn registered_user(&self) -> Option<User> {
        if let Some(user) = &self.user {
            return Some(user.clone());
        }
        match (&self.id, &self.email) {
            (Some(id), Some(email)) => Some(User::new(id.0.clone(), email.clone())),
            _ => None,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
