//! Persisted session storage for Keygate.
//!
//! Provides the [`SessionStore`] trait that abstracts over durable
//! key/value backends, plus the [`Slot`] names the session layer writes.
//!
//! # Feature Flags
//!
//! - `file` (default): [`FileStore`], a JSON file that survives restarts

mod error;
#[cfg(feature = "file")]
mod file;
mod memory;

pub use error::StoreError;
#[cfg(feature = "file")]
pub use file::{FileStore, default_store_path};
pub use memory::MemoryStore;

use std::fmt;

/// A named entry in the persisted record.
///
/// The session is stored as independent slots rather than one blob so a
/// reader can recover whatever survived a partial write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// The bearer credential.
    Credential,
    /// The full user record, serialized as JSON.
    SerializedUser,
    /// The user's id on its own.
    UserId,
    /// The user's email on its own.
    UserEmail,
}

impl Slot {
    /// Every slot, in the order they are written on login.
    pub const ALL: [Slot; 4] = [
        Slot::Credential,
        Slot::SerializedUser,
        Slot::UserId,
        Slot::UserEmail,
    ];

    /// Returns the storage key for this slot.
    pub fn key(self) -> &'static str {
        match self {
            Self::Credential => "access_token",
            Self::SerializedUser => "user_data",
            Self::UserId => "user_id",
            Self::UserEmail => "user_email",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Synchronous durable key/value storage.
///
/// Reads never fail: a backend loads its contents up front and answers
/// from memory. Writes may fail when the backend cannot persist them.
pub trait SessionStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Reads a session slot.
    fn get_slot(&self, slot: Slot) -> Option<String> {
        self.get(slot.key())
    }

    /// Writes a session slot.
    fn set_slot(&self, slot: Slot, value: &str) -> Result<(), StoreError> {
        self.set(slot.key(), value)
    }

    /// Removes a session slot.
    fn remove_slot(&self, slot: Slot) -> Result<(), StoreError> {
        self.remove(slot.key())
    }
}
