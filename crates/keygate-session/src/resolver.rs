//! Identity resolution: the current user's id, from whichever source has it.
//!
//! Memory, the standalone id slot and the serialized user record can drift
//! apart (a slot written by one code path, the record by another). The
//! resolver tries them in order of authority and tags the answer with the
//! tier that produced it, so drift shows up in logs instead of being
//! silently absorbed.

use std::fmt;

use keygate_protocol::{Codec, UserId};
use keygate_store::Slot;
use serde::Deserialize;

use crate::SessionState;

/// Which tier answered an identity lookup, most authoritative first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    /// The in-memory session user.
    Memory,
    /// The persisted standalone `user_id` slot.
    PersistedId,
    /// The `id` field of the persisted serialized user.
    PersistedRecord,
}

impl fmt::Display for IdentitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::PersistedId => write!(f, "persisted-id"),
            Self::PersistedRecord => write!(f, "persisted-record"),
        }
    }
}

/// A user id together with the tier it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub user_id: UserId,
    pub source: IdentitySource,
}

/// Just enough of a persisted user record to read its id.
#[derive(Deserialize)]
struct IdOnly {
    id: UserId,
}

impl<C: Codec> SessionState<C> {
    /// Resolves the current user's id. First tier with a value wins:
    ///
    /// 1. in-memory session user
    /// 2. persisted `user_id` slot
    /// 3. `id` of the persisted serialized user
    ///
    /// Returns `None` when no tier has a value. Never fails; an
    /// unparseable record is logged and treated as absent.
    pub fn resolve_user_id(&self) -> Option<ResolvedIdentity> {
        let persisted_id = self
            .store()
            .get_slot(Slot::UserId)
            .filter(|id| !id.is_empty());

        if let Some(user) = self.user() {
            if let Some(slot_id) = persisted_id.as_deref() {
                if slot_id != user.id.as_str() {
                    tracing::warn!(
                        memory = %user.id,
                        persisted = slot_id,
                        "user id slot disagrees with session"
                    );
                }
            }
            tracing::debug!(user_id = %user.id, source = %IdentitySource::Memory, "user id resolved");
            return Some(ResolvedIdentity {
                user_id: user.id,
                source: IdentitySource::Memory,
            });
        }

        if let Some(id) = persisted_id {
            return Some(fallback(UserId(id), IdentitySource::PersistedId));
        }

        let raw = self.store().get_slot(Slot::SerializedUser)?;
        match self.codec().decode::<IdOnly>(&raw) {
            Ok(record) => Some(fallback(record.id, IdentitySource::PersistedRecord)),
            Err(e) => {
                tracing::warn!(error = %e, "persisted user record unreadable");
                None
            }
        }
    }

    /// Shorthand for [`resolve_user_id`](Self::resolve_user_id) without
    /// the source tag.
    pub fn current_user_id(&self) -> Option<UserId> {
        self.resolve_user_id().map(|resolved| resolved.user_id)
    }
}

fn fallback(user_id: UserId, source: IdentitySource) -> ResolvedIdentity {
    tracing::warn!(%user_id, %source, "user id resolved from fallback tier");
    ResolvedIdentity { user_id, source }
}
