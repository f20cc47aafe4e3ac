//! Token authentication and per-event capability checks.

use crate::ids::{ActorId, EventId};
use crate::store::StoreError;
use async_trait::async_trait;

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Stable identifier, stamped into audit records.
    pub id: ActorId,
    /// Contact address, for log context only.
    pub email: String,
}

/// Grants checked against an event before catalog work runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Create, change, reorder, and delete catalog objects.
    ChangeItems,
}

impl Capability {
    /// The grant's stored name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChangeItems => "can_change_items",
        }
    }
}

/// Resolves bearer tokens and answers capability questions.
#[async_trait]
pub trait AccessControl: Send + Sync {
    /// Resolves a bearer token to its actor, or `None` for unknown or
    /// revoked tokens.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the lookup fails.
    async fn authenticate(&self, token: &str) -> Result<Option<Actor>, StoreError>;

    /// Whether the actor holds the capability on the event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the lookup fails.
    async fn allows(
        &self,
        actor: ActorId,
        event: EventId,
        capability: Capability,
    ) -> Result<bool, StoreError>;
}
