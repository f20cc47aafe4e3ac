//! Token and permission lookups backed by Postgres.

use async_trait::async_trait;
use marquee_core::access::{AccessControl, Actor, Capability};
use marquee_core::ids::{ActorId, EventId};
use marquee_core::store::StoreError;
use sqlx::postgres::PgPool;

/// [`AccessControl`] reading the `access_tokens` and `event_permissions`
/// tables.
#[derive(Clone)]
pub struct PgAccessControl {
    pool: PgPool,
}

impl PgAccessControl {
    /// Wraps an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl std::fmt::Debug for PgAccessControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgAccessControl").finish_non_exhaustive()
    }
}

#[async_trait]
impl AccessControl for PgAccessControl {
    async fn authenticate(&self, token: &str) -> Result<Option<Actor>, StoreError> {
        let row: Option<(i64, String)> = sqlx::query_as(
            "SELECT actor_id, email FROM access_tokens WHERE token = $1 AND active",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to resolve token: {e}")))?;
        Ok(row.map(|(actor_id, email)| Actor {
            id: ActorId::new(actor_id),
            email,
        }))
    }

    async fn allows(
        &self,
        actor: ActorId,
        event: EventId,
        capability: Capability,
    ) -> Result<bool, StoreError> {
        let (allowed,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM event_permissions \
             WHERE actor_id = $1 AND event_id = $2 AND capability = $3)",
        )
        .bind(actor.raw())
        .bind(event.raw())
        .bind(capability.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to check permission: {e}")))?;
        Ok(allowed)
    }
}
