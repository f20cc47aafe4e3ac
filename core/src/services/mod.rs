//! Per-entity orchestration.
//!
//! One service struct ties the boundary traits together; each method is one
//! administrative operation, executed as resolve event, check capability,
//! open a transaction, plan, apply writes plus audit records, commit. Any
//! failure before commit leaves no trace.

mod categories;
mod items;
mod questions;
mod quotas;

pub use items::{ItemDetail, ItemOverview, ItemRemoval};
pub use questions::{AnswerStat, QuestionDetail};
pub use quotas::{QuotaDetail, QuotaOverview};

use crate::access::{AccessControl, Capability};
use crate::audit::AuditEntry;
use crate::availability::AvailabilityProvider;
use crate::cache::CacheInvalidator;
use crate::entities::EventRecord;
use crate::error::CatalogError;
use crate::extensions::ExtensionRegistry;
use crate::ids::{ActorId, EventId, ItemId};
use crate::store::{CatalogStore, CatalogTransaction, StoreError};
use metrics::counter;
use std::sync::Arc;

/// The catalog administration service.
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    access: Arc<dyn AccessControl>,
    cache: Arc<dyn CacheInvalidator>,
    availability: Arc<dyn AvailabilityProvider>,
    extensions: ExtensionRegistry,
}

impl CatalogService {
    /// Wires the service to its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn CatalogStore>,
        access: Arc<dyn AccessControl>,
        cache: Arc<dyn CacheInvalidator>,
        availability: Arc<dyn AvailabilityProvider>,
        extensions: ExtensionRegistry,
    ) -> Self {
        Self {
            store,
            access,
            cache,
            availability,
            extensions,
        }
    }

    /// Resolves the event and checks the actor's `can_change_items` grant.
    /// Runs first in every operation so a denied actor causes no side
    /// effects.
    async fn authorize(
        &self,
        actor: ActorId,
        event: EventId,
    ) -> Result<EventRecord, CatalogError> {
        let record = self
            .store
            .event(event)
            .await?
            .ok_or(CatalogError::EventNotFound)?;
        if !self
            .access
            .allows(actor, event, Capability::ChangeItems)
            .await?
        {
            return Err(CatalogError::PermissionDenied);
        }
        Ok(record)
    }
}

/// Appends an audit record through the transaction and counts it.
async fn audit(
    tx: &mut dyn CatalogTransaction,
    entry: AuditEntry,
) -> Result<(), StoreError> {
    counter!("catalog_audit_records_total", "action" => entry.action.as_str()).increment(1);
    tx.record_audit(entry).await
}

/// Deduplicates submitted item links and checks they all live in the event.
async fn resolve_items(
    tx: &mut dyn CatalogTransaction,
    event: EventId,
    ids: &[ItemId],
) -> Result<Vec<ItemId>, CatalogError> {
    let mut unique: Vec<ItemId> = ids.to_vec();
    unique.sort_unstable_by_key(|id| id.raw());
    unique.dedup();
    let resolved = tx.items_by_ids(event, &unique).await?;
    if resolved.len() != unique.len() {
        return Err(CatalogError::invalid("items", "Invalid item selection."));
    }
    Ok(unique)
}

/// Counts one reconciliation: how many rows moved and how many writes the
/// differ saved.
fn note_reorder(entity: &'static str, scope_size: usize, changed: usize) {
    counter!("catalog_reorders_total", "entity" => entity).increment(1);
    counter!("catalog_position_writes_total", "entity" => entity).increment(as_count(changed));
    counter!("catalog_writes_avoided_total", "entity" => entity)
        .increment(as_count(scope_size.saturating_sub(changed)));
}

fn as_count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}
