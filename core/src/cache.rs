//! Shop-page cache invalidation seam.
//!
//! Whenever an item's mutable fields change, the service enqueues an
//! invalidation for that item's shop pages after the transaction commits. The
//! call is fire-and-forget: implementations hand the work to a queue and
//! never block, retry, or fail the request that triggered them.

use crate::ids::{EventId, ItemId};

/// Enqueues shop-page invalidations.
pub trait CacheInvalidator: Send + Sync {
    /// Schedules the item's pages for re-rendering. Must not block.
    fn invalidate(&self, event: EventId, item: ItemId);
}

/// Invalidator that drops every request, for deployments without a shop
/// cache.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInvalidator;

impl CacheInvalidator for NoopInvalidator {
    fn invalidate(&self, _event: EventId, _item: ItemId) {}
}
