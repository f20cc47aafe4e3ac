//! Canned collaborators for the seams around the catalog service.

use async_trait::async_trait;
use marquee_core::access::{AccessControl, Actor, Capability};
use marquee_core::availability::{AvailabilityProvider, QuotaSnapshot};
use marquee_core::cache::CacheInvalidator;
use marquee_core::entities::Quota;
use marquee_core::ids::{ActorId, EventId, ItemId};
use marquee_core::store::StoreError;
use std::sync::{Mutex, PoisonError};

/// Access control that authenticates every non-empty token as actor `1` and
/// grants every capability.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

#[async_trait]
impl AccessControl for AllowAll {
    async fn authenticate(&self, token: &str) -> Result<Option<Actor>, StoreError> {
        Ok((!token.is_empty()).then(|| Actor {
            id: ActorId::new(1),
            email: "admin@example.org".into(),
        }))
    }

    async fn allows(
        &self,
        _actor: ActorId,
        _event: EventId,
        _capability: Capability,
    ) -> Result<bool, StoreError> {
        Ok(true)
    }
}

/// Access control that authenticates like [`AllowAll`] but denies every
/// capability check.
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyAll;

#[async_trait]
impl AccessControl for DenyAll {
    async fn authenticate(&self, token: &str) -> Result<Option<Actor>, StoreError> {
        Ok((!token.is_empty()).then(|| Actor {
            id: ActorId::new(1),
            email: "admin@example.org".into(),
        }))
    }

    async fn allows(
        &self,
        _actor: ActorId,
        _event: EventId,
        _capability: Capability,
    ) -> Result<bool, StoreError> {
        Ok(false)
    }
}

/// Cache invalidator that records every call for assertions.
#[derive(Debug, Default)]
pub struct RecordingInvalidator {
    calls: Mutex<Vec<(EventId, ItemId)>>,
}

impl RecordingInvalidator {
    /// Every `(event, item)` pair invalidated so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<(EventId, ItemId)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CacheInvalidator for RecordingInvalidator {
    fn invalidate(&self, event: EventId, item: ItemId) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((event, item));
    }
}

/// Availability provider that answers every quota with fixed snapshots.
///
/// The default reports an unlimited, fully open quota. Tests exercising the
/// sold-out hint configure a second snapshot for `ignore_closed` probes via
/// [`StaticAvailability::when_ignoring_closed`].
#[derive(Debug, Clone, Copy)]
pub struct StaticAvailability {
    open: QuotaSnapshot,
    ignoring_closed: QuotaSnapshot,
}

impl Default for StaticAvailability {
    fn default() -> Self {
        Self::new(QuotaSnapshot::unlimited(0, 0))
    }
}

impl StaticAvailability {
    /// Answers every probe with the given snapshot.
    #[must_use]
    pub const fn new(snapshot: QuotaSnapshot) -> Self {
        Self {
            open: snapshot,
            ignoring_closed: snapshot,
        }
    }

    /// Overrides the answer for probes that ignore the closed flag.
    #[must_use]
    pub const fn when_ignoring_closed(mut self, snapshot: QuotaSnapshot) -> Self {
        self.ignoring_closed = snapshot;
        self
    }
}

#[async_trait]
impl AvailabilityProvider for StaticAvailability {
    async fn snapshot(
        &self,
        _quota: &Quota,
        ignore_closed: bool,
    ) -> Result<QuotaSnapshot, StoreError> {
        Ok(if ignore_closed {
            self.ignoring_closed
        } else {
            self.open
        })
    }
}
