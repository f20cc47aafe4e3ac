//! Live quota availability seam.
//!
//! Quota detail pages show how much of a quota is spoken for. Computing that
//! touches order data outside this crate's writes, so it sits behind a trait.

use crate::entities::Quota;
use crate::store::StoreError;
use async_trait::async_trait;
use serde::Serialize;

/// How available a quota currently is, worst state first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityLevel {
    /// Nothing left; includes manually closed quotas.
    Gone,
    /// Exhausted by paid and pending orders.
    Ordered,
    /// Exhausted once active carts are counted.
    Reserved,
    /// Capacity remains.
    Ok,
}

impl AvailabilityLevel {
    /// Numeric code as shown in quota listings.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Ok => 100,
            Self::Reserved => 80,
            Self::Ordered => 50,
            Self::Gone => 0,
        }
    }
}

/// Point-in-time usage of one quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaSnapshot {
    /// Overall verdict.
    pub level: AvailabilityLevel,
    /// Units still free; `None` for unlimited quotas.
    pub remaining: Option<i64>,
    /// Units consumed by paid orders.
    pub paid_orders: i64,
    /// Units held by pending orders.
    pub pending_orders: i64,
}

impl QuotaSnapshot {
    /// Snapshot of an unlimited quota.
    #[must_use]
    pub const fn unlimited(paid_orders: i64, pending_orders: i64) -> Self {
        Self {
            level: AvailabilityLevel::Ok,
            remaining: None,
            paid_orders,
            pending_orders,
        }
    }

    /// Whether demand alone exhausts the quota, regardless of the closed
    /// flag. Drives the sold-out hint on closed quotas.
    #[must_use]
    pub fn sold_out(&self) -> bool {
        self.level <= AvailabilityLevel::Ordered
    }
}

/// Computes quota usage from live order data.
#[async_trait]
pub trait AvailabilityProvider: Send + Sync {
    /// Current usage of the quota. With `ignore_closed`, a closed quota is
    /// assessed as if it were open, which tells apart "closed by hand" from
    /// "closed and genuinely sold out".
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if order data cannot be read.
    async fn snapshot(&self, quota: &Quota, ignore_closed: bool)
        -> Result<QuotaSnapshot, StoreError>;
}
