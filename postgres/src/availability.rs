//! Row-counting availability reference implementation.
//!
//! Counts order positions per status against the quota's linked items. A
//! dedicated inventory subsystem would replace this with something cached;
//! the trait keeps that swap contained.

use async_trait::async_trait;
use marquee_core::availability::{AvailabilityLevel, AvailabilityProvider, QuotaSnapshot};
use marquee_core::entities::Quota;
use marquee_core::ids::ItemId;
use marquee_core::store::StoreError;
use sqlx::postgres::PgPool;

/// [`AvailabilityProvider`] counting `order_positions` rows.
#[derive(Clone)]
pub struct PgAvailability {
    pool: PgPool,
}

impl PgAvailability {
    /// Wraps an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl std::fmt::Debug for PgAvailability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgAvailability").finish_non_exhaustive()
    }
}

#[async_trait]
impl AvailabilityProvider for PgAvailability {
    async fn snapshot(
        &self,
        quota: &Quota,
        ignore_closed: bool,
    ) -> Result<QuotaSnapshot, StoreError> {
        let item_ids: Vec<i64> = quota.item_ids.iter().map(|id| ItemId::raw(*id)).collect();
        let (paid, pending, carts): (i64, i64, i64) = if item_ids.is_empty() {
            (0, 0, 0)
        } else {
            sqlx::query_as(
                "SELECT COUNT(*) FILTER (WHERE status = 'paid'), \
                        COUNT(*) FILTER (WHERE status = 'pending'), \
                        COUNT(*) FILTER (WHERE status = 'cart') \
                 FROM order_positions WHERE event_id = $1 AND item_id = ANY($2)",
            )
            .bind(quota.event.raw())
            .bind(&item_ids)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to count order positions: {e}")))?
        };

        if quota.closed && !ignore_closed {
            return Ok(QuotaSnapshot {
                level: AvailabilityLevel::Gone,
                remaining: Some(0),
                paid_orders: paid,
                pending_orders: pending,
            });
        }

        let Some(size) = quota.size else {
            return Ok(QuotaSnapshot::unlimited(paid, pending));
        };

        let after_paid = size - paid;
        if after_paid <= 0 {
            return Ok(QuotaSnapshot {
                level: AvailabilityLevel::Gone,
                remaining: Some(0),
                paid_orders: paid,
                pending_orders: pending,
            });
        }
        let after_pending = after_paid - pending;
        if after_pending <= 0 {
            return Ok(QuotaSnapshot {
                level: AvailabilityLevel::Ordered,
                remaining: Some(0),
                paid_orders: paid,
                pending_orders: pending,
            });
        }
        let after_carts = after_pending - carts;
        if after_carts <= 0 {
            return Ok(QuotaSnapshot {
                level: AvailabilityLevel::Reserved,
                remaining: Some(0),
                paid_orders: paid,
                pending_orders: pending,
            });
        }
        Ok(QuotaSnapshot {
            level: AvailabilityLevel::Ok,
            remaining: Some(after_carts),
            paid_orders: paid,
            pending_orders: pending,
        })
    }
}
