//! Balance calculator
//!
//! Aggregates the ledger into the authoritative available balance and
//! its derived daily statistics. Always correct with no cache present:
//! expired credits remove themselves via the `expires_at` filter, and the
//! emergency pool is disjoint by construction, so neither `expired` nor
//! `emergency` rows enter the formula.

use chrono::{DateTime, Local, TimeZone, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::store::TransactionStore;
use crate::types::Result;

/// Start of the current local day, in UTC.
///
/// The daily earning cap and the emergency pool both reset at local
/// midnight. On an ambiguous DST transition the earliest mapping wins.
pub fn start_of_local_day() -> DateTime<Utc> {
    let now = Local::now();
    let midnight = now.date_naive().and_hms_opt(0, 0, 0).unwrap_or_default();
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc::now() - (now.time() - chrono::NaiveTime::MIN))
}

/// Authoritative balance reads over a transaction store
pub struct BalanceReader<T: TransactionStore> {
    store: Arc<T>,
}

impl<T: TransactionStore> BalanceReader<T> {
    /// Create a reader over a shared store handle
    pub fn new(store: Arc<T>) -> Self {
        Self { store }
    }

    /// Available balance: `max(0, earned_active - spent)`
    pub async fn available_credits(&self, user_id: Uuid) -> Result<i64> {
        let now = Utc::now();
        let earned = self.store.sum_earned_active(user_id, now).await?;
        let spent = self.store.sum_spent(user_id).await?;
        Ok((earned - spent).max(0))
    }

    /// Credits earned since the start of the current local day
    pub async fn earned_today(&self, user_id: Uuid) -> Result<i64> {
        self.store
            .sum_earned_since(user_id, start_of_local_day())
            .await
    }

    /// Emergency minutes used since the start of the current local day
    pub async fn emergency_used_today(&self, user_id: Uuid) -> Result<i64> {
        self.store
            .sum_emergency_since(user_id, start_of_local_day())
            .await
    }

    /// All credits ever earned, expired or not
    pub async fn total_earned(&self, user_id: Uuid) -> Result<i64> {
        self.store.sum_earned_total(user_id).await
    }

    /// All credits ever spent (absolute)
    pub async fn total_spent(&self, user_id: Uuid) -> Result<i64> {
        self.store.sum_spent(user_id).await
    }
}
