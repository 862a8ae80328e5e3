//! Store contracts the ledger depends on
//!
//! The engine never talks to MongoDB directly; it goes through these
//! traits so the durable backend can be swapped for the in-memory one in
//! dev mode and tests. The transaction store is append-only apart from
//! the single conditional `processed` flag flip.

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::schemas::{TransactionDoc, UserDoc, WorkoutDoc};
use crate::types::Result;

pub use memory::{MemoryTransactionStore, MemoryUserStore, MemoryWorkoutStore};
pub use mongo::{MongoTransactionStore, MongoUserStore, MongoWorkoutStore};

/// Read access to user settings
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by id
    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserDoc>>;
}

/// Read access to workouts plus the one permitted flag flip
#[async_trait]
pub trait WorkoutStore: Send + Sync {
    /// Look up a workout by id
    async fn find_workout(&self, workout_id: Uuid) -> Result<Option<WorkoutDoc>>;

    /// Mark a workout as processed (award has run)
    async fn mark_processed(&self, workout_id: Uuid) -> Result<()>;
}

/// Append-only credit transaction store
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Append a transaction to the ledger
    async fn append(&self, tx: TransactionDoc) -> Result<()>;

    /// Sum of earned amounts whose expiry is absent or after `now`
    async fn sum_earned_active(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<i64>;

    /// Sum of absolute spent amounts
    async fn sum_spent(&self, user_id: Uuid) -> Result<i64>;

    /// Sum of earned amounts created at or after `since` (daily cap)
    async fn sum_earned_since(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<i64>;

    /// Sum of absolute emergency amounts created at or after `since`
    async fn sum_emergency_since(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<i64>;

    /// Sum of all earned amounts ever, expired or not
    async fn sum_earned_total(&self, user_id: Uuid) -> Result<i64>;

    /// Earned rows past their expiry that have not been processed yet
    async fn find_expirable(&self, now: DateTime<Utc>) -> Result<Vec<TransactionDoc>>;

    /// Conditionally flip `processed` from false to true.
    ///
    /// Returns true only for the caller that performed the transition, so
    /// concurrent sweep instances cannot double-expire a row.
    async fn mark_processed(&self, tx_id: Uuid) -> Result<bool>;
}
