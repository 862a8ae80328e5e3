//! In-memory store implementations
//!
//! Dev-mode and test backends with the same semantics as the MongoDB
//! stores. The `processed` flag flip uses DashMap's per-entry locking, so
//! it is a real compare-and-set: at most one caller wins.

use async_trait::async_trait;
use bson::DateTime;
use chrono::{DateTime as ChronoDateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::db::schemas::{TransactionDoc, TransactionKind, UserDoc, WorkoutDoc};
use crate::store::{TransactionStore, UserStore, WorkoutStore};
use crate::types::{LedgerError, Result};

/// In-memory user store
#[derive(Default)]
pub struct MemoryUserStore {
    users: DashMap<Uuid, UserDoc>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user (test/dev helper)
    pub fn insert(&self, user: UserDoc) {
        self.users.insert(user.user_id, user);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserDoc>> {
        Ok(self.users.get(&user_id).map(|u| u.clone()))
    }
}

/// In-memory workout store
#[derive(Default)]
pub struct MemoryWorkoutStore {
    workouts: DashMap<Uuid, WorkoutDoc>,
}

impl MemoryWorkoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a workout (test/dev helper)
    pub fn insert(&self, workout: WorkoutDoc) {
        self.workouts.insert(workout.workout_id, workout);
    }
}

#[async_trait]
impl WorkoutStore for MemoryWorkoutStore {
    async fn find_workout(&self, workout_id: Uuid) -> Result<Option<WorkoutDoc>> {
        Ok(self.workouts.get(&workout_id).map(|w| w.clone()))
    }

    async fn mark_processed(&self, workout_id: Uuid) -> Result<()> {
        match self.workouts.get_mut(&workout_id) {
            Some(mut workout) => {
                workout.processed = true;
                Ok(())
            }
            None => Err(LedgerError::NotFound(format!("workout {}", workout_id))),
        }
    }
}

/// In-memory credit transaction store, keyed by tx_id
#[derive(Default)]
pub struct MemoryTransactionStore {
    rows: DashMap<Uuid, TransactionDoc>,
}

impl MemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows of a given kind for a user (test helper)
    pub fn count_kind(&self, user_id: Uuid, kind: TransactionKind) -> usize {
        self.rows
            .iter()
            .filter(|r| r.user_id == user_id && r.kind == kind)
            .count()
    }

    fn sum_where<F>(&self, pred: F) -> i64
    where
        F: Fn(&TransactionDoc) -> bool,
    {
        self.rows
            .iter()
            .filter(|r| pred(r.value()))
            .map(|r| r.amount)
            .sum()
    }
}

#[async_trait]
impl TransactionStore for MemoryTransactionStore {
    async fn append(&self, tx: TransactionDoc) -> Result<()> {
        self.rows.insert(tx.tx_id, tx);
        Ok(())
    }

    async fn sum_earned_active(&self, user_id: Uuid, now: ChronoDateTime<Utc>) -> Result<i64> {
        let now = DateTime::from_chrono(now);
        Ok(self.sum_where(|r| {
            r.user_id == user_id
                && r.kind == TransactionKind::Earned
                && r.expires_at.map(|e| e > now).unwrap_or(true)
        }))
    }

    async fn sum_spent(&self, user_id: Uuid) -> Result<i64> {
        Ok(self
            .sum_where(|r| r.user_id == user_id && r.kind == TransactionKind::Spent)
            .abs())
    }

    async fn sum_earned_since(&self, user_id: Uuid, since: ChronoDateTime<Utc>) -> Result<i64> {
        let since = DateTime::from_chrono(since);
        Ok(self.sum_where(|r| {
            r.user_id == user_id && r.kind == TransactionKind::Earned && r.timestamp >= since
        }))
    }

    async fn sum_emergency_since(&self, user_id: Uuid, since: ChronoDateTime<Utc>) -> Result<i64> {
        let since = DateTime::from_chrono(since);
        Ok(self
            .sum_where(|r| {
                r.user_id == user_id
                    && r.kind == TransactionKind::Emergency
                    && r.timestamp >= since
            })
            .abs())
    }

    async fn sum_earned_total(&self, user_id: Uuid) -> Result<i64> {
        Ok(self.sum_where(|r| r.user_id == user_id && r.kind == TransactionKind::Earned))
    }

    async fn find_expirable(&self, now: ChronoDateTime<Utc>) -> Result<Vec<TransactionDoc>> {
        let now = DateTime::from_chrono(now);
        Ok(self
            .rows
            .iter()
            .filter(|r| {
                r.kind == TransactionKind::Earned
                    && !r.processed
                    && r.expires_at.map(|e| e < now).unwrap_or(false)
            })
            .map(|r| r.clone())
            .collect())
    }

    async fn mark_processed(&self, tx_id: Uuid) -> Result<bool> {
        // DashMap holds the entry lock across the check and the write
        match self.rows.get_mut(&tx_id) {
            Some(mut row) if !row.processed => {
                row.processed = true;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Ok(false),
        }
    }
}
