//! MongoDB-backed store implementations
//!
//! Balance figures come from `$match`/`$group` aggregations so the store
//! does the arithmetic under its own isolation. The sweeper's flag flip is
//! a filtered `update_one` (update-if-still-unprocessed): with concurrent
//! sweep instances at most one caller sees `modified_count == 1`.

use async_trait::async_trait;
use bson::{doc, DateTime};
use chrono::{DateTime as ChronoDateTime, Utc};
use uuid::Uuid;

use crate::db::mongo::{MongoClient, MongoCollection};
use crate::db::schemas::{
    TransactionDoc, TransactionKind, UserDoc, WorkoutDoc, TRANSACTION_COLLECTION, USER_COLLECTION,
    WORKOUT_COLLECTION,
};
use crate::store::{TransactionStore, UserStore, WorkoutStore};
use crate::types::Result;

/// Users collection wrapper
#[derive(Clone)]
pub struct MongoUserStore {
    users: MongoCollection<UserDoc>,
}

impl MongoUserStore {
    /// Open the users collection (applies indexes)
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            users: client.collection(USER_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserDoc>> {
        self.users
            .find_one(doc! { "user_id": user_id.to_string() })
            .await
    }
}

/// Workouts collection wrapper
#[derive(Clone)]
pub struct MongoWorkoutStore {
    workouts: MongoCollection<WorkoutDoc>,
}

impl MongoWorkoutStore {
    /// Open the workouts collection (applies indexes)
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            workouts: client.collection(WORKOUT_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl WorkoutStore for MongoWorkoutStore {
    async fn find_workout(&self, workout_id: Uuid) -> Result<Option<WorkoutDoc>> {
        self.workouts
            .find_one(doc! { "workout_id": workout_id.to_string() })
            .await
    }

    async fn mark_processed(&self, workout_id: Uuid) -> Result<()> {
        self.workouts
            .update_one(
                doc! { "workout_id": workout_id.to_string() },
                doc! { "$set": { "processed": true, "metadata.updated_at": DateTime::now() } },
            )
            .await?;
        Ok(())
    }
}

/// Credit transactions collection wrapper
#[derive(Clone)]
pub struct MongoTransactionStore {
    transactions: MongoCollection<TransactionDoc>,
}

impl MongoTransactionStore {
    /// Open the transactions collection (applies indexes)
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            transactions: client.collection(TRANSACTION_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl TransactionStore for MongoTransactionStore {
    async fn append(&self, tx: TransactionDoc) -> Result<()> {
        self.transactions.insert_one(tx).await
    }

    async fn sum_earned_active(&self, user_id: Uuid, now: ChronoDateTime<Utc>) -> Result<i64> {
        let filter = doc! {
            "user_id": user_id.to_string(),
            "type": TransactionKind::Earned.as_str(),
            "$or": [
                { "expires_at": { "$exists": false } },
                { "expires_at": null },
                { "expires_at": { "$gt": DateTime::from_chrono(now) } },
            ],
        };
        self.transactions.aggregate_sum(filter, "amount").await
    }

    async fn sum_spent(&self, user_id: Uuid) -> Result<i64> {
        let filter = doc! {
            "user_id": user_id.to_string(),
            "type": TransactionKind::Spent.as_str(),
        };
        let total = self.transactions.aggregate_sum(filter, "amount").await?;
        Ok(total.abs())
    }

    async fn sum_earned_since(&self, user_id: Uuid, since: ChronoDateTime<Utc>) -> Result<i64> {
        let filter = doc! {
            "user_id": user_id.to_string(),
            "type": TransactionKind::Earned.as_str(),
            "timestamp": { "$gte": DateTime::from_chrono(since) },
        };
        self.transactions.aggregate_sum(filter, "amount").await
    }

    async fn sum_emergency_since(&self, user_id: Uuid, since: ChronoDateTime<Utc>) -> Result<i64> {
        let filter = doc! {
            "user_id": user_id.to_string(),
            "type": TransactionKind::Emergency.as_str(),
            "timestamp": { "$gte": DateTime::from_chrono(since) },
        };
        let total = self.transactions.aggregate_sum(filter, "amount").await?;
        Ok(total.abs())
    }

    async fn sum_earned_total(&self, user_id: Uuid) -> Result<i64> {
        let filter = doc! {
            "user_id": user_id.to_string(),
            "type": TransactionKind::Earned.as_str(),
        };
        self.transactions.aggregate_sum(filter, "amount").await
    }

    async fn find_expirable(&self, now: ChronoDateTime<Utc>) -> Result<Vec<TransactionDoc>> {
        let filter = doc! {
            "type": TransactionKind::Earned.as_str(),
            "processed": { "$ne": true },
            "expires_at": { "$lt": DateTime::from_chrono(now) },
        };
        self.transactions.find_many(filter).await
    }

    async fn mark_processed(&self, tx_id: Uuid) -> Result<bool> {
        let result = self
            .transactions
            .update_one(
                doc! {
                    "tx_id": tx_id.to_string(),
                    "processed": { "$ne": true },
                },
                doc! { "$set": { "processed": true, "metadata.updated_at": DateTime::now() } },
            )
            .await?;

        Ok(result.modified_count == 1)
    }
}
