//! Credit transaction document schema
//!
//! The ledger's unit record. Immutable once created, with one exception:
//! the sweeper flips `processed` from false to true exactly once on
//! `earned` rows when it closes them out.

use bson::{doc, oid::ObjectId, DateTime, Document};
use chrono::{DateTime as ChronoDateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::IntoIndexes;
use crate::db::schemas::Metadata;

/// Collection name for credit transactions
pub const TRANSACTION_COLLECTION: &str = "credit_transactions";

/// Kind of credit transaction
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Credits granted for a workout; positive amount, carries an expiry
    Earned,
    /// Coding time consumed; negative amount
    Spent,
    /// Paired close-out of an expired earned row; negative amount
    Expired,
    /// Emergency unlock from the separate daily pool; negative amount
    Emergency,
}

impl TransactionKind {
    /// Wire name used in store filters
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Earned => "earned",
            TransactionKind::Spent => "spent",
            TransactionKind::Expired => "expired",
            TransactionKind::Emergency => "emergency",
        }
    }
}

/// Credit transaction stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TransactionDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Stable transaction identifier
    pub tx_id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Transaction kind (persisted as `type`)
    #[serde(rename = "type")]
    pub kind: TransactionKind,

    /// Signed minutes: earned > 0; spent, expired, emergency <= 0
    pub amount: i64,

    /// Back-reference to the workout, present only on earned rows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workout_id: Option<Uuid>,

    /// Human-readable audit string
    pub reason: String,

    /// Creation time, immutable
    pub timestamp: DateTime,

    /// Expiry, present only on earned rows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime>,

    /// Meaningful only on earned rows: true once the sweeper has closed
    /// this row out with a paired expired transaction
    #[serde(default)]
    pub processed: bool,
}

impl TransactionDoc {
    /// Create an `earned` transaction for a workout
    pub fn earned(
        user_id: Uuid,
        workout_id: Uuid,
        amount: i64,
        reason: String,
        expires_at: ChronoDateTime<Utc>,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            tx_id: Uuid::new_v4(),
            user_id,
            kind: TransactionKind::Earned,
            amount,
            workout_id: Some(workout_id),
            reason,
            timestamp: DateTime::now(),
            expires_at: Some(DateTime::from_chrono(expires_at)),
            processed: false,
        }
    }

    /// Create a `spent` transaction (stored with a negative amount)
    pub fn spent(user_id: Uuid, minutes: i64, reason: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            tx_id: Uuid::new_v4(),
            user_id,
            kind: TransactionKind::Spent,
            amount: -minutes,
            workout_id: None,
            reason,
            timestamp: DateTime::now(),
            expires_at: None,
            processed: false,
        }
    }

    /// Create an `emergency` transaction (stored with a negative amount)
    pub fn emergency(user_id: Uuid, minutes: i64, reason: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            tx_id: Uuid::new_v4(),
            user_id,
            kind: TransactionKind::Emergency,
            amount: -minutes,
            workout_id: None,
            reason,
            timestamp: DateTime::now(),
            expires_at: None,
            processed: false,
        }
    }

    /// Create the paired `expired` close-out for an earned row
    pub fn expired_from(original: &TransactionDoc) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            tx_id: Uuid::new_v4(),
            user_id: original.user_id,
            kind: TransactionKind::Expired,
            amount: -original.amount,
            workout_id: None,
            reason: format!("Expired credits from transaction {}", original.tx_id),
            timestamp: DateTime::now(),
            expires_at: None,
            processed: false,
        }
    }
}

impl IntoIndexes for TransactionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on tx_id (target of the processed flag flip)
            (
                doc! { "tx_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("tx_id_unique".to_string())
                        .build(),
                ),
            ),
            // Balance and daily-cap aggregations
            (
                doc! { "user_id": 1, "type": 1, "timestamp": 1 },
                Some(
                    IndexOptions::builder()
                        .name("user_type_timestamp_index".to_string())
                        .build(),
                ),
            ),
            // Sweeper scan: earned rows past expiry, not yet processed
            (
                doc! { "type": 1, "processed": 1, "expires_at": 1 },
                Some(
                    IndexOptions::builder()
                        .name("expirable_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
