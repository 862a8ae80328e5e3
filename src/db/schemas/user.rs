//! User document schema
//!
//! Stores the per-user settings the ledger consumes. Account identity,
//! sessions, and credentials live with the out-of-scope auth service.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::IntoIndexes;
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// Per-user ledger settings
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserSettings {
    /// Fallback conversion ratio when the workout carries no usable type
    #[serde(default = "default_credit_ratio")]
    pub workout_credit_ratio: i64,

    /// Daily earning cap in minutes
    #[serde(default = "default_max_daily")]
    pub max_daily_credits: i64,

    /// Emergency pool per day, in minutes
    #[serde(default = "default_emergency")]
    pub emergency_credits: i64,

    /// Hours until earned credits expire
    #[serde(default = "default_expiration_hours")]
    pub credit_expiration_hours: i64,
}

fn default_credit_ratio() -> i64 {
    12
}

fn default_max_daily() -> i64 {
    480
}

fn default_emergency() -> i64 {
    60
}

fn default_expiration_hours() -> i64 {
    48
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            workout_credit_ratio: default_credit_ratio(),
            max_daily_credits: default_max_daily(),
            emergency_credits: default_emergency(),
            credit_expiration_hours: default_expiration_hours(),
        }
    }
}

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Stable user identifier
    pub user_id: Uuid,

    /// Ledger settings
    #[serde(default)]
    pub settings: UserSettings,
}

impl UserDoc {
    /// Create a new user document with default settings
    pub fn new(user_id: Uuid) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id,
            settings: UserSettings::default(),
        }
    }

    /// Create a user document with explicit settings
    pub fn with_settings(user_id: Uuid, settings: UserSettings) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id,
            settings,
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "user_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_id_unique".to_string())
                    .build(),
            ),
        )]
    }
}
