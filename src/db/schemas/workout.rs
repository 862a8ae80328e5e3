//! Workout document schema
//!
//! Workouts are handed to the ledger already normalized by the
//! out-of-scope fitness-API sync. The ledger only reads them and flips
//! `processed` once an award has run, which prevents double-awarding.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::IntoIndexes;
use crate::db::schemas::Metadata;

/// Collection name for workouts
pub const WORKOUT_COLLECTION: &str = "workouts";

/// Workout document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct WorkoutDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Stable workout identifier
    pub workout_id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Free-text workout type from the provider (e.g. "running", "HIIT")
    #[serde(default)]
    pub workout_type: String,

    /// When the workout started
    pub start_time: DateTime,

    /// When the workout ended
    pub end_time: DateTime,

    /// Duration in minutes
    pub duration_minutes: i64,

    /// Whether the provider marked this workout as verified
    #[serde(default)]
    pub verified: bool,

    /// True once an award operation has run for this workout
    #[serde(default)]
    pub processed: bool,
}

impl WorkoutDoc {
    /// Create a workout record
    pub fn new(workout_id: Uuid, user_id: Uuid, workout_type: &str, duration_minutes: i64) -> Self {
        let now = DateTime::now();
        Self {
            _id: None,
            metadata: Metadata::new(),
            workout_id,
            user_id,
            workout_type: workout_type.to_string(),
            start_time: now,
            end_time: now,
            duration_minutes,
            verified: false,
            processed: false,
        }
    }
}

impl IntoIndexes for WorkoutDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "workout_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("workout_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "user_id": 1, "processed": 1 },
                Some(
                    IndexOptions::builder()
                        .name("user_processed_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
