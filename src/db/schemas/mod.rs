//! Database schemas for Turnstile
//!
//! Defines MongoDB document structures for credit transactions, users,
//! and workouts.

mod metadata;
mod transaction;
mod user;
mod workout;

pub use metadata::Metadata;
pub use transaction::{TransactionDoc, TransactionKind, TRANSACTION_COLLECTION};
pub use user::{UserDoc, UserSettings, USER_COLLECTION};
pub use workout::{WorkoutDoc, WORKOUT_COLLECTION};
