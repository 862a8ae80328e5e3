//! Database layer
//!
//! MongoDB client wrapper and document schemas for the ledger.

pub mod mongo;
pub mod schemas;

pub use mongo::{IntoIndexes, MongoClient, MongoCollection};
