//! Turnstile - Credit ledger engine
//!
//! "Pay at the gate" - workouts earn time-limited coding credits,
//! coding activity and emergency unlocks spend them.
//!
//! The engine is an append-only accounting system: every earn, spend,
//! emergency unlock, and expiry is a new `CreditTransaction`; nothing is
//! ever rewritten except the single `processed` flag the sweeper flips.
//!
//! ## Components
//!
//! - **Ratio mapper**: workout type -> coding minutes per workout minute
//! - **Stores**: durable MongoDB-backed user/workout/transaction stores,
//!   plus in-memory backends for dev mode and tests
//! - **Balance reader**: authoritative balance from the ledger alone
//! - **Cache**: advisory read-through balance cache, never authoritative
//! - **Credit service**: award / spend / emergency-spend / expire
//! - **Sweeper**: periodic pass that closes out expired earned credits

pub mod cache;
pub mod config;
pub mod db;
pub mod ledger;
pub mod ratio;
pub mod store;
pub mod sweeper;
pub mod types;

pub use config::Args;
pub use ledger::{BalanceReader, CreditService, UserLocks};
pub use sweeper::ExpirationSweeper;
pub use types::{LedgerError, Result};
