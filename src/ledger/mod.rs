//! Ledger engine
//!
//! Balance calculation, per-user serialization, and the credit service
//! that orchestrates award / spend / emergency-spend / expiry against the
//! store contracts.

pub mod balance;
pub mod locks;
pub mod service;

pub use balance::{start_of_local_day, BalanceReader};
pub use locks::UserLocks;
pub use service::{CreditService, EMERGENCY_MAX_PER_CALL};
