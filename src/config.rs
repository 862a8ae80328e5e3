//! Configuration for Turnstile
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::time::Duration;

/// Turnstile - credit ledger engine
///
/// "Pay at the gate"
#[derive(Parser, Debug, Clone)]
#[command(name = "turnstile")]
#[command(about = "Credit ledger engine for workout-gated coding time")]
pub struct Args {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "turnstile")]
    pub mongodb_db: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Sweep interval in seconds (how often expired credits are closed out)
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value = "3600")]
    pub sweep_interval_secs: u64,

    /// Balance cache TTL in seconds
    #[arg(long, env = "CACHE_TTL_SECS", default_value = "300")]
    pub cache_ttl_secs: u64,

    /// Enable development mode (in-memory stores, no MongoDB required)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,
}

impl Args {
    /// Sweep interval as a Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Cache TTL as a Duration
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.sweep_interval_secs == 0 {
            return Err("SWEEP_INTERVAL_SECS must be greater than zero".to_string());
        }
        if self.cache_ttl_secs == 0 {
            return Err("CACHE_TTL_SECS must be greater than zero".to_string());
        }
        Ok(())
    }
}
