//! Turnstile sweeper - periodic scheduler for credit expiration
//!
//! Run this binary alongside the service instances; it closes out expired
//! earned credits on a fixed interval. Multiple instances may run against
//! the same database: the conditional processed-flag flip guarantees each
//! transaction is expired exactly once.
//!
//! Usage:
//!   turnstile-sweeper --mongodb-uri mongodb://localhost:27017
//!   turnstile-sweeper --once        # single pass, then exit
//!
//! Environment variables:
//!   MONGODB_URI - MongoDB connection URI (default: mongodb://localhost:27017)
//!   MONGODB_DB - database name (default: turnstile)
//!   SWEEP_INTERVAL_SECS - interval between passes (default: 3600)

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use turnstile::cache::MemoryCache;
use turnstile::db::MongoClient;
use turnstile::store::{MongoTransactionStore, MongoUserStore, MongoWorkoutStore};
use turnstile::{Args, CreditService, ExpirationSweeper};

/// Sweeper-specific flags on top of the shared configuration
#[derive(Parser, Debug)]
#[command(name = "turnstile-sweeper")]
#[command(about = "Credit expiration scheduler for Turnstile")]
#[command(version)]
struct SweeperArgs {
    #[command(flatten)]
    common: Args,

    /// Run a single sweep pass and exit
    #[arg(long, default_value = "false")]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = SweeperArgs::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("turnstile={},info", args.common.log_level))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.common.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("Turnstile sweeper starting");
    info!("MongoDB: {}", args.common.mongodb_uri);
    info!("Sweep interval: {}s", args.common.sweep_interval_secs);

    let mongo = match MongoClient::new(&args.common.mongodb_uri, &args.common.mongodb_db).await {
        Ok(client) => client,
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    let users = Arc::new(MongoUserStore::new(&mongo).await?);
    let workouts = Arc::new(MongoWorkoutStore::new(&mongo).await?);
    let transactions = Arc::new(MongoTransactionStore::new(&mongo).await?);
    let cache = Arc::new(MemoryCache::new());

    let service = Arc::new(
        CreditService::new(users, workouts, transactions, cache)
            .with_cache_ttl(args.common.cache_ttl()),
    );
    let sweeper = Arc::new(
        ExpirationSweeper::new(service).with_interval(args.common.sweep_interval()),
    );

    if args.once {
        let count = sweeper.sweep_once().await?;
        info!("Single sweep pass complete: {} transaction(s) expired", count);
        return Ok(());
    }

    Arc::clone(&sweeper).start().await;

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");
    sweeper.stop().await;

    Ok(())
}
