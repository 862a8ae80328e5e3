//! Expiration sweeper
//!
//! Periodic background pass that closes out expired earned credits. Runs
//! independently of request traffic, only appends `expired` rows and flips
//! `processed` flags, and never deletes history. Safe to run from several
//! server instances at once: the store-level conditional flag flip picks
//! one winner per row.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::cache::CreditCache;
use crate::ledger::CreditService;
use crate::store::{TransactionStore, UserStore, WorkoutStore};

/// Default sweep interval
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Periodic driver for `CreditService::expire_credits`
pub struct ExpirationSweeper<U, W, T, C>
where
    U: UserStore,
    W: WorkoutStore,
    T: TransactionStore,
    C: CreditCache,
{
    service: Arc<CreditService<U, W, T, C>>,
    interval: Duration,
    /// Whether the sweep loop is running
    running: Arc<RwLock<bool>>,
}

impl<U, W, T, C> ExpirationSweeper<U, W, T, C>
where
    U: UserStore + 'static,
    W: WorkoutStore + 'static,
    T: TransactionStore + 'static,
    C: CreditCache + 'static,
{
    /// Create a sweeper with the default hourly interval
    pub fn new(service: Arc<CreditService<U, W, T, C>>) -> Self {
        Self {
            service,
            interval: SWEEP_INTERVAL,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Override the sweep interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run a single sweep pass
    pub async fn sweep_once(&self) -> crate::types::Result<u64> {
        self.service.expire_credits().await
    }

    /// Start the sweep loop
    pub async fn start(self: Arc<Self>) {
        {
            let mut running = self.running.write().await;
            if *running {
                info!("Expiration sweeper already running");
                return;
            }
            *running = true;
        }

        info!("Starting expiration sweeper (interval: {:?})", self.interval);

        let sweeper = Arc::clone(&self);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweeper.interval);

            loop {
                interval.tick().await;

                if !*sweeper.running.read().await {
                    info!("Expiration sweeper stopped");
                    break;
                }

                match sweeper.sweep_once().await {
                    Ok(count) => {
                        if count > 0 {
                            info!("Sweep pass expired {} transaction(s)", count);
                        }
                    }
                    // Store failures are retried on the next tick
                    Err(e) => error!("Sweep pass failed: {}", e),
                }
            }
        });
    }

    /// Stop the sweep loop
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
        info!("Stopping expiration sweeper");
    }

    /// Check if the sweeper is running
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}
