use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio::time;
use tracing::{error, info};

use crate::db::settings;

/// Marks devices inactive once they stop reporting.
///
/// Ingestion is the only thing that sets `is_active`; this loop is the only
/// thing that clears it.
pub struct LivenessService {
    pool: PgPool,
    timeout: Duration,
    interval: Duration,
}

impl LivenessService {
    pub fn new(pool: PgPool, timeout_secs: u64, interval_secs: u64) -> Self {
        Self {
            pool,
            timeout: Duration::from_secs(timeout_secs),
            interval: Duration::from_secs(interval_secs),
        }
    }

    /// Runs the sweep indefinitely.
    /// Spawn this via `tokio::spawn`.
    pub async fn run(self) {
        info!(
            interval_secs = self.interval.as_secs(),
            timeout_secs = self.timeout.as_secs(),
            "Liveness sweep started"
        );
        let mut ticker = time::interval(self.interval);

        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once().await {
                error!(error = %e, "Liveness sweep failed");
            }
        }
    }

    pub async fn run_once(&self) -> anyhow::Result<u64> {
        let cutoff = Utc::now() - chrono::Duration::from_std(self.timeout)?;
        let flipped = settings::mark_stale_inactive(&self.pool, cutoff).await?;

        if flipped > 0 {
            info!(devices = flipped, cutoff = %cutoff, "Marked silent devices inactive");
        }
        Ok(flipped)
    }
}
