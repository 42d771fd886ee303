//! Background sweep of abandoned exchanges.
//!
//! A user who never returns from the provider leaves an exchange row behind.
//! Reads already ignore rows older than the TTL; this daemon deletes them.

use std::time::Duration;

use tracing::{debug, error, info};

use crate::models::ExchangeLedger;

/// Start the sweep loop. Runs until the task is dropped.
pub async fn exchange_sweeper(ledger: ExchangeLedger, interval: Duration) {
    info!("Exchange sweeper started (interval: {}s)", interval.as_secs());

    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        sweep_cycle(&ledger).await;
    }
}

async fn sweep_cycle(ledger: &ExchangeLedger) -> u64 {
    match ledger.sweep().await {
        Ok(0) => {
            debug!("No expired exchanges");
            0
        }
        Ok(removed) => {
            info!("Removed {removed} expired exchanges");
            removed
        }
        Err(e) => {
            error!("Exchange sweep error: {e}");
            0
        }
    }
}
