//! Cron-driven accrual loop.
//!
//! The engine itself holds no period state; this loop is the external
//! period boundary. It fires one cycle per schedule tick and keeps running
//! regardless of individual cycle outcomes.

use cron::Schedule;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::domain::Caller;
use crate::services::AccrualEngine;

pub async fn run_scheduler(engine: Arc<AccrualEngine>, schedule: Schedule) {
    info!("Accrual scheduler started");
    let caller = Caller::system();

    loop {
        let now = chrono::Utc::now();
        let Some(next) = schedule.after(&now).next() else {
            warn!("Accrual schedule yields no future fire times; scheduler stopping");
            return;
        };

        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        sleep(wait).await;

        match engine.run_cycle(&caller).await {
            Ok(summary) => info!(
                "Scheduled accrual cycle: {} processed, {} skipped, {} failed",
                summary.processed,
                summary.skipped,
                summary.failed.len()
            ),
            Err(e) => error!("Scheduled accrual cycle failed: {}", e),
        }
    }
}
