// b2backup/src/backup/schedule.rs
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info};

/// A backup is due when none has succeeded yet, or the last success is at
/// least `interval` old.
pub fn backup_due(last_success: Option<Instant>, now: Instant, interval: Duration) -> bool {
    match last_success {
        None => true,
        Some(last) => now.saturating_duration_since(last) >= interval,
    }
}

/// Runs `job` immediately and then every `interval`, checking once per `tick`.
/// A failed run is logged and tried again on the next tick. Never returns.
pub async fn run_every<F, Fut>(interval: Duration, tick: Duration, mut job: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let mut last_success: Option<Instant> = None;
    loop {
        let now = Instant::now();
        if backup_due(last_success, now, interval) {
            match job().await {
                Ok(()) => {
                    last_success = Some(now);
                    info!("Next backup due in {:?}", interval);
                }
                Err(e) => error!("Scheduled backup failed, retrying in {:?}: {:#}", tick, e),
            }
        }
        tokio::time::sleep(tick).await;
    }
}
