// ── Sync scheduler ──
//
// One background task driving `run_once` at the configured cadence: a
// 5-field cron expression when set, else a fixed interval. A short startup
// delay kicks the first cycle. Overlapping triggers lose the service's
// run gate and are counted as skipped there.

use std::time::Duration;

use chrono::Utc;
use cron::Schedule;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::sync::{RunOutcome, SyncService};

/// Delay before the startup kick, giving the process a moment to settle.
const STARTUP_DELAY: Duration = Duration::from_secs(3);

/// How the periodic trigger fires.
#[derive(Debug, Clone)]
pub enum Cadence {
    Cron(Box<Schedule>),
    Interval(Duration),
}

impl Cadence {
    /// Cron wins when the expression is non-empty; else the interval.
    pub fn resolve(cron_expr: Option<&str>, interval: Duration) -> Result<Self, SyncError> {
        match cron_expr.map(str::trim).filter(|e| !e.is_empty()) {
            Some(expr) => Ok(Self::Cron(Box::new(parse_cron(expr)?))),
            None => Ok(Self::Interval(interval.max(Duration::from_secs(1)))),
        }
    }

    /// Sleep until the next tick.
    async fn wait(&self) {
        match self {
            Self::Interval(interval) => tokio::time::sleep(*interval).await,
            Self::Cron(schedule) => {
                let Some(next) = schedule.upcoming(Utc).next() else {
                    // A schedule with no future firings never ticks again.
                    warn!("cron schedule has no upcoming firings");
                    std::future::pending::<()>().await;
                    return;
                };
                let delay = (next - Utc::now())
                    .to_std()
                    .unwrap_or(Duration::from_secs(0));
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Parse a 5-field cron expression (the `cron` crate wants six fields, so
/// a seconds column is prepended).
pub fn parse_cron(expr: &str) -> Result<Schedule, SyncError> {
    format!("0 {expr}")
        .parse::<Schedule>()
        .map_err(|e| SyncError::InvalidCron {
            expr: expr.to_owned(),
            reason: e.to_string(),
        })
}

/// Spawn the periodic sync driver. Cancelling the token stops it after the
/// in-flight cycle, if any, completes.
pub fn spawn(service: SyncService, cadence: Cadence, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        // Startup kick.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(STARTUP_DELAY) => {}
        }
        info!("startup sync kick");
        run(&service).await;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = cadence.wait() => run(&service).await,
            }
        }
        debug!("scheduler stopped");
    })
}

async fn run(service: &SyncService) {
    if service.run_once().await == RunOutcome::Busy {
        debug!("scheduled trigger skipped; cycle in progress");
    }
}
