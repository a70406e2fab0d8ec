//! Scheduled maintenance sweeps using tokio-cron-scheduler.
//!
//! ```text
//! Scheduler
//!     ├─► every hour at :00    expire_old_needs()        ACTIVE → EXPIRED
//!     ├─► every hour at :30    expire_vendor_supply()    AVAILABLE → EXPIRED
//!     └─► every 5 minutes      strain cache purge_expired()
//! ```
//!
//! Sweeps sit outside the matching request path; a failed sweep logs and
//! waits for its next tick.

use anyhow::Result;
use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::domains::needs::actions::expire_old_needs;
use crate::error::MatchingResult;
use crate::kernel::ServerDeps;

/// Start all scheduled tasks
pub async fn start_scheduler(deps: ServerDeps) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let needs_deps = deps.clone();
    let needs_job = Job::new_async("0 0 * * * *", move |_uuid, _lock| {
        let deps = needs_deps.clone();
        Box::pin(async move {
            if let Err(e) = expire_old_needs(Utc::now(), &deps).await {
                tracing::error!("Need expiry sweep failed: {}", e);
            }
        })
    })?;
    scheduler.add(needs_job).await?;

    let supply_deps = deps.clone();
    let supply_job = Job::new_async("0 30 * * * *", move |_uuid, _lock| {
        let deps = supply_deps.clone();
        Box::pin(async move {
            if let Err(e) = run_vendor_supply_expiry(&deps).await {
                tracing::error!("Vendor supply expiry sweep failed: {}", e);
            }
        })
    })?;
    scheduler.add(supply_job).await?;

    let cache_deps = deps;
    let cache_job = Job::new_async("0 */5 * * * *", move |_uuid, _lock| {
        let deps = cache_deps.clone();
        Box::pin(async move {
            let purged = deps.strain_families.purge_expired().await;
            if purged > 0 {
                tracing::debug!(purged, "Purged stale strain families");
            }
        })
    })?;
    scheduler.add(cache_job).await?;

    scheduler.start().await?;

    tracing::info!(
        "Scheduled tasks started (need expiry hourly, vendor supply expiry hourly, strain cache purge every 5 minutes)"
    );
    Ok(scheduler)
}

/// Flip lapsed vendor offers to EXPIRED.
pub async fn run_vendor_supply_expiry(deps: &ServerDeps) -> MatchingResult<u64> {
    let expired = deps.vendor_supply.expire_vendor_supply(Utc::now()).await?;
    if expired > 0 {
        tracing::info!(expired, "Expired vendor supply");
    }
    Ok(expired)
}
