//! Drift reconciliation for timezone-following jobs.
//!
//! Drift is the gap between the timezone the operator is in and the timezone
//! last pushed to the external scheduler for a job. Reconciliation closes it
//! with a patch call, one job at a time.

use tracing::{info, warn};

use crate::model::TimezoneFollower;
use crate::scheduler::CronScheduler;

/// Reconcile one follower against the GPS-resolved timezone.
///
/// `resolved_tz` must be GPS-derived — callers never pass the configured
/// fallback here, so a fallback can never be pushed to the scheduler as if
/// it were observed.
///
/// Matching timezones are an idempotent no-op: no external call is made, so
/// the scheduler's side effects (last-modified markers and the like) don't
/// fire every cycle. A rejected patch is logged and left for the next audit;
/// `last_applied_tz` only advances on success.
///
/// Returns whether the job record was mutated.
pub fn reconcile(
    job: &mut TimezoneFollower,
    resolved_tz: &str,
    scheduler: &dyn CronScheduler,
) -> bool {
    if job.last_applied_tz == resolved_tz {
        return false;
    }

    info!(
        job = %job.name,
        from = %job.last_applied_tz,
        to = %resolved_tz,
        "timezone drifted, patching"
    );

    match scheduler.patch_timezone(&job.external_job_id, resolved_tz) {
        Ok(()) => {
            job.last_applied_tz = resolved_tz.to_string();
            true
        }
        Err(e) => {
            warn!(job = %job.name, "patch failed, will show in next audit: {e}");
            false
        }
    }
}
