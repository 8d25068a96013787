//! Consistency check between the tracking store and the external scheduler.
//!
//! Timezone-following jobs live in two independently-writable places: the
//! engine owns the job, waypoint owns the mirror. Either side can be edited
//! behind the other's back, so the check verifies on demand that every
//! tracked id still resolves and that the engine's recorded timezone matches
//! what waypoint last applied. Findings are reported, never auto-healed —
//! healing would require guessing intent.

use std::fmt;

use crate::model::TrackedJob;
use crate::scheduler::{CronScheduler, ExternalJob, Result};

/// One detected inconsistency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// The tracked external id no longer resolves: the job was deleted
    /// out-of-band.
    MissingExternalJob { name: String, external_job_id: String },

    /// The engine's recorded timezone differs from the last one waypoint
    /// applied: the job was patched out-of-band.
    TimezoneDrift {
        name: String,
        tracked: String,
        actual: Option<String>,
    },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingExternalJob {
                name,
                external_job_id,
            } => write!(
                f,
                "{name}: tracked job (id={external_job_id}) missing from the scheduler"
            ),
            Self::TimezoneDrift {
                name,
                tracked,
                actual,
            } => write!(
                f,
                "{name}: waypoint applied {tracked}, scheduler has {}",
                actual.as_deref().unwrap_or("none")
            ),
        }
    }
}

/// Check every tracked follower against the engine's job list.
///
/// Geofence jobs have no external mirror and are not checked. An engine
/// listing failure is an error here — without the ground truth there is
/// nothing to compare against.
pub fn check(jobs: &[TrackedJob], scheduler: &dyn CronScheduler) -> Result<Vec<Finding>> {
    let external = ExternalJob::by_id(scheduler.list()?);

    let mut findings = Vec::new();
    for job in jobs {
        let TrackedJob::TimezoneFollower(follower) = job else {
            continue;
        };

        match external.get(&follower.external_job_id) {
            None => findings.push(Finding::MissingExternalJob {
                name: follower.name.clone(),
                external_job_id: follower.external_job_id.clone(),
            }),
            Some(engine_job) => {
                if engine_job.schedule.tz.as_deref() != Some(follower.last_applied_tz.as_str()) {
                    findings.push(Finding::TimezoneDrift {
                        name: follower.name.clone(),
                        tracked: follower.last_applied_tz.clone(),
                        actual: engine_job.schedule.tz.clone(),
                    });
                }
            }
        }
    }

    Ok(findings)
}
