//! Action dispatch: delivering fired geofence events.
//!
//! Delivery is fire-and-forget. The core hands the action over and moves on;
//! it never observes whether the downstream delivery ultimately succeeded.
//! A one-shot job is therefore marked fired even when delivery later fails —
//! an accepted, non-retried limitation.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::model::{Action, DeliveryMode, GeofenceEvent};
use crate::scheduler::{CronScheduler, JobPayload, JobSpec};

/// Delivers a fired geofence action. Must never block core logic on the
/// delivery's outcome.
pub trait ActionDispatcher {
    fn dispatch(&self, job_name: &str, event: GeofenceEvent, action: &Action);
}

/// Dispatcher that enqueues an immediate, self-deleting one-shot job on the
/// external scheduler and lets the engine do the delivering.
pub struct SchedulerDispatcher<'a> {
    scheduler: &'a dyn CronScheduler,
}

impl<'a> SchedulerDispatcher<'a> {
    pub fn new(scheduler: &'a dyn CronScheduler) -> Self {
        Self { scheduler }
    }
}

impl ActionDispatcher for SchedulerDispatcher<'_> {
    fn dispatch(&self, job_name: &str, event: GeofenceEvent, action: &Action) {
        if action.text.is_empty() {
            return;
        }

        // Unique per firing so repeated deliveries never collide on the engine.
        let suffix = Uuid::new_v4().simple().to_string();
        let spec = JobSpec {
            name: format!("waypoint-geo-{job_name}-{}", &suffix[..8]),
            cron_expr: None,
            at: Some("+0s".to_string()),
            timezone: None,
            payload: match action.delivery {
                DeliveryMode::Broadcast => JobPayload::SystemEvent(action.text.clone()),
                DeliveryMode::IsolatedAgent => JobPayload::AgentMessage(action.text.clone()),
            },
            delete_after_run: true,
            announce: action.delivery == DeliveryMode::IsolatedAgent,
        };

        match self.scheduler.create(&spec) {
            Ok(id) => debug!(job = %job_name, %event, engine_id = %id, "action enqueued"),
            Err(e) => warn!(job = %job_name, %event, "delivery failed, not retried: {e}"),
        }
    }
}
