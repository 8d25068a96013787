//! Geofence evaluation: a per-job hysteresis state machine.
//!
//! Each job is either inside or outside its zone. An event exists only at a
//! crossing — steady-state containment emits nothing, no matter how many
//! cycles the operator sits inside. The job's filter then decides whether a
//! crossing is delivered.

use std::collections::BTreeMap;

use tracing::debug;

use crate::geodesy;
use crate::model::{GeofenceEvent, GeofenceJob, Location, RuntimeState, Zone};

/// Evaluate one geofence job against the current fix.
///
/// Updates the job's `inside_zone` state on every evaluation with a
/// resolvable zone and returns the event to deliver, if any:
///
/// - outside → inside emits `enter`, inside → outside emits `exit`;
/// - an emitted event is returned only when it passes `job.on`;
/// - a job whose zone cannot be resolved is skipped entirely — its state
///   slot is neither created nor touched.
///
/// Fire bookkeeping (`fire_count`, `last_fired_at`, one-shot disabling)
/// belongs to the caller — it applies to delivered events only.
pub fn evaluate(
    job: &GeofenceJob,
    state: &mut RuntimeState,
    fix: &Location,
    registry: &BTreeMap<String, Zone>,
) -> Option<GeofenceEvent> {
    let Some(zone) = job.zone.resolve(registry) else {
        debug!(job = %job.name, "zone unresolvable, skipping");
        return None;
    };

    let slot = state.geofence_mut(&job.name);
    let was_inside = slot.inside_zone;
    let now_inside = geodesy::is_inside(fix.coords(), &zone);
    slot.inside_zone = now_inside;

    let event = match (was_inside, now_inside) {
        (false, true) => GeofenceEvent::Enter,
        (true, false) => GeofenceEvent::Exit,
        _ => return None,
    };

    job.on.matches(event).then_some(event)
}
