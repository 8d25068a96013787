//! Runtime state: what waypoint remembers between ticks.

use std::collections::BTreeMap;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::Location;

/// Per-job geofence state, persisted across cycles.
///
/// Created on a job's first evaluation, mutated every cycle the job is
/// evaluated, removed only when the owning job is removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceState {
    pub inside_zone: bool,
    pub last_fired_at: Option<Timestamp>,
    pub fire_count: u64,
}

/// Everything persisted in the runtime store.
///
/// `timezone` is only ever set from a GPS-derived lookup — the configured
/// fallback timezone never lands here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeState {
    pub location: Option<Location>,
    pub timezone: Option<String>,

    /// Per-geofence-job state, keyed by job name. A `BTreeMap` keeps the
    /// store file stable under diffing.
    #[serde(default)]
    pub geofences: BTreeMap<String, GeofenceState>,
}

impl RuntimeState {
    /// The state slot for a geofence job, created with defaults on first use.
    ///
    /// A fresh slot starts outside the zone, so the first observation inside
    /// the zone reads as an entry.
    pub fn geofence_mut(&mut self, name: &str) -> &mut GeofenceState {
        self.geofences.entry(name.to_string()).or_default()
    }

    /// Drop a removed job's state slot. Idempotent.
    pub fn remove_geofence(&mut self, name: &str) {
        self.geofences.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_geofence_state_starts_outside() {
        let mut state = RuntimeState::default();
        let slot = state.geofence_mut("gym");
        assert!(!slot.inside_zone);
        assert_eq!(slot.fire_count, 0);
        assert!(slot.last_fired_at.is_none());
    }

    #[test]
    fn geofence_state_persists_mutations() {
        let mut state = RuntimeState::default();
        state.geofence_mut("gym").inside_zone = true;
        state.geofence_mut("gym").fire_count += 1;

        assert!(state.geofences["gym"].inside_zone);
        assert_eq!(state.geofences["gym"].fire_count, 1);
    }

    #[test]
    fn remove_geofence_is_idempotent() {
        let mut state = RuntimeState::default();
        state.geofence_mut("gym");
        state.remove_geofence("gym");
        state.remove_geofence("gym");
        assert!(state.geofences.is_empty());
    }
}
