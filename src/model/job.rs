//! Tracked job types: the unit of work in waypoint.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::Zone;

/// A job waypoint manages, keyed by unique name.
///
/// Tagged enum so each record in the tracking store is self-describing.
/// Names are unique across both variants: re-adding a name supersedes the
/// prior entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TrackedJob {
    /// Mirrors a job in the external scheduler whose timezone follows the
    /// operator's location.
    TimezoneFollower(TimezoneFollower),

    /// Fires on geofence entry/exit. Lives only in waypoint — the external
    /// scheduler has no knowledge of it.
    Geofence(GeofenceJob),
}

impl TrackedJob {
    /// The job's unique name.
    pub fn name(&self) -> &str {
        match self {
            Self::TimezoneFollower(job) => &job.name,
            Self::Geofence(job) => &job.name,
        }
    }
}

/// A timezone-following job: the schedule lives in the external scheduler,
/// waypoint re-patches its timezone as the operator moves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimezoneFollower {
    pub name: String,

    /// Id of the mirrored job in the external scheduler. The scheduler is
    /// the sole authority for that job's existence and schedule.
    pub external_job_id: String,

    /// Cron expression, kept for display only — never interpreted here.
    pub cron_expr: String,

    /// The timezone last successfully pushed to the external scheduler.
    pub last_applied_tz: String,
}

/// A geofence-triggered job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceJob {
    pub name: String,
    pub enabled: bool,

    /// One-shot jobs (`recurring == false`) are disabled after their first
    /// delivered event.
    pub recurring: bool,

    pub zone: ZoneRef,
    pub on: EventFilter,
    pub action: Action,
}

/// Where a geofence job's zone comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ZoneRef {
    /// A named entry in the zone registry.
    Named { name: String },

    /// Coordinates supplied inline on the job.
    #[serde(rename_all = "camelCase")]
    Inline {
        lat: f64,
        lon: f64,
        radius_meters: f64,
    },
}

impl ZoneRef {
    /// Resolve against the zone registry.
    ///
    /// Returns `None` when a named zone is absent from the registry — the
    /// owning job is then skipped, not failed.
    pub fn resolve(&self, registry: &BTreeMap<String, Zone>) -> Option<Zone> {
        match self {
            Self::Named { name } => registry.get(name).copied(),
            Self::Inline {
                lat,
                lon,
                radius_meters,
            } => Some(Zone {
                lat: *lat,
                lon: *lon,
                radius_meters: *radius_meters,
            }),
        }
    }
}

/// Which crossings a geofence job cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventFilter {
    Enter,
    Exit,
    Both,
}

impl EventFilter {
    /// Whether an emitted event passes this filter.
    pub fn matches(self, event: GeofenceEvent) -> bool {
        match self {
            Self::Both => true,
            Self::Enter => event == GeofenceEvent::Enter,
            Self::Exit => event == GeofenceEvent::Exit,
        }
    }
}

/// A zone crossing, emitted exactly once per transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeofenceEvent {
    Enter,
    Exit,
}

impl fmt::Display for GeofenceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enter => write!(f, "enter"),
            Self::Exit => write!(f, "exit"),
        }
    }
}

/// What happens when a geofence job fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// The payload text handed to the dispatcher.
    pub text: String,
    pub delivery: DeliveryMode,
}

/// How a fired action reaches the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryMode {
    /// Injected into the main session as a system event.
    Broadcast,

    /// Handed to a spawned, isolated agent session.
    IsolatedAgent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_filter_matching() {
        assert!(EventFilter::Enter.matches(GeofenceEvent::Enter));
        assert!(!EventFilter::Enter.matches(GeofenceEvent::Exit));
        assert!(!EventFilter::Exit.matches(GeofenceEvent::Enter));
        assert!(EventFilter::Exit.matches(GeofenceEvent::Exit));
        assert!(EventFilter::Both.matches(GeofenceEvent::Enter));
        assert!(EventFilter::Both.matches(GeofenceEvent::Exit));
    }

    #[test]
    fn named_zone_resolves_from_registry() {
        let mut registry = BTreeMap::new();
        registry.insert(
            "gym".to_string(),
            Zone {
                lat: 40.748,
                lon: -73.985,
                radius_meters: 60.0,
            },
        );

        let named = ZoneRef::Named {
            name: "gym".to_string(),
        };
        assert_eq!(named.resolve(&registry).unwrap().radius_meters, 60.0);

        let missing = ZoneRef::Named {
            name: "office".to_string(),
        };
        assert!(missing.resolve(&registry).is_none());
    }

    #[test]
    fn inline_zone_resolves_without_registry() {
        let inline = ZoneRef::Inline {
            lat: 1.0,
            lon: 2.0,
            radius_meters: 50.0,
        };
        let zone = inline.resolve(&BTreeMap::new()).unwrap();
        assert_eq!(zone.lat, 1.0);
        assert_eq!(zone.lon, 2.0);
    }

    #[test]
    fn tracked_job_json_is_tagged_by_kind() {
        let job = TrackedJob::Geofence(GeofenceJob {
            name: "gym".to_string(),
            enabled: true,
            recurring: false,
            zone: ZoneRef::Named {
                name: "gym".to_string(),
            },
            on: EventFilter::Enter,
            action: Action {
                text: "At the gym".to_string(),
                delivery: DeliveryMode::Broadcast,
            },
        });

        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains(r#""kind":"geofence"#), "got {json}");

        let back: TrackedJob = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name(), "gym");
    }
}
