//! Core data model for waypoint.
//!
//! These types represent the conceptual architecture: tracked jobs (the two
//! location-derived trigger kinds), zones, GPS fixes, and the runtime state
//! that persists between ticks.

mod job;
mod location;
mod state;

pub use job::{
    Action, DeliveryMode, EventFilter, GeofenceEvent, GeofenceJob, TimezoneFollower, TrackedJob,
    ZoneRef,
};
pub use location::{Location, Zone};
pub use state::RuntimeState;
