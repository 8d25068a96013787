//! Location tracking: the last-known fix and its derived timezone.
//!
//! `refresh` is the only writer of `RuntimeState::location` and
//! `RuntimeState::timezone`. A fresh fix supersedes the old one wholesale;
//! a failed fetch leaves prior state untouched. The derived timezone is only
//! ever GPS-resolved — the configured fallback lives here as a separate
//! answer, so callers can tell the two apart.

use tracing::{debug, info};

use crate::model::{Location, RuntimeState};
use crate::provider::LocationProvider;
use crate::tzlookup::TzLookup;

/// Refreshes and answers location questions against the runtime state.
pub struct LocationTracker<'a> {
    provider: Option<&'a dyn LocationProvider>,
    lookup: &'a dyn TzLookup,
    default_tz: &'a str,
}

impl<'a> LocationTracker<'a> {
    pub fn new(
        provider: Option<&'a dyn LocationProvider>,
        lookup: &'a dyn TzLookup,
        default_tz: &'a str,
    ) -> Self {
        Self {
            provider,
            lookup,
            default_tz,
        }
    }

    /// Fetch the latest fix and fold it into the runtime state.
    ///
    /// On success the stored fix is replaced and the timezone recomputed.
    /// On any failure — provider unreachable, nothing recent, no provider
    /// configured — prior state stands. Returns the best fix now known,
    /// which may be the stale one.
    pub fn refresh(&self, state: &mut RuntimeState) -> Option<Location> {
        let Some(provider) = self.provider else {
            debug!("no location provider configured");
            return state.location;
        };

        if let Some(fix) = provider.latest_fix() {
            if let Some(tz) = self.lookup.timezone_at(fix.lat, fix.lon) {
                if state.timezone.as_deref() != Some(tz.as_str()) {
                    info!(from = state.timezone.as_deref().unwrap_or("none"), to = %tz, "timezone changed");
                }
                state.timezone = Some(tz);
            }
            state.location = Some(fix);
        }

        state.location
    }

    /// The timezone to schedule against right now: GPS-resolved if we ever
    /// got one, otherwise the configured default.
    pub fn current_timezone<'s>(&'s self, state: &'s RuntimeState) -> &'s str {
        state.timezone.as_deref().unwrap_or(self.default_tz)
    }
}
