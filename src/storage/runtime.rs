//! Runtime store: last-known fix, resolved timezone, geofence state.

use crate::model::RuntimeState;

use super::{Result, Storage};

impl Storage {
    /// Loads the runtime state.
    ///
    /// A missing store file yields the default state: no location, no
    /// resolved timezone, no geofence history.
    pub fn load_runtime(&self) -> Result<RuntimeState> {
        Ok(Self::read_json(&self.state_path())?.unwrap_or_default())
    }

    /// Replaces the runtime store.
    pub fn save_runtime(&self, state: &RuntimeState) -> Result<()> {
        self.write_json(&self.state_path(), state)
    }
}
