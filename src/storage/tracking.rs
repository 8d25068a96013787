//! Tracking store: the jobs waypoint manages.
//!
//! An ordered list of [`TrackedJob`] records. Names are unique: upserting a
//! name removes any prior entry before inserting the new one, for both job
//! kinds. Tick evaluation order is store order.

use crate::model::TrackedJob;

use super::{Result, Storage};

impl Storage {
    /// Loads all tracked jobs, in store order.
    ///
    /// A missing store file is a valid empty store.
    pub fn load_jobs(&self) -> Result<Vec<TrackedJob>> {
        Ok(Self::read_json(&self.jobs_path())?.unwrap_or_default())
    }

    /// Replaces the tracking store with the given jobs.
    pub fn save_jobs(&self, jobs: &[TrackedJob]) -> Result<()> {
        self.write_json(&self.jobs_path(), &jobs)
    }

    /// Inserts a job, superseding any prior entry with the same name.
    ///
    /// Last-write-wins at the name level: the old record is removed first,
    /// so the store never holds two jobs with one name.
    pub fn upsert_job(&self, job: TrackedJob) -> Result<()> {
        let mut jobs = self.load_jobs()?;
        jobs.retain(|j| j.name() != job.name());
        jobs.push(job);
        self.save_jobs(&jobs)
    }

    /// Removes a job by name, returning the removed record if it existed.
    pub fn remove_job(&self, name: &str) -> Result<Option<TrackedJob>> {
        let mut jobs = self.load_jobs()?;
        let removed = jobs.iter().position(|j| j.name() == name).map(|i| jobs.remove(i));
        if removed.is_some() {
            self.save_jobs(&jobs)?;
        }
        Ok(removed)
    }
}
