//! The tick orchestrator: one evaluation cycle over all tracked jobs.
//!
//! A cycle refreshes the location, reconciles timezone drift for every
//! follower, and evaluates every geofence job, in tracking-store order. Each
//! job's evaluation is isolated: a failing engine call or unusable zone
//! costs that job its turn, never the cycle. Stores are rewritten at most
//! once, at the end, and only when something changed.

use std::collections::BTreeMap;
use std::path::Path;
use std::thread;
use std::time::Duration;

use jiff::Timestamp;
use tracing::{debug, error, info, warn};

use crate::dispatch::ActionDispatcher;
use crate::locate::LocationTracker;
use crate::model::TrackedJob;
use crate::scheduler::CronScheduler;
use crate::storage::{self, Result, Storage};
use crate::{drift, geofence};

/// Binds the stores and collaborators into an evaluation cycle.
pub struct Orchestrator<'a> {
    storage: &'a Storage,
    tracker: LocationTracker<'a>,
    scheduler: &'a dyn CronScheduler,
    dispatcher: &'a dyn ActionDispatcher,
    registry_path: &'a Path,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        storage: &'a Storage,
        tracker: LocationTracker<'a>,
        scheduler: &'a dyn CronScheduler,
        dispatcher: &'a dyn ActionDispatcher,
        registry_path: &'a Path,
    ) -> Self {
        Self {
            storage,
            tracker,
            scheduler,
            dispatcher,
            registry_path,
        }
    }

    /// Run one evaluation cycle.
    pub fn run_once(&self) -> Result<()> {
        let mut jobs = self.storage.load_jobs()?;
        if jobs.is_empty() {
            debug!("no tracked jobs, nothing to do");
            return Ok(());
        }

        let mut state = self.storage.load_runtime()?;
        let snapshot = state.clone();

        let registry = match storage::load_registry(self.registry_path) {
            Ok(registry) => registry,
            Err(e) => {
                warn!("zone registry unusable, treating as empty: {e}");
                BTreeMap::new()
            }
        };

        let fix = self.tracker.refresh(&mut state);

        let mut jobs_dirty = false;
        for job in &mut jobs {
            match job {
                TrackedJob::TimezoneFollower(follower) => {
                    // Only a GPS-derived timezone may be pushed. Until a fix
                    // has ever resolved one, the configured fallback stays
                    // local and the follower keeps its last-applied zone.
                    let Some(tz) = state.timezone.as_deref() else {
                        continue;
                    };
                    if drift::reconcile(follower, tz, self.scheduler) {
                        jobs_dirty = true;
                    }
                }
                TrackedJob::Geofence(geo) => {
                    if !geo.enabled {
                        continue;
                    }
                    let Some(fix) = fix else {
                        continue;
                    };

                    if let Some(event) = geofence::evaluate(geo, &mut state, &fix, &registry) {
                        info!(job = %geo.name, %event, "geofence fired");
                        self.dispatcher.dispatch(&geo.name, event, &geo.action);

                        let slot = state.geofence_mut(&geo.name);
                        slot.fire_count += 1;
                        slot.last_fired_at = Some(Timestamp::now());

                        if !geo.recurring {
                            geo.enabled = false;
                            jobs_dirty = true;
                            info!(job = %geo.name, "one-shot complete, disabled");
                        }
                    }
                }
            }
        }

        // Batched writes: each store is rewritten at most once per cycle.
        if jobs_dirty {
            self.storage.save_jobs(&jobs)?;
        }
        if state != snapshot {
            self.storage.save_runtime(&state)?;
        }
        Ok(())
    }

    /// Run cycles forever, sleeping a fixed interval between them.
    ///
    /// A failed cycle is logged and the loop continues after the sleep; the
    /// next cycle starts from whatever the stores last held.
    pub fn run_forever(&self, interval: Duration) -> ! {
        info!(interval_secs = interval.as_secs(), "tick loop started");
        loop {
            if let Err(e) = self.run_once() {
                error!("tick cycle failed: {e}");
            }
            thread::sleep(interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::{Cell, RefCell};
    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use crate::model::{
        Action, DeliveryMode, EventFilter, GeofenceEvent, GeofenceJob, Location, TimezoneFollower,
        ZoneRef,
    };
    use crate::provider::LocationProvider;
    use crate::scheduler::{ExternalJob, JobSpec, SchedulerError};
    use crate::tzlookup::TzLookup;

    const INSIDE_GYM: (f64, f64) = (40.7481, -73.9851);
    const OUTSIDE_GYM: (f64, f64) = (40.758, -73.9855);

    struct MovableProvider(Cell<(f64, f64)>);

    impl LocationProvider for MovableProvider {
        fn latest_fix(&self) -> Option<Location> {
            let (lat, lon) = self.0.get();
            Some(Location {
                lat,
                lon,
                observed_at: Timestamp::now(),
            })
        }
    }

    struct FixedLookup(Option<&'static str>);

    impl TzLookup for FixedLookup {
        fn timezone_at(&self, _lat: f64, _lon: f64) -> Option<String> {
            self.0.map(String::from)
        }
    }

    /// Records engine calls; patches to ids in `reject` fail.
    #[derive(Default)]
    struct RecordingScheduler {
        patches: RefCell<Vec<(String, String)>>,
        reject: Vec<String>,
    }

    impl CronScheduler for RecordingScheduler {
        fn create(&self, _spec: &JobSpec) -> crate::scheduler::Result<String> {
            Ok("created".to_string())
        }

        fn list(&self) -> crate::scheduler::Result<Vec<ExternalJob>> {
            Ok(Vec::new())
        }

        fn patch_timezone(&self, id: &str, tz: &str) -> crate::scheduler::Result<()> {
            if self.reject.contains(&id.to_string()) {
                return Err(SchedulerError::Failed {
                    verb: "edit".to_string(),
                    detail: "no such job".to_string(),
                });
            }
            self.patches
                .borrow_mut()
                .push((id.to_string(), tz.to_string()));
            Ok(())
        }

        fn delete(&self, _id: &str) -> crate::scheduler::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingDispatcher {
        delivered: RefCell<Vec<(String, GeofenceEvent)>>,
    }

    impl ActionDispatcher for RecordingDispatcher {
        fn dispatch(&self, job_name: &str, event: GeofenceEvent, _action: &Action) {
            self.delivered
                .borrow_mut()
                .push((job_name.to_string(), event));
        }
    }

    struct Harness {
        _dir: TempDir,
        storage: Storage,
        registry_path: PathBuf,
    }

    fn harness() -> Harness {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("data")).unwrap();
        let registry_path = dir.path().join("locations.json");
        fs::write(
            &registry_path,
            r#"{ "gym": { "lat": 40.748, "lon": -73.985, "radiusMeters": 60.0 } }"#,
        )
        .unwrap();
        Harness {
            _dir: dir,
            storage,
            registry_path,
        }
    }

    fn geofence_job(name: &str, on: EventFilter, recurring: bool) -> TrackedJob {
        TrackedJob::Geofence(GeofenceJob {
            name: name.to_string(),
            enabled: true,
            recurring,
            zone: ZoneRef::Named {
                name: "gym".to_string(),
            },
            on,
            action: Action {
                text: "At the gym".to_string(),
                delivery: DeliveryMode::Broadcast,
            },
        })
    }

    fn follower(name: &str, id: &str, tz: &str) -> TrackedJob {
        TrackedJob::TimezoneFollower(TimezoneFollower {
            name: name.to_string(),
            external_job_id: id.to_string(),
            cron_expr: "30 6 * * *".to_string(),
            last_applied_tz: tz.to_string(),
        })
    }

    #[test]
    fn one_shot_fires_once_and_disables() {
        let h = harness();
        h.storage
            .upsert_job(geofence_job("gym", EventFilter::Enter, false))
            .unwrap();

        let provider = MovableProvider(Cell::new(INSIDE_GYM));
        let lookup = FixedLookup(None);
        let scheduler = RecordingScheduler::default();
        let dispatcher = RecordingDispatcher::default();
        let orchestrator = Orchestrator::new(
            &h.storage,
            LocationTracker::new(Some(&provider), &lookup, "Etc/UTC"),
            &scheduler,
            &dispatcher,
            &h.registry_path,
        );

        orchestrator.run_once().unwrap();

        assert_eq!(
            dispatcher.delivered.borrow().as_slice(),
            &[("gym".to_string(), GeofenceEvent::Enter)]
        );
        let state = h.storage.load_runtime().unwrap();
        assert_eq!(state.geofences["gym"].fire_count, 1);
        assert!(state.geofences["gym"].last_fired_at.is_some());
        match &h.storage.load_jobs().unwrap()[0] {
            TrackedJob::Geofence(job) => assert!(!job.enabled),
            TrackedJob::TimezoneFollower(_) => panic!("wrong kind"),
        }

        // Leaving and re-entering produces nothing more: the job is disabled.
        provider.0.set(OUTSIDE_GYM);
        orchestrator.run_once().unwrap();
        provider.0.set(INSIDE_GYM);
        orchestrator.run_once().unwrap();
        assert_eq!(dispatcher.delivered.borrow().len(), 1);
    }

    #[test]
    fn recurring_job_fires_on_each_crossing() {
        let h = harness();
        h.storage
            .upsert_job(geofence_job("gym", EventFilter::Both, true))
            .unwrap();

        let provider = MovableProvider(Cell::new(OUTSIDE_GYM));
        let lookup = FixedLookup(None);
        let scheduler = RecordingScheduler::default();
        let dispatcher = RecordingDispatcher::default();
        let orchestrator = Orchestrator::new(
            &h.storage,
            LocationTracker::new(Some(&provider), &lookup, "Etc/UTC"),
            &scheduler,
            &dispatcher,
            &h.registry_path,
        );

        orchestrator.run_once().unwrap(); // outside → outside
        provider.0.set(INSIDE_GYM);
        orchestrator.run_once().unwrap(); // enter
        orchestrator.run_once().unwrap(); // still inside, nothing
        provider.0.set(OUTSIDE_GYM);
        orchestrator.run_once().unwrap(); // exit

        assert_eq!(
            dispatcher.delivered.borrow().as_slice(),
            &[
                ("gym".to_string(), GeofenceEvent::Enter),
                ("gym".to_string(), GeofenceEvent::Exit),
            ]
        );
        let state = h.storage.load_runtime().unwrap();
        assert_eq!(state.geofences["gym"].fire_count, 2);
        match &h.storage.load_jobs().unwrap()[0] {
            TrackedJob::Geofence(job) => assert!(job.enabled),
            TrackedJob::TimezoneFollower(_) => panic!("wrong kind"),
        }
    }

    #[test]
    fn drift_is_patched_once_then_settles() {
        let h = harness();
        h.storage
            .upsert_job(follower("briefing", "j1", "America/New_York"))
            .unwrap();

        let provider = MovableProvider(Cell::new((52.2053, 0.1218)));
        let lookup = FixedLookup(Some("Europe/London"));
        let scheduler = RecordingScheduler::default();
        let dispatcher = RecordingDispatcher::default();
        let orchestrator = Orchestrator::new(
            &h.storage,
            LocationTracker::new(Some(&provider), &lookup, "Etc/UTC"),
            &scheduler,
            &dispatcher,
            &h.registry_path,
        );

        orchestrator.run_once().unwrap();
        orchestrator.run_once().unwrap();

        // Exactly one patch despite two cycles.
        assert_eq!(
            scheduler.patches.borrow().as_slice(),
            &[("j1".to_string(), "Europe/London".to_string())]
        );
        match &h.storage.load_jobs().unwrap()[0] {
            TrackedJob::TimezoneFollower(job) => {
                assert_eq!(job.last_applied_tz, "Europe/London");
            }
            TrackedJob::Geofence(_) => panic!("wrong kind"),
        }
    }

    #[test]
    fn fallback_timezone_is_never_pushed() {
        let h = harness();
        h.storage
            .upsert_job(follower("briefing", "j1", "America/New_York"))
            .unwrap();

        // Fixes arrive but never resolve a timezone; the configured default
        // must not be mistaken for an observed one.
        let provider = MovableProvider(Cell::new((0.0, -140.0)));
        let lookup = FixedLookup(None);
        let scheduler = RecordingScheduler::default();
        let dispatcher = RecordingDispatcher::default();
        let orchestrator = Orchestrator::new(
            &h.storage,
            LocationTracker::new(Some(&provider), &lookup, "Europe/London"),
            &scheduler,
            &dispatcher,
            &h.registry_path,
        );

        orchestrator.run_once().unwrap();

        assert!(scheduler.patches.borrow().is_empty());
        match &h.storage.load_jobs().unwrap()[0] {
            TrackedJob::TimezoneFollower(job) => {
                assert_eq!(job.last_applied_tz, "America/New_York");
            }
            TrackedJob::Geofence(_) => panic!("wrong kind"),
        }
    }

    #[test]
    fn one_failing_job_does_not_abort_the_cycle() {
        let h = harness();
        h.storage
            .upsert_job(follower("first", "j1", "America/New_York"))
            .unwrap();
        h.storage
            .upsert_job(follower("second", "j2", "America/New_York"))
            .unwrap();
        h.storage
            .upsert_job(geofence_job("gym", EventFilter::Enter, true))
            .unwrap();

        let provider = MovableProvider(Cell::new(INSIDE_GYM));
        let lookup = FixedLookup(Some("Europe/London"));
        let scheduler = RecordingScheduler {
            reject: vec!["j1".to_string()],
            ..RecordingScheduler::default()
        };
        let dispatcher = RecordingDispatcher::default();
        let orchestrator = Orchestrator::new(
            &h.storage,
            LocationTracker::new(Some(&provider), &lookup, "Etc/UTC"),
            &scheduler,
            &dispatcher,
            &h.registry_path,
        );

        orchestrator.run_once().unwrap();

        // The second follower was still patched and the geofence still fired.
        assert_eq!(
            scheduler.patches.borrow().as_slice(),
            &[("j2".to_string(), "Europe/London".to_string())]
        );
        assert_eq!(dispatcher.delivered.borrow().len(), 1);

        // The failed job's mirror is untouched, for the audit to find.
        match &h.storage.load_jobs().unwrap()[0] {
            TrackedJob::TimezoneFollower(job) => {
                assert_eq!(job.last_applied_tz, "America/New_York");
            }
            TrackedJob::Geofence(_) => panic!("wrong kind"),
        }
    }

    #[test]
    fn no_location_skips_geofences_without_state() {
        let h = harness();
        h.storage
            .upsert_job(geofence_job("gym", EventFilter::Enter, true))
            .unwrap();

        let lookup = FixedLookup(None);
        let scheduler = RecordingScheduler::default();
        let dispatcher = RecordingDispatcher::default();
        let orchestrator = Orchestrator::new(
            &h.storage,
            LocationTracker::new(None, &lookup, "Etc/UTC"),
            &scheduler,
            &dispatcher,
            &h.registry_path,
        );

        orchestrator.run_once().unwrap();

        assert!(dispatcher.delivered.borrow().is_empty());
        // Nothing changed, so the runtime store was never even written.
        assert!(h.storage.load_runtime().unwrap().geofences.is_empty());
    }

    #[test]
    fn unresolvable_zone_is_skipped_not_failed() {
        let h = harness();
        let mut job = geofence_job("lost", EventFilter::Enter, true);
        if let TrackedJob::Geofence(geo) = &mut job {
            geo.zone = ZoneRef::Named {
                name: "nowhere".to_string(),
            };
        }
        h.storage.upsert_job(job).unwrap();
        h.storage
            .upsert_job(geofence_job("gym", EventFilter::Enter, true))
            .unwrap();

        let provider = MovableProvider(Cell::new(INSIDE_GYM));
        let lookup = FixedLookup(None);
        let scheduler = RecordingScheduler::default();
        let dispatcher = RecordingDispatcher::default();
        let orchestrator = Orchestrator::new(
            &h.storage,
            LocationTracker::new(Some(&provider), &lookup, "Etc/UTC"),
            &scheduler,
            &dispatcher,
            &h.registry_path,
        );

        orchestrator.run_once().unwrap();

        // The broken job contributed nothing; the healthy one still fired.
        let delivered = dispatcher.delivered.borrow();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].0, "gym");
        let state = h.storage.load_runtime().unwrap();
        assert!(!state.geofences.contains_key("lost"));
    }
}
