//! CLI interface for waypoint.
//!
//! Thin verbs over the core: each subcommand parses arguments, calls one or
//! two operations, and prints. The reconciliation and evaluation logic lives
//! in the tick orchestrator, not here.
//!
//! `add` routes on its flags:
//!
//! - `--location` (or `--lat`/`--lon`) — a geofence job, owned by waypoint.
//! - `--tz local` — resolve the timezone from GPS now, create the job on the
//!   external scheduler, and track it for re-patching as the operator moves.
//! - anything else — created on the external scheduler, untracked.

mod format;

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use jiff::Timestamp;

use crate::config::Config;
use crate::dispatch::SchedulerDispatcher;
use crate::locate::LocationTracker;
use crate::model::{
    Action, DeliveryMode, EventFilter, GeofenceJob, TimezoneFollower, TrackedJob, ZoneRef,
};
use crate::scheduler::{CliScheduler, CronScheduler, JobPayload, JobSpec};
use crate::storage::Storage;
use crate::tick::Orchestrator;
use crate::tzlookup::TzfLookup;
use crate::{audit, provider};

use format::{describe_filter, describe_zone};

/// Waypoint — location-derived triggers for your scheduler.
#[derive(Debug, Parser)]
#[command(name = "waypoint", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r#"Workflow: location-derived jobs
  1. waypoint add --name briefing --cron "30 6 * * *" --tz local --system-event "Morning briefing"
     → created on the scheduler with the GPS-resolved timezone, re-patched as you travel
  2. waypoint add --name gym --location gym --on enter --system-event "At the gym"
     → geofence job, evaluated by the tick loop against the zone registry
  3. waypoint tick --daemon --interval 30
  4. waypoint status / waypoint audit"#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add a job: geofence, timezone-following, or plain scheduler job.
    Add(AddArgs),

    /// List jobs: the scheduler's, then waypoint's geofence jobs.
    List,

    /// Remove a tracked job by name, including its scheduler mirror.
    Remove {
        #[arg(long)]
        name: String,
    },

    /// Run the reconciliation tick: once, or repeatedly as a daemon.
    Tick {
        /// Keep running, sleeping between cycles.
        #[arg(long)]
        daemon: bool,

        /// Seconds between cycles in daemon mode. Defaults from config.
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Show current location, resolved timezone, and tracked job counts.
    Status,

    /// Check the tracking store against the scheduler for inconsistencies.
    Audit,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Job name, unique across tracked jobs.
    #[arg(long)]
    name: String,

    /// Cron expression (opaque here, interpreted by the scheduler).
    #[arg(long)]
    cron: Option<String>,

    /// Timezone: an IANA id passed through, or `local` to follow GPS.
    #[arg(long)]
    tz: Option<String>,

    /// One-shot time: ISO timestamp or +duration (e.g. `+20m`).
    #[arg(long)]
    at: Option<String>,

    /// Geofence: a named zone from the registry.
    #[arg(long)]
    location: Option<String>,

    /// Geofence: inline zone center latitude (with --lon).
    #[arg(long)]
    lat: Option<f64>,

    /// Geofence: inline zone center longitude (with --lat).
    #[arg(long)]
    lon: Option<f64>,

    /// Geofence: inline zone radius in meters.
    #[arg(long, default_value_t = 50.0)]
    radius_meters: f64,

    /// Geofence: which crossings fire the job.
    #[arg(long, value_enum, default_value = "enter")]
    on: EventArg,

    /// Geofence: fire on every crossing instead of disabling after one.
    #[arg(long)]
    recurring: bool,

    /// Action text injected into the main session as a system event.
    #[arg(long)]
    system_event: Option<String>,

    /// Action text handed to a spawned, isolated agent session.
    #[arg(long)]
    message: Option<String>,
}

/// CLI-facing event filter, mapped to the domain `EventFilter`.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EventArg {
    Enter,
    Exit,
    Both,
}

impl EventArg {
    fn to_domain(self) -> EventFilter {
        match self {
            Self::Enter => EventFilter::Enter,
            Self::Exit => EventFilter::Exit,
            Self::Both => EventFilter::Both,
        }
    }
}

/// Run the CLI, returning an error message on failure.
pub fn run(config: &Config, storage: &Storage) -> Result<(), String> {
    let cli = Cli::parse();
    let scheduler = CliScheduler::new(config.scheduler_bin.clone());

    match cli.command {
        Command::Add(args) => cmd_add(config, storage, &scheduler, args),
        Command::List => cmd_list(storage, &scheduler),
        Command::Remove { name } => cmd_remove(storage, &scheduler, &name),
        Command::Tick { daemon, interval } => {
            cmd_tick(config, storage, &scheduler, daemon, interval)
        }
        Command::Status => cmd_status(config, storage),
        Command::Audit => cmd_audit(storage, &scheduler),
    }
}

// ── add ──

fn cmd_add(
    config: &Config,
    storage: &Storage,
    scheduler: &dyn CronScheduler,
    args: AddArgs,
) -> Result<(), String> {
    if let Some(zone) = zone_ref(&args)? {
        add_geofence(storage, &args, zone)
    } else if args.tz.as_deref() == Some("local") {
        add_follower(config, storage, scheduler, &args)
    } else {
        add_passthrough(scheduler, &args)
    }
}

/// The zone this add targets, if any. Inline coordinates need both halves.
fn zone_ref(args: &AddArgs) -> Result<Option<ZoneRef>, String> {
    if let Some(name) = &args.location {
        return Ok(Some(ZoneRef::Named { name: name.clone() }));
    }
    match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => Ok(Some(ZoneRef::Inline {
            lat,
            lon,
            radius_meters: args.radius_meters,
        })),
        (None, None) => Ok(None),
        _ => Err("inline zones need both --lat and --lon".to_string()),
    }
}

/// The action payload: exactly one of `--system-event` and `--message`.
fn action(args: &AddArgs) -> Result<Action, String> {
    match (&args.system_event, &args.message) {
        (Some(text), None) => Ok(Action {
            text: text.clone(),
            delivery: DeliveryMode::Broadcast,
        }),
        (None, Some(text)) => Ok(Action {
            text: text.clone(),
            delivery: DeliveryMode::IsolatedAgent,
        }),
        (Some(_), Some(_)) => Err("specify --system-event or --message, not both".to_string()),
        (None, None) => Err("specify an action: --system-event or --message".to_string()),
    }
}

fn payload(args: &AddArgs) -> Result<JobPayload, String> {
    let action = action(args)?;
    Ok(match action.delivery {
        DeliveryMode::Broadcast => JobPayload::SystemEvent(action.text),
        DeliveryMode::IsolatedAgent => JobPayload::AgentMessage(action.text),
    })
}

fn add_geofence(storage: &Storage, args: &AddArgs, zone: ZoneRef) -> Result<(), String> {
    let job = GeofenceJob {
        name: args.name.clone(),
        enabled: true,
        recurring: args.recurring,
        zone,
        on: args.on.to_domain(),
        action: action(args)?,
    };

    let summary = format!(
        "Added geofence job {}: zone {}, on {} ({})",
        job.name,
        describe_zone(&job.zone),
        describe_filter(job.on),
        if job.recurring { "recurring" } else { "one-shot" },
    );
    storage
        .upsert_job(TrackedJob::Geofence(job))
        .map_err(|e| format!("failed to save job: {e}"))?;

    eprintln!("{summary}");
    Ok(())
}

fn add_follower(
    config: &Config,
    storage: &Storage,
    scheduler: &dyn CronScheduler,
    args: &AddArgs,
) -> Result<(), String> {
    let cron = args
        .cron
        .clone()
        .ok_or("--tz local requires --cron".to_string())?;
    let payload = payload(args)?;

    // Resolve the timezone from the freshest fix we can get. With no fix
    // ever observed this falls back to the configured default; the tick
    // loop re-patches once GPS resolves a real one.
    let provider = provider::from_settings(&config.provider);
    let lookup = TzfLookup::new();
    let tracker = LocationTracker::new(provider.as_deref(), &lookup, &config.default_tz);

    let mut state = storage
        .load_runtime()
        .map_err(|e| format!("failed to load runtime state: {e}"))?;
    tracker.refresh(&mut state);
    storage
        .save_runtime(&state)
        .map_err(|e| format!("failed to save runtime state: {e}"))?;
    let resolved = tracker.current_timezone(&state).to_string();

    let spec = JobSpec {
        name: args.name.clone(),
        cron_expr: Some(cron.clone()),
        at: args.at.clone(),
        timezone: Some(resolved.clone()),
        payload,
        delete_after_run: false,
        announce: false,
    };
    let id = scheduler
        .create(&spec)
        .map_err(|e| format!("failed to create job on the scheduler: {e}"))?;

    storage
        .upsert_job(TrackedJob::TimezoneFollower(TimezoneFollower {
            name: args.name.clone(),
            external_job_id: id.clone(),
            cron_expr: cron,
            last_applied_tz: resolved.clone(),
        }))
        .map_err(|e| format!("failed to save job: {e}"))?;

    println!("{id}");
    eprintln!("Tracking {} (tz {resolved})", args.name);
    Ok(())
}

fn add_passthrough(scheduler: &dyn CronScheduler, args: &AddArgs) -> Result<(), String> {
    let payload = payload(args)?;
    let spec = JobSpec {
        name: args.name.clone(),
        cron_expr: args.cron.clone(),
        at: args.at.clone(),
        timezone: args.tz.clone(),
        payload,
        delete_after_run: false,
        announce: false,
    };
    let id = scheduler
        .create(&spec)
        .map_err(|e| format!("failed to create job on the scheduler: {e}"))?;
    println!("{id}");
    Ok(())
}

// ── list ──

fn cmd_list(storage: &Storage, scheduler: &dyn CronScheduler) -> Result<(), String> {
    let jobs = storage
        .load_jobs()
        .map_err(|e| format!("failed to load jobs: {e}"))?;

    match scheduler.list() {
        Ok(engine_jobs) => {
            if engine_jobs.is_empty() {
                println!("No scheduler jobs");
            }
            for job in engine_jobs {
                let follows = jobs.iter().any(|j| match j {
                    TrackedJob::TimezoneFollower(f) => f.external_job_id == job.id,
                    TrackedJob::Geofence(_) => false,
                });
                println!(
                    "{}  {}  [{} {}]{}",
                    job.id,
                    job.name,
                    job.schedule.expr.as_deref().unwrap_or("-"),
                    job.schedule.tz.as_deref().unwrap_or("-"),
                    if follows { "  (follows location)" } else { "" },
                );
            }
        }
        // The scheduler being down shouldn't hide waypoint's own jobs.
        Err(e) => eprintln!("scheduler unavailable: {e}"),
    }

    let geofences: Vec<&GeofenceJob> = jobs
        .iter()
        .filter_map(|j| match j {
            TrackedJob::Geofence(g) => Some(g),
            TrackedJob::TimezoneFollower(_) => None,
        })
        .collect();

    if !geofences.is_empty() {
        println!("\n── geofence jobs ──");
        for job in geofences {
            println!(
                "  {}  {:30}  zone:{} on:{} ({})",
                if job.enabled { "on " } else { "off" },
                job.name,
                describe_zone(&job.zone),
                describe_filter(job.on),
                if job.recurring { "recurring" } else { "one-shot" },
            );
        }
    }

    Ok(())
}

// ── remove ──

fn cmd_remove(
    storage: &Storage,
    scheduler: &dyn CronScheduler,
    name: &str,
) -> Result<(), String> {
    let removed = storage
        .remove_job(name)
        .map_err(|e| format!("failed to update tracking store: {e}"))?;

    match removed {
        None => Err(format!("no tracked job named '{name}'")),
        Some(TrackedJob::Geofence(_)) => {
            let mut state = storage
                .load_runtime()
                .map_err(|e| format!("failed to load runtime state: {e}"))?;
            state.remove_geofence(name);
            storage
                .save_runtime(&state)
                .map_err(|e| format!("failed to save runtime state: {e}"))?;
            eprintln!("Removed geofence job {name}");
            Ok(())
        }
        Some(TrackedJob::TimezoneFollower(follower)) => {
            scheduler
                .delete(&follower.external_job_id)
                .map_err(|e| format!("tracking removed, but the scheduler delete failed: {e}"))?;
            eprintln!(
                "Removed {name} and scheduler job {}",
                follower.external_job_id
            );
            Ok(())
        }
    }
}

// ── tick ──

fn cmd_tick(
    config: &Config,
    storage: &Storage,
    scheduler: &dyn CronScheduler,
    daemon: bool,
    interval: Option<u64>,
) -> Result<(), String> {
    let provider = provider::from_settings(&config.provider);
    let lookup = TzfLookup::new();
    let tracker = LocationTracker::new(provider.as_deref(), &lookup, &config.default_tz);
    let dispatcher = SchedulerDispatcher::new(scheduler);

    let data_dir = config.data_dir()?;
    let registry_path = config.locations_file(&data_dir);
    let orchestrator = Orchestrator::new(storage, tracker, scheduler, &dispatcher, &registry_path);

    if daemon {
        let interval = interval.map_or_else(|| config.tick_interval(), Duration::from_secs);
        orchestrator.run_forever(interval)
    } else {
        orchestrator
            .run_once()
            .map_err(|e| format!("tick failed: {e}"))
    }
}

// ── status ──

fn cmd_status(config: &Config, storage: &Storage) -> Result<(), String> {
    let provider = provider::from_settings(&config.provider);
    let lookup = TzfLookup::new();
    let tracker = LocationTracker::new(provider.as_deref(), &lookup, &config.default_tz);

    let mut state = storage
        .load_runtime()
        .map_err(|e| format!("failed to load runtime state: {e}"))?;
    tracker.refresh(&mut state);
    storage
        .save_runtime(&state)
        .map_err(|e| format!("failed to save runtime state: {e}"))?;

    match state.location {
        Some(fix) => println!("Location: ({:.4}, {:.4})", fix.lat, fix.lon),
        None => println!("Location: none yet"),
    }

    let tz = tracker.current_timezone(&state);
    let origin = if state.timezone.is_some() {
        "gps"
    } else {
        "default"
    };
    println!("Timezone: {tz} ({origin})");
    if let Ok(zone) = jiff::tz::TimeZone::get(tz) {
        println!(
            "Local time: {}",
            Timestamp::now()
                .to_zoned(zone)
                .strftime("%Y-%m-%d %H:%M:%S %Z")
        );
    }

    let jobs = storage
        .load_jobs()
        .map_err(|e| format!("failed to load jobs: {e}"))?;
    let followers = jobs
        .iter()
        .filter(|j| matches!(j, TrackedJob::TimezoneFollower(_)))
        .count();
    println!(
        "Tracked: {followers} timezone-following, {} geofence",
        jobs.len() - followers
    );
    Ok(())
}

// ── audit ──

fn cmd_audit(storage: &Storage, scheduler: &dyn CronScheduler) -> Result<(), String> {
    let jobs = storage
        .load_jobs()
        .map_err(|e| format!("failed to load jobs: {e}"))?;

    let findings = audit::check(&jobs, scheduler).map_err(|e| format!("audit failed: {e}"))?;
    if findings.is_empty() {
        let followers = jobs
            .iter()
            .filter(|j| matches!(j, TrackedJob::TimezoneFollower(_)))
            .count();
        println!("Consistent: {followers} tracked scheduler job(s) verified");
        return Ok(());
    }

    for finding in &findings {
        println!("{finding}");
    }
    Err(format!("{} consistency finding(s)", findings.len()))
}
