//! External scheduler client.
//!
//! The cron engine that actually runs jobs is a separate program, reached
//! through its CLI in machine-readable mode (`--json`). Waypoint needs four
//! operations from it: create a job, list jobs, patch a job's timezone, and
//! delete a job. Everything else about the engine is its own business.
//!
//! Calls are synchronous with a bounded wait: the child is spawned, polled
//! until a deadline, and killed if it overruns. A stuck engine call costs one
//! tick, never the process.

use std::collections::BTreeMap;
use std::io;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::debug;

/// How long a single engine call may take.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll granularity while waiting for the child to exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Errors from talking to the external scheduler.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("failed to launch {bin}: {source}")]
    Spawn { bin: String, source: io::Error },

    #[error("`{verb}` timed out after {timeout:?}")]
    Timeout { verb: String, timeout: Duration },

    #[error("`{verb}` failed: {detail}")]
    Failed { verb: String, detail: String },

    #[error("unparseable `{verb}` response: {source}")]
    Response {
        verb: String,
        source: serde_json::Error,
    },
}

pub type Result<T> = core::result::Result<T, SchedulerError>;

/// The external cron engine, as seen from waypoint.
pub trait CronScheduler {
    /// Create a job. Returns the engine's id for it.
    fn create(&self, spec: &JobSpec) -> Result<String>;

    /// List all jobs the engine knows about.
    fn list(&self) -> Result<Vec<ExternalJob>>;

    /// Patch an existing job's timezone by id.
    fn patch_timezone(&self, id: &str, tz: &str) -> Result<()>;

    /// Delete a job by id.
    fn delete(&self, id: &str) -> Result<()>;
}

/// A request to create a job on the engine.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub name: String,

    /// Cron expression, opaque to waypoint.
    pub cron_expr: Option<String>,

    /// One-shot time: an ISO timestamp or a `+duration` offset.
    pub at: Option<String>,

    pub timezone: Option<String>,
    pub payload: JobPayload,
    pub delete_after_run: bool,

    /// Ask the engine to announce the run's result.
    pub announce: bool,
}

/// What the engine should do when the job fires.
#[derive(Debug, Clone)]
pub enum JobPayload {
    /// Inject text into the main session as a system event.
    SystemEvent(String),

    /// Hand text to a spawned, isolated agent session.
    AgentMessage(String),
}

/// A job as reported by the engine's list operation.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalJob {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub schedule: ExternalSchedule,
}

/// Schedule fields waypoint reads back: expression and timezone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalSchedule {
    #[serde(default)]
    pub expr: Option<String>,
    #[serde(default)]
    pub tz: Option<String>,
}

impl ExternalJob {
    /// Index a listing by job id.
    pub fn by_id(jobs: Vec<ExternalJob>) -> BTreeMap<String, ExternalJob> {
        jobs.into_iter().map(|j| (j.id.clone(), j)).collect()
    }
}

// ── CLI-backed implementation ──

/// Scheduler reached by invoking `<bin> cron <verb> … --json`.
pub struct CliScheduler {
    bin: String,
}

impl CliScheduler {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    /// Run one engine call and return its parsed stdout.
    fn run(&self, verb: &str, args: &[String]) -> Result<serde_json::Value> {
        debug!(bin = %self.bin, verb, "engine call");

        let mut child = Command::new(&self.bin)
            .arg("cron")
            .arg(verb)
            .args(args)
            .arg("--json")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SchedulerError::Spawn {
                bin: self.bin.clone(),
                source,
            })?;

        // Drain the pipes from helper threads so a chatty child can't fill
        // a pipe buffer and deadlock against our bounded wait.
        let mut stdout_pipe = child.stdout.take();
        let stdout_thread = thread::spawn(move || read_all(stdout_pipe.as_mut()));
        let mut stderr_pipe = child.stderr.take();
        let stderr_thread = thread::spawn(move || read_all(stderr_pipe.as_mut()));

        let deadline = Instant::now() + CALL_TIMEOUT;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(SchedulerError::Timeout {
                        verb: verb.to_string(),
                        timeout: CALL_TIMEOUT,
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => {
                    return Err(SchedulerError::Spawn {
                        bin: self.bin.clone(),
                        source,
                    });
                }
            }
        };

        let stdout = stdout_thread.join().unwrap_or_default();
        let stderr = stderr_thread.join().unwrap_or_default();

        if !status.success() {
            let detail = if stderr.trim().is_empty() {
                format!("exit status {status}")
            } else {
                stderr.trim().to_string()
            };
            return Err(SchedulerError::Failed {
                verb: verb.to_string(),
                detail,
            });
        }

        serde_json::from_str(&stdout).map_err(|source| SchedulerError::Response {
            verb: verb.to_string(),
            source,
        })
    }
}

fn read_all(pipe: Option<&mut impl io::Read>) -> String {
    let mut buf = String::new();
    if let Some(pipe) = pipe {
        let _ = pipe.read_to_string(&mut buf);
    }
    buf
}

impl CronScheduler for CliScheduler {
    fn create(&self, spec: &JobSpec) -> Result<String> {
        #[derive(Deserialize)]
        struct Created {
            id: String,
        }

        let value = self.run("add", &create_args(spec))?;
        let created: Created =
            serde_json::from_value(value).map_err(|source| SchedulerError::Response {
                verb: "add".to_string(),
                source,
            })?;
        Ok(created.id)
    }

    fn list(&self) -> Result<Vec<ExternalJob>> {
        #[derive(Deserialize)]
        struct Listing {
            #[serde(default)]
            jobs: Vec<ExternalJob>,
        }

        let value = self.run("list", &[])?;
        let listing: Listing =
            serde_json::from_value(value).map_err(|source| SchedulerError::Response {
                verb: "list".to_string(),
                source,
            })?;
        Ok(listing.jobs)
    }

    fn patch_timezone(&self, id: &str, tz: &str) -> Result<()> {
        self.run(
            "edit",
            &[id.to_string(), "--tz".to_string(), tz.to_string()],
        )?;
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.run("rm", &[id.to_string()])?;
        Ok(())
    }
}

/// CLI arguments for a create call.
fn create_args(spec: &JobSpec) -> Vec<String> {
    let mut args = vec!["--name".to_string(), spec.name.clone()];

    if let Some(expr) = &spec.cron_expr {
        args.push("--cron".to_string());
        args.push(expr.clone());
    }
    if let Some(at) = &spec.at {
        args.push("--at".to_string());
        args.push(at.clone());
    }
    if let Some(tz) = &spec.timezone {
        args.push("--tz".to_string());
        args.push(tz.clone());
    }

    match &spec.payload {
        JobPayload::SystemEvent(text) => {
            args.push("--system-event".to_string());
            args.push(text.clone());
        }
        JobPayload::AgentMessage(text) => {
            args.push("--session".to_string());
            args.push("isolated".to_string());
            args.push("--message".to_string());
            args.push(text.clone());
        }
    }

    if spec.delete_after_run {
        args.push("--delete-after-run".to_string());
    }
    if spec.announce {
        args.push("--announce".to_string());
    }

    args
}
