//! Background solve and repair jobs.
//!
//! Each job runs on its own thread against an immutable snapshot, so a
//! caller can keep serving reads while a generation or repair is running.
//! Job lifecycle changes can be streamed through a tokio channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};

use timeweave_config::SchedulerConfig;
use timeweave_core::{AssignmentSet, EntitySnapshot, Result};

use crate::conflict::ConflictGraph;
use crate::engine::SolverEngine;
use crate::repair::{RepairEngine, RepairOutcome, RepairRequest};
use crate::strategy::SolveOutcome;
use crate::termination::Deadline;

/// Identifies a background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job#{}", self.0)
    }
}

/// Status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// No such job, or its result has been taken.
    Unknown,
    Running,
    Finished,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Unknown => "UNKNOWN",
            JobStatus::Running => "RUNNING",
            JobStatus::Finished => "FINISHED",
        }
    }
}

/// What a finished job produced.
#[derive(Debug)]
pub enum JobResult {
    Generated(Result<SolveOutcome>),
    Repaired(Result<RepairOutcome>),
}

/// Lifecycle notification sent to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    Started { job: JobId, kind: &'static str },
    Finished { job: JobId, status: String },
}

struct Job {
    status: JobStatus,
    result: Option<JobResult>,
    terminate_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

type Jobs = Arc<Mutex<HashMap<JobId, Job>>>;

fn lock(jobs: &Mutex<HashMap<JobId, Job>>) -> MutexGuard<'_, HashMap<JobId, Job>> {
    jobs.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs generations and repairs on background threads.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use timeweave_config::SchedulerConfig;
/// use timeweave_solver::{JobResult, ScheduleManager};
/// use timeweave_test::campus;
///
/// let manager = ScheduleManager::new(SchedulerConfig::default());
/// let job = manager.submit_generate(Arc::new(campus::small_campus()));
/// manager.wait(job);
/// match manager.take_result(job) {
///     Some(JobResult::Generated(Ok(outcome))) => assert!(outcome.is_feasible()),
///     other => panic!("unexpected result: {:?}", other),
/// }
/// ```
pub struct ScheduleManager {
    config: SchedulerConfig,
    jobs: Jobs,
    next_id: AtomicU64,
    notifier: Option<mpsc::UnboundedSender<JobEvent>>,
}

impl ScheduleManager {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            jobs: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            notifier: None,
        }
    }

    /// Streams job events to `sender`.
    pub fn with_notifier(mut self, sender: mpsc::UnboundedSender<JobEvent>) -> Self {
        self.notifier = Some(sender);
        self
    }

    /// Creates a manager and the receiving end of its event stream.
    pub fn with_channel(config: SchedulerConfig) -> (Self, mpsc::UnboundedReceiver<JobEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(config).with_notifier(sender), receiver)
    }

    /// Starts generating a schedule for the snapshot.
    pub fn submit_generate(&self, snapshot: Arc<EntitySnapshot>) -> JobId {
        let engine = SolverEngine::new(self.config.clone());
        self.spawn("generate", move |cancel| {
            JobResult::Generated(engine.generate_with(snapshot, Deadline::none(), Some(cancel)))
        })
    }

    /// Starts repairing `set` against the conflicts in `graph`.
    pub fn submit_repair(
        &self,
        snapshot: Arc<EntitySnapshot>,
        set: AssignmentSet,
        graph: ConflictGraph,
        change_budget: usize,
    ) -> JobId {
        let engine = RepairEngine::new(snapshot, &self.config);
        let request = RepairRequest::new(set, graph, change_budget);
        self.submit_repair_request(engine, request)
    }

    /// Starts a fully specified repair.
    pub fn submit_repair_request(&self, engine: RepairEngine, request: RepairRequest) -> JobId {
        self.spawn("repair", move |cancel| {
            JobResult::Repaired(engine.run(&request.with_cancel(cancel)))
        })
    }

    fn spawn<F>(&self, kind: &'static str, work: F) -> JobId
    where
        F: FnOnce(Arc<AtomicBool>) -> JobResult + Send + 'static,
    {
        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let terminate_flag = Arc::new(AtomicBool::new(false));
        lock(&self.jobs).insert(
            id,
            Job {
                status: JobStatus::Running,
                result: None,
                terminate_flag: terminate_flag.clone(),
                handle: None,
            },
        );
        info!(event = "job_start", job = %id, kind);
        self.notify(JobEvent::Started { job: id, kind });

        let jobs = self.jobs.clone();
        let notifier = self.notifier.clone();
        let handle = std::thread::spawn(move || {
            let result = work(terminate_flag);
            let status = match &result {
                JobResult::Generated(Ok(outcome)) => outcome.status().to_string(),
                JobResult::Repaired(Ok(outcome)) => outcome.state.as_str().to_string(),
                JobResult::Generated(Err(_)) | JobResult::Repaired(Err(_)) => "ERROR".to_string(),
            };
            if let Some(job) = lock(&jobs).get_mut(&id) {
                job.status = JobStatus::Finished;
                job.result = Some(result);
            }
            info!(event = "job_end", job = %id, status = %status);
            if let Some(sender) = notifier {
                let _ = sender.send(JobEvent::Finished { job: id, status });
            }
        });

        if let Some(job) = lock(&self.jobs).get_mut(&id) {
            job.handle = Some(handle);
        }
        id
    }

    fn notify(&self, event: JobEvent) {
        if let Some(sender) = &self.notifier {
            let _ = sender.send(event);
        }
    }

    pub fn status(&self, id: JobId) -> JobStatus {
        lock(&self.jobs)
            .get(&id)
            .map_or(JobStatus::Unknown, |job| job.status)
    }

    /// Asks a running job to stop at its next node expansion.
    ///
    /// Returns false if the job is unknown or already finished.
    pub fn terminate_early(&self, id: JobId) -> bool {
        let jobs = lock(&self.jobs);
        match jobs.get(&id) {
            Some(job) if job.status == JobStatus::Running => {
                job.terminate_flag.store(true, Ordering::SeqCst);
                debug!(job = %id, "Termination requested");
                true
            }
            _ => false,
        }
    }

    /// Blocks until the job's thread has finished.
    pub fn wait(&self, id: JobId) {
        let handle = lock(&self.jobs).get_mut(&id).and_then(|job| job.handle.take());
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    /// Removes a finished job and returns its result.
    pub fn take_result(&self, id: JobId) -> Option<JobResult> {
        let mut jobs = lock(&self.jobs);
        if jobs.get(&id)?.status != JobStatus::Finished {
            return None;
        }
        jobs.remove(&id).and_then(|job| job.result)
    }

    /// Number of jobs not yet taken.
    pub fn job_count(&self) -> usize {
        lock(&self.jobs).len()
    }
}

impl std::fmt::Debug for ScheduleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleManager")
            .field("jobs", &self.job_count())
            .finish()
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
