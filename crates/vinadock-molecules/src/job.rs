//! Docking job queue.
//!
//! A job moves `queued → running → completed | failed | timed_out` and never
//! goes back. Runs are bounded by a semaphore; the job table lock is never
//! held across the Vina subprocess.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock, Semaphore};
use tracing::{info, warn};
use uuid::Uuid;

use vinadock_common::{DockingSettings, Result};

use crate::docking::{DockingFailure, DockingResult, VinaRunner};
use crate::request::{DockingBox, DockingRequest};
use crate::workspace::JobWorkspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    TimedOut,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::TimedOut)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::TimedOut => "timed_out",
        }
    }

    fn from_result(result: &DockingResult) -> Self {
        match result {
            DockingResult::Completed { .. } => JobStatus::Completed,
            DockingResult::Failed(DockingFailure::TimedOut { .. }) => JobStatus::TimedOut,
            DockingResult::Failed(_) => JobStatus::Failed,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub id: JobId,
    pub status: JobStatus,
    pub receptor_name: String,
    pub ligand_name: String,
    pub docking_box: DockingBox,
    /// Shell-quoted rendering of the Vina invocation.
    pub command: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub result: Option<DockingResult>,
    #[serde(skip)]
    pub workspace: JobWorkspace,
}

/// Job transitions, pushed to subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    JobQueued { job_id: JobId },
    JobStarted { job_id: JobId },
    JobFinished { job_id: JobId, status: JobStatus, message: Option<String> },
}

impl JobEvent {
    /// Event name, also the serialized `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            JobEvent::JobQueued { .. } => "job_queued",
            JobEvent::JobStarted { .. } => "job_started",
            JobEvent::JobFinished { .. } => "job_finished",
        }
    }

    pub fn job_id(&self) -> JobId {
        match self {
            JobEvent::JobQueued { job_id }
            | JobEvent::JobStarted { job_id }
            | JobEvent::JobFinished { job_id, .. } => *job_id,
        }
    }
}

#[derive(Default)]
struct JobTable {
    records: HashMap<JobId, JobRecord>,
    order: VecDeque<JobId>,
}

impl JobTable {
    /// Drop the oldest finished jobs until at most `retain` finished jobs
    /// remain. Queued and running jobs are never dropped, and neither is `keep`.
    fn evict(&mut self, retain: usize, keep: JobId) -> Vec<JobWorkspace> {
        let records = &self.records;
        let finished: Vec<JobId> = self
            .order
            .iter()
            .copied()
            .filter(|id| records.get(id).is_some_and(|r| r.status.is_terminal()))
            .collect();

        let excess = finished.len().saturating_sub(retain);
        let doomed: Vec<JobId> = finished.into_iter().filter(|id| *id != keep).take(excess).collect();

        let mut removed = Vec::new();
        for id in doomed {
            self.order.retain(|other| *other != id);
            if let Some(record) = self.records.remove(&id) {
                removed.push(record.workspace);
            }
        }
        removed
    }
}

struct Inner {
    runner: VinaRunner,
    work_root: PathBuf,
    retain: usize,
    permits: Arc<Semaphore>,
    table: RwLock<JobTable>,
    event_tx: broadcast::Sender<JobEvent>,
}

/// In-memory docking job queue. Cheap to clone.
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<Inner>,
}

impl JobQueue {
    pub fn new<P: AsRef<Path>>(
        runner: VinaRunner,
        work_root: P,
        max_concurrent_jobs: usize,
        retain_jobs: usize,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(Inner {
                runner,
                work_root: work_root.as_ref().to_path_buf(),
                retain: retain_jobs.max(1),
                permits: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
                table: RwLock::new(JobTable::default()),
                event_tx,
            }),
        }
    }

    pub fn from_settings(settings: &DockingSettings) -> Self {
        Self::new(
            VinaRunner::from_settings(settings),
            &settings.work_root,
            settings.max_concurrent_jobs,
            settings.retain_jobs,
        )
    }

    pub fn runner(&self) -> &VinaRunner {
        &self.inner.runner
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Register a job in its own workspace and start it in the background.
    pub async fn submit(&self, request: DockingRequest) -> Result<JobId> {
        let id = JobId::new();
        let workspace = JobWorkspace::create(&self.inner.work_root, &id.to_string()).await?;
        let command = self
            .inner
            .runner
            .command(&workspace, &request.docking_box)
            .display();

        let record = JobRecord {
            id,
            status: JobStatus::Queued,
            receptor_name: request.receptor.file_name.clone(),
            ligand_name: request.ligand.file_name.clone(),
            docking_box: request.docking_box,
            command,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            result: None,
            workspace: workspace.clone(),
        };

        {
            let mut table = self.inner.table.write().await;
            table.records.insert(id, record);
            table.order.push_back(id);
        }

        info!("Queued docking job {} ({} + {})", id, request.receptor.file_name, request.ligand.file_name);
        self.emit(JobEvent::JobQueued { job_id: id });

        let queue = self.clone();
        tokio::spawn(async move {
            queue.execute(id, workspace, request).await;
        });

        Ok(id)
    }

    pub async fn get(&self, id: &JobId) -> Option<JobRecord> {
        self.inner.table.read().await.records.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.table.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Wait until `id` reaches a terminal state. `None` if the job is unknown.
    pub async fn wait_for(&self, id: JobId) -> Option<JobRecord> {
        // Subscribe before the first read so a finish in between is not missed.
        let mut rx = self.subscribe();
        loop {
            let record = self.get(&id).await?;
            if record.status.is_terminal() {
                return Some(record);
            }
            if let Err(broadcast::error::RecvError::Closed) = rx.recv().await {
                return self.get(&id).await;
            }
        }
    }

    async fn execute(&self, id: JobId, workspace: JobWorkspace, request: DockingRequest) {
        let _permit = match self.inner.permits.clone().acquire_owned().await {
            Ok(p) => p,
            Err(e) => {
                let failure = DockingFailure::Invocation { message: e.to_string() };
                self.finish(id, DockingResult::Failed(failure)).await;
                return;
            }
        };

        {
            let mut table = self.inner.table.write().await;
            if let Some(record) = table.records.get_mut(&id) {
                record.status = JobStatus::Running;
                record.started_at = Some(Utc::now());
            }
        }
        info!("Docking job {} started", id);
        self.emit(JobEvent::JobStarted { job_id: id });

        let result = self.inner.runner.run(&workspace, &request).await;
        self.finish(id, result).await;
    }

    async fn finish(&self, id: JobId, result: DockingResult) {
        let status = JobStatus::from_result(&result);
        let message = result.failure().map(|f| f.to_string());
        match &message {
            Some(m) => warn!("Docking job {} {}: {}", id, status, m),
            None => info!("Docking job {} completed", id),
        }

        let evicted = {
            let mut table = self.inner.table.write().await;
            if let Some(record) = table.records.get_mut(&id) {
                record.status = status;
                record.finished_at = Some(Utc::now());
                record.result = Some(result);
            }
            table.evict(self.inner.retain, id)
        };
        remove_workspaces(evicted).await;

        self.emit(JobEvent::JobFinished { job_id: id, status, message });
    }

    fn emit(&self, event: JobEvent) {
        // No subscribers is fine.
        let _ = self.inner.event_tx.send(event);
    }
}

async fn remove_workspaces(workspaces: Vec<JobWorkspace>) {
    for ws in workspaces {
        if let Err(e) = ws.remove().await {
            warn!("Failed to remove evicted job directory {:?}: {}", ws.dir(), e);
        }
    }
}
