//! Processing tracker: simulates the staged background pipeline.
//!
//! Each `start` spawns one run loop that walks [`Stage::WORKING`], advancing
//! progress by a fixed step every tick until the stage target is reached.
//! Pollers read a snapshot of the run's state at any time. Starting again for
//! the same project cancels the previous run before replacing its state, so
//! two loops never write to the same entry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use slugge_core::ids::ProjectId;
use slugge_core::processing::{progress_event, ProcessingStatus, Stage};
use slugge_store::projects::ProjectRepo;
use slugge_store::Database;

use crate::error::EngineError;

#[derive(Clone, Debug)]
pub struct ProcessingConfig {
    /// Simulated work interval between progress steps.
    pub tick: Duration,
    /// Progress added per tick, in whole percent.
    pub step_percent: u32,
    /// Drop completed runs older than this. `None` keeps them for the process lifetime.
    pub status_retention: Option<Duration>,
    /// How often the eviction task looks for expired runs.
    pub sweep_interval: Duration,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(500),
            step_percent: 5,
            status_retention: None,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct RunState {
    percent: u32,
    stage: Stage,
    events: Vec<String>,
    finished_at: Option<Instant>,
}

impl RunState {
    fn queued() -> Self {
        Self {
            percent: 0,
            stage: Stage::Queued,
            events: Vec::new(),
            finished_at: None,
        }
    }

    fn snapshot(&self) -> ProcessingStatus {
        ProcessingStatus {
            progress: f64::from(self.percent) / 100.0,
            stage: self.stage,
            events: self.events.clone(),
        }
    }
}

struct ActiveRun {
    run_id: u64,
    cancel: CancellationToken,
    state: Arc<RwLock<RunState>>,
}

pub struct ProcessingTracker {
    db: Database,
    config: ProcessingConfig,
    runs: Arc<DashMap<ProjectId, ActiveRun>>,
    next_run_id: AtomicU64,
}

impl ProcessingTracker {
    pub fn new(db: Database, config: ProcessingConfig) -> Self {
        Self {
            db,
            config,
            runs: Arc::new(DashMap::new()),
            next_run_id: AtomicU64::new(1),
        }
    }

    /// Reset the project's status to `Queued` and spawn a run in the background.
    ///
    /// Fails only when the project does not exist. Any run already in flight
    /// for the project is cancelled and replaced.
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub fn start(&self, project_id: &ProjectId) -> Result<ProcessingStatus, EngineError> {
        if !ProjectRepo::new(self.db.clone()).exists(project_id)? {
            return Err(EngineError::ProjectNotFound(project_id.to_string()));
        }

        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let state = Arc::new(RwLock::new(RunState::queued()));
        let initial = state.read().snapshot();

        let replaced = self.runs.insert(
            project_id.clone(),
            ActiveRun {
                run_id,
                cancel: cancel.clone(),
                state: Arc::clone(&state),
            },
        );
        if let Some(previous) = replaced {
            previous.cancel.cancel();
            info!(previous_run = previous.run_id, run_id, "restarted processing; previous run cancelled");
        } else {
            info!(run_id, "processing started");
        }

        tokio::spawn(run_pipeline(
            project_id.clone(),
            run_id,
            state,
            cancel,
            self.config.tick,
            self.config.step_percent.max(1),
        ));

        Ok(initial)
    }

    /// Current snapshot, or the idle snapshot when nothing was started.
    pub fn status(&self, project_id: &ProjectId) -> ProcessingStatus {
        self.runs
            .get(project_id)
            .map(|run| run.state.read().snapshot())
            .unwrap_or_else(ProcessingStatus::idle)
    }

    /// Cancel any run for the project and drop its state.
    pub fn forget(&self, project_id: &ProjectId) -> bool {
        match self.runs.remove(project_id) {
            Some((_, run)) => {
                run.cancel.cancel();
                debug!(project_id = %project_id, run_id = run.run_id, "processing state dropped");
                true
            }
            None => false,
        }
    }

    /// Drop completed runs that finished more than `older_than` ago.
    pub fn evict_completed(&self, older_than: Duration) -> usize {
        let before = self.runs.len();
        self.runs.retain(|_, run| match run.state.read().finished_at {
            Some(finished) => finished.elapsed() < older_than,
            None => true,
        });
        before.saturating_sub(self.runs.len())
    }

    /// Cancel every in-flight run. Returns how many were tracked.
    pub fn cancel_all(&self) -> usize {
        let count = self.runs.len();
        for entry in self.runs.iter() {
            entry.value().cancel.cancel();
        }
        count
    }

    pub fn tracked(&self) -> usize {
        self.runs.len()
    }
}

async fn run_pipeline(
    project_id: ProjectId,
    run_id: u64,
    state: Arc<RwLock<RunState>>,
    cancel: CancellationToken,
    tick: Duration,
    step: u32,
) {
    for stage in Stage::WORKING {
        let target = stage.target_percent();
        state.write().stage = stage;

        while state.read().percent < target {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!(project_id = %project_id, run_id, "processing run cancelled");
                    return;
                }
                () = tokio::time::sleep(tick) => {}
            }

            let mut s = state.write();
            s.percent = (s.percent + step).min(target);
            let event = progress_event(stage, s.percent);
            s.events.push(event);
        }
    }

    {
        let mut s = state.write();
        s.stage = Stage::Complete;
        s.finished_at = Some(Instant::now());
    }
    info!(project_id = %project_id, run_id, "processing complete");
}

/// Periodically evict completed runs when a retention window is configured.
pub fn start_eviction_task(tracker: Arc<ProcessingTracker>) -> Option<tokio::task::JoinHandle<()>> {
    let retention = tracker.config.status_retention?;
    let interval = tracker.config.sweep_interval;

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let removed = tracker.evict_completed(retention);
            if removed > 0 {
                info!(removed, "evicted completed processing runs");
            }
        }
    }))
}
