use crate::error::ScanError;
use crate::executor::{Executor, HttpExecutor};
use crate::types::{
    Outcome, ProbeOutcome, ProbeStatus, ScanConfig, ScanResults, Target, TaskException,
    UploadOutcome,
};
use ::time::{format_description::well_known, OffsetDateTime};
use indicatif::ProgressBar;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinError, JoinSet};
use tracing::{debug, info, warn};

/// Largest permit count the task pool's semaphore accepts.
pub const MAX_CONCURRENCY: usize = Semaphore::MAX_PERMITS;

/// Scan the provided targets against the candidate path catalog over HTTP.
///
/// Builds a [`HttpExecutor`] from `config` and runs without a visible progress line.
pub async fn scan_targets(
    targets: &[Target],
    paths: &[String],
    config: &ScanConfig,
) -> Result<ScanResults, ScanError> {
    let executor = Arc::new(HttpExecutor::new(config)?);
    run_scan(targets, paths, config, executor, &ProgressBar::hidden()).await
}

/// Targets finished versus targets submitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanProgress {
    pub done: u64,
    pub total: u64,
}

impl ScanProgress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.done as f64 / self.total as f64 * 100.0
    }
}

/// Run one scan with the given executor.
///
/// - One probe task per target; at most `config.concurrency` tasks (probes and uploads) run at once.
/// - Outcomes are appended in task completion order by this coordinator only.
/// - Every `FOUND` probe outcome triggers an upload task when `config.upload_file` is set.
/// - A probe task that errors or panics is recorded as a single `EXCEPTION` outcome.
/// - `progress` advances once per finished probe task.
pub async fn run_scan(
    targets: &[Target],
    paths: &[String],
    config: &ScanConfig,
    executor: Arc<dyn Executor>,
    progress: &ProgressBar,
) -> Result<ScanResults, ScanError> {
    if config.concurrency == 0 || config.concurrency > MAX_CONCURRENCY {
        return Err(ScanError::InvalidConcurrency(config.concurrency));
    }

    let started_at = now_rfc3339();
    let mut state = ScanProgress {
        done: 0,
        total: targets.len() as u64,
    };
    progress.set_length(state.total);
    info!(
        targets = targets.len(),
        paths = paths.len(),
        concurrency = config.concurrency,
        upload = config.upload_file.is_some(),
        "starting scan"
    );

    let paths: Arc<[String]> = paths.into();
    let mut pool = TaskPool::new(config.concurrency, executor);
    for target in targets {
        pool.submit_probe(target.clone(), paths.clone());
    }

    let mut entries: Vec<Outcome> = Vec::new();
    let mut found_count = 0u64;

    while let Some(joined) = pool.join_next().await {
        match joined {
            Finished::Probe { target, result } => {
                match result {
                    Ok(outcomes) => {
                        for outcome in outcomes {
                            if outcome.status == ProbeStatus::Found {
                                found_count += 1;
                                if let Some(file) = &config.upload_file {
                                    let url = outcome.target.join(&outcome.path);
                                    pool.submit_upload(url, file.clone());
                                }
                            }
                            entries.push(Outcome::Probe(outcome));
                        }
                    }
                    Err(message) => {
                        warn!(%target, "probe task failed: {message}");
                        entries.push(Outcome::Exception(TaskException {
                            url: target.to_string(),
                            message: format!("Exception processing {target}: {message}"),
                        }));
                    }
                }

                state.done += 1;
                progress.inc(1);
                progress.set_message(format!("{:.1}% - Checking: {target}", state.percent()));
            }
            Finished::Upload { url, result } => match result {
                Ok(outcome) => entries.push(Outcome::Upload(outcome)),
                Err(message) => {
                    warn!(%url, "upload task failed: {message}");
                    entries.push(Outcome::Exception(TaskException {
                        message: format!("Exception processing {url}: {message}"),
                        url,
                    }));
                }
            },
        }
    }

    info!(
        outcomes = entries.len(),
        found = found_count,
        "scan finished"
    );

    Ok(ScanResults {
        targets_total: state.total,
        targets_done: state.done,
        found_count,
        started_at,
        finished_at: now_rfc3339(),
        entries,
    })
}

/// What a task was submitted for, so a panicked task can still be attributed.
enum TaskLabel {
    Probe(Target),
    Upload(String),
}

enum Finished {
    Probe {
        target: Target,
        result: Result<Vec<ProbeOutcome>, String>,
    },
    Upload {
        url: String,
        result: Result<UploadOutcome, String>,
    },
}

/// Bounded pool shared by probe and upload tasks.
///
/// Permits are taken inside each task, in FIFO order, so submitting never blocks the coordinator.
/// The set's length is the outstanding task count; it grows on every submission, including
/// uploads discovered mid-run, and the scan ends when it drains to zero.
struct TaskPool {
    set: JoinSet<Finished>,
    labels: HashMap<task::Id, TaskLabel>,
    sem: Arc<Semaphore>,
    executor: Arc<dyn Executor>,
}

impl TaskPool {
    fn new(concurrency: usize, executor: Arc<dyn Executor>) -> Self {
        Self {
            set: JoinSet::new(),
            labels: HashMap::new(),
            sem: Arc::new(Semaphore::new(concurrency)),
            executor,
        }
    }

    fn submit_probe(&mut self, target: Target, paths: Arc<[String]>) {
        let sem = self.sem.clone();
        let executor = self.executor.clone();
        let label = TaskLabel::Probe(target.clone());
        let handle = self.set.spawn(async move {
            let _permit = sem.acquire_owned().await.expect("semaphore in scope");
            let result = executor
                .probe(&target, &paths)
                .await
                .map_err(|e| format!("{e:#}"));
            Finished::Probe { target, result }
        });
        self.labels.insert(handle.id(), label);
    }

    fn submit_upload(&mut self, url: String, file: PathBuf) {
        debug!(%url, "queueing upload");
        let sem = self.sem.clone();
        let executor = self.executor.clone();
        let label = TaskLabel::Upload(url.clone());
        let handle = self.set.spawn(async move {
            let _permit = sem.acquire_owned().await.expect("semaphore in scope");
            let outcome = executor.upload(&url, &file).await;
            Finished::Upload {
                url,
                result: Ok(outcome),
            }
        });
        self.labels.insert(handle.id(), label);
    }

    /// Wait for the next task to finish, in completion order. `None` once nothing is outstanding.
    async fn join_next(&mut self) -> Option<Finished> {
        match self.set.join_next_with_id().await? {
            Ok((id, finished)) => {
                self.labels.remove(&id);
                Some(finished)
            }
            Err(err) => {
                let label = self
                    .labels
                    .remove(&err.id())
                    .unwrap_or_else(|| TaskLabel::Upload("<unknown task>".to_string()));
                let message = describe_join_error(err);
                Some(match label {
                    TaskLabel::Probe(target) => Finished::Probe {
                        target,
                        result: Err(message),
                    },
                    TaskLabel::Upload(url) => Finished::Upload {
                        url,
                        result: Err(message),
                    },
                })
            }
        }
    }
}

fn describe_join_error(err: JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        if let Some(s) = payload.downcast_ref::<&str>() {
            return format!("task panicked: {s}");
        }
        if let Some(s) = payload.downcast_ref::<String>() {
            return format!("task panicked: {s}");
        }
        return "task panicked".to_string();
    }
    err.to_string()
}

fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
