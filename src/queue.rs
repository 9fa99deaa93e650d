use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tracing::{error, info};

use crate::executor::{ExecutorError, ExecutorOutput, JobExecutor};
use crate::models::{Job, QueueStatus};

/// Outcome delivered to whoever submitted a job.
pub type JobResult = Result<ExecutorOutput, ExecutorError>;

/// A job waiting for a free slot, with the channel its result goes out on.
struct PendingJob {
    job: Job,
    reply: oneshot::Sender<JobResult>,
}

#[derive(Default)]
struct QueueState {
    active: usize,
    pending: VecDeque<PendingJob>,
}

struct QueueInner {
    executor: Arc<dyn JobExecutor>,
    max_concurrent: usize,
    state: Mutex<QueueState>,
}

/// Bounded-concurrency download queue.
///
/// Up to `max_concurrent` jobs run at once; the rest wait in FIFO order and are
/// started one by one as running jobs finish. Cloning yields another handle to
/// the same queue.
#[derive(Clone)]
pub struct DownloadQueue {
    inner: Arc<QueueInner>,
}

impl DownloadQueue {
    /// Create a queue that runs at most `max_concurrent` jobs at once (at least one).
    pub fn new(executor: Arc<dyn JobExecutor>, max_concurrent: usize) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                executor,
                max_concurrent: max_concurrent.max(1),
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.inner.max_concurrent
    }

    /// Submit a job. It starts right away if a slot is free, otherwise it is
    /// queued behind every job submitted before it.
    ///
    /// Must be called from within a tokio runtime. Dropping the returned handle
    /// does not cancel the job.
    pub fn submit(&self, job: Job) -> JobHandle {
        let (reply, rx) = oneshot::channel();
        let admitted = {
            let mut state = self.inner.lock();
            if state.active < self.inner.max_concurrent {
                state.active += 1;
                Some(PendingJob { job, reply })
            } else {
                info!(
                    job = %job.display_name,
                    queue_length = state.pending.len() + 1,
                    "download queued"
                );
                state.pending.push_back(PendingJob { job, reply });
                None
            }
        };

        if let Some(entry) = admitted {
            QueueInner::start(&self.inner, entry);
        }
        JobHandle { rx }
    }

    /// Snapshot of the running and waiting jobs. Has no side effects.
    pub fn status(&self) -> QueueStatus {
        let state = self.inner.lock();
        QueueStatus {
            active_downloads: state.active,
            max_concurrent: self.inner.max_concurrent,
            queue_length: state.pending.len(),
            queued_items: state
                .pending
                .iter()
                .map(|p| p.job.display_name.clone())
                .collect(),
        }
    }
}

impl QueueInner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // State is only ever mutated with plain arithmetic and deque ops, so a
        // poisoned lock still holds consistent data.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run an admitted job on its own task. The slot it occupies must already be
    /// counted in `active`.
    fn start(this: &Arc<Self>, entry: PendingJob) {
        let inner = Arc::clone(this);
        tokio::spawn(async move {
            let PendingJob { job, reply } = entry;
            info!(
                category = %job.category,
                "[{}/{}] starting download: {}",
                inner.lock().active,
                inner.max_concurrent,
                job.display_name
            );

            let result = inner.executor.execute(&job).await;
            match &result {
                Ok(_) => info!(job = %job.display_name, "download completed"),
                Err(e) => error!(job = %job.display_name, "download failed: {e}"),
            }

            Self::release(&inner);
            // The submitter may have stopped waiting; the job still counts as done.
            let _ = reply.send(result);
        });
    }

    /// Free the slot held by a finished job. If anything is waiting, the oldest
    /// entry takes the slot over inside the same critical section.
    fn release(this: &Arc<Self>) {
        let next = {
            let mut state = this.lock();
            match state.pending.pop_front() {
                Some(next) => Some(next),
                None => {
                    state.active = state.active.saturating_sub(1);
                    None
                }
            }
        };

        if let Some(entry) = next {
            Self::start(this, entry);
        }
    }
}

/// Resolves to the executor result of one submitted job.
#[derive(Debug)]
pub struct JobHandle {
    rx: oneshot::Receiver<JobResult>,
}

impl Future for JobHandle {
    type Output = JobResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(Err(ExecutorError::Abandoned)))
    }
}
