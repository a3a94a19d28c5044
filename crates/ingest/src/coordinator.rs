//! Concurrent fan-out over a batch of attachments.
//!
//! Every attachment is processed on its own task. Tasks finish in any order,
//! so completion is detected by counting finished tasks, never by looking at
//! which index finished last. Exactly one caller performs finalization: the
//! task that moves the phase out of `RUNNING`, either by finishing the N-th
//! item or by reporting the first failure.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU8, AtomicUsize, Ordering},
};

use {
    tokio::{sync::oneshot, task::JoinSet},
    tracing::{debug, warn},
};

use crate::{
    attachment::Attachment,
    error::{IngestError, Result},
    model::Contribution,
    processor::AttachmentProcessor,
};

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const COMPLETE: u8 = 2;
const FAILED: u8 = 3;

/// One unit of work: an attachment, its position, and its processor.
pub struct Job {
    pub index: usize,
    pub attachment: Arc<dyn Attachment>,
    pub processor: Arc<dyn AttachmentProcessor>,
}

/// How a run ended.
#[derive(Debug)]
pub enum Finalized {
    /// All items reported; contributions in completion order.
    Complete(Vec<Contribution>),
    /// The first failure; later outcomes were discarded.
    Failed(IngestError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Running { completed: usize },
    Complete,
    Failed,
}

pub struct BatchCoordinator {
    expected: usize,
    completed: AtomicUsize,
    phase: AtomicU8,
    contributions: Mutex<Vec<Contribution>>,
    finalizations: AtomicUsize,
    tx: Mutex<Option<oneshot::Sender<Finalized>>>,
    rx: Mutex<Option<oneshot::Receiver<Finalized>>>,
}

impl BatchCoordinator {
    /// Coordinator for a run of `expected` attachments.
    pub fn new(expected: usize) -> Arc<Self> {
        let (tx, rx) = oneshot::channel();
        Arc::new(Self {
            expected,
            completed: AtomicUsize::new(0),
            phase: AtomicU8::new(IDLE),
            contributions: Mutex::new(Vec::with_capacity(expected)),
            finalizations: AtomicUsize::new(0),
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
        })
    }

    #[must_use]
    pub fn state(&self) -> CoordinatorState {
        match self.phase.load(Ordering::Acquire) {
            IDLE => CoordinatorState::Idle,
            RUNNING => CoordinatorState::Running {
                completed: self.completed.load(Ordering::Acquire),
            },
            COMPLETE => CoordinatorState::Complete,
            _ => CoordinatorState::Failed,
        }
    }

    /// How many times the batch was finalized. Never more than one.
    #[must_use]
    pub fn finalizations(&self) -> usize {
        self.finalizations.load(Ordering::Acquire)
    }

    /// Process every job concurrently and wait for the batch to settle.
    ///
    /// Returns on completion of all jobs or on the first failure. Jobs still
    /// in flight after a failure keep running detached; their outcomes are
    /// ignored.
    pub async fn run(self: Arc<Self>, jobs: Vec<Job>) -> Finalized {
        let rx = self.rx.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(mut rx) = rx else {
            return Finalized::Failed(IngestError::message("batch coordinator already ran"));
        };
        if jobs.len() != self.expected {
            return Finalized::Failed(IngestError::message(format!(
                "expected {} jobs, got {}",
                self.expected,
                jobs.len()
            )));
        }
        if self
            .phase
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Finalized::Failed(IngestError::message("batch coordinator already ran"));
        }

        if self.expected == 0 {
            self.try_complete();
        }

        let mut tasks = JoinSet::new();
        for job in jobs {
            let coordinator = Arc::clone(&self);
            tasks.spawn(async move {
                let outcome = job.processor.process(job.attachment.as_ref(), job.index).await;
                coordinator.record(outcome);
            });
        }

        loop {
            tokio::select! {
                finalized = &mut rx => {
                    tasks.detach_all();
                    return finalized.unwrap_or_else(|_| {
                        Finalized::Failed(IngestError::message("batch finalization was dropped"))
                    });
                },
                joined = tasks.join_next(), if !tasks.is_empty() => {
                    if let Some(Err(e)) = joined
                        && e.is_panic()
                    {
                        self.record(Err(IngestError::message(format!(
                            "attachment task panicked: {e}"
                        ))));
                    }
                },
            }
        }
    }

    /// Report one task's outcome.
    pub fn record(&self, outcome: Result<Contribution>) {
        match outcome {
            Ok(contribution) => {
                let done = {
                    let mut items = self.contributions.lock().unwrap_or_else(|e| e.into_inner());
                    if self.phase.load(Ordering::Acquire) != RUNNING {
                        debug!("discarding contribution after batch settled");
                        return;
                    }
                    items.push(contribution);
                    self.completed.fetch_add(1, Ordering::AcqRel) + 1
                };
                debug!(done, expected = self.expected, "attachment finished");
                if done == self.expected {
                    self.try_complete();
                }
            },
            Err(err) => {
                self.completed.fetch_add(1, Ordering::AcqRel);
                if self
                    .phase
                    .compare_exchange(RUNNING, FAILED, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    warn!(error = %err, "attachment failed, abandoning batch");
                    self.finalize(Finalized::Failed(err));
                } else {
                    debug!(error = %err, "ignoring failure after batch settled");
                }
            },
        }
    }

    fn try_complete(&self) {
        if self
            .phase
            .compare_exchange(RUNNING, COMPLETE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let items =
                std::mem::take(&mut *self.contributions.lock().unwrap_or_else(|e| e.into_inner()));
            self.finalize(Finalized::Complete(items));
        }
    }

    fn finalize(&self, finalized: Finalized) {
        self.finalizations.fetch_add(1, Ordering::AcqRel);
        if let Some(tx) = self.tx.lock().unwrap_or_else(|e| e.into_inner()).take() {
            let _ = tx.send(finalized);
        }
    }
}
