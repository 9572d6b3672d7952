//! Bounded, self-throttling execution of a paging plan.
//!
//! One coordinator task owns everything mutable: the pending deque, the set of
//! in-flight attempts, the set of backoff timers and the throttle. Workers only
//! report an [`AttemptOutcome`] back. Pages are sent to the [`PageStream`] as
//! soon as they complete, in no particular order.
//!
//! A terminal failure aborts every in-flight attempt and pending timer before
//! the single abort item is sent, so nothing can be emitted after it.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::error::FetchError;
use super::executor::{AttemptOutcome, RequestExecutor};
use super::page::FeaturePage;
use super::task::Task;
use super::throttle::ThrottleController;
use crate::planner::PageDescriptor;

/// Items buffered between the coordinator and the consumer, per worker.
const BUFFER_PER_WORKER: usize = 2;

/// Item type of a [`PageStream`].
pub type PageResult = Result<FeaturePage, FetchError>;

/// Counters shared between the coordinator and the stream handle.
#[derive(Debug, Default)]
pub struct FetchStats {
    completed: AtomicUsize,
    retried: AtomicUsize,
    failed: AtomicUsize,
}

impl FetchStats {
    /// Creates a stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pages fetched successfully.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Attempts that failed and were scheduled again.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried.load(Ordering::SeqCst)
    }

    /// Pages that exhausted their retries (0 or 1).
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    fn increment_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_retried(&self) {
        self.retried.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Dispatches page descriptors with adaptive, bounded concurrency.
#[derive(Debug, Clone)]
pub struct ExecutionQueue {
    executor: Arc<RequestExecutor>,
    max_concurrency: usize,
}

impl ExecutionQueue {
    /// Creates a queue. A `max_concurrency` of 0 is treated as 1.
    #[must_use]
    pub fn new(executor: RequestExecutor, max_concurrency: usize) -> Self {
        Self {
            executor: Arc::new(executor),
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Returns the configured concurrency ceiling.
    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Starts fetching `descriptors` and returns the stream of results.
    ///
    /// Must be called from within a tokio runtime. Dropping the returned
    /// stream cancels all outstanding work.
    #[must_use]
    pub fn submit(&self, descriptors: Vec<PageDescriptor>) -> PageStream {
        let planned = descriptors.len();
        let (tx, rx) = mpsc::channel(self.max_concurrency * BUFFER_PER_WORKER);
        let cancel = CancellationToken::new();
        let stats = Arc::new(FetchStats::new());

        let coordinator = Coordinator {
            executor: Arc::clone(&self.executor),
            throttle: ThrottleController::new(self.max_concurrency),
            pending: descriptors
                .into_iter()
                .enumerate()
                .map(|(index, descriptor)| Task::new(index, descriptor))
                .collect(),
            in_flight: JoinSet::new(),
            timers: JoinSet::new(),
            tx,
            cancel: cancel.clone(),
            stats: Arc::clone(&stats),
        };
        tokio::spawn(coordinator.run());

        PageStream {
            rx,
            cancel,
            stats,
            planned,
        }
    }
}

struct Coordinator {
    executor: Arc<RequestExecutor>,
    throttle: ThrottleController,
    pending: VecDeque<Task>,
    in_flight: JoinSet<AttemptOutcome>,
    timers: JoinSet<Task>,
    tx: mpsc::Sender<PageResult>,
    cancel: CancellationToken,
    stats: Arc<FetchStats>,
}

/// Whether the coordinator keeps running after handling an event.
enum Flow {
    Continue,
    Stop,
}

impl Coordinator {
    #[instrument(skip_all, fields(pages = self.pending.len(), max_concurrency = self.throttle.max()))]
    async fn run(mut self) {
        info!("starting page fetch");

        loop {
            self.dispatch();
            if self.in_flight.is_empty() && self.timers.is_empty() {
                break;
            }

            let flow = tokio::select! {
                biased;

                () = self.cancel.cancelled() => {
                    debug!("fetch cancelled");
                    Flow::Stop
                }
                Some(joined) = self.in_flight.join_next() => match joined {
                    Ok(outcome) => self.handle(outcome).await,
                    Err(e) => self.worker_failed(&e).await,
                },
                Some(joined) = self.timers.join_next() => match joined {
                    Ok(mut task) => {
                        task.wake();
                        self.pending.push_front(task);
                        Flow::Continue
                    }
                    Err(e) => self.worker_failed(&e).await,
                },
                else => Flow::Stop,
            };

            if matches!(flow, Flow::Stop) {
                self.shutdown();
                return;
            }
        }

        info!(
            completed = self.stats.completed(),
            retried = self.stats.retried(),
            "page fetch complete"
        );
    }

    fn dispatch(&mut self) {
        while self.in_flight.len() < self.throttle.limit() {
            let Some(mut task) = self.pending.pop_front() else {
                break;
            };
            task.start();
            let executor = Arc::clone(&self.executor);
            self.in_flight
                .spawn(async move { executor.execute(task).await });
        }
    }

    async fn handle(&mut self, outcome: AttemptOutcome) -> Flow {
        match outcome {
            AttemptOutcome::Success(page) => {
                self.throttle.on_success();
                self.stats.increment_completed();
                debug!(
                    page = page.index,
                    concurrency = self.throttle.limit(),
                    "page complete"
                );
                if self.tx.send(Ok(page)).await.is_err() {
                    debug!("page stream dropped");
                    return Flow::Stop;
                }
                Flow::Continue
            }
            AttemptOutcome::Retry { task, delay, .. } => {
                self.throttle.on_failure();
                self.stats.increment_retried();
                debug!(
                    page = task.index(),
                    concurrency = self.throttle.limit(),
                    delay_ms = delay.as_millis(),
                    "scheduling retry"
                );
                self.timers.spawn(async move {
                    tokio::time::sleep(delay).await;
                    task
                });
                Flow::Continue
            }
            AttemptOutcome::Terminal { task, error } => {
                self.throttle.on_failure();
                self.stats.increment_failed();
                self.shutdown();
                let _ = self
                    .tx
                    .send(Err(FetchError::aborted(task.attempt() + 1, error)))
                    .await;
                Flow::Stop
            }
        }
    }

    async fn worker_failed(&mut self, error: &JoinError) -> Flow {
        self.shutdown();
        let _ = self
            .tx
            .send(Err(FetchError::worker_failed(error.to_string())))
            .await;
        Flow::Stop
    }

    fn shutdown(&mut self) {
        if !self.in_flight.is_empty() || !self.timers.is_empty() || !self.pending.is_empty() {
            debug!(
                in_flight = self.in_flight.len(),
                waiting = self.timers.len(),
                pending = self.pending.len(),
                "cancelling outstanding pages"
            );
        }
        self.in_flight.abort_all();
        self.timers.abort_all();
        self.pending.clear();
    }
}

/// Pages of a running fetch, in completion order.
///
/// Ends after the last page, or right after a single `Err` if the fetch
/// aborts. Dropping the stream cancels the fetch.
#[derive(Debug)]
pub struct PageStream {
    rx: mpsc::Receiver<PageResult>,
    cancel: CancellationToken,
    stats: Arc<FetchStats>,
    planned: usize,
}

impl PageStream {
    /// Receives the next result, or `None` once the fetch has finished.
    pub async fn recv(&mut self) -> Option<PageResult> {
        self.rx.recv().await
    }

    /// Drains the stream into a list of pages.
    ///
    /// # Errors
    ///
    /// Returns the abort error if the fetch aborted. Pages received before it
    /// are discarded.
    pub async fn collect_pages(mut self) -> Result<Vec<FeaturePage>, FetchError> {
        let mut pages = Vec::with_capacity(self.planned);
        while let Some(result) = self.recv().await {
            pages.push(result?);
        }
        Ok(pages)
    }

    /// Stops the fetch. Results already buffered can still be received.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Live counters for this fetch.
    #[must_use]
    pub fn stats(&self) -> &Arc<FetchStats> {
        &self.stats
    }

    /// Number of pages in the plan.
    #[must_use]
    pub fn planned(&self) -> usize {
        self.planned
    }
}

impl Stream for PageStream {
    type Item = PageResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for PageStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
