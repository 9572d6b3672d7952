//! Per-page work items and their lifecycle.

use crate::planner::PageDescriptor;

/// Lifecycle of a [`Task`].
///
/// ```text
/// Pending -> InFlight -> Succeeded
///                     -> Retrying -> Pending
///                     -> FailedTerminal
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting for a free worker slot.
    Pending,
    /// A request attempt is running.
    InFlight,
    /// The page was fetched and emitted.
    Succeeded,
    /// Waiting for a backoff timer before going back to `Pending`.
    Retrying,
    /// Retries exhausted; the batch aborts.
    FailedTerminal,
}

/// One page to fetch, plus how many attempts it has used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    index: usize,
    descriptor: PageDescriptor,
    attempt: u32,
    state: TaskState,
}

impl Task {
    /// Creates a pending task at attempt 0.
    #[must_use]
    pub fn new(index: usize, descriptor: PageDescriptor) -> Self {
        Self {
            index,
            descriptor,
            attempt: 0,
            state: TaskState::Pending,
        }
    }

    /// Position of the page in the plan.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The page's request parameters.
    #[must_use]
    pub fn descriptor(&self) -> &PageDescriptor {
        &self.descriptor
    }

    /// Zero-based attempt number of the current (or next) request.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TaskState {
        self.state
    }

    pub(crate) fn start(&mut self) {
        debug_assert_eq!(self.state, TaskState::Pending);
        self.state = TaskState::InFlight;
    }

    pub(crate) fn succeed(&mut self) {
        debug_assert_eq!(self.state, TaskState::InFlight);
        self.state = TaskState::Succeeded;
    }

    pub(crate) fn retry_as(&mut self, attempt: u32) {
        debug_assert_eq!(self.state, TaskState::InFlight);
        self.attempt = attempt;
        self.state = TaskState::Retrying;
    }

    pub(crate) fn fail(&mut self) {
        debug_assert_eq!(self.state, TaskState::InFlight);
        self.state = TaskState::FailedTerminal;
    }

    pub(crate) fn wake(&mut self) {
        debug_assert_eq!(self.state, TaskState::Retrying);
        self.state = TaskState::Pending;
    }
}
