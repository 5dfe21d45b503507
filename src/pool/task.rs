//! Tasks, priorities and result handles.

use super::error::TaskError;
use crate::utils::panic_message;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::oneshot;

/// Scheduling priority of a task. Higher priorities are claimed first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum TaskPriority {
    /// Background work
    Low = 0,
    /// Default priority
    #[default]
    Medium = 1,
    /// Latency sensitive work
    High = 2,
}

impl TaskPriority {
    /// Number of priority levels.
    pub const COUNT: usize = 3;

    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
        };
        f.write_str(name)
    }
}

/// Type-erased unit of work.
pub(crate) trait Job: Send {
    /// Runs the work, reports whether it succeeded to `finished`, then
    /// delivers its result.
    fn run(self: Box<Self>, finished: &mut dyn FnMut(bool));

    /// Resolves the result channel without running the work.
    fn cancel(self: Box<Self>);
}

struct Packaged<F, R> {
    func: F,
    sender: oneshot::Sender<Result<R, TaskError>>,
}

impl<F, R> Job for Packaged<F, R>
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    fn run(self: Box<Self>, finished: &mut dyn FnMut(bool)) {
        let Packaged { func, sender } = *self;
        let result = catch_unwind(AssertUnwindSafe(func))
            .map_err(|payload| TaskError::Panicked(panic_message(payload.as_ref())));
        let succeeded = result.is_ok();
        // Accounting happens before the waiter can observe the result.
        finished(succeeded);
        // The caller may have dropped its handle; the result is then discarded.
        let _ = sender.send(result);
    }

    fn cancel(self: Box<Self>) {
        let _ = self.sender.send(Err(TaskError::Cancelled));
    }
}

/// A queued task ordered by priority, then by submission order.
pub(crate) struct PrioritizedTask {
    pub(crate) priority: TaskPriority,
    pub(crate) sequence: u64,
    pub(crate) enqueued_at: Instant,
    pub(crate) job: Box<dyn Job>,
}

impl PrioritizedTask {
    /// Packages `func` and returns the queued task with the handle to its result.
    pub(crate) fn package<F, R>(
        priority: TaskPriority,
        sequence: u64,
        func: F,
    ) -> (Self, TaskHandle<R>)
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let task = PrioritizedTask {
            priority,
            sequence,
            enqueued_at: Instant::now(),
            job: Box::new(Packaged { func, sender }),
        };
        (task, TaskHandle { receiver, priority })
    }
}

impl PartialEq for PrioritizedTask {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for PrioritizedTask {}

impl PartialOrd for PrioritizedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PrioritizedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority first, then the earlier submission.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Handle to the eventual result of a submitted task.
///
/// Await it from async code, or block on it with [`TaskHandle::wait`].
/// Dropping the handle does not cancel the task.
#[must_use = "the task result is only observable through its handle"]
pub struct TaskHandle<R> {
    receiver: oneshot::Receiver<Result<R, TaskError>>,
    priority: TaskPriority,
}

impl<R> fmt::Debug for TaskHandle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("priority", &self.priority)
            .finish()
    }
}

impl<R> TaskHandle<R> {
    /// Priority the task was submitted with.
    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    /// Blocks the current thread until the task finished.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context; await
    /// the handle there instead.
    pub fn wait(self) -> Result<R, TaskError> {
        self.receiver
            .blocking_recv()
            .unwrap_or(Err(TaskError::Cancelled))
    }

    /// Returns the result if the task already finished. The result is handed
    /// out once; later calls report [`TaskError::Cancelled`].
    pub fn try_result(&mut self) -> Option<Result<R, TaskError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(TaskError::Cancelled)),
        }
    }
}

impl<R> Future for TaskHandle<R> {
    type Output = Result<R, TaskError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(TaskError::Cancelled)))
    }
}
