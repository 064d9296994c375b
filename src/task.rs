//! Asynchronous tasks.
//!
//! An [AsyncTask] runs exactly one unit of work on an
//! [Executor](crate::executor::Executor) and publishes the resulting
//! [Outcome] to whoever is interested:
//!
//! - a success callback registered with [AsyncTask::on_success],
//! - a failure callback registered with [AsyncTask::on_failure],
//! - a chained task created with [AsyncTask::then],
//! - any thread blocked in [AsyncTask::outcome].
//!
//! # Example
//!
//! ```
//! use thenable::task::AsyncTask;
//! use std::sync::mpsc::channel;
//!
//! let (tx, rx) = channel();
//! let task = AsyncTask::run(|| Ok(42));
//! let chained = task.then(|x| Ok(*x + 1))?.then(|x| Ok(*x + 1))?;
//! chained.on_success(move |x| tx.send(*x).unwrap())?;
//!
//! assert_eq!(rx.recv().unwrap(), 44);
//! # Ok::<(), thenable::error::UsageError>(())
//! ```
//!
//! # Lifecycle
//!
//! A task starts out pending. Submitting a unit of work hands it to the
//! executor; a task accepts work only once and a second submission is a
//! [UsageError]. When the work finishes its outcome is stored, the matching
//! callback (if any) is invoked on the executor's thread, and finally the
//! task is marked completed, waking any thread blocked in
//! [AsyncTask::outcome]. A completed task never changes again.
//!
//! # Callbacks
//!
//! Each task has one success slot and one failure slot, and each slot can be
//! assigned once. Registering a callback *before* the outcome is known stores
//! it for the executor thread to call. Registering it *after* calls it
//! straight away on the registering thread. A callback registered for the
//! branch that did not happen is dropped without being called.
//!
//! Registration and completion are serialised on one lock, so a callback
//! registered while the task is completing runs exactly once: either on the
//! executor thread, if completion got there first, or on the registering
//! thread. Callbacks are never invoked while that lock is held.
//!
//! Chaining uses the very same slots. A task can therefore have either one
//! [AsyncTask::then] child, or its own `on_success`/`on_failure` callbacks,
//! but not both.
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use log::{error, trace, warn};
use parking_lot::Mutex;

pub use chain::ChainedTask;
use gate::Gate;

use crate::{
    error::{panic_message, TaskError, UsageError},
    executor::{default_executor, Executor},
    outcome::{Cause, Outcome},
};

mod chain;
mod gate;

type Callback<T> = Box<dyn FnOnce(&Arc<Outcome<T>>) + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    Success,
    Failure,
}

impl Branch {
    fn of<T>(outcome: &Outcome<T>) -> Self {
        if outcome.is_success() {
            Self::Success
        } else {
            Self::Failure
        }
    }

    fn other(self) -> Self {
        match self {
            Self::Success => Self::Failure,
            Self::Failure => Self::Success,
        }
    }

    fn reassigned(self) -> UsageError {
        match self {
            Self::Success => UsageError::SuccessCallbackAssigned,
            Self::Failure => UsageError::FailureCallbackAssigned,
        }
    }
}

/// A single-assignment callback slot.
enum Slot<T> {
    Vacant,
    Waiting(Callback<T>),
    /// Assigned, and either already called or never going to be.
    Spent,
}

impl<T> Slot<T> {
    fn is_vacant(&self) -> bool {
        matches!(self, Self::Vacant)
    }

    /// Take a waiting callback, leaving the slot spent. A vacant slot stays
    /// vacant.
    fn take(&mut self) -> Option<Callback<T>> {
        if self.is_vacant() {
            return None;
        }

        match std::mem::replace(self, Self::Spent) {
            Self::Waiting(cb) => Some(cb),
            _ => None,
        }
    }
}

struct State<T> {
    submitted: bool,
    outcome: Option<Arc<Outcome<T>>>,
    on_success: Slot<T>,
    on_failure: Slot<T>,
}

impl<T> State<T> {
    fn slot(&mut self, branch: Branch) -> &mut Slot<T> {
        match branch {
            Branch::Success => &mut self.on_success,
            Branch::Failure => &mut self.on_failure,
        }
    }
}

struct Inner<T> {
    executor: Arc<dyn Executor>,
    state: Mutex<State<T>>,
    completed: Gate<Arc<Outcome<T>>>,
}

impl<T> Inner<T> {
    fn complete(&self, outcome: Outcome<T>) {
        let outcome = Arc::new(outcome);
        let branch = Branch::of(&outcome);

        let (callback, unreachable) = {
            let mut state = self.state.lock();
            state.outcome = Some(outcome.clone());
            (
                state.slot(branch).take(),
                state.slot(branch.other()).take(),
            )
        };
        drop(unreachable);

        trace!("task completed: {branch:?}");

        if let Some(callback) = callback {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(&outcome))) {
                error!(
                    "{branch:?} callback panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }

        self.completed.release(outcome);
    }
}

/// Completes its task when the unit of work finishes, or with
/// [TaskError::Abandoned] if the executor drops the work unrun.
struct Completion<T> {
    inner: Option<Arc<Inner<T>>>,
}

impl<T> Completion<T> {
    fn complete(mut self, outcome: Outcome<T>) {
        if let Some(inner) = self.inner.take() {
            inner.complete(outcome);
        }
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            warn!("unit of work dropped before completing");
            inner.complete(Outcome::failure(TaskError::Abandoned));
        }
    }
}

/// A unit of work executing in the background.
///
/// `AsyncTask` is a handle: cloning it yields another handle to the same
/// task. See the [module-level documentation](self) for the full contract.
pub struct AsyncTask<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for AsyncTask<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> Default for AsyncTask<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> AsyncTask<T> {
    /// Create a pending task bound to the [default
    /// executor](crate::executor::default_executor).
    pub fn new() -> Self {
        Self::with_executor(default_executor())
    }

    /// Create a pending task that will run its work on `executor`.
    pub fn with_executor(executor: Arc<dyn Executor>) -> Self {
        Self {
            inner: Arc::new(Inner {
                executor,
                state: Mutex::new(State {
                    submitted: false,
                    outcome: None,
                    on_success: Slot::Vacant,
                    on_failure: Slot::Vacant,
                }),
                completed: Gate::new(),
            }),
        }
    }

    /// Create a task on the default executor and submit `work` to it.
    pub fn run<F>(work: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        let task = Self::new();
        task.inner.state.lock().submitted = true;
        task.dispatch(move || Outcome::execute(work));
        task
    }

    /// Submit the unit of work this task runs.
    ///
    /// `work` is executed on the task's executor; an `Err` or a panic
    /// becomes a failed outcome. Fails with [UsageError::AlreadySubmitted]
    /// if work was submitted before, whether or not it has finished.
    pub fn submit<F>(&self, work: F) -> Result<&Self, UsageError>
    where
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        self.submit_outcome(move || Outcome::execute(work))
    }

    fn submit_outcome<F>(&self, work: F) -> Result<&Self, UsageError>
    where
        F: FnOnce() -> Outcome<T> + Send + 'static,
    {
        {
            let mut state = self.inner.state.lock();
            if state.submitted {
                return Err(UsageError::AlreadySubmitted);
            }
            state.submitted = true;
        }

        self.dispatch(work);

        Ok(self)
    }

    fn dispatch<F>(&self, work: F)
    where
        F: FnOnce() -> Outcome<T> + Send + 'static,
    {
        let completion = Completion {
            inner: Some(self.inner.clone()),
        };

        trace!("submitting unit of work");

        self.inner
            .executor
            .execute(Box::new(move || completion.complete(work())));
    }

    /// Register the callback to run with the value of a successful outcome.
    ///
    /// If the task already succeeded, `callback` runs before this call
    /// returns, on the calling thread. If the task already failed it is
    /// dropped without running. Fails with
    /// [UsageError::SuccessCallbackAssigned] if the success slot was assigned
    /// before, including by [AsyncTask::then].
    pub fn on_success<F>(&self, callback: F) -> Result<&Self, UsageError>
    where
        F: FnOnce(&T) + Send + 'static,
    {
        let callback: Callback<T> = Box::new(move |outcome: &Arc<Outcome<T>>| {
            if let Outcome::Success(value) = &**outcome {
                callback(value);
            }
        });

        self.register([(Branch::Success, callback)])?;

        Ok(self)
    }

    /// Register the callback to run with the cause of a failed outcome.
    ///
    /// The failure counterpart of [AsyncTask::on_success].
    pub fn on_failure<F>(&self, callback: F) -> Result<&Self, UsageError>
    where
        F: FnOnce(&Cause) + Send + 'static,
    {
        let callback: Callback<T> = Box::new(move |outcome: &Arc<Outcome<T>>| {
            if let Outcome::Failure(cause) = &**outcome {
                callback(cause);
            }
        });

        self.register([(Branch::Failure, callback)])?;

        Ok(self)
    }

    /// Assign several slots in one step: either every slot is vacant and all
    /// are assigned, or nothing changes.
    fn register<const N: usize>(
        &self,
        callbacks: [(Branch, Callback<T>); N],
    ) -> Result<(), UsageError> {
        let mut state = self.inner.state.lock();

        for (branch, _) in &callbacks {
            if !state.slot(*branch).is_vacant() {
                return Err(branch.reassigned());
            }
        }

        let Some(outcome) = state.outcome.clone() else {
            for (branch, callback) in callbacks {
                *state.slot(branch) = Slot::Waiting(callback);
            }
            return Ok(());
        };

        for (branch, _) in &callbacks {
            *state.slot(*branch) = Slot::Spent;
        }
        drop(state);

        let happened = Branch::of(&outcome);
        for (branch, callback) in callbacks {
            if branch == happened {
                trace!("task already completed, calling {branch:?} callback");
                callback(&outcome);
            }
        }

        Ok(())
    }

    /// Chain a transform onto this task's value.
    ///
    /// Returns a new task, on the same executor, whose unit of work is
    /// `transform(value)` once this task succeeds. If this task fails, the
    /// new task fails with the same [Cause] and `transform` is never called.
    /// No work is submitted until this task completes.
    ///
    /// This consumes both of this task's callback slots, so it fails if
    /// either was already assigned.
    pub fn then<R, F>(&self, transform: F) -> Result<ChainedTask<R, T>, UsageError>
    where
        R: Send + Sync + 'static,
        F: FnOnce(&T) -> anyhow::Result<R> + Send + 'static,
    {
        ChainedTask::new(self, transform)
    }

    /// Block until the task has completed and return its outcome.
    ///
    /// *Note* if no work is ever submitted this never returns.
    pub fn outcome(&self) -> Arc<Outcome<T>> {
        self.inner.completed.wait()
    }

    /// Whether the outcome is available and its callback, if registered
    /// beforehand, has returned. Never blocks.
    pub fn is_completed(&self) -> bool {
        self.inner.completed.is_released()
    }

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.inner.executor
    }
}
