//! Error types.
//!
//! Two kinds of error exist in `thenable`, and they never mix:
//!
//! - [UsageError] is returned synchronously from an operation that was used
//!   incorrectly: submitting work twice to the same task or assigning a
//!   callback slot twice. These indicate a logic bug in the caller and are
//!   never captured into an [Outcome](crate::outcome::Outcome).
//! - [TaskError] is a *cause* that the library itself places inside a
//!   failed outcome, for failures that did not originate as an `Err` returned
//!   by the unit of work. It can be recovered from a
//!   [Cause](crate::outcome::Cause) with `downcast_ref`.
use std::any::Any;

use thiserror::Error;

/// Misuse of an [AsyncTask](crate::task::AsyncTask).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UsageError {
    /// A unit of work was already submitted to this task; a task runs at
    /// most once.
    #[error("cannot execute more than once")]
    AlreadySubmitted,

    /// The success callback slot has already been assigned.
    #[error("cannot reassign on_success handler")]
    SuccessCallbackAssigned,

    /// The failure callback slot has already been assigned.
    #[error("cannot reassign on_failure handler")]
    FailureCallbackAssigned,
}

/// Failure causes produced by the library rather than by user code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The unit of work (or a transform) panicked. Holds the panic message
    /// when it was a string.
    #[error("unit of work panicked: {0}")]
    Panicked(String),

    /// The executor dropped the unit of work without ever running it.
    #[error("unit of work was abandoned by its executor")]
    Abandoned,
}

impl TaskError {
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        Self::Panicked(panic_message(payload.as_ref()))
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_owned()
    }
}
