//! # `thenable`: futures that call you back
//!
//! This crate implements a small future/promise abstraction for plain
//! threads. A unit of work is submitted to an executor, its result is
//! captured as an [Outcome](outcome::Outcome) exactly once, and that outcome
//! is delivered to a success or failure callback, to a chained task, or to a
//! thread that blocks waiting for it.
//!
//! Failures never escape across the asynchronous boundary: an `Err` returned
//! by a unit of work and a panic raised inside one both become a failed
//! outcome. Misusing a task, by submitting work to it twice or assigning one
//! of its callbacks twice, is reported straight back to the caller as a
//! [UsageError](error::UsageError).
//!
//! For running work and chaining tasks, see the [task] module. For the
//! outcome type, see [outcome]. Executors, including the shared thread pool
//! used by default, live in [executor].
//!
//! ## Example
//!
//! Chain two transforms onto a computation and wait for the result:
//!
//! ```
//! use thenable::task::AsyncTask;
//!
//! let answer = AsyncTask::run(|| Ok(40))
//!     .then(|x| Ok(*x + 1))?
//!     .then(|x| Ok(*x + 1))?;
//!
//! assert_eq!(*answer.outcome().value(), 42);
//! # Ok::<(), thenable::error::UsageError>(())
//! ```
//!
//! A failure anywhere in the chain skips the remaining transforms:
//!
//! ```
//! use thenable::task::AsyncTask;
//! use anyhow::bail;
//!
//! let answer = AsyncTask::run(|| Ok(40))
//!     .then(|_: &i32| -> anyhow::Result<i32> { bail!("no answer") })?
//!     .then(|x| Ok(*x + 1))?;
//!
//! assert_eq!(answer.outcome().cause().to_string(), "no answer");
//! # Ok::<(), thenable::error::UsageError>(())
//! ```
pub mod error;
pub mod executor;
pub mod outcome;
pub mod task;
