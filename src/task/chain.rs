//! Tasks derived from another task's outcome.
use std::{ops::Deref, sync::Arc};

use log::warn;

use super::{AsyncTask, Branch, Callback};
use crate::{error::UsageError, outcome::Outcome};

/// A task whose unit of work is derived from a parent task's value.
///
/// Created by [AsyncTask::then]. When the parent succeeds, the transform is
/// submitted as this task's work; when the parent fails, this task fails
/// with the very same cause and the transform is dropped unrun. A
/// `ChainedTask` dereferences to its own [AsyncTask], so callbacks, blocking
/// and further chaining work just as they do on any task.
pub struct ChainedTask<R, P> {
    task: AsyncTask<R>,
    parent: AsyncTask<P>,
}

impl<R, P> ChainedTask<R, P>
where
    R: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    pub(super) fn new<F>(parent: &AsyncTask<P>, transform: F) -> Result<Self, UsageError>
    where
        F: FnOnce(&P) -> anyhow::Result<R> + Send + 'static,
    {
        let task = AsyncTask::with_executor(parent.executor().clone());

        let child = task.clone();
        let on_success: Callback<P> = Box::new(move |outcome: &Arc<Outcome<P>>| {
            let outcome = outcome.clone();
            child.derive(move || (*outcome).as_ref().then(transform));
        });

        let child = task.clone();
        let on_failure: Callback<P> = Box::new(move |outcome: &Arc<Outcome<P>>| {
            if let Outcome::Failure(cause) = &**outcome {
                let cause = cause.clone();
                child.derive(move || Outcome::Failure(cause));
            }
        });

        parent.register([(Branch::Success, on_success), (Branch::Failure, on_failure)])?;

        Ok(Self {
            task,
            parent: parent.clone(),
        })
    }

    pub fn parent(&self) -> &AsyncTask<P> {
        &self.parent
    }

    pub fn into_task(self) -> AsyncTask<R> {
        self.task
    }
}

impl<R: Send + Sync + 'static> AsyncTask<R> {
    fn derive<F>(&self, work: F)
    where
        F: FnOnce() -> Outcome<R> + Send + 'static,
    {
        if let Err(e) = self.submit_outcome(work) {
            warn!("chained task rejected work derived from its parent: {e}");
        }
    }
}

impl<R, P> Deref for ChainedTask<R, P> {
    type Target = AsyncTask<R>;

    fn deref(&self) -> &Self::Target {
        &self.task
    }
}
