//! Running units of work.
//!
//! An [Executor] accepts a [Job] and runs it, either right away on the
//! calling thread or later on some other thread. Tasks only ever talk to
//! their executor through this trait, so anything from a thread pool to a
//! test harness that queues jobs by hand can drive them.
//!
//! Two executors are provided:
//!
//! - [ThreadPool]: a cached pool that hands each job to an idle worker or
//!   spawns a new one. The process-wide [default_executor] is one of these.
//! - [Immediate]: runs each job synchronously inside [Executor::execute].
//!   This makes task behaviour fully deterministic and is what tests should
//!   inject instead of relying on the shared default.
//!
//! An executor is allowed to drop a job without running it (a pool that is
//! shutting down, for instance). The task that submitted the job then fails
//! with [TaskError::Abandoned](crate::error::TaskError::Abandoned) rather than
//! leaving its waiters blocked.
use std::sync::{Arc, OnceLock};

pub use pool::{Builder, ThreadPool};

mod pool;

/// A boxed unit of work, as handed to an [Executor].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Something that can run jobs.
pub trait Executor: Send + Sync {
    /// Run `job`, possibly on another thread and possibly after this call has
    /// returned.
    fn execute(&self, job: Job);
}

/// An executor that runs every job on the calling thread before returning.
///
/// ```
/// use thenable::executor::{Executor, Immediate};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// let ran = Arc::new(AtomicBool::new(false));
/// let flag = ran.clone();
/// Immediate.execute(Box::new(move || flag.store(true, Ordering::SeqCst)));
/// assert!(ran.load(Ordering::SeqCst));
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct Immediate;

impl Executor for Immediate {
    fn execute(&self, job: Job) {
        job()
    }
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, job: Job) {
        (**self).execute(job)
    }
}

static DEFAULT: OnceLock<Arc<ThreadPool>> = OnceLock::new();

/// The process-wide executor used by tasks that were not given one.
///
/// A [ThreadPool] with the default configuration, created on first use and
/// never shut down.
pub fn default_executor() -> Arc<dyn Executor> {
    DEFAULT
        .get_or_init(|| Arc::new(ThreadPool::new()))
        .clone()
}


#[cfg(test)]
mod tests {
    use std::sync::{mpsc::channel, Arc};

    use super::{default_executor, testing::Deferred, Executor, Immediate};

    #[test]
    fn immediate_runs_inline() {
        let caller = std::thread::current().id();
        let (tx, rx) = channel();

        Immediate.execute(Box::new(move || {
            tx.send(std::thread::current().id()).unwrap();
        }));

        assert_eq!(rx.try_recv().unwrap(), caller);
    }

    #[test]
    fn default_is_shared() {
        let a = default_executor();
        let b = default_executor();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn default_runs_elsewhere() {
        let caller = std::thread::current().id();
        let (tx, rx) = channel();

        default_executor().execute(Box::new(move || {
            tx.send(std::thread::current().id()).unwrap();
        }));

        assert_ne!(rx.recv().unwrap(), caller);
    }

    #[test]
    fn deferred_runs_on_demand() {
        let exec = Deferred::default();
        let (tx, rx) = channel();

        exec.execute(Box::new(move || tx.send(1).unwrap()));
        assert!(rx.try_recv().is_err());
        assert_eq!(exec.pending(), 1);

        exec.run_all();
        assert_eq!(rx.try_recv().unwrap(), 1);
        assert_eq!(exec.pending(), 0);
    }

    #[test]
    fn arc_is_an_executor() {
        let exec: Arc<Immediate> = Arc::new(Immediate);
        let (tx, rx) = channel();
        exec.execute(Box::new(move || tx.send(7).unwrap()));
        assert_eq!(rx.try_recv().unwrap(), 7);
    }
}
