//! A cached thread pool.
//!
//! Jobs are handed over through a zero-capacity channel: a job is accepted by
//! a worker only if that worker is idle and already blocked waiting for one.
//! When no worker is idle a new thread is spawned with the job as its first
//! piece of work, so the pool grows without bound under load. Workers that
//! sit idle for longer than the keep-alive period retire.
//!
//! Because a job never waits in a queue behind another job, a job that
//! blocks on the outcome of a later job cannot starve it.
use std::{
    io,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, error, trace};

use super::{Executor, Job};
use crate::error::panic_message;

const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);
const DEFAULT_NAME_PREFIX: &str = "thenable-worker";

/// Configuration for a [ThreadPool].
///
/// ```
/// use thenable::executor::ThreadPool;
/// use std::time::Duration;
///
/// let pool = ThreadPool::builder()
///     .keep_alive(Duration::from_secs(5))
///     .name_prefix("io")
///     .build();
/// assert_eq!(pool.live_workers(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct Builder {
    keep_alive: Duration,
    name_prefix: String,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            keep_alive: DEFAULT_KEEP_ALIVE,
            name_prefix: DEFAULT_NAME_PREFIX.to_owned(),
        }
    }
}

impl Builder {
    /// How long an idle worker waits for a new job before exiting. Defaults
    /// to 60 seconds.
    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Worker threads are named `<prefix>-<n>`.
    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    pub fn build(self) -> ThreadPool {
        let (handoff, idle) = bounded(0);

        ThreadPool {
            handoff,
            idle,
            keep_alive: self.keep_alive,
            name_prefix: self.name_prefix,
            next_id: AtomicUsize::new(0),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// An unbounded, cached thread pool.
///
/// See the [module-level documentation](self) for how jobs are scheduled.
pub struct ThreadPool {
    handoff: Sender<Job>,
    idle: Receiver<Job>,
    keep_alive: Duration,
    name_prefix: String,
    next_id: AtomicUsize,
    live: Arc<AtomicUsize>,
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadPool {
    pub fn new() -> Self {
        Builder::default().build()
    }

    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Number of worker threads currently alive, busy or idle.
    pub fn live_workers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn spawn_worker(&self, first: Job) -> io::Result<()> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}-{}", self.name_prefix, id);
        let worker = Worker {
            idle: self.idle.clone(),
            keep_alive: self.keep_alive,
            live: self.live.clone(),
        };

        self.live.fetch_add(1, Ordering::SeqCst);

        // If spawning fails the closure, and with it `worker`, is dropped,
        // which undoes the increment above.
        thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker.run(first))?;

        debug!("spawned {name}");

        Ok(())
    }
}

impl Executor for ThreadPool {
    fn execute(&self, job: Job) {
        let job = match self.handoff.try_send(job) {
            Ok(()) => {
                trace!("job handed to idle worker");
                return;
            }
            // The pool owns a receiver, so the channel never disconnects;
            // either way there is nobody waiting.
            Err(TrySendError::Full(job)) | Err(TrySendError::Disconnected(job)) => job,
        };

        // The job was dropped along with the worker closure.
        if let Err(e) = self.spawn_worker(job) {
            error!("failed to spawn pool worker, dropping job: {e}");
        }
    }
}

struct Worker {
    idle: Receiver<Job>,
    keep_alive: Duration,
    live: Arc<AtomicUsize>,
}

impl Worker {
    fn run(self, first: Job) {
        Self::run_job(first);

        while let Ok(job) = self.idle.recv_timeout(self.keep_alive) {
            Self::run_job(job);
        }

        debug!("idle for {:?}, retiring", self.keep_alive);
    }

    fn run_job(job: Job) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(job)) {
            error!("pool job panicked: {}", panic_message(payload.as_ref()));
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        sync::{mpsc::channel, Arc, Barrier},
        thread,
        time::{Duration, Instant},
    };

    use super::ThreadPool;
    use crate::executor::Executor;

    fn wait_for(pool: &ThreadPool, workers: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while pool.live_workers() != workers {
            assert!(Instant::now() < deadline, "pool never reached {workers} workers");
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn runs_on_named_worker() {
        let pool = ThreadPool::builder().name_prefix("test-pool").build();
        let (tx, rx) = channel();

        pool.execute(Box::new(move || {
            tx.send(thread::current().name().map(str::to_owned)).unwrap();
        }));

        let name = rx.recv().unwrap().unwrap();
        assert!(name.starts_with("test-pool-"), "{name}");
    }

    #[test]
    fn grows_when_all_busy() {
        let pool = ThreadPool::new();
        let barrier = Arc::new(Barrier::new(5));
        let (tx, rx) = channel();

        // Each job blocks until all four are running, which can only happen
        // if the pool gave each one its own thread.
        for _ in 0..4 {
            let barrier = barrier.clone();
            let tx = tx.clone();
            pool.execute(Box::new(move || {
                barrier.wait();
                tx.send(thread::current().id()).unwrap();
            }));
        }

        barrier.wait();
        let ids: HashSet<_> = rx.iter().take(4).collect();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn reuses_idle_worker() {
        let pool = ThreadPool::new();
        let (tx, rx) = channel();

        let tx2 = tx.clone();
        pool.execute(Box::new(move || tx2.send(thread::current().id()).unwrap()));
        let first = rx.recv().unwrap();

        // Give the worker time to get back to waiting for work.
        thread::sleep(Duration::from_millis(100));

        pool.execute(Box::new(move || tx.send(thread::current().id()).unwrap()));
        let second = rx.recv().unwrap();

        assert_eq!(first, second);
        assert_eq!(pool.live_workers(), 1);
    }

    #[test]
    fn idle_workers_retire() {
        let pool = ThreadPool::builder()
            .keep_alive(Duration::from_millis(50))
            .build();
        let (tx, rx) = channel();

        pool.execute(Box::new(move || tx.send(()).unwrap()));
        rx.recv().unwrap();

        wait_for(&pool, 0);
    }

    #[test]
    fn survives_panicking_job() {
        let pool = ThreadPool::new();
        let (tx, rx) = channel();

        pool.execute(Box::new(|| panic!("job blew up")));
        wait_for(&pool, 1);
        thread::sleep(Duration::from_millis(100));

        pool.execute(Box::new(move || tx.send(()).unwrap()));
        rx.recv().unwrap();
        assert_eq!(pool.live_workers(), 1);
    }
}
