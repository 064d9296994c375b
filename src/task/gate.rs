//! One-shot completion signal.
use parking_lot::{Condvar, Mutex};

/// A latch that opens exactly once, publishing a value to everyone waiting on
/// it.
///
/// Everything a thread did before calling [Gate::release] is visible to any
/// thread that returns from [Gate::wait] or sees [Gate::is_released] return
/// `true`.
pub(crate) struct Gate<V> {
    value: Mutex<Option<V>>,
    cond: Condvar,
}

impl<V: Clone> Gate<V> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
            cond: Condvar::new(),
        }
    }

    /// Open the gate. Only the first release has any effect.
    pub fn release(&self, value: V) {
        let mut slot = self.value.lock();
        if slot.is_none() {
            *slot = Some(value);
            self.cond.notify_all();
        }
    }

    pub fn is_released(&self) -> bool {
        self.value.lock().is_some()
    }

    /// Block until the gate is released and return the published value.
    pub fn wait(&self) -> V {
        let mut slot = self.value.lock();
        loop {
            if let Some(v) = slot.as_ref() {
                return v.clone();
            }
            self.cond.wait(&mut slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::Arc,
        thread,
        time::{Duration, Instant},
    };

    use super::Gate;

    #[test]
    fn opens_once() {
        let gate = Gate::new();
        assert!(!gate.is_released());

        gate.release(1);
        gate.release(2);

        assert!(gate.is_released());
        assert_eq!(gate.wait(), 1);
    }

    #[test]
    fn wakes_all_waiters() {
        let gate = Arc::new(Gate::new());
        let before = Instant::now();

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let gate = gate.clone();
                thread::spawn(move || gate.wait())
            })
            .collect();

        thread::sleep(Duration::from_millis(100));
        gate.release("done");

        for w in waiters {
            assert_eq!(w.join().unwrap(), "done");
        }
        assert!(before.elapsed() >= Duration::from_millis(100));
    }
}
