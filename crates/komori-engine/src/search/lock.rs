//! Lock-free shared/exclusive lock over a single signed atomic integer.
//!
//! `state == 0` is unlocked, `state > 0` counts shared (reader) holders,
//! and `state == -1` marks the single exclusive (writer) holder. No
//! fairness is provided: a writer may spin indefinitely under sustained
//! reader load. That is acceptable here because the only writer is the
//! search thread's own garbage collector, which is invoked cooperatively
//! and therefore always makes eventual progress.

use std::sync::atomic::{AtomicI32, Ordering};

/// A reader/writer lock backed by one `AtomicI32`.
#[derive(Debug)]
pub struct SharedExclusiveLock {
    state: AtomicI32,
}

impl SharedExclusiveLock {
    /// A new, unlocked instance.
    pub const fn new() -> Self {
        SharedExclusiveLock {
            state: AtomicI32::new(0),
        }
    }

    /// Acquire a shared (reader) lock, spinning while a writer holds it.
    pub fn lock_shared(&self) {
        let mut state = self.state.load(Ordering::Relaxed);
        loop {
            if state >= 0 {
                match self.state.compare_exchange_weak(
                    state,
                    state + 1,
                    Ordering::Acquire,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => break,
                    Err(observed) => state = observed,
                }
            } else {
                state = self.state.load(Ordering::Relaxed);
            }
        }
    }

    /// Release a shared lock previously acquired via [`lock_shared`](Self::lock_shared).
    pub fn unlock_shared(&self) {
        self.state.fetch_sub(1, Ordering::Release);
    }

    /// Acquire the exclusive (writer) lock, spinning while any lock is held.
    pub fn lock(&self) {
        loop {
            if self
                .state
                .compare_exchange_weak(0, -1, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }
    }

    /// Release the exclusive lock.
    pub fn unlock(&self) {
        self.state.store(0, Ordering::Release);
    }
}

impl Default for SharedExclusiveLock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn multiple_shared_locks_coexist() {
        let lock = SharedExclusiveLock::new();
        lock.lock_shared();
        lock.lock_shared();
        assert_eq!(lock.state.load(Ordering::Relaxed), 2);
        lock.unlock_shared();
        lock.unlock_shared();
        assert_eq!(lock.state.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn exclusive_lock_sets_negative_state() {
        let lock = SharedExclusiveLock::new();
        lock.lock();
        assert_eq!(lock.state.load(Ordering::Relaxed), -1);
        lock.unlock();
        assert_eq!(lock.state.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn exclusive_waits_for_shared_release() {
        let lock = Arc::new(SharedExclusiveLock::new());
        let observed_post_release = Arc::new(AtomicUsize::new(0));

        lock.lock_shared();

        thread::scope(|s| {
            let lock2 = Arc::clone(&lock);
            let observed = Arc::clone(&observed_post_release);
            let writer = s.spawn(move || {
                lock2.lock();
                observed.store(1, Ordering::Relaxed);
                lock2.unlock();
            });

            thread::sleep(std::time::Duration::from_millis(5));
            assert_eq!(observed_post_release.load(Ordering::Relaxed), 0);
            lock.unlock_shared();
            writer.join().unwrap();
        });

        assert_eq!(observed_post_release.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn concurrent_stress_no_panics() {
        let lock = Arc::new(SharedExclusiveLock::new());

        thread::scope(|s| {
            for t in 0..8u64 {
                let lock = Arc::clone(&lock);
                s.spawn(move || {
                    for i in 0..2_000u64 {
                        if (t + i) % 7 == 0 {
                            lock.lock();
                            lock.unlock();
                        } else {
                            lock.lock_shared();
                            lock.unlock_shared();
                        }
                    }
                });
            }
        });

        assert_eq!(lock.state.load(Ordering::Relaxed), 0);
    }
}
