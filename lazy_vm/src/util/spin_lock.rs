use core::hint::spin_loop;

use try_lock::{Locked, TryLock};

/// Busy waiting lock on top of [`TryLock`].
///
/// Critical sections guarded by this lock must be short and must never
/// block on disk or file I/O.
pub(crate) struct SpinLock<T> {
    inner: TryLock<T>,
}

impl<T> SpinLock<T> {
    pub(crate) fn new(inner: T) -> Self {
        Self {
            inner: TryLock::new(inner),
        }
    }

    pub(crate) fn lock(&self) -> Locked<'_, T> {
        loop {
            if let Some(guard) = self.inner.try_lock() {
                return guard;
            }

            spin_loop();
        }
    }

    #[cfg(test)]
    pub(crate) fn try_lock(&self) -> Option<Locked<'_, T>> {
        self.inner.try_lock()
    }
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, thread};

    use super::SpinLock;

    #[test]
    fn test_lock_excludes() {
        let lock = SpinLock::new(0usize);
        let guard = lock.lock();
        assert!(lock.try_lock().is_none());
        drop(guard);
        assert!(lock.try_lock().is_some());
    }

    #[test]
    fn test_lock_counts_across_threads() {
        const THREADS: usize = 4;
        const ITERATIONS: usize = 1000;

        let counter = Arc::new(SpinLock::new(0usize));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let counter = counter.clone();
                thread::spawn(move || {
                    for _ in 0..ITERATIONS {
                        *counter.lock() += 1;
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*counter.lock(), THREADS * ITERATIONS);
    }
}
