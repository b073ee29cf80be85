//! Poison-tolerant lock access.
//!
//! Handler code runs outside every lock, but a panic while a registration
//! table is being written would still poison it. The registries recover the
//! guard instead of propagating the panic to every later session.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Extension trait for `RwLock` to recover from poisoned locks.
pub(crate) trait RwLockRecovery<T> {
    /// Acquires a read lock, clearing poison if necessary.
    fn read_recover(&self) -> RwLockReadGuard<'_, T>;

    /// Acquires a write lock, clearing poison if necessary.
    fn write_recover(&self) -> RwLockWriteGuard<'_, T>;
}

impl<T> RwLockRecovery<T> for RwLock<T> {
    fn read_recover(&self) -> RwLockReadGuard<'_, T> {
        self.read().unwrap_or_else(|poisoned| {
            self.clear_poison();
            poisoned.into_inner()
        })
    }

    fn write_recover(&self) -> RwLockWriteGuard<'_, T> {
        self.write().unwrap_or_else(|poisoned| {
            self.clear_poison();
            poisoned.into_inner()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn poisoned(value: Vec<u32>) -> Arc<RwLock<Vec<u32>>> {
        let lock = Arc::new(RwLock::new(value));
        let clone = Arc::clone(&lock);
        let _ = thread::spawn(move || {
            let _guard = clone.write().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(lock.is_poisoned());
        lock
    }

    #[test]
    fn read_recover_returns_data_from_poisoned_lock() {
        let lock = poisoned(vec![1, 2, 3]);
        assert_eq!(*lock.read_recover(), vec![1, 2, 3]);
        assert!(!lock.is_poisoned());
    }

    #[test]
    fn write_recover_allows_mutation_after_poison() {
        let lock = poisoned(vec![1]);
        lock.write_recover().push(2);
        assert_eq!(*lock.read_recover(), vec![1, 2]);
    }
}
