use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::database::SeasonKey;

/// seasons that currently have a prefetch task. Membership is all that matters here
#[derive(Debug, Clone, Default)]
pub struct SeasonLocks {
    inner: Arc<Mutex<HashSet<SeasonKey>>>,
}

impl SeasonLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<SeasonKey>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// test-and-set under one lock, `None` means someone else already owns the season
    pub fn try_acquire(&self, key: SeasonKey) -> Option<SeasonLockGuard> {
        if !self.lock().insert(key) {
            return None;
        }

        Some(SeasonLockGuard {
            locks: self.clone(),
            key,
        })
    }

    pub fn is_locked(&self, key: SeasonKey) -> bool {
        self.lock().contains(&key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// releases the season on drop, which also covers a prefetch task unwinding from a panic
#[derive(Debug)]
pub struct SeasonLockGuard {
    locks: SeasonLocks,
    key: SeasonKey,
}

impl Drop for SeasonLockGuard {
    fn drop(&mut self) {
        self.locks.lock().remove(&self.key);
        debug!("released season lock {}", self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(series_id: usize, season_num: u32) -> SeasonKey {
        SeasonKey {
            series_id,
            season_num,
        }
    }

    #[test]
    fn second_acquire_is_rejected_until_release() {
        let locks = SeasonLocks::new();

        let guard = locks.try_acquire(key(1, 2));
        assert!(guard.is_some());
        assert!(locks.try_acquire(key(1, 2)).is_none());
        // other seasons are independent
        assert!(locks.try_acquire(key(1, 3)).is_some());

        drop(guard);
        assert!(!locks.is_locked(key(1, 2)));
        assert!(locks.try_acquire(key(1, 2)).is_some());
    }

    #[test]
    fn guard_releases_when_a_thread_panics() {
        let locks = SeasonLocks::new();
        let guard = locks.try_acquire(key(7, 1)).unwrap();

        let result = std::thread::spawn(move || {
            let _guard = guard;
            panic!("prefetch blew up");
        })
        .join();

        assert!(result.is_err());
        assert!(locks.is_empty());
    }
}
