// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `zone_lock.rs`

#[cfg(test)]
mod tests {
    use crate::zone_lock::ZoneLock;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_second_acquire_within_window_fails() {
        let lock = ZoneLock::new(Duration::from_secs(60));

        assert!(lock.acquire("example.com."));
        assert!(!lock.acquire("example.com."));
        assert!(lock.acquire("example.org."), "keys are independent");
    }

    #[test]
    fn test_release_allows_reacquire() {
        let lock = ZoneLock::new(Duration::from_secs(60));

        assert!(lock.acquire("example.com."));
        lock.release("example.com.");
        assert!(lock.acquire("example.com."));
    }

    #[test]
    fn test_release_unknown_key_is_noop() {
        let lock = ZoneLock::new(Duration::from_secs(60));
        lock.release("missing.");
        assert!(!lock.is_held("missing."));
    }

    #[test]
    fn test_expired_entry_can_be_taken_over() {
        let lock = ZoneLock::new(Duration::from_millis(10));

        assert!(lock.acquire("example.com."));
        std::thread::sleep(Duration::from_millis(30));
        assert!(!lock.is_held("example.com."));
        assert!(lock.acquire("example.com."));
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let lock = Arc::new(ZoneLock::new(Duration::from_secs(60)));

        {
            let guard = lock.try_guard("z1");
            assert!(guard.is_some());
            assert!(lock.try_guard("z1").is_none());
            assert!(lock.is_held("z1"));
        }

        assert!(!lock.is_held("z1"));
        assert!(lock.try_guard("z1").is_some());
    }

    #[test]
    fn test_concurrent_acquire_grants_once() {
        let lock = Arc::new(ZoneLock::new(Duration::from_secs(60)));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let lock = Arc::clone(&lock);
                std::thread::spawn(move || lock.acquire("example.com."))
            })
            .collect();

        let granted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|g| *g)
            .count();
        assert_eq!(granted, 1);
    }

    #[test]
    fn test_guarded_key_does_not_expire() {
        let lock = Arc::new(ZoneLock::new(Duration::from_millis(10)));

        let guard = lock.try_guard("z1");
        assert!(guard.is_some());
        std::thread::sleep(Duration::from_millis(30));

        assert!(lock.is_held("z1"));
        assert!(lock.try_guard("z1").is_none());
        assert!(!lock.acquire("z1"));

        drop(guard);
        assert!(lock.try_guard("z1").is_some());
    }

    #[test]
    fn test_stale_guard_does_not_release_successor() {
        let lock = Arc::new(ZoneLock::new(Duration::from_secs(60)));

        let first = lock.try_guard("z1").unwrap();
        lock.release("z1");
        let second = lock.try_guard("z1").unwrap();

        drop(first);
        assert!(lock.is_held("z1"), "second holder still owns the key");
        assert!(lock.try_guard("z1").is_none());

        drop(second);
        assert!(!lock.is_held("z1"));
    }

    #[test]
    fn test_guard_takes_over_expired_acquire() {
        let lock = Arc::new(ZoneLock::new(Duration::from_millis(10)));

        assert!(lock.acquire("z1"));
        std::thread::sleep(Duration::from_millis(30));
        let guard = lock.try_guard("z1");
        assert!(guard.is_some(), "expired plain grant is taken over");

        std::thread::sleep(Duration::from_millis(30));
        assert!(lock.try_guard("z1").is_none());
    }
}
