// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-key mutual exclusion with an expiry window.
//!
//! A key can be granted once per `delay`: a second [`ZoneLock::acquire`]
//! within the window fails unless the holder released it. Entries older than
//! the window are considered abandoned and can be taken over. Entries owned by
//! a live [`ZoneLockGuard`] never expire.
//!
//! Every grant carries a token. Releasing with a token only removes the entry
//! if it is still the same grant, so a holder that was taken over cannot
//! release its successor.
//!
//! The worker service uses this to keep two actions for the same zone from
//! running at once.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct Grant {
    at: Instant,
    token: u64,
    guarded: bool,
}

#[derive(Debug, Default)]
struct Grants {
    by_key: HashMap<String, Grant>,
    next_token: u64,
}

#[derive(Debug)]
pub struct ZoneLock {
    delay: Duration,
    data: Mutex<Grants>,
}

impl ZoneLock {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            data: Mutex::new(Grants::default()),
        }
    }

    fn live(&self, grant: &Grant, now: Instant) -> bool {
        grant.guarded || now.duration_since(grant.at) < self.delay
    }

    fn grant(&self, key: &str, guarded: bool) -> Option<u64> {
        let mut data = self.data.lock();
        let now = Instant::now();

        if let Some(grant) = data.by_key.get(key) {
            if self.live(grant, now) {
                debug!(key = %key, "Lock held");
                return None;
            }
            debug!(key = %key, "Taking over expired lock");
        }

        data.next_token += 1;
        let token = data.next_token;
        data.by_key.insert(
            key.to_string(),
            Grant {
                at: now,
                token,
                guarded,
            },
        );
        Some(token)
    }

    /// Try to take `key`. Returns false if it was granted less than `delay` ago
    /// or is owned by a live guard.
    pub fn acquire(&self, key: &str) -> bool {
        self.grant(key, false).is_some()
    }

    /// Release `key` whoever holds it. Releasing a key that is not held is a no-op.
    pub fn release(&self, key: &str) {
        self.data.lock().by_key.remove(key);
    }

    /// Release `key` only if `token` is still the current grant.
    fn release_grant(&self, key: &str, token: u64) {
        let mut data = self.data.lock();
        if data.by_key.get(key).is_some_and(|grant| grant.token == token) {
            data.by_key.remove(key);
        } else {
            debug!(key = %key, "Lock was taken over, leaving it to the new holder");
        }
    }

    /// Acquire `key` and release it when the returned guard is dropped.
    #[must_use]
    pub fn try_guard(self: &Arc<Self>, key: &str) -> Option<ZoneLockGuard> {
        self.grant(key, true).map(|token| ZoneLockGuard {
            lock: Arc::clone(self),
            key: key.to_string(),
            token,
        })
    }

    #[must_use]
    pub fn is_held(&self, key: &str) -> bool {
        let now = Instant::now();
        self.data
            .lock()
            .by_key
            .get(key)
            .is_some_and(|grant| self.live(grant, now))
    }
}

/// Releases its own grant on drop.
#[derive(Debug)]
pub struct ZoneLockGuard {
    lock: Arc<ZoneLock>,
    key: String,
    token: u64,
}

impl Drop for ZoneLockGuard {
    fn drop(&mut self) {
        self.lock.release_grant(&self.key, self.token);
    }
}

#[cfg(test)]
#[path = "zone_lock_tests.rs"]
mod zone_lock_tests;
