// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Back-off schedules for calls to services that are expected to recover.
//!
//! | Schedule              | First wait | Cap        | Gives up after |
//! |-----------------------|------------|------------|----------------|
//! | [`http_backoff`]      | 50ms       | 10s        | 2 minutes      |
//! | [`pool_load_backoff`] | caller     | caller     | never          |
//!
//! Both double the wait each time and add ±10% jitter so that workers
//! restarted together do not retry in lockstep.
//!
//! Task-level retries (backend attempts, poll rounds) do not use these; they
//! sleep the fixed `retry_interval` from [`TaskConfig`](crate::config::TaskConfig).

use rand::Rng;
use reqwest::StatusCode;
use std::time::{Duration, Instant};

const GROWTH_FACTOR: f64 = 2.0;
const JITTER: f64 = 0.1;

const HTTP_FIRST_WAIT: Duration = Duration::from_millis(50);
const HTTP_MAX_WAIT: Duration = Duration::from_secs(10);
const HTTP_GIVE_UP_AFTER: Duration = Duration::from_secs(120);

/// Shape of a back-off schedule.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    pub first_wait: Duration,
    pub max_wait: Duration,
    /// `None` retries forever
    pub give_up_after: Option<Duration>,
    pub growth_factor: f64,
    /// Fraction of the wait added or removed at random
    pub jitter: f64,
}

/// A running back-off: the policy plus where we are in it.
#[derive(Debug)]
pub struct Backoff {
    policy: BackoffPolicy,
    next_wait: Duration,
    started: Instant,
}

impl Backoff {
    #[must_use]
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            next_wait: policy.first_wait.min(policy.max_wait),
            policy,
            started: Instant::now(),
        }
    }

    #[must_use]
    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Un-jittered wait the next call to [`next_backoff`](Self::next_backoff) is based on.
    #[must_use]
    pub fn next_wait(&self) -> Duration {
        self.next_wait
    }

    /// How long to sleep before the next attempt, or `None` once the
    /// schedule has run out of time.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self
            .policy
            .give_up_after
            .is_some_and(|limit| self.started.elapsed() >= limit)
        {
            return None;
        }

        let wait = self.next_wait;
        self.next_wait = wait
            .mul_f64(self.policy.growth_factor)
            .min(self.policy.max_wait);
        Some(jittered(wait, self.policy.jitter))
    }

    /// Go back to the first wait and restart the give-up clock.
    pub fn reset(&mut self) {
        self.next_wait = self.policy.first_wait.min(self.policy.max_wait);
        self.started = Instant::now();
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

fn jittered(wait: Duration, jitter: f64) -> Duration {
    if wait.is_zero() || jitter <= 0.0 {
        return wait;
    }
    let factor = rand::thread_rng().gen_range((1.0 - jitter)..=(1.0 + jitter));
    wait.mul_f64(factor.max(0.0))
}

/// Schedule for retrying bindcar HTTP calls.
#[must_use]
pub fn http_backoff() -> Backoff {
    Backoff::new(BackoffPolicy {
        first_wait: HTTP_FIRST_WAIT,
        max_wait: HTTP_MAX_WAIT,
        give_up_after: Some(HTTP_GIVE_UP_AFTER),
        growth_factor: GROWTH_FACTOR,
        jitter: JITTER,
    })
}

/// Schedule for waiting on Central to hand out a pool. Never runs out.
#[must_use]
pub fn pool_load_backoff(first_wait: Duration, max_wait: Duration) -> Backoff {
    Backoff::new(BackoffPolicy {
        first_wait,
        max_wait,
        give_up_after: None,
        growth_factor: GROWTH_FACTOR,
        jitter: JITTER,
    })
}

/// 429 and the transient 5xx statuses (500, 502, 503, 504).
#[must_use]
pub fn is_retryable_http_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502..=504)
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
