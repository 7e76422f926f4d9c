// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Bounded fan-out of independent tasks.
//!
//! [`Executor::run`] spawns every task, lets at most `max_concurrent` of them
//! run at once, and returns one slot per task in submission order. A task
//! that fails (or panics) is logged and reported as `None`; the rest of the
//! batch is unaffected. Threshold calculations downstream rely on getting a
//! complete, ordered vector back.
//!
//! Only leaf tasks (backend calls, DNS queries, NOTIFY) go through the
//! executor. Orchestration tasks await their own fan-out directly so that a
//! full pool can never wait on itself.

use crate::tasks::Task;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

/// Runs batches of tasks on a bounded number of permits.
#[derive(Clone, Debug)]
pub struct Executor {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl Executor {
    /// Create an executor allowing `max_concurrent` tasks to run at once (at least one).
    #[must_use]
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        debug!(max_concurrent = max_concurrent, "Creating task executor");
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    /// Run `tasks` and return their outputs in submission order.
    ///
    /// Failed tasks yield `None` in their slot.
    pub async fn run<T: Task>(&self, tasks: Vec<T>) -> Vec<Option<T::Output>> {
        let mut descriptions = Vec::with_capacity(tasks.len());
        let mut handles = Vec::with_capacity(tasks.len());

        for task in tasks {
            descriptions.push(task.describe());
            let semaphore = Arc::clone(&self.semaphore);
            handles.push(tokio::spawn(async move {
                // The semaphore is never closed; a failed acquire only happens on shutdown
                let _permit = semaphore.acquire_owned().await.ok()?;
                Some(task.run().await)
            }));
        }

        join_all(handles)
            .await
            .into_iter()
            .zip(descriptions)
            .map(|(joined, task)| match joined {
                Ok(Some(Ok(output))) => Some(output),
                Ok(Some(Err(e))) => {
                    warn!(task = %task, error = %e, kind = e.kind(), "Task failed");
                    None
                }
                Ok(None) => {
                    warn!(task = %task, "Task not run, executor is shutting down");
                    None
                }
                Err(e) => {
                    error!(task = %task, error = %e, "Task panicked or was cancelled");
                    None
                }
            })
            .collect()
    }

    /// Run a single task. Equivalent to a one-element [`run`](Self::run).
    pub async fn run_one<T: Task>(&self, task: T) -> Option<T::Output> {
        self.run(vec![task]).await.into_iter().next().flatten()
    }

    /// Maximum number of tasks running at once.
    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Permits currently held by running tasks.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.max_concurrent - self.semaphore.available_permits()
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod executor_tests;
