// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! One end-to-end zone change.
//!
//! ```text
//! validate ─► ZoneActor ──false──► done (failure, already reported)
//!                 │true
//!                 ▼
//!           sleep(delay) ─► ZonePoller ─► done (poller's result)
//! ```
//!
//! Steps never overlap: the push finishes before the delay starts, and the
//! delay finishes before the first poll.

use super::actor::ZoneActor;
use super::poller::ZonePoller;
use super::{StageOutcome, Task, TaskEnv};
use crate::errors::{Result, WorkerError};
use crate::metrics;
use crate::zone::{Action, Pool, RequestContext, Zone, ZoneParams};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub struct ZoneAction {
    env: TaskEnv,
    ctx: RequestContext,
    pool: Arc<Pool>,
    zone: Zone,
    params: ZoneParams,
}

impl ZoneAction {
    #[must_use]
    pub fn new(
        env: TaskEnv,
        ctx: RequestContext,
        pool: Arc<Pool>,
        zone: Zone,
        params: ZoneParams,
    ) -> Self {
        Self {
            env,
            ctx,
            pool,
            zone,
            params,
        }
    }

    async fn execute(&self) -> Result<StageOutcome> {
        let pushed = ZoneActor::new(
            self.env.clone(),
            self.ctx.clone(),
            Arc::clone(&self.pool),
            self.zone.clone(),
            self.params,
        )
        .run()
        .await?;

        if !pushed.success {
            return Ok(pushed);
        }

        debug!(
            zone = %self.zone.name,
            delay = ?self.env.config.delay,
            "Waiting before polling nameservers"
        );
        tokio::time::sleep(self.env.config.delay).await;

        let mut expected = self.zone.with_state(pushed.state);
        if expected.action == Action::Delete {
            expected.serial = 0;
        }

        ZonePoller::new(
            self.env.clone(),
            self.ctx.clone(),
            Arc::clone(&self.pool),
            expected,
        )
        .run()
        .await
    }
}

#[async_trait]
impl Task for ZoneAction {
    type Output = StageOutcome;

    fn describe(&self) -> String {
        format!("ZoneAction({} {})", self.zone.action, self.zone.name)
    }

    /// # Errors
    ///
    /// Only [`WorkerError::InvalidAction`]; every operational failure is
    /// reported through the outcome instead.
    async fn run(&self) -> Result<StageOutcome> {
        if !self.zone.action.is_crud() {
            return Err(WorkerError::InvalidAction {
                zone: self.zone.name.clone(),
                action: self.zone.action,
            });
        }

        let started = Instant::now();
        info!(
            zone = %self.zone.name,
            zone_id = %self.zone.id,
            action = %self.zone.action,
            serial = self.zone.serial,
            "Starting zone action"
        );

        let outcome = self.execute().await?;

        metrics::record_zone_action(self.zone.action, outcome.success, started.elapsed());
        info!(
            zone = %self.zone.name,
            action = %self.zone.action,
            success = outcome.success,
            status = %outcome.state.status,
            elapsed = ?started.elapsed(),
            "Finished zone action"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "zone_action_tests.rs"]
mod zone_action_tests;
