// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Push a zone action to every target of a pool.

use super::target::ZoneActionOnTarget;
use super::update_status::UpdateStatus;
use super::{threshold_met, StageOutcome, Task, TaskEnv};
use crate::errors::{Result, WorkerError};
use crate::zone::{Pool, RequestContext, Status, Zone, ZoneParams, ZoneState};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Run [`ZoneActionOnTarget`] for each pool target and check enough of them succeeded.
///
/// When too few targets succeed, the zone is reported as `ERROR` with its
/// action unchanged, so a later attempt repeats it.
pub struct ZoneActor {
    env: TaskEnv,
    ctx: RequestContext,
    pool: Arc<Pool>,
    zone: Zone,
    params: ZoneParams,
}

impl ZoneActor {
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
}

#[async_trait]
impl Task for ZoneActor {
    type Output = StageOutcome;

    fn describe(&self) -> String {
        format!("ZoneActor({} {})", self.zone.action, self.zone.name)
    }

    /// # Errors
    ///
    /// [`WorkerError::InvalidAction`] if the zone's action is not CREATE, UPDATE or DELETE.
    async fn run(&self) -> Result<StageOutcome> {
        if !self.zone.action.is_crud() {
            return Err(WorkerError::InvalidAction {
                zone: self.zone.name.clone(),
                action: self.zone.action,
            });
        }

        let tasks = self
            .pool
            .targets
            .iter()
            .map(|target| {
                ZoneActionOnTarget::new(
                    self.env.clone(),
                    self.ctx.clone(),
                    self.zone.clone(),
                    Arc::clone(target),
                    self.params,
                )
            })
            .collect();

        let results = self.env.executor.run(tasks).await;
        let total = results.len();
        let successes = results.into_iter().filter(|r| *r == Some(true)).count();
        let threshold = self.env.config.threshold_percentage;

        if threshold_met(successes, total, threshold) {
            info!(
                zone = %self.zone.name,
                action = %self.zone.action,
                successes = successes,
                total = total,
                "Zone action applied to pool targets"
            );
            return Ok(StageOutcome {
                success: true,
                state: self.zone.state(),
            });
        }

        warn!(
            zone = %self.zone.name,
            action = %self.zone.action,
            successes = successes,
            total = total,
            threshold = threshold,
            "Zone action failed on too many pool targets"
        );

        let reported = UpdateStatus::new(
            Arc::clone(&self.env.central),
            self.ctx.clone(),
            &self.zone.id,
            &self.zone.name,
            ZoneState {
                status: Status::Error,
                ..self.zone.state()
            },
        )
        .run()
        .await?;

        Ok(StageOutcome {
            success: false,
            state: reported,
        })
    }
}

#[cfg(test)]
#[path = "actor_tests.rs"]
mod actor_tests;
