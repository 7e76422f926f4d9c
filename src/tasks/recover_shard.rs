// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Periodic self-healing sweep over a shard range.
//!
//! A worker that dies in the middle of a [`ZoneAction`](super::ZoneAction)
//! leaves its zone `PENDING` forever, and a failed action leaves it `ERROR`.
//! This task finds both kinds of zone and re-dispatches their last known
//! action through the worker API. There is no durable work queue: idempotent
//! re-dispatch is the whole crash-recovery story.

use super::Task;
use crate::api::{Storage, WorkerApi, ZoneCriterion};
use crate::config::TaskConfig;
use crate::errors::Result;
use crate::metrics;
use crate::zone::{increment_serial, Action, RequestContext, Status, Zone};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info};

pub struct RecoverShard {
    storage: Arc<dyn Storage>,
    worker_api: Arc<dyn WorkerApi>,
    config: Arc<TaskConfig>,
    ctx: RequestContext,
    begin: u16,
    end: u16,
}

impl RecoverShard {
    #[must_use]
    pub fn new(
        storage: Arc<dyn Storage>,
        worker_api: Arc<dyn WorkerApi>,
        config: Arc<TaskConfig>,
        ctx: RequestContext,
        begin: u16,
        end: u16,
    ) -> Self {
        Self {
            storage,
            worker_api,
            config,
            ctx,
            begin,
            end,
        }
    }

    /// Serials below this value belong to zones that should have finished
    /// propagating by now. Serials are generated from wall-clock seconds.
    fn stale_before(&self) -> u32 {
        let max_prop_secs =
            u32::try_from(self.config.max_prop_time().as_secs()).unwrap_or(u32::MAX);
        increment_serial(0).saturating_sub(max_prop_secs)
    }

    async fn zones_to_recover(&self) -> Result<Vec<Zone>> {
        let in_shard = ZoneCriterion::shard_range(self.begin, self.end);

        let errored = self
            .storage
            .find_zones(&self.ctx, &in_shard.clone().with_status(Status::Error), None, None)
            .await?;

        let stale = self
            .storage
            .find_zones(
                &self.ctx,
                &in_shard
                    .with_status(Status::Pending)
                    .with_serial_below(self.stale_before()),
                None,
                None,
            )
            .await?;

        let mut seen = HashSet::new();
        Ok(errored
            .into_iter()
            .chain(stale)
            .filter(|zone| seen.insert(zone.id.clone()))
            .collect())
    }

    async fn dispatch(&self, zone: &Zone) -> Result<bool> {
        match zone.action {
            Action::Create => self.worker_api.create_zone(&self.ctx, zone).await?,
            Action::Update => self.worker_api.update_zone(&self.ctx, zone).await?,
            Action::Delete => self.worker_api.delete_zone(&self.ctx, zone).await?,
            Action::None => return Ok(false),
        }
        Ok(true)
    }
}

#[async_trait]
impl Task for RecoverShard {
    /// Number of zones re-dispatched
    type Output = usize;

    fn describe(&self) -> String {
        format!("RecoverShard({}..={})", self.begin, self.end)
    }

    /// # Errors
    ///
    /// Storage failures while finding zones. Failures to re-dispatch a single
    /// zone are logged and do not stop the sweep.
    async fn run(&self) -> Result<usize> {
        let zones = self.zones_to_recover().await?;
        debug!(
            begin = self.begin,
            end = self.end,
            candidates = zones.len(),
            "Recovering shard range"
        );

        let mut dispatched = 0;
        for zone in &zones {
            match self.dispatch(zone).await {
                Ok(true) => {
                    info!(
                        zone = %zone.name,
                        zone_id = %zone.id,
                        action = %zone.action,
                        status = %zone.status,
                        "Recovery dispatched zone action"
                    );
                    metrics::record_recovery_dispatch(zone.action);
                    dispatched += 1;
                }
                Ok(false) => {
                    debug!(
                        zone = %zone.name,
                        status = %zone.status,
                        "Zone has no action to recover, leaving it alone"
                    );
                }
                Err(e) => {
                    error!(
                        zone = %zone.name,
                        zone_id = %zone.id,
                        action = %zone.action,
                        error = %e,
                        "Failed to re-dispatch zone action"
                    );
                    metrics::record_error("recover_shard", e.kind());
                }
            }
        }

        if dispatched > 0 {
            info!(
                begin = self.begin,
                end = self.end,
                dispatched = dispatched,
                "Shard recovery complete"
            );
        }
        Ok(dispatched)
    }
}

#[cfg(test)]
#[path = "recover_shard_tests.rs"]
mod recover_shard_tests;
