// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-target tasks: apply a zone action through a backend, and send NOTIFY.

use super::{Task, TaskEnv};
use crate::config::TaskConfig;
use crate::dns::DnsTransport;
use crate::errors::{Result, WorkerError};
use crate::metrics;
use crate::zone::{Action, NotifyTarget, PoolTarget, RequestContext, Zone, ZoneParams};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Send one NOTIFY for a zone to one server.
///
/// Returns `Ok(true)` once the server acknowledged, or straight away when
/// NOTIFY is disabled in the configuration. A timeout is returned to the
/// caller as [`WorkerError::Timeout`]; any other transport failure is logged
/// and yields `Ok(false)`.
pub struct SendNotify {
    transport: Arc<dyn DnsTransport>,
    config: Arc<TaskConfig>,
    zone_name: String,
    target: NotifyTarget,
}

impl SendNotify {
    #[must_use]
    pub fn new(
        transport: Arc<dyn DnsTransport>,
        config: Arc<TaskConfig>,
        zone_name: &str,
        target: NotifyTarget,
    ) -> Self {
        Self {
            transport,
            config,
            zone_name: zone_name.to_string(),
            target,
        }
    }
}

#[async_trait]
impl Task for SendNotify {
    type Output = bool;

    fn describe(&self) -> String {
        format!(
            "SendNotify({} -> {}:{})",
            self.zone_name, self.target.host, self.target.port
        )
    }

    async fn run(&self) -> Result<bool> {
        if !self.config.notify {
            debug!(zone = %self.zone_name, host = %self.target.host, "NOTIFY disabled, skipping");
            metrics::record_notify("disabled");
            return Ok(true);
        }

        match self
            .transport
            .notify(
                &self.zone_name,
                &self.target.host,
                self.target.port,
                self.config.timeout,
            )
            .await
        {
            Ok(()) => {
                debug!(
                    zone = %self.zone_name,
                    host = %self.target.host,
                    port = self.target.port,
                    "Sent NOTIFY"
                );
                metrics::record_notify("sent");
                Ok(true)
            }
            Err(e @ WorkerError::Timeout { .. }) => {
                metrics::record_notify("failure");
                Err(e)
            }
            Err(e) => {
                warn!(
                    zone = %self.zone_name,
                    host = %self.target.host,
                    port = self.target.port,
                    error = %e,
                    "Failed to send NOTIFY"
                );
                metrics::record_notify("failure");
                Ok(false)
            }
        }
    }
}

/// Apply the zone's action to one pool target, retrying on failure.
///
/// CREATE and UPDATE are followed by a NOTIFY to the target; the attempt only
/// counts once that NOTIFY succeeds. The target's catalog zone, if it has one,
/// is notified afterwards on a best-effort basis. DELETE sends nothing.
///
/// Never returns an error: the output is whether the target ended up applied.
pub struct ZoneActionOnTarget {
    env: TaskEnv,
    ctx: RequestContext,
    zone: Zone,
    target: Arc<PoolTarget>,
    params: ZoneParams,
}

impl ZoneActionOnTarget {
    #[must_use]
    pub fn new(
        env: TaskEnv,
        ctx: RequestContext,
        zone: Zone,
        target: Arc<PoolTarget>,
        params: ZoneParams,
    ) -> Self {
        Self {
            env,
            ctx,
            zone,
            target,
            params,
        }
    }

    fn send_notify(&self, zone_name: &str, target: NotifyTarget) -> SendNotify {
        SendNotify::new(
            Arc::clone(&self.env.transport),
            Arc::clone(&self.env.config),
            zone_name,
            target,
        )
    }

    /// One attempt: backend call, then NOTIFY for CREATE/UPDATE.
    async fn attempt(&self) -> Result<()> {
        let backend = &self.target.backend;
        match self.zone.action {
            Action::Create => backend.create_zone(&self.ctx, &self.zone).await?,
            Action::Update => backend.update_zone(&self.ctx, &self.zone).await?,
            Action::Delete => {
                return backend
                    .delete_zone(&self.ctx, &self.zone, &self.params)
                    .await;
            }
            Action::None => {
                return Err(WorkerError::InvalidAction {
                    zone: self.zone.name.clone(),
                    action: self.zone.action,
                });
            }
        }

        // The target is sent NOTIFY inline: this task already holds an executor permit
        let notify_target = self.target.notify_target()?;
        if !self
            .send_notify(&self.zone.name, notify_target)
            .run()
            .await?
        {
            return Err(WorkerError::Transport {
                server: self.target.id.clone(),
                reason: format!("NOTIFY for {} was not acknowledged", self.zone.name),
            });
        }
        Ok(())
    }

    async fn notify_catalog_zone(&self) {
        let catalog_zone = match self.target.backend.catalog_zone(&self.ctx).await {
            Ok(name) => name,
            Err(WorkerError::CatalogZoneNotFound { .. }) => return,
            Err(e) => {
                warn!(target_id = %self.target.id, error = %e, "Failed to look up catalog zone");
                return;
            }
        };

        let result = match self.target.notify_target() {
            Ok(notify_target) => self.send_notify(&catalog_zone, notify_target).run().await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(
                target_id = %self.target.id,
                catalog_zone = %catalog_zone,
                error = %e,
                "Failed to NOTIFY catalog zone"
            );
        }
    }
}

#[async_trait]
impl Task for ZoneActionOnTarget {
    type Output = bool;

    fn describe(&self) -> String {
        format!(
            "ZoneActionOnTarget({} {} on {})",
            self.zone.action, self.zone.name, self.target.id
        )
    }

    async fn run(&self) -> Result<bool> {
        let attempts = self.env.config.attempts();

        for attempt in 1..=attempts {
            match self.attempt().await {
                Ok(()) => {
                    info!(
                        zone = %self.zone.name,
                        target_id = %self.target.id,
                        action = %self.zone.action,
                        attempt = attempt,
                        "Applied zone action on target"
                    );
                    if self.zone.action != Action::Delete {
                        self.notify_catalog_zone().await;
                    }
                    metrics::record_target_action(self.zone.action, true);
                    return Ok(true);
                }
                Err(e) => {
                    warn!(
                        zone = %self.zone.name,
                        target_id = %self.target.id,
                        action = %self.zone.action,
                        attempt = attempt,
                        max_attempts = attempts,
                        error = %e,
                        "Zone action on target failed"
                    );
                    if e.is_contract_violation() {
                        break;
                    }
                    if attempt < attempts {
                        tokio::time::sleep(self.env.config.retry_interval).await;
                    }
                }
            }
        }

        warn!(
            zone = %self.zone.name,
            target_id = %self.target.id,
            action = %self.zone.action,
            "Giving up on target after {attempts} attempts"
        );
        metrics::record_target_action(self.zone.action, false);
        Ok(false)
    }
}

#[cfg(test)]
#[path = "target_tests.rs"]
mod target_tests;
