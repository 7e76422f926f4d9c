// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Worker service: the entry points the control plane calls.
//!
//! Each entry point is a thin dispatcher onto a task from [`crate::tasks`].
//! The service adds what the tasks deliberately leave out:
//!
//! - **Pool loading** - pools are fetched from Central on first use and
//!   cached. While Central does not know the pool (or times out) the load is
//!   retried with back-off, indefinitely.
//! - **Per-zone exclusion** - two actions for the same zone never run at
//!   once; the second caller gets [`WorkerError::ZoneBusy`].
//! - **Also-notify** - servers outside the pool are sent NOTIFY alongside the
//!   zone action, through the same executor as every other leaf task.
//! - **Periodic recovery** - [`WorkerService::run_periodic_recovery`] sweeps
//!   the configured shard range until shut down.

use crate::api::{CentralApi, Quota, Storage, WorkerApi};
use crate::backend;
use crate::config::{TaskConfig, WorkerConfig};
use crate::constants::POOL_LOAD_INITIAL_INTERVAL_MILLIS;
use crate::dns::DnsTransport;
use crate::errors::{Result, WorkerError};
use crate::executor::Executor;
use crate::metrics;
use crate::retry;
use crate::tasks::{
    ExportZone, PollForZone, RecoverShard, SendNotify, Task, TaskEnv, ZoneAction,
};
use crate::zone::{
    Action, Nameserver, NotifyTarget, Pool, PoolDefinition, RequestContext, Zone, ZoneExport,
    ZoneParams,
};
use crate::zone_lock::ZoneLock;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Services the worker talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub storage: Arc<dyn Storage>,
    pub central: Arc<dyn CentralApi>,
    pub worker_api: Arc<dyn WorkerApi>,
    pub quota: Arc<dyn Quota>,
    pub transport: Arc<dyn DnsTransport>,
}

pub struct WorkerService {
    env: TaskEnv,
    storage: Arc<dyn Storage>,
    worker_api: Arc<dyn WorkerApi>,
    quota: Arc<dyn Quota>,
    pools: Mutex<HashMap<String, Arc<Pool>>>,
    zone_lock: Arc<ZoneLock>,
    pool_load_retry_interval: Duration,
    recovery_interval: Duration,
    shard_begin: u16,
    shard_end: u16,
}

impl WorkerService {
    /// Build the service from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: &WorkerConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let task_config = TaskConfig::from(config);

        info!(
            threads = config.threads,
            threshold_percentage = config.threshold_percentage,
            shard_begin = config.shard_begin,
            shard_end = config.shard_end,
            max_prop_time = ?task_config.max_prop_time(),
            "Creating zone worker service"
        );

        Ok(Self {
            zone_lock: Arc::new(ZoneLock::new(task_config.max_prop_time())),
            env: TaskEnv {
                executor: Executor::new(config.threads),
                config: Arc::new(task_config),
                central: collaborators.central,
                transport: collaborators.transport,
            },
            storage: collaborators.storage,
            worker_api: collaborators.worker_api,
            quota: collaborators.quota,
            pools: Mutex::new(HashMap::new()),
            pool_load_retry_interval: Duration::from_secs(config.pool_load_retry_interval),
            recovery_interval: Duration::from_secs(config.recovery_interval.max(1)),
            shard_begin: config.shard_begin,
            shard_end: config.shard_end,
        })
    }

    /// The task configuration shared by every task of this service.
    #[must_use]
    pub fn task_config(&self) -> &TaskConfig {
        &self.env.config
    }

    // ========================================================================
    // Pools
    // ========================================================================

    /// Return the pool, loading it from Central on first use.
    ///
    /// # Errors
    ///
    /// [`WorkerError::NoPoolTargetsConfigured`] for a pool without targets,
    /// backend construction errors, and any Central error other than
    /// `PoolNotFound` or `Timeout` (those are retried).
    pub async fn get_pool(&self, ctx: &RequestContext, pool_id: &str) -> Result<Arc<Pool>> {
        if let Some(pool) = self.pools.lock().get(pool_id) {
            return Ok(Arc::clone(pool));
        }

        let loaded = Arc::new(self.load_pool(ctx, pool_id).await?);
        let pool = Arc::clone(
            self.pools
                .lock()
                .entry(pool_id.to_string())
                .or_insert(loaded),
        );
        Ok(pool)
    }

    async fn load_pool(&self, ctx: &RequestContext, pool_id: &str) -> Result<Pool> {
        let mut backoff = retry::pool_load_backoff(
            Duration::from_millis(POOL_LOAD_INITIAL_INTERVAL_MILLIS),
            self.pool_load_retry_interval,
        );

        let definition = loop {
            match self.env.central.get_pool(ctx, pool_id).await {
                Ok(definition) => break definition,
                Err(e @ (WorkerError::PoolNotFound { .. } | WorkerError::Timeout { .. })) => {
                    let wait = backoff
                        .next_backoff()
                        .unwrap_or(self.pool_load_retry_interval);
                    warn!(
                        pool_id = %pool_id,
                        error = %e,
                        retry_in = ?wait,
                        "Pool not available yet, retrying"
                    );
                    metrics::record_error("get_pool", e.kind());
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(e),
            }
        };

        build_pool(&definition)
    }

    // ========================================================================
    // Zone actions
    // ========================================================================

    /// Create a zone on every target of its pool and wait for it to propagate.
    ///
    /// # Errors
    ///
    /// See [`perform_zone_action`](Self::perform_zone_action).
    pub async fn create_zone(&self, ctx: &RequestContext, zone: &Zone) -> Result<bool> {
        self.perform_zone_action(ctx, zone, ZoneParams::default())
            .await
    }

    /// Push a zone change to every target of its pool and wait for it to propagate.
    ///
    /// # Errors
    ///
    /// See [`perform_zone_action`](Self::perform_zone_action).
    pub async fn update_zone(&self, ctx: &RequestContext, zone: &Zone) -> Result<bool> {
        self.perform_zone_action(ctx, zone, ZoneParams::default())
            .await
    }

    /// Remove a zone from every target of its pool and wait until it is gone.
    ///
    /// # Errors
    ///
    /// See [`perform_zone_action`](Self::perform_zone_action).
    pub async fn delete_zone(
        &self,
        ctx: &RequestContext,
        zone: &Zone,
        params: ZoneParams,
    ) -> Result<bool> {
        self.perform_zone_action(ctx, zone, params).await
    }

    /// Run the zone's pending action end to end.
    ///
    /// Returns whether the action reached its threshold on both the targets
    /// and the nameservers. NOTIFY to also-notify servers is sent alongside
    /// CREATE and UPDATE, and its outcome does not affect the result. DELETE
    /// sends no also-notify: there is no zone left for them to transfer.
    ///
    /// The zone stays locked until the action returns, however long it takes.
    ///
    /// # Errors
    ///
    /// - [`WorkerError::ZoneBusy`] if an action for the zone is already running
    /// - [`WorkerError::InvalidAction`] if the zone has no CRUD action
    /// - pool loading errors from [`get_pool`](Self::get_pool)
    pub async fn perform_zone_action(
        &self,
        ctx: &RequestContext,
        zone: &Zone,
        params: ZoneParams,
    ) -> Result<bool> {
        let _guard = self
            .zone_lock
            .try_guard(&zone.id)
            .ok_or_else(|| WorkerError::ZoneBusy {
                zone_id: zone.id.clone(),
            })?;

        let pool = self.get_pool(ctx, &zone.pool_id).await?;

        let action = ZoneAction::new(
            self.env.clone(),
            ctx.clone(),
            Arc::clone(&pool),
            zone.clone(),
            params,
        );

        let (outcome, _) = tokio::join!(action.run(), self.notify_also_notifies(zone, &pool));
        let outcome = outcome.inspect_err(|e| {
            if e.is_contract_violation() {
                error!(zone = %zone.name, error = %e, "Rejected zone action");
            }
        })?;

        Ok(outcome.success)
    }

    async fn notify_also_notifies(&self, zone: &Zone, pool: &Pool) {
        if zone.action == Action::Delete || pool.also_notifies.is_empty() {
            return;
        }

        let sends = pool
            .also_notifies
            .iter()
            .map(|also_notify| {
                SendNotify::new(
                    Arc::clone(&self.env.transport),
                    Arc::clone(&self.env.config),
                    &zone.name,
                    NotifyTarget::from(also_notify),
                )
            })
            .collect();

        // Failed sends are logged by the executor and come back as None
        let acknowledged = self
            .env
            .executor
            .run(sends)
            .await
            .into_iter()
            .filter(|ack| *ack == Some(true))
            .count();

        debug!(
            zone = %zone.name,
            acknowledged = acknowledged,
            total = pool.also_notifies.len(),
            "Also-notify sent"
        );
    }

    // ========================================================================
    // Recovery, export, serial lookup
    // ========================================================================

    /// Re-dispatch stuck zones in shards `[begin, end]`.
    ///
    /// # Errors
    ///
    /// Storage errors while finding zones.
    pub async fn recover_shard(&self, ctx: &RequestContext, begin: u16, end: u16) -> Result<usize> {
        RecoverShard::new(
            Arc::clone(&self.storage),
            Arc::clone(&self.worker_api),
            Arc::clone(&self.env.config),
            ctx.clone(),
            begin,
            end,
        )
        .run()
        .await
    }

    /// Export a zone, subject to the tenant's export size quota.
    ///
    /// # Errors
    ///
    /// Storage, quota and Central errors.
    pub async fn start_zone_export(
        &self,
        ctx: &RequestContext,
        export: &ZoneExport,
    ) -> Result<ZoneExport> {
        ExportZone::new(
            Arc::clone(&self.storage),
            Arc::clone(&self.env.central),
            Arc::clone(&self.quota),
            Arc::clone(&self.env.config),
            ctx.clone(),
            export.clone(),
        )
        .run()
        .await
    }

    /// The zone's SOA serial as served by `nameserver`, or `None` if it did not answer.
    ///
    /// # Errors
    ///
    /// Never fails in practice; transport errors yield `Ok(None)`.
    pub async fn get_serial_number(
        &self,
        _ctx: &RequestContext,
        zone: &Zone,
        nameserver: &Nameserver,
    ) -> Result<Option<u32>> {
        PollForZone::new(
            Arc::clone(&self.env.transport),
            Arc::clone(&self.env.config),
            &zone.name,
            nameserver.clone(),
        )
        .run()
        .await
    }

    /// Sweep the configured shard range every `recovery_interval` until
    /// `shutdown` turns true or its sender is dropped.
    pub async fn run_periodic_recovery(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.recovery_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let ctx = RequestContext::admin();

        info!(
            interval = ?self.recovery_interval,
            shard_begin = self.shard_begin,
            shard_end = self.shard_end,
            "Starting periodic shard recovery"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.recover_shard(&ctx, self.shard_begin, self.shard_end).await {
                        error!(error = %e, kind = e.kind(), "Shard recovery failed");
                        metrics::record_error("recover_shard", e.kind());
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Stopping periodic shard recovery");
                        return;
                    }
                }
            }
        }
    }
}

/// Attach backends to a pool definition.
fn build_pool(definition: &PoolDefinition) -> Result<Pool> {
    if definition.targets.is_empty() {
        return Err(WorkerError::NoPoolTargetsConfigured {
            pool_id: definition.id.clone(),
        });
    }

    let targets = definition
        .targets
        .iter()
        .map(|target| backend::build_target(target).map(Arc::new))
        .collect::<Result<Vec<_>>>()?;

    debug!(
        pool_id = %definition.id,
        targets = targets.len(),
        nameservers = definition.nameservers.len(),
        also_notifies = definition.also_notifies.len(),
        "Loaded pool"
    );

    Ok(Pool {
        id: definition.id.clone(),
        targets,
        nameservers: definition.nameservers.clone(),
        also_notifies: definition.also_notifies.clone(),
    })
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod service_tests;
