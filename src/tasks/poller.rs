// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Nameserver polling and the propagation consensus.
//!
//! [`ZonePoller`] asks every nameserver of the pool for the zone's SOA serial
//! ([`PollForZone`]) and folds the answers into a [`DnsQueryResult`]:
//!
//! - **CREATE/UPDATE**: a server is *positive* when its serial is at least the
//!   zone's serial. The consensus serial is the lowest positive serial. A
//!   server answering `0` without being positive has *no zone*.
//! - **DELETE**: a server is positive (and has no zone) when it answers `0`.
//!   The consensus serial is `0`.
//! - Servers that did not answer count as neither.
//!
//! Rounds repeat until the positive ratio meets the threshold or the retries
//! run out. The last round is then classified by [`classify`]:
//!
//! | check                                        | outcome   |
//! |----------------------------------------------|-----------|
//! | `(total - no_zones) / total` below threshold (not DELETE) | `NO_ZONE` |
//! | `positives / total` below threshold          | `ERROR`   |
//! | otherwise                                    | `SUCCESS` |

use super::update_status::UpdateStatus;
use super::{threshold_met, StageOutcome, Task, TaskEnv};
use crate::config::TaskConfig;
use crate::dns::DnsTransport;
use crate::errors::{Result, WorkerError};
use crate::metrics;
use crate::zone::{Action, Nameserver, Pool, RequestContext, Status, Zone, ZoneState};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one poll round.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsQueryResult {
    pub positives: usize,
    pub no_zones: usize,
    pub consensus_serial: u32,
    /// Serial per nameserver, in pool order; `None` when there was no answer
    pub results: Vec<Option<u32>>,
}

impl DnsQueryResult {
    /// Number of nameservers polled, answered or not.
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }
}

/// Fold per-nameserver serials into positives, no-zones and consensus.
#[must_use]
pub fn parse_query_results(results: Vec<Option<u32>>, action: Action, serial: u32) -> DnsQueryResult {
    let mut positives = 0;
    let mut no_zones = 0;
    let mut consensus_serial = 0;

    if action == Action::Delete {
        let gone = results.iter().filter(|r| **r == Some(0)).count();
        positives = gone;
        no_zones = gone;
    } else {
        let mut lowest: Option<u32> = None;
        for answer in results.iter().flatten().copied() {
            if answer >= serial {
                positives += 1;
                lowest = Some(lowest.map_or(answer, |l| l.min(answer)));
            } else if answer == 0 {
                no_zones += 1;
            }
        }
        consensus_serial = lowest.unwrap_or(0);
    }

    DnsQueryResult {
        positives,
        no_zones,
        consensus_serial,
        results,
    }
}

/// Classify a poll round against the threshold. Returns `SUCCESS`, `NO_ZONE` or `ERROR`.
#[must_use]
pub fn classify(result: &DnsQueryResult, action: Action, threshold_percentage: u8) -> Status {
    let total = result.total();
    let with_zone = total.saturating_sub(result.no_zones);

    if !threshold_met(with_zone, total, threshold_percentage) && action != Action::Delete {
        Status::NoZone
    } else if !threshold_met(result.positives, total, threshold_percentage) {
        Status::Error
    } else {
        Status::Success
    }
}

/// Query one nameserver for a zone's SOA serial.
///
/// Output is `None` when the server did not answer in time or the query failed.
pub struct PollForZone {
    transport: Arc<dyn DnsTransport>,
    config: Arc<TaskConfig>,
    zone_name: String,
    nameserver: Nameserver,
}

impl PollForZone {
    #[must_use]
    pub fn new(
        transport: Arc<dyn DnsTransport>,
        config: Arc<TaskConfig>,
        zone_name: &str,
        nameserver: Nameserver,
    ) -> Self {
        Self {
            transport,
            config,
            zone_name: zone_name.to_string(),
            nameserver,
        }
    }
}

#[async_trait]
impl Task for PollForZone {
    type Output = Option<u32>;

    fn describe(&self) -> String {
        format!(
            "PollForZone({} @ {}:{})",
            self.zone_name, self.nameserver.host, self.nameserver.port
        )
    }

    async fn run(&self) -> Result<Option<u32>> {
        let answer = self
            .transport
            .get_serial(
                &self.zone_name,
                &self.nameserver.host,
                self.nameserver.port,
                self.config.timeout,
            )
            .await;

        match answer {
            Ok(serial) => {
                debug!(
                    zone = %self.zone_name,
                    nameserver = %self.nameserver.host,
                    serial = serial,
                    "Got SOA serial"
                );
                Ok(Some(serial))
            }
            Err(WorkerError::Timeout { .. }) => {
                info!(
                    zone = %self.zone_name,
                    nameserver = %self.nameserver.host,
                    port = self.nameserver.port,
                    "Timed out querying SOA serial"
                );
                Ok(None)
            }
            Err(e) => {
                warn!(
                    zone = %self.zone_name,
                    nameserver = %self.nameserver.host,
                    port = self.nameserver.port,
                    error = %e,
                    "Failed to query SOA serial"
                );
                Ok(None)
            }
        }
    }
}

/// Poll the pool's nameservers until the zone's serial has propagated, then
/// report the resulting status.
///
/// The zone carries the expected serial and the action being verified.
pub struct ZonePoller {
    env: TaskEnv,
    ctx: RequestContext,
    pool: Arc<Pool>,
    zone: Zone,
}

impl ZonePoller {
    #[must_use]
    pub fn new(env: TaskEnv, ctx: RequestContext, pool: Arc<Pool>, zone: Zone) -> Self {
        Self {
            env,
            ctx,
            pool,
            zone,
        }
    }

    async fn do_poll(&self) -> DnsQueryResult {
        let queries = self
            .pool
            .nameservers
            .iter()
            .map(|ns| {
                PollForZone::new(
                    Arc::clone(&self.env.transport),
                    Arc::clone(&self.env.config),
                    &self.zone.name,
                    ns.clone(),
                )
            })
            .collect();

        let results = self
            .env
            .executor
            .run(queries)
            .await
            .into_iter()
            .map(Option::flatten)
            .collect();

        parse_query_results(results, self.zone.action, self.zone.serial)
    }
}

#[async_trait]
impl Task for ZonePoller {
    type Output = StageOutcome;

    fn describe(&self) -> String {
        format!("ZonePoller({} {})", self.zone.action, self.zone.name)
    }

    async fn run(&self) -> Result<StageOutcome> {
        let config = &self.env.config;
        let rounds = config.attempts();
        let mut result = DnsQueryResult::default();

        for round in 1..=rounds {
            result = self.do_poll().await;

            if threshold_met(result.positives, result.total(), config.threshold_percentage) {
                debug!(
                    zone = %self.zone.name,
                    round = round,
                    positives = result.positives,
                    total = result.total(),
                    "Propagation threshold met"
                );
                break;
            }

            if round < rounds {
                info!(
                    zone = %self.zone.name,
                    serial = self.zone.serial,
                    round = round,
                    max_rounds = rounds,
                    positives = result.positives,
                    no_zones = result.no_zones,
                    total = result.total(),
                    retry_in = ?config.retry_interval,
                    "Propagation threshold not met, polling again"
                );
                tokio::time::sleep(config.retry_interval).await;
            }
        }

        let status = classify(&result, self.zone.action, config.threshold_percentage);
        metrics::record_poll_result(status);

        let state = match status {
            Status::Success => ZoneState {
                action: self.zone.action,
                status,
                serial: result.consensus_serial,
            },
            Status::NoZone => ZoneState {
                action: Action::Create,
                status,
                serial: self.zone.serial,
            },
            _ => ZoneState {
                action: self.zone.action,
                status,
                serial: self.zone.serial,
            },
        };

        if status == Status::Success {
            info!(
                zone = %self.zone.name,
                consensus_serial = result.consensus_serial,
                positives = result.positives,
                total = result.total(),
                "Zone propagated"
            );
        } else {
            warn!(
                zone = %self.zone.name,
                status = %status,
                serial = self.zone.serial,
                positives = result.positives,
                no_zones = result.no_zones,
                total = result.total(),
                threshold = config.threshold_percentage,
                "Zone did not reach propagation threshold"
            );
        }

        let reported = UpdateStatus::new(
            Arc::clone(&self.env.central),
            self.ctx.clone(),
            &self.zone.id,
            &self.zone.name,
            state,
        )
        .run()
        .await?;

        Ok(StageOutcome {
            success: status == Status::Success,
            state: reported,
        })
    }
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod poller_tests;
