// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The zone task graph.
//!
//! ```text
//! ZoneAction
//!   ├── ZoneActor ──► ZoneActionOnTarget (one per pool target, via Executor)
//!   │                   └── SendNotify (target, then catalog zone)
//!   ├── sleep(delay)
//!   └── ZonePoller ─► PollForZone (one per nameserver, via Executor)
//!                      └── UpdateStatus ──► Central
//! RecoverShard ──► WorkerApi (re-dispatch stuck zones)
//! ExportZone  ──► Quota, Central
//! ```
//!
//! Every stage is a struct implementing [`Task`]. Stages never mutate a shared
//! zone: they return a [`ZoneState`] (inside a [`StageOutcome`]) and
//! [`ZoneAction`] threads it into the next stage.
//!
//! Leaf tasks (per target, per nameserver) are fanned out through the
//! [`Executor`]; orchestration tasks await their children directly and do not
//! occupy an executor permit while waiting.

pub mod actor;
pub mod export_zone;
pub mod poller;
pub mod recover_shard;
pub mod target;
pub mod update_status;
pub mod zone_action;

#[cfg(test)]
pub(crate) mod test_support;

use crate::api::CentralApi;
use crate::config::TaskConfig;
use crate::dns::DnsTransport;
use crate::errors::Result;
use crate::executor::Executor;
use crate::zone::ZoneState;
use async_trait::async_trait;
use std::sync::Arc;

pub use actor::ZoneActor;
pub use export_zone::ExportZone;
pub use poller::{classify, parse_query_results, DnsQueryResult, PollForZone, ZonePoller};
pub use recover_shard::RecoverShard;
pub use target::{SendNotify, ZoneActionOnTarget};
pub use update_status::{normalize, UpdateStatus};
pub use zone_action::ZoneAction;

/// A unit of work with its dependencies captured at construction.
#[async_trait]
pub trait Task: Send + Sync + 'static {
    type Output: Send + 'static;

    /// Short human readable description for logs.
    fn describe(&self) -> String;

    /// Execute the task.
    ///
    /// # Errors
    ///
    /// Task specific. Most tasks fold operational failures into their output
    /// and only return errors for contract violations.
    async fn run(&self) -> Result<Self::Output>;
}

/// Handles shared by every task of one service.
#[derive(Clone)]
pub struct TaskEnv {
    pub executor: Executor,
    pub config: Arc<TaskConfig>,
    pub central: Arc<dyn CentralApi>,
    pub transport: Arc<dyn DnsTransport>,
}

/// Result of an orchestration stage: whether it succeeded, and the zone
/// state it leaves behind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageOutcome {
    pub success: bool,
    pub state: ZoneState,
}

/// `part` as a whole-number percentage of `whole`, rounded down.
///
/// An empty `whole` is 0%.
#[must_use]
pub fn percentage(part: usize, whole: usize) -> u64 {
    if whole == 0 {
        return 0;
    }
    (part as u64).saturating_mul(100) / whole as u64
}

/// Whether `part / whole >= threshold / 100`, computed without rounding.
///
/// An empty `whole` only meets a threshold of zero.
#[must_use]
pub fn threshold_met(part: usize, whole: usize, threshold_percentage: u8) -> bool {
    if whole == 0 {
        return threshold_percentage == 0;
    }
    (part as u128) * 100 >= u128::from(threshold_percentage) * whole as u128
}
