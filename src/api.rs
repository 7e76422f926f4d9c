// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Interfaces of the services the worker collaborates with.
//!
//! - [`Storage`] - relational zone store (read side, used by recovery and export)
//! - [`CentralApi`] - owner of zone metadata; persists statuses and serves pools
//! - [`WorkerApi`] - RPC client of the worker itself, used to re-dispatch work
//! - [`Quota`] - per-tenant limits
//!
//! Implementations live with the owning process; this crate only consumes them.

use crate::errors::Result;
use crate::zone::{Action, PoolDefinition, RequestContext, Status, Zone, ZoneExport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Filter for [`Storage::find_zones`]. Unset fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ZoneCriterion {
    /// `shard BETWEEN begin,end`
    pub shard: Option<RangeInclusive<u16>>,
    /// `serial < value`
    pub serial_below: Option<u32>,
    pub status: Option<Status>,
    pub action: Option<Action>,
    pub id: Option<String>,
    pub pool_id: Option<String>,
}

impl ZoneCriterion {
    /// Zones with a shard in `[begin, end]`.
    #[must_use]
    pub fn shard_range(begin: u16, end: u16) -> Self {
        Self {
            shard: Some(begin..=end),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_serial_below(mut self, serial: u32) -> Self {
        self.serial_below = Some(serial);
        self
    }

    /// Evaluate the criterion against a zone, for stores that filter in memory.
    #[must_use]
    pub fn matches(&self, zone: &Zone) -> bool {
        self.shard.as_ref().map_or(true, |r| r.contains(&zone.shard))
            && self.serial_below.map_or(true, |s| zone.serial < s)
            && self.status.map_or(true, |s| zone.status == s)
            && self.action.map_or(true, |a| zone.action == a)
            && self.id.as_ref().map_or(true, |id| &zone.id == id)
            && self.pool_id.as_ref().map_or(true, |p| &zone.pool_id == p)
    }
}

/// Filter for [`Storage::count_recordsets`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordsetCriterion {
    pub zone_id: Option<String>,
}

/// Sort order for [`Storage::find_zones`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
    #[default]
    CreatedAt,
    Serial,
    Shard,
}

/// Read/write access to the zone store.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Find zones matching `criterion`.
    async fn find_zones(
        &self,
        ctx: &RequestContext,
        criterion: &ZoneCriterion,
        limit: Option<usize>,
        sort: Option<SortKey>,
    ) -> Result<Vec<Zone>>;

    /// Fetch one zone by id.
    async fn get_zone(&self, ctx: &RequestContext, zone_id: &str) -> Result<Zone>;

    /// Persist a zone.
    async fn update_zone(&self, ctx: &RequestContext, zone: &Zone) -> Result<Zone>;

    /// Count recordsets matching `criterion`.
    async fn count_recordsets(
        &self,
        ctx: &RequestContext,
        criterion: &RecordsetCriterion,
    ) -> Result<u64>;
}

/// The central coordinator. Calls may fail with [`WorkerError::Timeout`](crate::errors::WorkerError::Timeout).
#[async_trait]
pub trait CentralApi: Send + Sync {
    /// Persist the outcome of a zone action.
    async fn update_status(
        &self,
        ctx: &RequestContext,
        zone_id: &str,
        status: Status,
        serial: u32,
        action: Action,
    ) -> Result<()>;

    /// Persist the outcome of a zone export.
    async fn update_zone_export(
        &self,
        ctx: &RequestContext,
        export: &ZoneExport,
    ) -> Result<ZoneExport>;

    /// Fetch a pool definition.
    ///
    /// Fails with [`WorkerError::PoolNotFound`](crate::errors::WorkerError::PoolNotFound)
    /// if Central does not know the pool.
    async fn get_pool(&self, ctx: &RequestContext, pool_id: &str) -> Result<PoolDefinition>;
}

/// RPC client of the worker service, used by recovery to re-dispatch actions.
#[async_trait]
pub trait WorkerApi: Send + Sync {
    async fn create_zone(&self, ctx: &RequestContext, zone: &Zone) -> Result<()>;
    async fn update_zone(&self, ctx: &RequestContext, zone: &Zone) -> Result<()>;
    async fn delete_zone(&self, ctx: &RequestContext, zone: &Zone) -> Result<()>;
}

/// Tenant quota enforcement.
#[async_trait]
pub trait Quota: Send + Sync {
    /// Check `value` against the tenant's limit for `resource`.
    ///
    /// Fails with [`WorkerError::OverQuota`](crate::errors::WorkerError::OverQuota)
    /// when the limit is exceeded.
    async fn limit_check(
        &self,
        ctx: &RequestContext,
        tenant_id: &str,
        resource: &str,
        value: u64,
    ) -> Result<()>;
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod api_tests;
