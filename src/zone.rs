// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone, pool and export data types.
//!
//! Zones are owned by Central. The worker only holds a copy for the duration of
//! one orchestration attempt, and reports the outcome back as a [`ZoneState`]
//! through the Central API.
//!
//! # Example
//!
//! ```rust
//! use zone_worker::zone::{Action, Status, Zone};
//!
//! let zone = Zone::new("b1a0", "example.com.", "default", Action::Create);
//! assert_eq!(zone.status, Status::Pending);
//! assert!(zone.shard <= 4095);
//! ```

use crate::backend::Backend;
use crate::constants::{DNS_PORT, MAX_SHARD, OPTION_HOST, OPTION_PORT};
use crate::errors::{Result, WorkerError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// The pending change Central wants applied to a zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Create,
    Update,
    Delete,
    #[default]
    None,
}

impl Action {
    /// Returns true for the actions the task graph knows how to perform.
    #[must_use]
    pub fn is_crud(self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }

    /// Lowercase label used in metrics.
    #[must_use]
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::None => "none",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::None => "NONE",
        };
        f.write_str(s)
    }
}

/// Propagation status of a zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Pending,
    Success,
    Error,
    NoZone,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
            Self::NoZone => "NO_ZONE",
        };
        f.write_str(s)
    }
}

/// The orchestration fields of a zone, as passed between task stages.
///
/// Each stage receives the latest state and returns a new one; nothing is
/// mutated behind the caller's back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneState {
    pub action: Action,
    pub status: Status,
    pub serial: u32,
}

/// A DNS zone as tracked by the control plane.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Opaque identifier
    pub id: String,
    /// Fully qualified name, with trailing dot
    pub name: String,
    /// Pool the zone is served from
    pub pool_id: String,
    /// Owning tenant
    #[serde(default)]
    pub tenant_id: String,
    /// SOA RNAME in mailbox form
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    #[serde(default = "default_refresh")]
    pub refresh: u32,
    #[serde(default = "default_retry")]
    pub retry: u32,
    #[serde(default = "default_expire")]
    pub expire: u32,
    #[serde(default = "default_minimum")]
    pub minimum: u32,
    /// SOA serial; generated from wall-clock seconds by [`increment_serial`]
    #[serde(default)]
    pub serial: u32,
    #[serde(default)]
    pub action: Action,
    #[serde(default)]
    pub status: Status,
    /// Bucket used to partition periodic work, `0..=4095`
    #[serde(default)]
    pub shard: u16,
}

fn default_ttl() -> u32 {
    3600
}

fn default_refresh() -> u32 {
    3600
}

fn default_retry() -> u32 {
    600
}

fn default_expire() -> u32 {
    86400
}

fn default_minimum() -> u32 {
    3600
}

impl Zone {
    /// Create a pending zone with default SOA timers and a shard derived from its id.
    #[must_use]
    pub fn new(id: &str, name: &str, pool_id: &str, action: Action) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            pool_id: pool_id.to_string(),
            tenant_id: String::new(),
            email: String::new(),
            ttl: default_ttl(),
            refresh: default_refresh(),
            retry: default_retry(),
            expire: default_expire(),
            minimum: default_minimum(),
            serial: 0,
            action,
            status: Status::Pending,
            shard: shard_for(id),
        }
    }

    /// The orchestration fields of this zone.
    #[must_use]
    pub fn state(&self) -> ZoneState {
        ZoneState {
            action: self.action,
            status: self.status,
            serial: self.serial,
        }
    }

    /// A copy of this zone carrying `state`.
    #[must_use]
    pub fn with_state(&self, state: ZoneState) -> Self {
        Self {
            action: state.action,
            status: state.status,
            serial: state.serial,
            ..self.clone()
        }
    }
}

/// Generate the next serial for a zone.
///
/// Serials track wall-clock seconds so that they double as a coarse
/// "last changed" timestamp; the result is always strictly greater than
/// `serial` (modulo 2^32).
#[must_use]
pub fn increment_serial(serial: u32) -> u32 {
    let now = u32::try_from(chrono::Utc::now().timestamp()).unwrap_or(u32::MAX);
    now.max(serial.wrapping_add(1))
}

/// Assign a shard to a zone id.
///
/// Stable across processes: the shard is the top 12 bits of the FNV-1a hash
/// of the id.
#[must_use]
pub fn shard_for(zone_id: &str) -> u16 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in zone_id.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    #[allow(clippy::cast_possible_truncation)]
    let shard = (hash >> 20) as u16;
    shard.min(MAX_SHARD)
}

/// Extra parameters forwarded to backends with a zone action.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneParams {
    /// Remove the zone from the backend even if it keeps soft-deleted copies
    #[serde(default)]
    pub hard_delete: bool,
}

/// Per-request context passed through to every collaborator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub tenant_id: String,
    /// Operate across all tenants (administrative context)
    #[serde(default)]
    pub all_tenants: bool,
}

impl RequestContext {
    /// An administrative context for internally triggered work.
    #[must_use]
    pub fn admin() -> Self {
        Self {
            request_id: String::new(),
            tenant_id: String::new(),
            all_tenants: true,
        }
    }
}

/// A nameserver polled for the zone's SOA serial.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nameserver {
    pub host: String,
    #[serde(default = "default_dns_port")]
    pub port: u16,
}

/// An unmanaged server that still receives NOTIFY messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlsoNotify {
    pub host: String,
    #[serde(default = "default_dns_port")]
    pub port: u16,
}

fn default_dns_port() -> u16 {
    DNS_PORT
}

/// Where a NOTIFY message is sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotifyTarget {
    pub host: String,
    pub port: u16,
}

impl From<&AlsoNotify> for NotifyTarget {
    fn from(also_notify: &AlsoNotify) -> Self {
        Self {
            host: also_notify.host.clone(),
            port: also_notify.port,
        }
    }
}

/// A pool target as Central describes it; no backend attached yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub target_type: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl TargetDefinition {
    /// The NOTIFY address of this target, from its `host`/`port` options.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::InvalidTargetOptions`] if `host` is missing or
    /// `port` is not a valid port number.
    pub fn notify_target(&self) -> Result<NotifyTarget> {
        let host = self
            .options
            .get(OPTION_HOST)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| WorkerError::InvalidTargetOptions {
                target: self.id.clone(),
                reason: format!("missing '{OPTION_HOST}' option"),
            })?;

        let port = match self.options.get(OPTION_PORT) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| WorkerError::InvalidTargetOptions {
                    target: self.id.clone(),
                    reason: format!("invalid '{OPTION_PORT}' option '{raw}': {e}"),
                })?,
            None => DNS_PORT,
        };

        Ok(NotifyTarget {
            host: host.clone(),
            port,
        })
    }
}

/// A pool as Central describes it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolDefinition {
    pub id: String,
    #[serde(default)]
    pub targets: Vec<TargetDefinition>,
    #[serde(default)]
    pub nameservers: Vec<Nameserver>,
    #[serde(default)]
    pub also_notifies: Vec<AlsoNotify>,
}

/// One backend-managed DNS server in a pool.
#[derive(Clone, Debug)]
pub struct PoolTarget {
    pub id: String,
    pub target_type: String,
    pub backend: Arc<dyn Backend>,
    pub options: BTreeMap<String, String>,
}

impl PoolTarget {
    /// The NOTIFY address of this target.
    ///
    /// # Errors
    ///
    /// See [`TargetDefinition::notify_target`].
    pub fn notify_target(&self) -> Result<NotifyTarget> {
        TargetDefinition {
            id: self.id.clone(),
            target_type: self.target_type.clone(),
            options: self.options.clone(),
        }
        .notify_target()
    }
}

/// A loaded pool. Read-only and shared between concurrent zone actions.
#[derive(Clone, Debug)]
pub struct Pool {
    pub id: String,
    pub targets: Vec<Arc<PoolTarget>>,
    pub nameservers: Vec<Nameserver>,
    pub also_notifies: Vec<AlsoNotify>,
}

/// Status of a zone export.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportStatus {
    #[default]
    Pending,
    Complete,
    Error,
}

impl ExportStatus {
    /// Lowercase label used in metrics.
    #[must_use]
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

/// A request to export a zone.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneExport {
    pub id: String,
    pub zone_id: String,
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub status: ExportStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[cfg(test)]
#[path = "zone_tests.rs"]
mod zone_tests;
