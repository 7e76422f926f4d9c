// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the zone worker.
//!
//! This module provides the error taxonomy shared by tasks, collaborators and
//! the service layer:
//! - Contract violations (an invalid zone action reaching the task graph)
//! - Resource and configuration errors (missing pool, empty pool, quota)
//! - Transport errors from DNS queries, NOTIFY messages and backend calls
//! - Errors reported by external collaborators (storage, Central, worker RPC)
//!
//! Threshold failures are not errors. They surface as an `ERROR` or `NO_ZONE`
//! zone status computed by the tasks.

use crate::zone::Action;
use thiserror::Error;

/// Errors that can occur while orchestrating zone actions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// A task was handed a zone whose action it cannot perform
    ///
    /// This is a caller bug. It is never retried and never converted into a
    /// zone status.
    #[error("Invalid action {action} for zone '{zone}'")]
    InvalidAction {
        /// The zone name
        zone: String,
        /// The offending action
        action: Action,
    },

    /// The pool exists but has no targets to push zones to
    #[error("No targets configured for pool '{pool_id}'")]
    NoPoolTargetsConfigured {
        /// The pool identifier
        pool_id: String,
    },

    /// Central does not know the pool
    #[error("Pool '{pool_id}' not found")]
    PoolNotFound {
        /// The pool identifier
        pool_id: String,
    },

    /// A quota check rejected the operation
    #[error("Quota exceeded for resource '{resource}' (tenant '{tenant_id}', value {value})")]
    OverQuota {
        /// The tenant the quota applies to
        tenant_id: String,
        /// The quota resource name
        resource: String,
        /// The value that was checked
        value: u64,
    },

    /// A network call did not complete in time
    #[error("Timed out after {timeout_ms}ms: {operation}")]
    Timeout {
        /// What was being attempted (e.g. "NOTIFY example.com. to 192.0.2.1:53")
        operation: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// A DNS transport error other than a timeout
    #[error("DNS transport error talking to {server}: {reason}")]
    Transport {
        /// The server (host:port) involved
        server: String,
        /// Reason for the failure
        reason: String,
    },

    /// A backend failed to apply an action to its DNS server
    #[error("Backend '{target}' failed to {action} zone '{zone}': {reason}")]
    Backend {
        /// The pool target identifier
        target: String,
        /// The action being applied
        action: Action,
        /// The zone name
        zone: String,
        /// Reason for the failure
        reason: String,
    },

    /// The target does not expose a catalog zone
    #[error("Catalog zone not found for target '{target}'")]
    CatalogZoneNotFound {
        /// The pool target identifier
        target: String,
    },

    /// A pool target is missing options, or they cannot be parsed
    #[error("Invalid options for target '{target}': {reason}")]
    InvalidTargetOptions {
        /// The pool target identifier
        target: String,
        /// Explanation of what is invalid
        reason: String,
    },

    /// No backend implementation exists for the target type
    #[error("Unknown backend type '{backend_type}' for target '{target}'")]
    UnknownBackend {
        /// The pool target identifier
        target: String,
        /// The configured backend type
        backend_type: String,
    },

    /// Another action for the same zone is still in flight
    #[error("Zone '{zone_id}' already has an action in progress")]
    ZoneBusy {
        /// The zone identifier
        zone_id: String,
    },

    /// Storage lookup or update failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Central rejected or failed a call
    #[error("Central API error: {0}")]
    Central(String),

    /// A worker RPC call failed
    #[error("Worker API error: {0}")]
    Rpc(String),

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl WorkerError {
    /// Returns true if this error is transient and the operation may be retried.
    ///
    /// Transient errors include timeouts, transport and backend failures, and a
    /// pool that Central does not know yet. Contract violations, quota and
    /// configuration errors are permanent.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. }
            | Self::Transport { .. }
            | Self::Backend { .. }
            | Self::PoolNotFound { .. }
            | Self::ZoneBusy { .. }
            | Self::Storage(_)
            | Self::Central(_)
            | Self::Rpc(_) => true,

            Self::InvalidAction { .. }
            | Self::NoPoolTargetsConfigured { .. }
            | Self::OverQuota { .. }
            | Self::CatalogZoneNotFound { .. }
            | Self::InvalidTargetOptions { .. }
            | Self::UnknownBackend { .. }
            | Self::InvalidConfig(_) => false,
        }
    }

    /// Returns true if this error indicates a bug in the caller.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::InvalidAction { .. })
    }

    /// Returns a short, stable label for this error, used in logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAction { .. } => "InvalidAction",
            Self::NoPoolTargetsConfigured { .. } => "NoPoolTargetsConfigured",
            Self::PoolNotFound { .. } => "PoolNotFound",
            Self::OverQuota { .. } => "OverQuota",
            Self::Timeout { .. } => "Timeout",
            Self::Transport { .. } => "Transport",
            Self::Backend { .. } => "Backend",
            Self::CatalogZoneNotFound { .. } => "CatalogZoneNotFound",
            Self::InvalidTargetOptions { .. } => "InvalidTargetOptions",
            Self::UnknownBackend { .. } => "UnknownBackend",
            Self::ZoneBusy { .. } => "ZoneBusy",
            Self::Storage(_) => "Storage",
            Self::Central(_) => "Central",
            Self::Rpc(_) => "Rpc",
            Self::InvalidConfig(_) => "InvalidConfig",
        }
    }
}

/// Convenience alias for results carrying a [`WorkerError`].
pub type Result<T, E = WorkerError> = std::result::Result<T, E>;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
