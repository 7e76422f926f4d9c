// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the zone worker.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// DNS Protocol Constants
// ============================================================================

/// Standard DNS port for SOA queries and NOTIFY messages
pub const DNS_PORT: u16 = 53;

/// Lowest shard a zone can be assigned to
pub const MIN_SHARD: u16 = 0;

/// Highest shard a zone can be assigned to (shards are 12 bits wide)
pub const MAX_SHARD: u16 = 4095;

// ============================================================================
// Task Tunable Defaults
// ============================================================================

/// Percentage of targets/nameservers that must agree for an action to succeed
pub const DEFAULT_THRESHOLD_PERCENTAGE: u8 = 100;

/// Timeout for a single SOA query or NOTIFY (30 seconds)
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

/// Interval between retries of a backend action or a poll round (15 seconds)
pub const DEFAULT_POLL_RETRY_INTERVAL_SECS: u64 = 15;

/// Maximum number of backend action attempts and poll rounds
pub const DEFAULT_POLL_MAX_RETRIES: u32 = 10;

/// Wait between pushing a zone to the targets and the first poll round (5 seconds)
pub const DEFAULT_POLL_DELAY_SECS: u64 = 5;

/// Size of the executor's worker pool
pub const DEFAULT_WORKER_THREADS: usize = 200;

// ============================================================================
// Periodic Work Constants
// ============================================================================

/// Interval of the shard recovery sweep (2 minutes)
pub const DEFAULT_RECOVERY_INTERVAL_SECS: u64 = 120;

/// Upper bound on the back-off between attempts to load a pool from Central (5 seconds)
pub const DEFAULT_POOL_LOAD_RETRY_INTERVAL_SECS: u64 = 5;

/// Initial back-off when loading a pool from Central fails (500ms)
pub const POOL_LOAD_INITIAL_INTERVAL_MILLIS: u64 = 500;

// ============================================================================
// Export Constants
// ============================================================================

/// Quota resource name checked before a synchronous export
pub const QUOTA_RESOURCE_EXPORT_SIZE: &str = "api_export_size";

/// Location prefix of a completed synchronous export
pub const EXPORT_LOCATION_PREFIX: &str = "zone-worker://v2/zones/tasks/exports";

/// Export message when the zone exceeds the export size quota
pub const EXPORT_MESSAGE_TOO_LARGE: &str = "Zone is too large to export";

/// Export message when no export method is available
pub const EXPORT_MESSAGE_NO_METHOD: &str = "No suitable method for export";

// ============================================================================
// Backend Constants
// ============================================================================

/// Backend type name for the no-op backend
pub const BACKEND_TYPE_FAKE: &str = "fake";

/// Backend type name for BIND9 servers managed through the bindcar HTTP API
pub const BACKEND_TYPE_BIND9: &str = "bind9";

/// Target option holding the NOTIFY/query host
pub const OPTION_HOST: &str = "host";

/// Target option holding the NOTIFY/query port
pub const OPTION_PORT: &str = "port";

/// Target option holding the bindcar API endpoint
pub const OPTION_API_ENDPOINT: &str = "api_endpoint";

/// Target option holding the bindcar API token
pub const OPTION_API_TOKEN: &str = "api_token";

/// Target option holding the comma separated list of primaries (`ip` or `ip:port`)
pub const OPTION_MASTERS: &str = "masters";

/// Target option naming the catalog zone served by the target
pub const OPTION_CATALOG_ZONE: &str = "catalog_zone";

/// Default TTL written into zones created on a BIND9 target (1 hour)
pub const DEFAULT_ZONE_TTL_SECS: u32 = 3600;
