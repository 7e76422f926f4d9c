// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # zone-worker - DNS zone propagation engine
//!
//! zone-worker pushes zone changes to the DNS servers of a pool, then polls
//! the pool's nameservers until enough of them serve the new SOA serial, and
//! reports the outcome back to the control plane.
//!
//! ## Overview
//!
//! - Push a CREATE, UPDATE or DELETE to every pool target through its backend
//! - Wait, then poll the nameservers for the zone's serial
//! - Decide SUCCESS / NO_ZONE / ERROR against a percentage threshold
//! - Periodically recover zones left in ERROR or stuck in PENDING
//!
//! ## Modules
//!
//! - [`tasks`] - The zone task graph (actor, poller, status, recovery, export)
//! - [`executor`] - Bounded, order-preserving fan-out of tasks
//! - [`service`] - Entry points, pool cache and per-zone locking
//! - [`backend`] - Backend drivers (`fake`, `bind9` over bindcar)
//! - [`dns`] - SOA queries and NOTIFY over UDP
//! - [`api`] - Collaborator interfaces (storage, Central, worker RPC, quota)
//! - [`zone`] - Zone, pool and export types
//! - [`config`] - Worker configuration
//!
//! ## Example
//!
//! ```rust
//! use zone_worker::tasks::{classify, parse_query_results};
//! use zone_worker::zone::{Action, Status};
//!
//! // Four nameservers polled for serial 2: two current, one without the zone
//! let result = parse_query_results(vec![Some(2), Some(1), Some(0), Some(3)], Action::Update, 2);
//! assert_eq!(result.positives, 2);
//! assert_eq!(result.consensus_serial, 2);
//! assert_eq!(classify(&result, Action::Update, 50), Status::Success);
//! ```

pub mod api;
pub mod backend;
pub mod config;
pub mod constants;
pub mod dns;
pub mod errors;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod retry;
pub mod service;
pub mod tasks;
pub mod zone;
pub mod zone_lock;
