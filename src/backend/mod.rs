// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Backends apply zone actions to the DNS server behind a pool target.
//!
//! Every pool target has a `type` naming its backend and a free-form option
//! map. [`from_definition`] turns a [`TargetDefinition`] into a live backend:
//!
//! - `fake` - accepts every action; used for development pools and tests
//! - `bind9` - drives a BIND9 server through its bindcar HTTP sidecar
//!
//! Backends are shared between concurrent zone actions and must not hold
//! per-zone state.

pub mod bind9;
pub mod fake;

use crate::constants::{BACKEND_TYPE_BIND9, BACKEND_TYPE_FAKE};
use crate::errors::{Result, WorkerError};
use crate::zone::{PoolTarget, RequestContext, TargetDefinition, Zone, ZoneParams};
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

pub use bind9::Bind9Backend;
pub use fake::FakeBackend;

/// Applies zone actions to one DNS server.
#[async_trait]
pub trait Backend: Send + Sync + Debug {
    /// Backend type name, as used in pool target definitions.
    fn name(&self) -> &str;

    /// Make the server start serving `zone`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Backend`] if the server rejects the zone or cannot be reached.
    async fn create_zone(&self, ctx: &RequestContext, zone: &Zone) -> Result<()>;

    /// Make the server pick up the latest version of `zone`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Backend`] on failure.
    async fn update_zone(&self, ctx: &RequestContext, zone: &Zone) -> Result<()>;

    /// Make the server stop serving `zone`. Deleting a missing zone succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Backend`] on failure.
    async fn delete_zone(&self, ctx: &RequestContext, zone: &Zone, params: &ZoneParams)
        -> Result<()>;

    /// Name of the catalog zone this server publishes, if any.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::CatalogZoneNotFound`] when the backend has no catalog zone.
    async fn catalog_zone(&self, _ctx: &RequestContext) -> Result<String> {
        Err(WorkerError::CatalogZoneNotFound {
            target: self.name().to_string(),
        })
    }
}

/// Instantiate the backend described by `definition`.
///
/// # Errors
///
/// Returns [`WorkerError::UnknownBackend`] for unsupported types, or
/// [`WorkerError::InvalidTargetOptions`] if the backend rejects its options.
pub fn from_definition(definition: &TargetDefinition) -> Result<Arc<dyn Backend>> {
    match definition.target_type.as_str() {
        BACKEND_TYPE_FAKE => Ok(Arc::new(FakeBackend::new(&definition.id))),
        BACKEND_TYPE_BIND9 => Ok(Arc::new(Bind9Backend::from_options(
            &definition.id,
            &definition.options,
        )?)),
        other => Err(WorkerError::UnknownBackend {
            target: definition.id.clone(),
            backend_type: other.to_string(),
        }),
    }
}

/// Build a [`PoolTarget`] from its definition, attaching the backend.
///
/// # Errors
///
/// See [`from_definition`].
pub fn build_target(definition: &TargetDefinition) -> Result<PoolTarget> {
    Ok(PoolTarget {
        id: definition.id.clone(),
        target_type: definition.target_type.clone(),
        backend: from_definition(definition)?,
        options: definition.options.clone(),
    })
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
