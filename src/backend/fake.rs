// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Backend that accepts every action without talking to a server.

use super::Backend;
use crate::constants::BACKEND_TYPE_FAKE;
use crate::errors::Result;
use crate::zone::{RequestContext, Zone, ZoneParams};
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone)]
pub struct FakeBackend {
    target_id: String,
}

impl FakeBackend {
    #[must_use]
    pub fn new(target_id: &str) -> Self {
        Self {
            target_id: target_id.to_string(),
        }
    }
}

#[async_trait]
impl Backend for FakeBackend {
    fn name(&self) -> &str {
        BACKEND_TYPE_FAKE
    }

    async fn create_zone(&self, _ctx: &RequestContext, zone: &Zone) -> Result<()> {
        info!(target_id = %self.target_id, zone = %zone.name, "Create zone (fake backend)");
        Ok(())
    }

    async fn update_zone(&self, _ctx: &RequestContext, zone: &Zone) -> Result<()> {
        info!(target_id = %self.target_id, zone = %zone.name, "Update zone (fake backend)");
        Ok(())
    }

    async fn delete_zone(
        &self,
        _ctx: &RequestContext,
        zone: &Zone,
        params: &ZoneParams,
    ) -> Result<()> {
        info!(
            target_id = %self.target_id,
            zone = %zone.name,
            hard_delete = params.hard_delete,
            "Delete zone (fake backend)"
        );
        Ok(())
    }
}
