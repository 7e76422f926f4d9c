// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Report the final state of a zone action to Central.

use super::Task;
use crate::api::CentralApi;
use crate::errors::Result;
use crate::metrics;
use crate::zone::{Action, RequestContext, Status, ZoneState};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Map a stage's state to the terminal pair Central stores.
///
/// - a DELETE that did not fail becomes `NONE`/`NO_ZONE`
/// - any other SUCCESS clears the action
/// - everything else (ERROR keeps its action for a later retry) is unchanged
#[must_use]
pub fn normalize(state: ZoneState) -> ZoneState {
    if state.action == Action::Delete && state.status != Status::Error {
        ZoneState {
            action: Action::None,
            status: Status::NoZone,
            ..state
        }
    } else if state.status == Status::Success {
        ZoneState {
            action: Action::None,
            ..state
        }
    } else {
        state
    }
}

pub struct UpdateStatus {
    central: Arc<dyn CentralApi>,
    ctx: RequestContext,
    zone_id: String,
    zone_name: String,
    state: ZoneState,
}

impl UpdateStatus {
    #[must_use]
    pub fn new(
        central: Arc<dyn CentralApi>,
        ctx: RequestContext,
        zone_id: &str,
        zone_name: &str,
        state: ZoneState,
    ) -> Self {
        Self {
            central,
            ctx,
            zone_id: zone_id.to_string(),
            zone_name: zone_name.to_string(),
            state,
        }
    }
}

#[async_trait]
impl Task for UpdateStatus {
    type Output = ZoneState;

    fn describe(&self) -> String {
        format!("UpdateStatus({})", self.zone_name)
    }

    /// Returns the normalized state. A failed report is logged and not retried.
    async fn run(&self) -> Result<ZoneState> {
        let state = normalize(self.state);

        info!(
            zone = %self.zone_name,
            zone_id = %self.zone_id,
            action = %state.action,
            status = %state.status,
            serial = state.serial,
            "Reporting zone status"
        );

        if let Err(e) = self
            .central
            .update_status(
                &self.ctx,
                &self.zone_id,
                state.status,
                state.serial,
                state.action,
            )
            .await
        {
            warn!(
                zone = %self.zone_name,
                zone_id = %self.zone_id,
                error = %e,
                "Failed to report zone status to Central"
            );
            metrics::record_error("update_status", e.kind());
        }

        Ok(state)
    }
}

#[cfg(test)]
#[path = "update_status_tests.rs"]
mod update_status_tests;
