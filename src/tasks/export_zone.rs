// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Quota-gated zone export.

use super::Task;
use crate::api::{CentralApi, Quota, RecordsetCriterion, Storage};
use crate::config::TaskConfig;
use crate::constants::{
    EXPORT_LOCATION_PREFIX, EXPORT_MESSAGE_NO_METHOD, EXPORT_MESSAGE_TOO_LARGE,
    QUOTA_RESOURCE_EXPORT_SIZE,
};
use crate::errors::{Result, WorkerError};
use crate::metrics;
use crate::zone::{ExportStatus, RequestContext, ZoneExport};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Check the zone's recordset count against the tenant's export quota, then
/// mark the export `COMPLETE` (synchronous exports) or `ERROR`, and persist
/// the result through Central.
pub struct ExportZone {
    storage: Arc<dyn Storage>,
    central: Arc<dyn CentralApi>,
    quota: Arc<dyn Quota>,
    config: Arc<TaskConfig>,
    ctx: RequestContext,
    export: ZoneExport,
}

impl ExportZone {
    #[must_use]
    pub fn new(
        storage: Arc<dyn Storage>,
        central: Arc<dyn CentralApi>,
        quota: Arc<dyn Quota>,
        config: Arc<TaskConfig>,
        ctx: RequestContext,
        export: ZoneExport,
    ) -> Self {
        Self {
            storage,
            central,
            quota,
            config,
            ctx,
            export,
        }
    }

    async fn within_quota(&self) -> Result<bool> {
        let count = self
            .storage
            .count_recordsets(
                &self.ctx,
                &RecordsetCriterion {
                    zone_id: Some(self.export.zone_id.clone()),
                },
            )
            .await?;

        match self
            .quota
            .limit_check(
                &self.ctx,
                &self.export.tenant_id,
                QUOTA_RESOURCE_EXPORT_SIZE,
                count,
            )
            .await
        {
            Ok(()) => Ok(true),
            Err(WorkerError::OverQuota { .. }) => {
                warn!(
                    zone_id = %self.export.zone_id,
                    recordsets = count,
                    "Zone exceeds the export size quota"
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Task for ExportZone {
    type Output = ZoneExport;

    fn describe(&self) -> String {
        format!("ExportZone({} for zone {})", self.export.id, self.export.zone_id)
    }

    /// # Errors
    ///
    /// Storage, quota (other than `OverQuota`) and Central failures.
    async fn run(&self) -> Result<ZoneExport> {
        let mut export = self.export.clone();

        if !self.within_quota().await? {
            export.status = ExportStatus::Error;
            export.message = Some(EXPORT_MESSAGE_TOO_LARGE.to_string());
        } else if self.config.export_synchronous {
            export.status = ExportStatus::Complete;
            export.location = Some(format!("{EXPORT_LOCATION_PREFIX}/{}/export", export.id));
        } else {
            export.status = ExportStatus::Error;
            export.message = Some(EXPORT_MESSAGE_NO_METHOD.to_string());
        }

        let export = self.central.update_zone_export(&self.ctx, &export).await?;
        metrics::record_export(export.status);
        info!(
            export_id = %export.id,
            zone_id = %export.zone_id,
            status = ?export.status,
            "Zone export finished"
        );
        Ok(export)
    }
}

#[cfg(test)]
#[path = "export_zone_tests.rs"]
mod export_zone_tests;
