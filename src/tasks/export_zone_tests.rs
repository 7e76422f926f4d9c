// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `export_zone.rs`

#[cfg(test)]
mod tests {
    use crate::api::{CentralApi, Quota, Storage};
    use crate::constants::{
        EXPORT_MESSAGE_NO_METHOD, EXPORT_MESSAGE_TOO_LARGE, QUOTA_RESOURCE_EXPORT_SIZE,
    };
    use crate::tasks::test_support::{test_config, MockCentral, MockQuota, MockStorage};
    use crate::tasks::{ExportZone, Task};
    use crate::zone::{ExportStatus, RequestContext, ZoneExport};
    use std::sync::Arc;

    fn export() -> ZoneExport {
        ZoneExport {
            id: "exp-1".to_string(),
            zone_id: "zone-1".to_string(),
            tenant_id: "tenant-a".to_string(),
            ..ZoneExport::default()
        }
    }

    fn task(
        storage: &Arc<MockStorage>,
        central: &Arc<MockCentral>,
        quota: &Arc<MockQuota>,
        synchronous: bool,
    ) -> ExportZone {
        let mut config = test_config();
        config.export_synchronous = synchronous;
        ExportZone::new(
            Arc::clone(storage) as Arc<dyn Storage>,
            Arc::clone(central) as Arc<dyn CentralApi>,
            Arc::clone(quota) as Arc<dyn Quota>,
            Arc::new(config),
            RequestContext::admin(),
            export(),
        )
    }

    #[tokio::test]
    async fn test_synchronous_export_completes() {
        let storage = MockStorage::with_recordsets(10);
        let central = MockCentral::new();
        let quota = MockQuota::with_limit(100);

        let result = task(&storage, &central, &quota, true).run().await.unwrap();

        assert_eq!(result.status, ExportStatus::Complete);
        assert_eq!(
            result.location.as_deref(),
            Some("zone-worker://v2/zones/tasks/exports/exp-1/export")
        );
        assert_eq!(result.message, None);
        assert_eq!(central.exports.lock().len(), 1);
        assert_eq!(
            *quota.checks.lock(),
            vec![(
                "tenant-a".to_string(),
                QUOTA_RESOURCE_EXPORT_SIZE.to_string(),
                10
            )]
        );
    }

    #[tokio::test]
    async fn test_over_quota_is_reported_not_raised() {
        let storage = MockStorage::with_recordsets(101);
        let central = MockCentral::new();
        let quota = MockQuota::with_limit(100);

        let result = task(&storage, &central, &quota, true).run().await.unwrap();

        assert_eq!(result.status, ExportStatus::Error);
        assert_eq!(result.message.as_deref(), Some(EXPORT_MESSAGE_TOO_LARGE));
        assert_eq!(result.location, None);
        assert_eq!(central.exports.lock()[0].status, ExportStatus::Error);
    }

    #[tokio::test]
    async fn test_asynchronous_export_has_no_method() {
        let storage = MockStorage::with_recordsets(1);
        let central = MockCentral::new();
        let quota = MockQuota::with_limit(100);

        let result = task(&storage, &central, &quota, false).run().await.unwrap();

        assert_eq!(result.status, ExportStatus::Error);
        assert_eq!(result.message.as_deref(), Some(EXPORT_MESSAGE_NO_METHOD));
    }
}
