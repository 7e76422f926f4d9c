// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tests for backend construction and the fake backend.

#[cfg(test)]
mod tests {
    use crate::backend::{build_target, from_definition, Backend, FakeBackend};
    use crate::errors::WorkerError;
    use crate::zone::{Action, RequestContext, TargetDefinition, Zone, ZoneParams};
    use std::collections::BTreeMap;

    fn definition(target_type: &str, options: &[(&str, &str)]) -> TargetDefinition {
        TargetDefinition {
            id: "target-1".to_string(),
            target_type: target_type.to_string(),
            options: options
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_fake_backend_from_definition() {
        let backend = from_definition(&definition("fake", &[])).unwrap();
        assert_eq!(backend.name(), "fake");
    }

    #[test]
    fn test_bind9_backend_from_definition() {
        let backend = from_definition(&definition(
            "bind9",
            &[("api_endpoint", "bind9-api:8080"), ("masters", "192.0.2.1:5354")],
        ))
        .unwrap();
        assert_eq!(backend.name(), "bind9");
    }

    #[test]
    fn test_unknown_backend_type() {
        let err = from_definition(&definition("powerdns", &[])).unwrap_err();
        assert_eq!(
            err,
            WorkerError::UnknownBackend {
                target: "target-1".to_string(),
                backend_type: "powerdns".to_string(),
            }
        );
    }

    #[test]
    fn test_build_target_keeps_options() {
        let target = build_target(&definition("fake", &[("host", "192.0.2.10")])).unwrap();
        assert_eq!(target.id, "target-1");
        assert_eq!(target.notify_target().unwrap().host, "192.0.2.10");
    }

    #[tokio::test]
    async fn test_fake_backend_accepts_everything() {
        let backend = FakeBackend::new("target-1");
        let ctx = RequestContext::admin();
        let zone = Zone::new("z1", "example.com.", "default", Action::Create);

        assert!(backend.create_zone(&ctx, &zone).await.is_ok());
        assert!(backend.update_zone(&ctx, &zone).await.is_ok());
        assert!(backend
            .delete_zone(&ctx, &zone, &ZoneParams::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_default_catalog_zone_is_not_found() {
        let backend = FakeBackend::new("target-1");
        let err = backend
            .catalog_zone(&RequestContext::admin())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::CatalogZoneNotFound { .. }));
    }
}
