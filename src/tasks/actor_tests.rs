// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `actor.rs`

#[cfg(test)]
mod tests {
    use crate::errors::WorkerError;
    use crate::tasks::test_support::{
        env, pool, target, test_config, zone, MockBackend, MockCentral, MockTransport,
    };
    use crate::tasks::{Task, ZoneActor};
    use crate::zone::{Action, RequestContext, Status, ZoneParams};

    #[tokio::test]
    async fn test_all_targets_succeed() {
        let central = MockCentral::new();
        let transport = MockTransport::new();
        let (b1, b2) = (MockBackend::ok(), MockBackend::ok());

        let outcome = ZoneActor::new(
            env(test_config(), &central, &transport),
            RequestContext::admin(),
            pool(vec![target("t1", &b1), target("t2", &b2)], &[]),
            zone(Action::Create, 5),
            ZoneParams::default(),
        )
        .run()
        .await
        .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.state.action, Action::Create);
        assert_eq!(outcome.state.status, Status::Pending);
        assert_eq!(b1.calls() + b2.calls(), 2);
        assert!(central.updates().is_empty(), "success is reported by the poller");
    }

    #[tokio::test]
    async fn test_below_threshold_reports_error_and_keeps_action() {
        let central = MockCentral::new();
        let transport = MockTransport::new();
        let (good, bad) = (MockBackend::ok(), MockBackend::failing());

        let outcome = ZoneActor::new(
            env(test_config(), &central, &transport),
            RequestContext::admin(),
            pool(vec![target("t1", &good), target("t2", &bad)], &[]),
            zone(Action::Update, 5),
            ZoneParams::default(),
        )
        .run()
        .await
        .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.state.status, Status::Error);
        assert_eq!(outcome.state.action, Action::Update);
        let update = central.last_update().unwrap();
        assert_eq!(update.status, Status::Error);
        assert_eq!(update.action, Action::Update);
        assert_eq!(update.serial, 5);
    }

    #[tokio::test]
    async fn test_partial_success_meets_lower_threshold() {
        let central = MockCentral::new();
        let transport = MockTransport::new();
        let mut config = test_config();
        config.threshold_percentage = 50;
        let (good, bad) = (MockBackend::ok(), MockBackend::failing());

        let outcome = ZoneActor::new(
            env(config, &central, &transport),
            RequestContext::admin(),
            pool(vec![target("t1", &good), target("t2", &bad)], &[]),
            zone(Action::Update, 5),
            ZoneParams::default(),
        )
        .run()
        .await
        .unwrap();

        assert!(outcome.success);
    }

    #[tokio::test]
    async fn test_failed_delete_is_reported_as_error() {
        let central = MockCentral::new();
        let transport = MockTransport::new();
        let bad = MockBackend::failing();

        let outcome = ZoneActor::new(
            env(test_config(), &central, &transport),
            RequestContext::admin(),
            pool(vec![target("t1", &bad)], &[]),
            zone(Action::Delete, 5),
            ZoneParams::default(),
        )
        .run()
        .await
        .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.state.action, Action::Delete);
        assert_eq!(outcome.state.status, Status::Error);
    }

    #[tokio::test]
    async fn test_empty_pool_does_not_succeed() {
        let central = MockCentral::new();
        let transport = MockTransport::new();

        let outcome = ZoneActor::new(
            env(test_config(), &central, &transport),
            RequestContext::admin(),
            pool(vec![], &[]),
            zone(Action::Create, 5),
            ZoneParams::default(),
        )
        .run()
        .await
        .unwrap();

        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn test_invalid_action_fails_fast() {
        let central = MockCentral::new();
        let transport = MockTransport::new();
        let backend = MockBackend::ok();

        let err = ZoneActor::new(
            env(test_config(), &central, &transport),
            RequestContext::admin(),
            pool(vec![target("t1", &backend)], &[]),
            zone(Action::None, 5),
            ZoneParams::default(),
        )
        .run()
        .await
        .unwrap_err();

        assert!(matches!(err, WorkerError::InvalidAction { .. }));
        assert!(err.is_contract_violation());
        assert_eq!(backend.calls(), 0);
        assert!(central.updates().is_empty());
    }
}
