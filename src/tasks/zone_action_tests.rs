// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `zone_action.rs`

#[cfg(test)]
mod tests {
    use crate::errors::WorkerError;
    use crate::tasks::test_support::{
        env, pool, target, test_config, zone, Answer, MockBackend, MockCentral, MockTransport,
    };
    use crate::tasks::{Task, ZoneAction};
    use crate::zone::{Action, RequestContext, Status, ZoneParams};
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_failed_push_short_circuits() {
        let central = MockCentral::new();
        let transport = MockTransport::new();
        let mut config = test_config();
        config.delay = Duration::from_secs(30);
        let backend = MockBackend::failing();

        let started = Instant::now();
        let outcome = ZoneAction::new(
            env(config, &central, &transport),
            RequestContext::admin(),
            pool(vec![target("t1", &backend)], &["ns1", "ns2"]),
            zone(Action::Update, 10),
            ZoneParams::default(),
        )
        .run()
        .await
        .unwrap();

        assert!(!outcome.success);
        assert_eq!(transport.serial_calls(), 0, "poller must not run");
        assert!(started.elapsed() < Duration::from_secs(5), "no delay after a failed push");
        assert_eq!(central.updates().len(), 1);
        assert_eq!(central.last_update().unwrap().status, Status::Error);
    }

    #[tokio::test]
    async fn test_create_end_to_end() {
        let central = MockCentral::new();
        let transport = MockTransport::new();
        transport.set_serial("ns1", Answer::Serial(10));
        transport.set_serial("ns2", Answer::Serial(10));
        let backend = MockBackend::ok();

        let outcome = ZoneAction::new(
            env(test_config(), &central, &transport),
            RequestContext::admin(),
            pool(vec![target("t1", &backend)], &["ns1", "ns2"]),
            zone(Action::Create, 10),
            ZoneParams::default(),
        )
        .run()
        .await
        .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.state.action, Action::None);
        assert_eq!(outcome.state.status, Status::Success);
        assert_eq!(outcome.state.serial, 10);
        assert_eq!(transport.serial_calls(), 2);
        assert_eq!(central.updates().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_polls_for_serial_zero() {
        let central = MockCentral::new();
        let transport = MockTransport::new();
        transport.set_serial("ns1", Answer::Serial(0));
        let backend = MockBackend::ok();

        // The zone still carries its old serial; DELETE expects 0 on the servers
        let outcome = ZoneAction::new(
            env(test_config(), &central, &transport),
            RequestContext::admin(),
            pool(vec![target("t1", &backend)], &["ns1"]),
            zone(Action::Delete, 12345),
            ZoneParams { hard_delete: true },
        )
        .run()
        .await
        .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.state.action, Action::None);
        assert_eq!(outcome.state.status, Status::NoZone);
        assert_eq!(outcome.state.serial, 0);
    }

    #[tokio::test]
    async fn test_poll_failure_is_the_result() {
        let central = MockCentral::new();
        let transport = MockTransport::new();
        transport.set_serial("ns1", Answer::Serial(9));
        let backend = MockBackend::ok();

        let outcome = ZoneAction::new(
            env(test_config(), &central, &transport),
            RequestContext::admin(),
            pool(vec![target("t1", &backend)], &["ns1"]),
            zone(Action::Update, 10),
            ZoneParams::default(),
        )
        .run()
        .await
        .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.state.status, Status::Error);
        assert_eq!(outcome.state.action, Action::Update);
    }

    #[tokio::test]
    async fn test_invalid_action_is_an_error() {
        let central = MockCentral::new();
        let transport = MockTransport::new();
        let backend = MockBackend::ok();

        let result = ZoneAction::new(
            env(test_config(), &central, &transport),
            RequestContext::admin(),
            pool(vec![target("t1", &backend)], &["ns1"]),
            zone(Action::None, 10),
            ZoneParams::default(),
        )
        .run()
        .await;

        assert!(matches!(result, Err(WorkerError::InvalidAction { .. })));
        assert_eq!(backend.calls(), 0);
        assert_eq!(transport.serial_calls(), 0);
    }
}
