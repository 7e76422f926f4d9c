// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory collaborators with call recording, shared by task and service tests.

use crate::api::{
    CentralApi, Quota, RecordsetCriterion, SortKey, Storage, WorkerApi, ZoneCriterion,
};
use crate::backend::Backend;
use crate::config::TaskConfig;
use crate::dns::DnsTransport;
use crate::errors::{Result, WorkerError};
use crate::executor::Executor;
use crate::tasks::TaskEnv;
use crate::zone::{
    Action, Nameserver, Pool, PoolDefinition, PoolTarget, RequestContext, Status, Zone,
    ZoneExport, ZoneParams,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Fast settings: short timeouts, no sleeps, three attempts, 100% threshold.
pub fn test_config() -> TaskConfig {
    TaskConfig {
        threshold_percentage: 100,
        timeout: Duration::from_millis(50),
        retry_interval: Duration::ZERO,
        max_retries: 3,
        delay: Duration::ZERO,
        notify: true,
        export_synchronous: true,
    }
}

pub fn env(
    config: TaskConfig,
    central: &Arc<MockCentral>,
    transport: &Arc<MockTransport>,
) -> TaskEnv {
    TaskEnv {
        executor: Executor::new(8),
        config: Arc::new(config),
        central: Arc::clone(central) as Arc<dyn CentralApi>,
        transport: Arc::clone(transport) as Arc<dyn DnsTransport>,
    }
}

/// A pool target named `id` whose NOTIFY host is `<id>.targets.test`.
pub fn target(id: &str, backend: &Arc<MockBackend>) -> Arc<PoolTarget> {
    let mut options = BTreeMap::new();
    options.insert("host".to_string(), target_host(id));
    Arc::new(PoolTarget {
        id: id.to_string(),
        target_type: "mock".to_string(),
        backend: Arc::clone(backend) as Arc<dyn Backend>,
        options,
    })
}

pub fn target_host(id: &str) -> String {
    format!("{id}.targets.test")
}

pub fn nameserver(host: &str) -> Nameserver {
    Nameserver {
        host: host.to_string(),
        port: 53,
    }
}

pub fn pool(targets: Vec<Arc<PoolTarget>>, nameservers: &[&str]) -> Arc<Pool> {
    Arc::new(Pool {
        id: "default".to_string(),
        targets,
        nameservers: nameservers.iter().map(|h| nameserver(h)).collect(),
        also_notifies: vec![],
    })
}

pub fn zone(action: Action, serial: u32) -> Zone {
    let mut zone = Zone::new("zone-1", "example.com.", "default", action);
    zone.serial = serial;
    zone
}

// ============================================================================
// Central
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusUpdate {
    pub zone_id: String,
    pub status: Status,
    pub serial: u32,
    pub action: Action,
}

#[derive(Default)]
pub struct MockCentral {
    pub status_updates: Mutex<Vec<StatusUpdate>>,
    pub exports: Mutex<Vec<ZoneExport>>,
    pub pools: Mutex<HashMap<String, PoolDefinition>>,
    /// `get_pool` fails with `PoolNotFound` this many times before answering
    pub pool_failures: AtomicUsize,
    pub get_pool_calls: AtomicUsize,
    pub fail_update_status: AtomicBool,
}

impl MockCentral {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_pool(definition: PoolDefinition) -> Arc<Self> {
        let central = Self::default();
        central
            .pools
            .lock()
            .insert(definition.id.clone(), definition);
        Arc::new(central)
    }

    pub fn updates(&self) -> Vec<StatusUpdate> {
        self.status_updates.lock().clone()
    }

    pub fn last_update(&self) -> Option<StatusUpdate> {
        self.status_updates.lock().last().cloned()
    }
}

#[async_trait]
impl CentralApi for MockCentral {
    async fn update_status(
        &self,
        _ctx: &RequestContext,
        zone_id: &str,
        status: Status,
        serial: u32,
        action: Action,
    ) -> Result<()> {
        self.status_updates.lock().push(StatusUpdate {
            zone_id: zone_id.to_string(),
            status,
            serial,
            action,
        });
        if self.fail_update_status.load(Ordering::SeqCst) {
            return Err(WorkerError::Timeout {
                operation: "update_status".to_string(),
                timeout_ms: 0,
            });
        }
        Ok(())
    }

    async fn update_zone_export(
        &self,
        _ctx: &RequestContext,
        export: &ZoneExport,
    ) -> Result<ZoneExport> {
        self.exports.lock().push(export.clone());
        Ok(export.clone())
    }

    async fn get_pool(&self, _ctx: &RequestContext, pool_id: &str) -> Result<PoolDefinition> {
        self.get_pool_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.pool_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.pool_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(WorkerError::PoolNotFound {
                pool_id: pool_id.to_string(),
            });
        }
        self.pools
            .lock()
            .get(pool_id)
            .cloned()
            .ok_or_else(|| WorkerError::PoolNotFound {
                pool_id: pool_id.to_string(),
            })
    }
}

// ============================================================================
// DNS transport
// ============================================================================

/// How a mocked server answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Answer {
    Serial(u32),
    Timeout,
    Fail,
}

pub struct MockTransport {
    serials: Mutex<HashMap<String, Answer>>,
    notifies: Mutex<HashMap<String, Answer>>,
    pub serial_calls: AtomicUsize,
    pub notify_calls: Mutex<Vec<(String, String)>>,
    notify_delay: Mutex<Duration>,
    notifies_in_flight: AtomicUsize,
    /// Most NOTIFY messages in flight at the same time
    pub notify_peak: AtomicUsize,
}

impl MockTransport {
    /// Unknown hosts time out on SOA queries and acknowledge NOTIFY.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            serials: Mutex::new(HashMap::new()),
            notifies: Mutex::new(HashMap::new()),
            serial_calls: AtomicUsize::new(0),
            notify_calls: Mutex::new(Vec::new()),
            notify_delay: Mutex::new(Duration::ZERO),
            notifies_in_flight: AtomicUsize::new(0),
            notify_peak: AtomicUsize::new(0),
        })
    }

    /// Make every NOTIFY take `delay` before it is answered.
    pub fn set_notify_delay(&self, delay: Duration) {
        *self.notify_delay.lock() = delay;
    }

    pub fn set_serial(&self, host: &str, answer: Answer) {
        self.serials.lock().insert(host.to_string(), answer);
    }

    /// Set the NOTIFY answer for a host, or for a zone name on any host.
    pub fn set_notify(&self, key: &str, answer: Answer) {
        self.notifies.lock().insert(key.to_string(), answer);
    }

    pub fn serial_calls(&self) -> usize {
        self.serial_calls.load(Ordering::SeqCst)
    }

    /// `(zone, host)` of every NOTIFY sent.
    pub fn notified(&self) -> Vec<(String, String)> {
        self.notify_calls.lock().clone()
    }

    fn answer(answer: Answer, host: &str, operation: &str) -> Result<u32> {
        match answer {
            Answer::Serial(serial) => Ok(serial),
            Answer::Timeout => Err(WorkerError::Timeout {
                operation: format!("{operation} to {host}"),
                timeout_ms: 50,
            }),
            Answer::Fail => Err(WorkerError::Transport {
                server: host.to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}

#[async_trait]
impl DnsTransport for MockTransport {
    async fn get_serial(
        &self,
        _zone_name: &str,
        host: &str,
        _port: u16,
        _timeout: Duration,
    ) -> Result<u32> {
        self.serial_calls.fetch_add(1, Ordering::SeqCst);
        let answer = self
            .serials
            .lock()
            .get(host)
            .copied()
            .unwrap_or(Answer::Timeout);
        Self::answer(answer, host, "SOA query")
    }

    async fn notify(
        &self,
        zone_name: &str,
        host: &str,
        _port: u16,
        _timeout: Duration,
    ) -> Result<()> {
        self.notify_calls
            .lock()
            .push((zone_name.to_string(), host.to_string()));

        let in_flight = self.notifies_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.notify_peak.fetch_max(in_flight, Ordering::SeqCst);
        let delay = *self.notify_delay.lock();
        tokio::time::sleep(delay).await;
        self.notifies_in_flight.fetch_sub(1, Ordering::SeqCst);

        let answer = {
            let notifies = self.notifies.lock();
            notifies
                .get(host)
                .or_else(|| notifies.get(zone_name))
                .copied()
                .unwrap_or(Answer::Serial(0))
        };
        Self::answer(answer, host, "NOTIFY").map(|_| ())
    }
}

// ============================================================================
// Backend
// ============================================================================

#[derive(Debug, Default)]
pub struct MockBackend {
    /// Number of calls that fail before calls start succeeding
    pub failures: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub catalog_zone: Option<String>,
}

impl MockBackend {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Self::failing_times(usize::MAX)
    }

    pub fn failing_times(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            failures: AtomicUsize::new(failures),
            ..Self::default()
        })
    }

    pub fn with_catalog(catalog_zone: &str) -> Arc<Self> {
        Arc::new(Self {
            catalog_zone: Some(catalog_zone.to_string()),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
            + self.update_calls.load(Ordering::SeqCst)
            + self.delete_calls.load(Ordering::SeqCst)
    }

    fn outcome(&self, action: Action, zone: &Zone) -> Result<()> {
        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(WorkerError::Backend {
                target: "mock".to_string(),
                action,
                zone: zone.name.clone(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_zone(&self, _ctx: &RequestContext, zone: &Zone) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome(Action::Create, zone)
    }

    async fn update_zone(&self, _ctx: &RequestContext, zone: &Zone) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome(Action::Update, zone)
    }

    async fn delete_zone(
        &self,
        _ctx: &RequestContext,
        zone: &Zone,
        _params: &ZoneParams,
    ) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome(Action::Delete, zone)
    }

    async fn catalog_zone(&self, _ctx: &RequestContext) -> Result<String> {
        self.catalog_zone
            .clone()
            .ok_or_else(|| WorkerError::CatalogZoneNotFound {
                target: "mock".to_string(),
            })
    }
}

// ============================================================================
// Storage, worker API, quota
// ============================================================================

#[derive(Default)]
pub struct MockStorage {
    pub zones: Mutex<Vec<Zone>>,
    pub recordsets: u64,
}

impl MockStorage {
    pub fn with_zones(zones: Vec<Zone>) -> Arc<Self> {
        Arc::new(Self {
            zones: Mutex::new(zones),
            recordsets: 0,
        })
    }

    pub fn with_recordsets(recordsets: u64) -> Arc<Self> {
        Arc::new(Self {
            zones: Mutex::new(Vec::new()),
            recordsets,
        })
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn find_zones(
        &self,
        _ctx: &RequestContext,
        criterion: &ZoneCriterion,
        limit: Option<usize>,
        _sort: Option<SortKey>,
    ) -> Result<Vec<Zone>> {
        Ok(self
            .zones
            .lock()
            .iter()
            .filter(|z| criterion.matches(z))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn get_zone(&self, _ctx: &RequestContext, zone_id: &str) -> Result<Zone> {
        self.zones
            .lock()
            .iter()
            .find(|z| z.id == zone_id)
            .cloned()
            .ok_or_else(|| WorkerError::Storage(format!("zone {zone_id} not found")))
    }

    async fn update_zone(&self, _ctx: &RequestContext, zone: &Zone) -> Result<Zone> {
        let mut zones = self.zones.lock();
        match zones.iter_mut().find(|z| z.id == zone.id) {
            Some(existing) => *existing = zone.clone(),
            None => zones.push(zone.clone()),
        }
        Ok(zone.clone())
    }

    async fn count_recordsets(
        &self,
        _ctx: &RequestContext,
        _criterion: &RecordsetCriterion,
    ) -> Result<u64> {
        Ok(self.recordsets)
    }
}

#[derive(Default)]
pub struct MockWorkerApi {
    pub created: Mutex<Vec<String>>,
    pub updated: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
    /// Zone ids whose dispatch fails
    pub failing: Mutex<Vec<String>>,
}

impl MockWorkerApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn record(&self, calls: &Mutex<Vec<String>>, zone: &Zone) -> Result<()> {
        calls.lock().push(zone.id.clone());
        if self.failing.lock().contains(&zone.id) {
            return Err(WorkerError::Rpc(format!("dispatch of {} failed", zone.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl WorkerApi for MockWorkerApi {
    async fn create_zone(&self, _ctx: &RequestContext, zone: &Zone) -> Result<()> {
        self.record(&self.created, zone)
    }

    async fn update_zone(&self, _ctx: &RequestContext, zone: &Zone) -> Result<()> {
        self.record(&self.updated, zone)
    }

    async fn delete_zone(&self, _ctx: &RequestContext, zone: &Zone) -> Result<()> {
        self.record(&self.deleted, zone)
    }
}

pub struct MockQuota {
    pub limit: u64,
    pub checks: Mutex<Vec<(String, String, u64)>>,
}

impl MockQuota {
    pub fn with_limit(limit: u64) -> Arc<Self> {
        Arc::new(Self {
            limit,
            checks: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Quota for MockQuota {
    async fn limit_check(
        &self,
        _ctx: &RequestContext,
        tenant_id: &str,
        resource: &str,
        value: u64,
    ) -> Result<()> {
        self.checks
            .lock()
            .push((tenant_id.to_string(), resource.to_string(), value));
        if value > self.limit {
            return Err(WorkerError::OverQuota {
                tenant_id: tenant_id.to_string(),
                resource: resource.to_string(),
                value,
            });
        }
        Ok(())
    }
}
