// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! BIND9 backend, driven through the bindcar HTTP API sidecar.
//!
//! Targets of this type are secondaries of the zone's primaries (the
//! `masters` option):
//!
//! - **CREATE** adds a secondary zone transferring from the masters
//! - **UPDATE** asks BIND9 to retransfer the zone
//! - **DELETE** removes the zone
//!
//! # Target options
//!
//! | option         | required | meaning                                            |
//! |----------------|----------|----------------------------------------------------|
//! | `api_endpoint` | yes      | bindcar address, e.g. `bind9-api:8080`             |
//! | `masters`      | yes      | comma separated `ip[:port]` list to transfer from  |
//! | `api_token`    | no       | bearer token, sent when bindcar has auth enabled   |
//! | `catalog_zone` | no       | catalog zone to NOTIFY after zone changes          |
//!
//! All requests retry on 429 and 5xx with jittered exponential back-off.

use super::Backend;
use crate::constants::{
    BACKEND_TYPE_BIND9, OPTION_API_ENDPOINT, OPTION_API_TOKEN, OPTION_CATALOG_ZONE, OPTION_MASTERS,
};
use crate::errors::WorkerError;
use crate::retry::{http_backoff, is_retryable_http_status};
use crate::zone::{Action, RequestContext, Zone, ZoneParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bindcar::{CreateZoneRequest, SoaRecord, ZoneConfig, ZONE_TYPE_SECONDARY};
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::net::SocketAddr;
use tracing::{debug, error, info, warn};

/// A non-2xx bindcar response.
#[derive(Debug, thiserror::Error)]
#[error("bindcar returned {status}: {body}")]
struct ApiStatusError {
    status: StatusCode,
    body: String,
}

fn response_status(err: &anyhow::Error) -> Option<StatusCode> {
    err.downcast_ref::<ApiStatusError>().map(|e| e.status)
}

/// Whether a failed call is worth repeating: a retryable status, or no
/// response at all.
fn should_retry(err: &anyhow::Error) -> bool {
    match response_status(err) {
        Some(status) => is_retryable_http_status(status),
        None => err
            .downcast_ref::<reqwest::Error>()
            .is_some_and(|e| e.is_connect() || e.is_timeout() || e.is_request()),
    }
}

/// Base URL for a bindcar address; `host:port` gets an `http://` scheme.
pub(crate) fn build_api_url(server: &str) -> String {
    let server = server.trim_end_matches('/');
    if server.starts_with("http://") || server.starts_with("https://") {
        server.to_string()
    } else {
        format!("http://{server}")
    }
}

/// Rewrite `ip[:port]` masters into BIND9 `primaries` entries (`IP port PORT`).
/// Entries that are not socket addresses pass through untouched.
pub(crate) fn format_primaries(masters: &[String]) -> Vec<String> {
    masters
        .iter()
        .map(|master| {
            master.parse::<SocketAddr>().map_or_else(
                |_| master.clone(),
                |addr| format!("{} port {}", addr.ip(), addr.port()),
            )
        })
        .collect()
}

fn non_empty<'a>(options: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    options
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// bindcar addresses zones without the trailing root label.
fn api_zone_name(zone_name: &str) -> &str {
    zone_name.strip_suffix('.').unwrap_or(zone_name)
}

/// Thin bindcar client: bearer auth and retries on transient failures.
#[derive(Debug, Clone)]
struct BindcarClient {
    http: HttpClient,
    base_url: String,
    token: Option<String>,
}

impl BindcarClient {
    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{path}", self.base_url)
    }

    /// Send `method path` until it succeeds, fails permanently, or the
    /// [`http_backoff`] schedule runs out.
    async fn call<B: Serialize + fmt::Debug + Sync>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<String> {
        let url = self.url(path);
        let mut backoff = http_backoff();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let err = match self.send_once(method.clone(), &url, body).await {
                Ok(text) => {
                    if attempt > 1 {
                        debug!(
                            method = %method,
                            url = %url,
                            attempt = attempt,
                            elapsed = ?backoff.elapsed(),
                            "bindcar call succeeded after retrying"
                        );
                    }
                    return Ok(text);
                }
                Err(err) => err,
            };

            if !should_retry(&err) {
                return Err(err);
            }

            let Some(wait) = backoff.next_backoff() else {
                error!(
                    method = %method,
                    url = %url,
                    attempt = attempt,
                    error = %err,
                    "bindcar still failing, giving up"
                );
                return Err(err.context(format!("gave up after {attempt} attempts")));
            };

            warn!(
                method = %method,
                url = %url,
                attempt = attempt,
                retry_in = ?wait,
                error = %err,
                "bindcar call failed, retrying"
            );
            tokio::time::sleep(wait).await;
        }
    }

    async fn send_once<B: Serialize + fmt::Debug + Sync>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<String> {
        debug!(method = %method, url = %url, body = ?body, "bindcar request");

        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response
            .text()
            .await
            .with_context(|| format!("reading bindcar response from {url}"))?;

        if status.is_success() {
            Ok(text)
        } else {
            Err(ApiStatusError { status, body: text }.into())
        }
    }
}

/// A BIND9 server managed through bindcar.
#[derive(Debug, Clone)]
pub struct Bind9Backend {
    target_id: String,
    api: BindcarClient,
    masters: Vec<String>,
    catalog_zone: Option<String>,
}

impl Bind9Backend {
    /// Build the backend from a pool target's options.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::InvalidTargetOptions`] if `api_endpoint` or
    /// `masters` is missing or empty.
    pub fn from_options(
        target_id: &str,
        options: &BTreeMap<String, String>,
    ) -> crate::errors::Result<Self> {
        let missing = |option: &str| WorkerError::InvalidTargetOptions {
            target: target_id.to_string(),
            reason: format!("missing '{option}' option"),
        };
        let endpoint = non_empty(options, OPTION_API_ENDPOINT)
            .ok_or_else(|| missing(OPTION_API_ENDPOINT))?;
        let masters: Vec<String> = non_empty(options, OPTION_MASTERS)
            .into_iter()
            .flat_map(|raw| raw.split(','))
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from)
            .collect();
        if masters.is_empty() {
            return Err(missing(OPTION_MASTERS));
        }

        Ok(Self {
            target_id: target_id.to_string(),
            api: BindcarClient {
                http: HttpClient::new(),
                base_url: build_api_url(endpoint),
                token: options.get(OPTION_API_TOKEN).cloned(),
            },
            masters,
            catalog_zone: non_empty(options, OPTION_CATALOG_ZONE).map(String::from),
        })
    }

    fn backend_error(&self, action: Action, zone: &Zone, err: &anyhow::Error) -> WorkerError {
        WorkerError::Backend {
            target: self.target_id.clone(),
            action,
            zone: zone.name.clone(),
            reason: format!("{err:#}"),
        }
    }

    /// Add `zone` as a secondary of the configured masters. A zone BIND9
    /// already serves counts as added.
    async fn add_secondary_zone(&self, zone: &Zone) -> Result<()> {
        let zone_name = api_zone_name(&zone.name);
        let primaries = format_primaries(&self.masters);

        // SOA and NS arrive by zone transfer; these values only satisfy the schema
        let request = CreateZoneRequest {
            zone_name: zone_name.to_string(),
            zone_type: ZONE_TYPE_SECONDARY.to_string(),
            zone_config: ZoneConfig {
                ttl: zone.ttl,
                soa: SoaRecord {
                    primary_ns: "placeholder.example.com.".to_string(),
                    admin_email: "admin.example.com.".to_string(),
                    serial: zone.serial,
                    refresh: zone.refresh,
                    retry: zone.retry,
                    expire: zone.expire,
                    negative_ttl: zone.minimum,
                },
                name_servers: vec![],
                name_server_ips: HashMap::new(),
                records: vec![],
                also_notify: None,
                allow_transfer: None,
                primaries: Some(primaries.clone()),
                dnssec_policy: None,
                inline_signing: None,
            },
            update_key_name: None,
        };

        match self.api.call(Method::POST, "zones", Some(&request)).await {
            Ok(_) => {
                info!(
                    target_id = %self.target_id,
                    zone = %zone_name,
                    primaries = ?primaries,
                    "Added secondary zone"
                );
                Ok(())
            }
            Err(e) if is_duplicate_zone(&e) => {
                info!(
                    target_id = %self.target_id,
                    zone = %zone_name,
                    "Zone already present on server"
                );
                Ok(())
            }
            Err(e) => Err(e.context("adding secondary zone")),
        }
    }

    async fn retransfer_zone(&self, zone: &Zone) -> Result<()> {
        let zone_name = api_zone_name(&zone.name);
        self.api
            .call(Method::POST, &format!("zones/{zone_name}/retransfer"), None::<&()>)
            .await
            .context("requesting zone retransfer")?;

        info!(target_id = %self.target_id, zone = %zone_name, "Requested zone retransfer");
        Ok(())
    }

    async fn remove_zone(&self, zone: &Zone) -> Result<()> {
        let zone_name = api_zone_name(&zone.name);
        match self
            .api
            .call(Method::DELETE, &format!("zones/{zone_name}"), None::<&()>)
            .await
        {
            Ok(_) => {
                info!(target_id = %self.target_id, zone = %zone_name, "Deleted zone");
                Ok(())
            }
            Err(e) if response_status(&e) == Some(StatusCode::NOT_FOUND) => {
                debug!(target_id = %self.target_id, zone = %zone_name, "Zone already gone");
                Ok(())
            }
            Err(e) => Err(e.context("deleting zone")),
        }
    }
}

/// 409, or one of the ways BIND9 words "zone already exists".
fn is_duplicate_zone(err: &anyhow::Error) -> bool {
    if response_status(err) == Some(StatusCode::CONFLICT) {
        return true;
    }
    let message = err.to_string().to_lowercase();
    ["already exists", "already serves", "duplicate zone"]
        .iter()
        .any(|needle| message.contains(needle))
}

#[async_trait]
impl Backend for Bind9Backend {
    fn name(&self) -> &str {
        BACKEND_TYPE_BIND9
    }

    async fn create_zone(&self, _ctx: &RequestContext, zone: &Zone) -> crate::errors::Result<()> {
        self.add_secondary_zone(zone)
            .await
            .map_err(|e| self.backend_error(Action::Create, zone, &e))
    }

    async fn update_zone(&self, _ctx: &RequestContext, zone: &Zone) -> crate::errors::Result<()> {
        self.retransfer_zone(zone)
            .await
            .map_err(|e| self.backend_error(Action::Update, zone, &e))
    }

    async fn delete_zone(
        &self,
        _ctx: &RequestContext,
        zone: &Zone,
        _params: &ZoneParams,
    ) -> crate::errors::Result<()> {
        self.remove_zone(zone)
            .await
            .map_err(|e| self.backend_error(Action::Delete, zone, &e))
    }

    async fn catalog_zone(&self, _ctx: &RequestContext) -> crate::errors::Result<String> {
        self.catalog_zone
            .clone()
            .ok_or_else(|| WorkerError::CatalogZoneNotFound {
                target: self.target_id.clone(),
            })
    }
}

#[cfg(test)]
#[path = "bind9_tests.rs"]
mod bind9_tests;
