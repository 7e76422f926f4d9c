// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS transport used by the poller and the NOTIFY task.
//!
//! Only two operations are needed: read a zone's SOA serial from a nameserver,
//! and send a NOTIFY for a zone. [`HickoryTransport`] implements both over UDP
//! with hickory-client; tests substitute their own [`DnsTransport`].

use crate::errors::{Result, WorkerError};
use async_trait::async_trait;
use hickory_client::client::{AsyncClient, ClientHandle};
use hickory_client::op::ResponseCode;
use hickory_client::rr::{DNSClass, Name, RData, Record, RecordSet, RecordType};
use hickory_client::udp::UdpClientStream;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// Send queries and NOTIFY messages to DNS servers.
#[async_trait]
pub trait DnsTransport: Send + Sync {
    /// Query `host:port` for the SOA of `zone_name` and return its serial.
    ///
    /// A response without an SOA answer yields `0` (zone not served there).
    ///
    /// # Errors
    ///
    /// [`WorkerError::Timeout`] if no response arrives within `timeout`,
    /// [`WorkerError::Transport`] for any other failure.
    async fn get_serial(
        &self,
        zone_name: &str,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<u32>;

    /// Send a NOTIFY for `zone_name` to `host:port`.
    ///
    /// Any reply counts as delivered. A non-NOERROR rcode (such as REFUSED from
    /// a secondary without `allow-notify`) is logged, not returned.
    ///
    /// # Errors
    ///
    /// [`WorkerError::Timeout`] if no response arrives within `timeout`,
    /// [`WorkerError::Transport`] for any other failure.
    async fn notify(&self, zone_name: &str, host: &str, port: u16, timeout: Duration)
        -> Result<()>;
}

/// UDP transport backed by hickory-client.
#[derive(Debug, Clone, Default)]
pub struct HickoryTransport;

impl HickoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    async fn connect(server: SocketAddr, timeout: Duration) -> Result<AsyncClient> {
        // The caller's deadline decides between Timeout and Transport errors,
        // so the stream's own timer must not fire first.
        let stream = UdpClientStream::<UdpSocket>::with_timeout(server, timeout * 2);
        let (client, bg) = AsyncClient::connect(stream)
            .await
            .map_err(|e| transport_error(server, &e))?;

        // Spawn the background task
        tokio::spawn(bg);

        Ok(client)
    }
}

/// Resolve `host:port` to a socket address. IP literals skip the resolver.
async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    if let Ok(ip) = host.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }

    tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| WorkerError::Transport {
            server: format!("{host}:{port}"),
            reason: format!("failed to resolve host: {e}"),
        })?
        .next()
        .ok_or_else(|| WorkerError::Transport {
            server: format!("{host}:{port}"),
            reason: "host resolved to no addresses".to_string(),
        })
}

fn parse_zone_name(zone_name: &str, server: SocketAddr) -> Result<Name> {
    Name::from_str(zone_name).map_err(|e| WorkerError::Transport {
        server: server.to_string(),
        reason: format!("invalid zone name '{zone_name}': {e}"),
    })
}

fn transport_error(server: SocketAddr, err: &dyn std::fmt::Display) -> WorkerError {
    WorkerError::Transport {
        server: server.to_string(),
        reason: err.to_string(),
    }
}

fn timeout_error(operation: String, timeout: Duration) -> WorkerError {
    WorkerError::Timeout {
        operation,
        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    }
}

/// Extract the SOA serial from an answer section; `0` when there is none.
#[must_use]
pub fn serial_from_answers(answers: &[Record]) -> u32 {
    answers
        .iter()
        .find_map(|record| match record.data() {
            Some(RData::SOA(soa)) => Some(soa.serial()),
            _ => None,
        })
        .unwrap_or(0)
}

#[async_trait]
impl DnsTransport for HickoryTransport {
    async fn get_serial(
        &self,
        zone_name: &str,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<u32> {
        let server = resolve(host, port).await?;
        let name = parse_zone_name(zone_name, server)?;
        let operation = format!("SOA query for {zone_name} to {server}");

        let query = async {
            let mut client = Self::connect(server, timeout).await?;
            client
                .query(name, DNSClass::IN, RecordType::SOA)
                .await
                .map_err(|e| transport_error(server, &e))
        };

        let response = tokio::time::timeout(timeout, query)
            .await
            .map_err(|_| timeout_error(operation, timeout))??;

        let serial = serial_from_answers(response.answers());
        debug!(
            zone = %zone_name,
            server = %server,
            rcode = ?response.response_code(),
            serial = serial,
            "SOA query answered"
        );
        Ok(serial)
    }

    async fn notify(
        &self,
        zone_name: &str,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<()> {
        let server = resolve(host, port).await?;
        let name = parse_zone_name(zone_name, server)?;
        let operation = format!("NOTIFY for {zone_name} to {server}");

        let send = async {
            let mut client = Self::connect(server, timeout).await?;
            client
                .notify(name, DNSClass::IN, RecordType::SOA, None::<RecordSet>)
                .await
                .map_err(|e| transport_error(server, &e))
        };

        let response = tokio::time::timeout(timeout, send)
            .await
            .map_err(|_| timeout_error(operation, timeout))??;

        let rcode = response.response_code();
        if rcode == ResponseCode::NoError {
            debug!(zone = %zone_name, server = %server, "NOTIFY acknowledged");
        } else {
            warn!(
                zone = %zone_name,
                server = %server,
                rcode = %rcode,
                "NOTIFY answered with an error rcode"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "dns_tests.rs"]
mod dns_tests;
