use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

use super::Collector;
use crate::error::ScrapeError;
use crate::fields::{resolve_bool, resolve_duration, resolve_str, resolve_u64, Aliases};
use crate::routeros::Record;
use crate::scrape::ScrapeResult;
use crate::session::CommandSession;

/// RouterOS 7 first, then the v6 location.
const PEER_PRINT: &[&[&str]] = &[&["/routing/bgp/peer/print"], &["/ip/bgp/peer/print"]];

const UPTIME: Aliases = &["uptime", "established-for"];
const PREFIX_COUNT: Aliases = &["prefix-count", "prefixes", "prefixes-count", "received-prefixes"];
const UPDATES_SENT: Aliases = &["updates-sent", "sent-updates", "updates-out"];
const UPDATES_RECEIVED: Aliases = &["updates-received", "received-updates", "updates-in"];
const WITHDRAWS_SENT: Aliases = &["withdraws-sent", "sent-withdraws", "withdraws-out"];
const WITHDRAWS_RECEIVED: Aliases = &["withdraws-received", "received-withdraws", "withdraws-in"];
const STATE: Aliases = &["state", "connection-state", "status"];
const DISABLED: Aliases = &["disabled", "inactive"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingPeerSession {
    pub name: String,
    pub instance: String,
    pub remote_address: String,
    pub remote_as: String,
    pub local_address: String,
    pub local_role: String,
    pub remote_role: String,
    pub state: String,
    pub uptime: Duration,
    pub prefix_count: u64,
    pub updates_sent: u64,
    pub updates_received: u64,
    pub withdraws_sent: u64,
    pub withdraws_received: u64,
    pub disabled: bool,
}

impl RoutingPeerSession {
    pub fn is_established(&self) -> bool {
        self.state == "established"
    }

    fn from_record(record: &Record) -> Option<Self> {
        let name = resolve_str(record, &["name"]);
        if name.is_empty() {
            debug!(?record, "skipping BGP peer without a name");
            return None;
        }
        Some(Self {
            name,
            instance: resolve_str(record, &["instance"]),
            remote_address: resolve_str(record, &["remote-address", "remote.address"]),
            remote_as: resolve_str(record, &["remote-as", "remote.as"]),
            local_address: resolve_str(record, &["local-address", "local.address"]),
            local_role: resolve_str(record, &["local-role", "local.role"]),
            remote_role: resolve_str(record, &["remote-role", "remote.role"]),
            state: resolve_str(record, STATE),
            uptime: resolve_duration(record, UPTIME),
            prefix_count: resolve_u64(record, PREFIX_COUNT),
            updates_sent: resolve_u64(record, UPDATES_SENT),
            updates_received: resolve_u64(record, UPDATES_RECEIVED),
            withdraws_sent: resolve_u64(record, WITHDRAWS_SENT),
            withdraws_received: resolve_u64(record, WITHDRAWS_RECEIVED),
            disabled: resolve_bool(record, DISABLED),
        })
    }
}

/// BGP peer sessions across both API generations.
pub struct BgpPeerCollector;

#[async_trait]
impl Collector for BgpPeerCollector {
    fn name(&self) -> &str {
        "bgp"
    }

    async fn collect(
        &self,
        session: &mut CommandSession,
        out: &mut ScrapeResult,
    ) -> Result<(), ScrapeError> {
        let Some(reply) = session.execute_first_supported(PEER_PRINT).await? else {
            info!(address = %session.target().address, "BGP not available, skipping peers");
            return Ok(());
        };
        out.bgp_peers = reply
            .records
            .iter()
            .filter_map(RoutingPeerSession::from_record)
            .collect();
        debug!(count = out.bgp_peers.len(), "collected BGP peers");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record, session, FakeDevice, Response};

    async fn run(device: &FakeDevice) -> (ScrapeResult, Result<(), ScrapeError>) {
        let mut session = session(device);
        let mut out = ScrapeResult::default();
        let result = BgpPeerCollector.collect(&mut session, &mut out).await;
        (out, result)
    }

    #[tokio::test]
    async fn falls_back_to_legacy_path_once() {
        let device = FakeDevice::new().respond(
            "/ip/bgp/peer/print",
            Response::records(vec![record(&[
                ("name", "upstream"),
                ("remote-as", "64512"),
                ("state", "established"),
                ("uptime", "1h"),
                ("prefix-count", "900"),
                ("updates-in", "12"),
            ])]),
        );
        let (out, result) = run(&device).await;
        result.unwrap();
        assert_eq!(
            device.commands(),
            vec!["/routing/bgp/peer/print", "/ip/bgp/peer/print"]
        );
        let peer = &out.bgp_peers[0];
        assert!(peer.is_established());
        assert_eq!(peer.remote_as, "64512");
        assert_eq!(peer.uptime, Duration::from_secs(3600));
        assert_eq!(peer.prefix_count, 900);
        assert_eq!(peer.updates_received, 12);
    }

    #[test]
    fn established_state_matches_exactly() {
        let peer = |state: &str| RoutingPeerSession {
            state: state.to_string(),
            ..Default::default()
        };
        assert!(peer("established").is_established());
        assert!(!peer("Established").is_established());
        assert!(!peer("established ").is_established());
        assert!(!peer("").is_established());
    }

    #[tokio::test]
    async fn legacy_path_failure_names_command() {
        let device = FakeDevice::new().respond("/ip/bgp/peer/print", Response::trap("failure: busy"));
        let (_, result) = run(&device).await;
        match result {
            Err(ScrapeError::Command { command, .. }) => assert_eq!(command, "/ip/bgp/peer/print"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(device.commands().len(), 2);
    }

    #[tokio::test]
    async fn both_paths_unsupported_is_empty() {
        let device = FakeDevice::new()
            .respond("/routing/bgp/peer/print", Response::trap("routing package is disabled"));
        let (out, result) = run(&device).await;
        result.unwrap();
        assert!(out.bgp_peers.is_empty());
    }

    #[tokio::test]
    async fn new_path_failure_does_not_fall_back() {
        let device = FakeDevice::new()
            .respond("/routing/bgp/peer/print", Response::trap("failure: busy"));
        let (_, result) = run(&device).await;
        assert!(result.unwrap_err().is_failure());
        assert_eq!(device.commands(), vec!["/routing/bgp/peer/print"]);
    }

    #[tokio::test]
    async fn v7_fields_and_skipped_peers() {
        let device = FakeDevice::new().respond(
            "/routing/bgp/peer/print",
            Response::records(vec![
                record(&[("instance", "default")]),
                record(&[
                    ("name", "ix-1"),
                    ("connection-state", "idle"),
                    ("uptime", ""),
                    ("established-for", "2m"),
                    ("received-prefixes", "5"),
                    ("inactive", "true"),
                    ("sent-withdraws", "3"),
                ]),
                record(&[("name", "ix-2"), ("uptime", "garbage")]),
            ]),
        );
        let (out, result) = run(&device).await;
        result.unwrap();
        assert_eq!(out.bgp_peers.len(), 2);

        let ix1 = &out.bgp_peers[0];
        assert_eq!(ix1.state, "idle");
        assert!(!ix1.is_established());
        assert_eq!(ix1.uptime, Duration::from_secs(120));
        assert_eq!(ix1.prefix_count, 5);
        assert_eq!(ix1.withdraws_sent, 3);
        assert!(ix1.disabled);

        assert_eq!(out.bgp_peers[1].uptime, Duration::ZERO);
        assert!(!out.bgp_peers[1].is_established());
    }
}
