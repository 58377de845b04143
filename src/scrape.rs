//! One scrape of one device: connect, run the collectors in order, fold
//! their outcomes into `up` / `had_error`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::collector::bgp::RoutingPeerSession;
use crate::collector::create_collectors;
use crate::collector::interface::InterfaceStat;
use crate::collector::ppp::DialupUserSession;
use crate::collector::system::{RouterboardIdentity, SystemHealth, SystemResource};
use crate::collector::wireless::{WirelessClientSession, WirelessInterfaceState};
use crate::routeros::Connector;
use crate::session::{CommandSession, Target};

/// Optional subsystems requested for this scrape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrapeOptions {
    pub collect_bgp: bool,
    pub collect_ppp: bool,
    pub collect_wireless: bool,
}

/// How one collector fared.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorOutcome {
    pub name: String,
    /// False only for a real failure; an unsupported feature is a success.
    pub success: bool,
    pub duration: Duration,
}

/// Everything gathered in one scrape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapeResult {
    /// The device accepted the connection and login.
    pub up: bool,
    pub duration: Duration,
    /// At least one collector failed; the record sets may be incomplete.
    pub had_error: bool,
    pub system: Option<SystemResource>,
    pub routerboard: Option<RouterboardIdentity>,
    pub health: Option<SystemHealth>,
    pub interfaces: Vec<InterfaceStat>,
    pub bgp_peers: Vec<RoutingPeerSession>,
    pub ppp_sessions: Vec<DialupUserSession>,
    pub wireless_interfaces: Vec<WirelessInterfaceState>,
    pub wireless_clients: Vec<WirelessClientSession>,
    pub collectors: Vec<CollectorOutcome>,
}

/// Drives a single scrape. Built per request and consumed by [`Scraper::scrape`].
pub struct Scraper {
    session: CommandSession,
    options: ScrapeOptions,
}

impl Scraper {
    pub fn new(target: Target, connector: Arc<dyn Connector>, options: ScrapeOptions) -> Self {
        Self {
            session: CommandSession::new(target, connector),
            options,
        }
    }

    pub async fn scrape(mut self) -> ScrapeResult {
        let start = Instant::now();
        let address = self.session.target().address.clone();
        let mut result = ScrapeResult::default();

        info!(address = %address, "starting scrape");
        if let Err(e) = self.session.connect().await {
            warn!(address = %address, error = %e, "router unreachable");
            result.had_error = true;
            result.duration = start.elapsed();
            return result;
        }
        result.up = true;

        for collector in create_collectors(&self.options) {
            let started = Instant::now();
            let success = match collector.collect(&mut self.session, &mut result).await {
                Ok(()) => true,
                Err(e) if e.is_unsupported() => {
                    info!(address = %address, collector = collector.name(), "not supported on this device");
                    true
                }
                Err(e) => {
                    warn!(address = %address, collector = collector.name(), error = %e, "collector failed");
                    false
                }
            };
            let duration = started.elapsed();
            debug!(collector = collector.name(), success, ?duration, "collector finished");
            result.had_error |= !success;
            result.collectors.push(CollectorOutcome {
                name: collector.name().to_string(),
                success,
                duration,
            });
        }

        self.session.close().await;
        result.duration = start.elapsed();
        info!(
            address = %address,
            had_error = result.had_error,
            duration_ms = result.duration.as_millis() as u64,
            "scrape finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record, target, FakeDevice, Response};

    const ALL: ScrapeOptions = ScrapeOptions {
        collect_bgp: true,
        collect_ppp: true,
        collect_wireless: true,
    };

    const INTERFACE_LIST: &str = "/interface/print =.proplist=name,type";
    const WIRELESS_LIST: &str = "/interface/wireless/print =.proplist=.id,name";
    const WIRELESS_CLIENTS: &str = "/interface/wireless/registration-table/print =.proplist=interface,mac-address,signal-strength,tx-ccq,rx-rate,tx-rate,uptime";

    async fn scrape(device: &FakeDevice, options: ScrapeOptions) -> ScrapeResult {
        Scraper::new(target(), device.connector(), options).scrape().await
    }

    fn healthy_device() -> FakeDevice {
        FakeDevice::new()
            .respond(
                "/system/resource/print",
                Response::records(vec![record(&[
                    ("uptime", "5d"),
                    ("cpu-load", "3"),
                    ("free-memory", "1000"),
                    ("total-memory", "4000"),
                ])]),
            )
            .respond(
                "/system/routerboard/print",
                Response::records(vec![record(&[("model", "RB5009"), ("serial-number", "X1")])]),
            )
            .respond(
                INTERFACE_LIST,
                Response::records(vec![
                    record(&[("name", "ether1"), ("type", "ether")]),
                    record(&[("name", "pppoe-out1"), ("type", "pppoe-out")]),
                ]),
            )
            .respond(
                "/interface/print =detail=",
                Response::records(vec![record(&[("name", "ether1"), ("running", "true")])]),
            )
            .respond(
                "/interface/print =stats=",
                Response::records(vec![record(&[("name", "ether1"), ("rx-byte", "10"), ("tx-byte", "20")])]),
            )
            .respond(
                "/system/health/print",
                Response::records(vec![record(&[("temperature", "40C")])]),
            )
            .respond(
                "/ip/bgp/peer/print",
                Response::records(vec![record(&[("name", "peer1"), ("state", "established")])]),
            )
            .respond(
                "/ppp/active/print",
                Response::records(vec![record(&[("name", "alice"), ("uptime", "1h")])]),
            )
            .respond(WIRELESS_LIST, Response::records(vec![]))
            .respond(
                WIRELESS_CLIENTS,
                Response::records(vec![record(&[("interface", "wlan1"), ("mac-address", "AA:00:00:00:00:01")])]),
            )
    }

    fn assert_send<T: Send>(value: T) -> T {
        value
    }

    #[tokio::test]
    async fn scrape_future_is_send() {
        let device = healthy_device();
        let scraping = assert_send(Scraper::new(target(), device.connector(), ALL).scrape());
        let result = tokio::spawn(scraping).await.unwrap();
        assert!(result.up);
    }

    #[tokio::test]
    async fn unreachable_device() {
        let device = FakeDevice::unreachable();
        let result = scrape(&device, ALL).await;
        assert!(!result.up);
        assert!(result.had_error);
        assert!(result.collectors.is_empty());
        assert!(device.commands().is_empty());
    }

    #[tokio::test]
    async fn healthy_scrape() {
        let device = healthy_device();
        let result = scrape(&device, ALL).await;
        assert!(result.up);
        assert!(!result.had_error);
        assert_eq!(result.system.as_ref().unwrap().cpu_load_percent, 3);
        assert_eq!(result.routerboard.as_ref().unwrap().model, "RB5009");
        assert_eq!(result.interfaces.len(), 1);
        assert_eq!(result.interfaces[0].rx_bytes, 10);
        assert_eq!(result.health.as_ref().unwrap().cpu_temperature, 40.0);
        assert_eq!(result.bgp_peers.len(), 1);
        assert_eq!(result.ppp_sessions.len(), 1);
        assert_eq!(result.wireless_clients.len(), 1);
        assert_eq!(result.collectors.len(), 7);
        assert!(result.collectors.iter().all(|c| c.success));
    }

    #[tokio::test]
    async fn interface_stats_timeout() {
        let device = healthy_device().respond("/interface/print =stats=", Response::Hang);
        let result = scrape(&device, ScrapeOptions::default()).await;

        assert!(result.up);
        assert!(result.had_error);
        assert!(result.system.is_some());
        assert!(result.routerboard.is_some());
        assert_eq!(result.interfaces.len(), 1);
        assert_eq!(result.interfaces[0].name, "ether1");
        assert!(result.interfaces[0].running);
        assert_eq!(result.interfaces[0].rx_bytes, 0);
        assert_eq!(result.interfaces[0].tx_bytes, 0);
        // health still ran on a fresh connection
        assert!(result.health.is_some());
        let interface = result.collectors.iter().find(|c| c.name == "interface").unwrap();
        assert!(!interface.success);
    }

    #[tokio::test]
    async fn optional_collectors_only_when_enabled() {
        let device = healthy_device();
        let result = scrape(&device, ScrapeOptions::default()).await;
        assert!(result.bgp_peers.is_empty());
        assert!(result.ppp_sessions.is_empty());
        let commands = device.commands();
        assert!(!commands.iter().any(|c| c.contains("bgp") || c.contains("ppp/") || c.contains("wireless")));
    }

    #[tokio::test]
    async fn legacy_bgp_path_attempted_exactly_once() {
        let device = healthy_device();
        scrape(&device, ALL).await;
        let commands = device.commands();
        assert_eq!(commands.iter().filter(|c| *c == "/routing/bgp/peer/print").count(), 1);
        assert_eq!(commands.iter().filter(|c| *c == "/ip/bgp/peer/print").count(), 1);
    }

    #[tokio::test]
    async fn repeated_scrapes_are_identical() {
        let device = healthy_device();
        let mut first = scrape(&device, ALL).await;
        let mut second = scrape(&device, ALL).await;
        for result in [&mut first, &mut second] {
            result.duration = Duration::ZERO;
            result.collectors.iter_mut().for_each(|c| c.duration = Duration::ZERO);
        }
        assert_eq!(first, second);
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Outcome {
        Ok,
        Unsupported,
        Failed,
    }

    impl Outcome {
        fn from_digit(digit: u32) -> Self {
            match digit {
                0 => Outcome::Ok,
                1 => Outcome::Unsupported,
                _ => Outcome::Failed,
            }
        }
    }

    /// Command that decides each collector's outcome, and a reply that succeeds.
    fn decisive_commands() -> [(&'static str, Response); 7] {
        fn one(pairs: &[(&str, &str)]) -> Response {
            Response::records(vec![record(pairs)])
        }
        [
            ("/system/resource/print", one(&[("cpu-load", "1")])),
            ("/system/routerboard/print", one(&[("model", "hAP")])),
            (INTERFACE_LIST, one(&[("name", "ether1")])),
            ("/system/health/print", one(&[("voltage", "24V")])),
            ("/routing/bgp/peer/print", one(&[("name", "p1")])),
            ("/ppp/active/print", one(&[("name", "u1")])),
            (WIRELESS_LIST, Response::records(vec![])),
        ]
    }

    #[tokio::test]
    async fn had_error_is_or_of_real_failures() {
        let collectors = decisive_commands().len() as u32;
        for combo in 0..3u32.pow(collectors) {
            let mut device = FakeDevice::new()
                .respond("/interface/print =detail=", Response::records(vec![]))
                .respond("/interface/print =stats=", Response::records(vec![]))
                .respond(WIRELESS_CLIENTS, Response::records(vec![]));
            let mut outcomes = Vec::new();
            let mut rest = combo;
            for (command, ok) in decisive_commands() {
                let outcome = Outcome::from_digit(rest % 3);
                rest /= 3;
                device = match outcome {
                    Outcome::Ok => device.respond(command, ok),
                    Outcome::Unsupported => device,
                    Outcome::Failed => device.respond(command, Response::trap("failure: busy")),
                };
                outcomes.push(outcome);
            }

            let result = scrape(&device, ALL).await;
            let expected = outcomes.contains(&Outcome::Failed);
            assert!(result.up, "combo {:?}", outcomes);
            assert_eq!(result.had_error, expected, "combo {:?}", outcomes);
            let failed: Vec<bool> = result.collectors.iter().map(|c| !c.success).collect();
            let expected_failed: Vec<bool> = outcomes.iter().map(|o| *o == Outcome::Failed).collect();
            assert_eq!(failed, expected_failed, "combo {:?}", outcomes);
        }
    }
}
