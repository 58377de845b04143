use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::Collector;
use crate::error::ScrapeError;
use crate::fields::{resolve, resolve_str, Aliases};
use crate::parse::{parse_rate, parse_signal};
use crate::routeros::Record;
use crate::scrape::ScrapeResult;
use crate::session::CommandSession;

const INTERFACE_LIST: &[&str] = &["/interface/wireless/print", "=.proplist=.id,name"];
const MONITOR: &str = "/interface/wireless/monitor";
const MONITOR_PROPLIST: &str = "=.proplist=name,ssid,frequency,signal-strength,rate-set,tx-rate,rx-rate";
const REGISTRATION_TABLE: &[&str] = &[
    "/interface/wireless/registration-table/print",
    "=.proplist=interface,mac-address,signal-strength,tx-ccq,rx-rate,tx-rate,uptime",
];

const SIGNAL: Aliases = &["signal-strength"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WirelessInterfaceState {
    pub name: String,
    pub ssid: String,
    /// MHz.
    pub frequency: u64,
    /// dBm; station mode only.
    pub signal_strength: i64,
    pub tx_rate_bps: f64,
    pub rx_rate_bps: f64,
}

/// One station in the registration table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WirelessClientSession {
    pub interface_name: String,
    pub mac_address: String,
    pub signal_strength: i64,
    pub tx_ccq: i64,
    pub rx_rate: String,
    pub tx_rate: String,
    pub uptime_text: String,
}

fn signal(record: &Record) -> i64 {
    let Some((field, value)) = resolve(record, SIGNAL) else {
        return 0;
    };
    parse_signal(value).unwrap_or_else(|e| {
        debug!(field, error = %e, "unparseable signal strength");
        0
    })
}

fn rate(record: &Record, field: &str) -> f64 {
    let Some((field, value)) = resolve(record, &[field]) else {
        return 0.0;
    };
    parse_rate(value).unwrap_or_else(|e| {
        debug!(field, error = %e, "unparseable rate");
        0.0
    })
}

/// `2412` or `5180/20-Ceee/ac` both read as the leading MHz value.
fn frequency(record: &Record) -> u64 {
    let value = resolve_str(record, &["frequency"]);
    let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

fn ccq(record: &Record) -> i64 {
    resolve_str(record, &["tx-ccq"])
        .trim_end_matches('%')
        .parse()
        .unwrap_or(0)
}

/// Wireless interfaces (via single-shot monitor) and registered clients.
///
/// The two halves are independent: a failure in one does not stop the
/// other, and the first failure is reported once both have run.
pub struct WirelessCollector;

impl WirelessCollector {
    async fn interfaces(
        &self,
        session: &mut CommandSession,
        out: &mut ScrapeResult,
    ) -> Result<(), ScrapeError> {
        let listing = match session.execute(INTERFACE_LIST).await {
            Ok(reply) => reply,
            Err(e) if e.is_unsupported() => {
                info!(address = %session.target().address, "wireless package not available, skipping interfaces");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        for entry in &listing.records {
            let name = resolve_str(entry, &["name"]);
            let id = resolve_str(entry, &[".id"]);
            if name.is_empty() || id.is_empty() {
                continue;
            }

            let numbers = format!("=numbers={}", id);
            let sentence = [MONITOR, numbers.as_str(), "=once=", MONITOR_PROPLIST];
            let monitor = match session.execute(&sentence).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(interface = %name, id = %id, error = %e, "wireless monitor failed, skipping interface");
                    continue;
                }
            };
            let Some(data) = monitor.records.first() else {
                debug!(interface = %name, "wireless monitor returned nothing");
                continue;
            };

            out.wireless_interfaces.push(WirelessInterfaceState {
                name,
                ssid: resolve_str(data, &["ssid"]),
                frequency: frequency(data),
                signal_strength: signal(data),
                tx_rate_bps: rate(data, "tx-rate"),
                rx_rate_bps: rate(data, "rx-rate"),
            });
        }
        Ok(())
    }

    async fn clients(
        &self,
        session: &mut CommandSession,
        out: &mut ScrapeResult,
    ) -> Result<(), ScrapeError> {
        let reply = match session.execute(REGISTRATION_TABLE).await {
            Ok(reply) => reply,
            Err(e) if e.is_unsupported() => {
                info!(address = %session.target().address, "wireless package not available, skipping clients");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        for record in &reply.records {
            let mac_address = resolve_str(record, &["mac-address"]);
            if mac_address.is_empty() {
                continue;
            }
            out.wireless_clients.push(WirelessClientSession {
                interface_name: resolve_str(record, &["interface"]),
                mac_address,
                signal_strength: signal(record),
                tx_ccq: ccq(record),
                rx_rate: resolve_str(record, &["rx-rate"]),
                tx_rate: resolve_str(record, &["tx-rate"]),
                uptime_text: resolve_str(record, &["uptime"]),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Collector for WirelessCollector {
    fn name(&self) -> &str {
        "wireless"
    }

    async fn collect(
        &self,
        session: &mut CommandSession,
        out: &mut ScrapeResult,
    ) -> Result<(), ScrapeError> {
        let interfaces = self.interfaces(session, out).await;
        let clients = self.clients(session, out).await;
        debug!(
            interfaces = out.wireless_interfaces.len(),
            clients = out.wireless_clients.len(),
            "collected wireless state"
        );
        interfaces.and(clients)
    }
}
