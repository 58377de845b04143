use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info, trace, warn};

use super::Collector;
use crate::error::ScrapeError;
use crate::fields::{resolve_bool, resolve_str, resolve_u64, Aliases};
use crate::routeros::Record;
use crate::scrape::ScrapeResult;
use crate::session::CommandSession;

const LIST: &[&str] = &["/interface/print", "=.proplist=name,type"];
const DETAIL: &[&str] = &["/interface/print", "=detail="];
const STATS: &[&str] = &["/interface/print", "=stats="];

const RX_BYTES: Aliases = &["rx-byte", "rx-bytes", "bytes-in"];
const TX_BYTES: Aliases = &["tx-byte", "tx-bytes", "bytes-out"];
const RX_PACKETS: Aliases = &["rx-packet", "rx-packets", "packets-in"];
const TX_PACKETS: Aliases = &["tx-packet", "tx-packets", "packets-out"];
const RX_ERRORS: Aliases = &["rx-error", "rx-errors", "errors-in"];
const TX_ERRORS: Aliases = &["tx-error", "tx-errors", "errors-out"];
const RX_DROPS: Aliases = &["rx-drop", "rx-drops", "drops-in"];
const TX_DROPS: Aliases = &["tx-drop", "tx-drops", "drops-out"];

/// One physical or virtual interface with its traffic counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterfaceStat {
    pub name: String,
    pub kind: String,
    pub comment: String,
    pub mac_address: String,
    pub running: bool,
    pub disabled: bool,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub rx_errors: u64,
    pub tx_errors: u64,
    pub rx_drops: u64,
    pub tx_drops: u64,
}

impl InterfaceStat {
    fn apply_detail(&mut self, record: &Record) {
        self.comment = resolve_str(record, &["comment"]);
        self.mac_address = resolve_str(record, &["mac-address"]);
        self.running = resolve_bool(record, &["running"]);
        self.disabled = resolve_bool(record, &["disabled"]);
    }

    fn apply_counters(&mut self, record: &Record) {
        self.rx_bytes = resolve_u64(record, RX_BYTES);
        self.tx_bytes = resolve_u64(record, TX_BYTES);
        self.rx_packets = resolve_u64(record, RX_PACKETS);
        self.tx_packets = resolve_u64(record, TX_PACKETS);
        self.rx_errors = resolve_u64(record, RX_ERRORS);
        self.tx_errors = resolve_u64(record, TX_ERRORS);
        self.rx_drops = resolve_u64(record, RX_DROPS);
        self.tx_drops = resolve_u64(record, TX_DROPS);
    }
}

/// PPP and PPPoE links belong to the PPP collector.
fn is_dialup(name: &str, kind: &str) -> bool {
    let name = name.to_lowercase();
    let kind = kind.to_lowercase();
    name.contains("ppp") || kind.contains("ppp")
}

/// Interfaces tracked for this scrape, in device order, addressable by name.
#[derive(Default)]
struct Tracked {
    stats: Vec<InterfaceStat>,
    by_name: HashMap<String, usize>,
}

impl Tracked {
    fn from_listing(records: &[Record]) -> Self {
        let mut tracked = Tracked::default();
        for record in records {
            let name = resolve_str(record, &["name"]);
            if name.is_empty() {
                debug!(?record, "skipping interface without a name");
                continue;
            }
            let kind = resolve_str(record, &["type"]);
            if is_dialup(&name, &kind) {
                trace!(name = %name, kind = %kind, "skipping dial-up interface");
                continue;
            }
            if tracked.by_name.contains_key(&name) {
                continue;
            }
            tracked.by_name.insert(name.clone(), tracked.stats.len());
            tracked.stats.push(InterfaceStat {
                name,
                kind,
                ..Default::default()
            });
        }
        tracked
    }

    fn get_mut(&mut self, record: &Record) -> Option<&mut InterfaceStat> {
        let idx = *self.by_name.get(resolve_str(record, &["name"]).as_str())?;
        self.stats.get_mut(idx)
    }

    fn merge_detail(&mut self, records: &[Record]) {
        for record in records {
            if let Some(stat) = self.get_mut(record) {
                stat.apply_detail(record);
            }
        }
    }

    fn merge_counters(&mut self, records: &[Record]) {
        for record in records {
            match self.get_mut(record) {
                Some(stat) => stat.apply_counters(record),
                None => trace!("ignoring counters for untracked interface"),
            }
        }
    }
}

/// Interface listing, flags and traffic counters.
///
/// Three commands: the listing decides which interfaces exist; the detail
/// and statistics listings only enrich them. Losing either of the latter
/// still yields the interface set.
pub struct InterfaceCollector;

#[async_trait]
impl Collector for InterfaceCollector {
    fn name(&self) -> &str {
        "interface"
    }

    async fn collect(
        &self,
        session: &mut CommandSession,
        out: &mut ScrapeResult,
    ) -> Result<(), ScrapeError> {
        let listing = session.execute(LIST).await?;
        let mut tracked = Tracked::from_listing(&listing.records);
        if tracked.stats.is_empty() {
            info!(address = %session.target().address, "no non-dial-up interfaces found");
            return Ok(());
        }

        match session.execute(DETAIL).await {
            Ok(reply) => tracked.merge_detail(&reply.records),
            Err(e) => {
                warn!(address = %session.target().address, error = %e,
                      "interface detail unavailable, proceeding without comment/mac/status");
            }
        }

        let result = match session.execute(STATS).await {
            Ok(reply) if reply.records.is_empty() => {
                warn!(address = %session.target().address, "empty interface statistics reply");
                Ok(())
            }
            Ok(reply) => {
                tracked.merge_counters(&reply.records);
                Ok(())
            }
            Err(e) if e.is_unsupported() => {
                info!(address = %session.target().address, error = %e, "interface statistics not supported");
                Ok(())
            }
            Err(e) => {
                warn!(address = %session.target().address, error = %e,
                      "interface statistics failed, returning interfaces without counters");
                Err(e)
            }
        };

        debug!(count = tracked.stats.len(), "collected interfaces");
        out.interfaces = tracked.stats;
        result
    }
}
