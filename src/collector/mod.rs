pub mod bgp;
pub mod interface;
pub mod ppp;
pub mod system;
pub mod wireless;

use async_trait::async_trait;

use crate::error::ScrapeError;
use crate::scrape::{ScrapeOptions, ScrapeResult};
use crate::session::CommandSession;

/// Trait for all subsystem collectors.
///
/// Each collector covers one functional area of the device. It issues its
/// commands through the shared session and stores whatever it gathered in
/// `out`, even when it then reports an error, so a late failure never
/// discards records already parsed.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Short name used in logs and the per-collector metrics (e.g. "interface").
    fn name(&self) -> &str;

    /// Run the collector's commands. A returned `Unsupported` error is
    /// counted as success by the scraper.
    async fn collect(
        &self,
        session: &mut CommandSession,
        out: &mut ScrapeResult,
    ) -> Result<(), ScrapeError>;
}

/// Build the collectors for one scrape, in the order they must run.
pub fn create_collectors(options: &ScrapeOptions) -> Vec<Box<dyn Collector>> {
    let mut collectors: Vec<Box<dyn Collector>> = vec![
        Box::new(system::SystemResourceCollector),
        Box::new(system::RouterboardCollector),
        Box::new(interface::InterfaceCollector),
        Box::new(system::HealthCollector),
    ];

    if options.collect_bgp {
        collectors.push(Box::new(bgp::BgpPeerCollector));
    }

    if options.collect_ppp {
        collectors.push(Box::new(ppp::PppCollector));
    }

    if options.collect_wireless {
        collectors.push(Box::new(wireless::WirelessCollector));
    }

    tracing::debug!(count = collectors.len(), "initialized collectors");
    collectors
}
