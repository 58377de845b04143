use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

use super::Collector;
use crate::error::ScrapeError;
use crate::fields::{resolve_duration, resolve_str, resolve_u64};
use crate::scrape::ScrapeResult;
use crate::session::CommandSession;

const ACTIVE_PRINT: &str = "/ppp/active/print";

/// One connected PPP/PPPoE/L2TP user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialupUserSession {
    pub name: String,
    pub service: String,
    pub caller_id: String,
    pub address: String,
    pub uptime: Duration,
    /// Uptime exactly as the device printed it.
    pub uptime_text: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

pub struct PppCollector;

#[async_trait]
impl Collector for PppCollector {
    fn name(&self) -> &str {
        "ppp"
    }

    async fn collect(
        &self,
        session: &mut CommandSession,
        out: &mut ScrapeResult,
    ) -> Result<(), ScrapeError> {
        let reply = match session.execute(&[ACTIVE_PRINT]).await {
            Ok(reply) => reply,
            Err(e) if e.is_unsupported() => {
                info!(address = %session.target().address, "PPP not available, skipping sessions");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        for record in &reply.records {
            let name = resolve_str(record, &["name"]);
            if name.is_empty() {
                debug!(?record, "skipping PPP session without a name");
                continue;
            }
            out.ppp_sessions.push(DialupUserSession {
                name,
                service: resolve_str(record, &["service"]),
                caller_id: resolve_str(record, &["caller-id"]),
                address: resolve_str(record, &["address"]),
                uptime: resolve_duration(record, &["uptime"]),
                uptime_text: resolve_str(record, &["uptime"]),
                rx_bytes: resolve_u64(record, &["bytes-in"]),
                tx_bytes: resolve_u64(record, &["bytes-out"]),
            });
        }
        debug!(count = out.ppp_sessions.len(), "collected PPP sessions");
        Ok(())
    }
}
