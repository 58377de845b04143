//! Flatten a [`ScrapeResult`] into metric samples.

use std::collections::BTreeMap;

use crate::scrape::ScrapeResult;
use crate::types::{Label, MetricId, MetricSample};

#[derive(Default)]
struct Samples(Vec<MetricSample>);

impl Samples {
    /// `values` pair up with `metric.label_names()` in order.
    fn push(&mut self, metric: MetricId, value: f64, values: &[&str]) {
        debug_assert_eq!(values.len(), metric.label_names().len(), "{}", metric);
        let labels = metric
            .label_names()
            .iter()
            .zip(values)
            .map(|(key, value)| Label {
                key: *key,
                value: value.to_string(),
            })
            .collect();
        self.0.push(MetricSample {
            metric,
            value,
            labels,
        });
    }

    fn push_nonzero(&mut self, metric: MetricId, value: f64, values: &[&str]) {
        if value != 0.0 {
            self.push(metric, value, values);
        }
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

impl ScrapeResult {
    fn collector_succeeded(&self, name: &str) -> bool {
        self.collectors.iter().any(|c| c.name == name && c.success)
    }

    /// All samples for this scrape, records in device order.
    pub fn samples(&self) -> Vec<MetricSample> {
        let mut s = Samples::default();

        s.push(MetricId::Up, flag(self.up), &[]);
        s.push(MetricId::ScrapeDuration, self.duration.as_secs_f64(), &[]);
        s.push(MetricId::LastScrapeError, flag(self.had_error), &[]);
        for outcome in &self.collectors {
            s.push(MetricId::CollectorSuccess, flag(outcome.success), &[outcome.name.as_str()]);
            s.push(MetricId::CollectorDuration, outcome.duration.as_secs_f64(), &[outcome.name.as_str()]);
        }

        if let Some(sys) = &self.system {
            s.push(MetricId::SystemCpuLoad, sys.cpu_load_percent as f64, &[]);
            s.push(
                MetricId::SystemMemoryUsage,
                sys.total_memory.saturating_sub(sys.free_memory) as f64,
                &[],
            );
            s.push(MetricId::SystemMemoryTotal, sys.total_memory as f64, &[]);
            s.push(MetricId::SystemUptime, sys.uptime.as_secs_f64(), &[]);
            s.push(MetricId::SystemStorageTotal, sys.total_storage as f64, &[]);
            s.push(MetricId::SystemStorageFree, sys.free_storage as f64, &[]);
            s.push(
                MetricId::SystemStorageUsed,
                sys.total_storage.saturating_sub(sys.free_storage) as f64,
                &[],
            );
        }

        match (&self.routerboard, &self.system) {
            (Some(rb), _) => s.push(
                MetricId::SystemInfo,
                1.0,
                &[
                    &rb.board_name,
                    &rb.model,
                    &rb.serial_number,
                    &rb.firmware_type,
                    &rb.factory_firmware,
                    &rb.current_firmware,
                    &rb.upgrade_firmware,
                ],
            ),
            (None, Some(sys)) => s.push(
                MetricId::SystemInfo,
                1.0,
                &[&sys.board_name, &sys.model, &sys.serial_number, "", "", "", ""],
            ),
            (None, None) => {}
        }

        for iface in &self.interfaces {
            let name = iface.name.as_str();
            s.push(
                MetricId::InterfaceInfo,
                flag(iface.running),
                &[name, &iface.kind, &iface.comment, &iface.mac_address],
            );
            s.push(MetricId::InterfaceDisabled, flag(iface.disabled), &[name]);
            s.push(MetricId::InterfaceRxBytes, iface.rx_bytes as f64, &[name]);
            s.push(MetricId::InterfaceTxBytes, iface.tx_bytes as f64, &[name]);
            s.push(MetricId::InterfaceRxPackets, iface.rx_packets as f64, &[name]);
            s.push(MetricId::InterfaceTxPackets, iface.tx_packets as f64, &[name]);
            s.push(MetricId::InterfaceRxErrors, iface.rx_errors as f64, &[name]);
            s.push(MetricId::InterfaceTxErrors, iface.tx_errors as f64, &[name]);
            s.push(MetricId::InterfaceRxDrops, iface.rx_drops as f64, &[name]);
            s.push(MetricId::InterfaceTxDrops, iface.tx_drops as f64, &[name]);
        }

        if let Some(health) = &self.health {
            s.push_nonzero(MetricId::HealthTemperature, health.cpu_temperature, &["cpu"]);
            if health.board_temperature != health.cpu_temperature {
                s.push_nonzero(MetricId::HealthTemperature, health.board_temperature, &["board"]);
            }
            s.push_nonzero(MetricId::HealthVoltage, health.voltage, &[]);
            s.push_nonzero(MetricId::HealthCurrent, health.current, &[]);
            s.push_nonzero(MetricId::HealthPowerConsumed, health.power_consumed, &[]);
            s.push_nonzero(MetricId::HealthFanSpeed, health.fan_speed, &["fan1"]);
        }

        for peer in &self.bgp_peers {
            let name = peer.name.as_str();
            let disabled = if peer.disabled { "true" } else { "false" };
            s.push(
                MetricId::BgpPeerInfo,
                1.0,
                &[
                    name,
                    &peer.instance,
                    &peer.remote_address,
                    &peer.remote_as,
                    &peer.local_address,
                    &peer.local_role,
                    &peer.remote_role,
                    disabled,
                ],
            );
            s.push(MetricId::BgpPeerState, flag(peer.is_established()), &[name, &peer.state]);
            s.push(MetricId::BgpPeerUptime, peer.uptime.as_secs_f64(), &[name]);
            s.push(MetricId::BgpPeerPrefixCount, peer.prefix_count as f64, &[name]);
            s.push(MetricId::BgpPeerUpdatesSent, peer.updates_sent as f64, &[name]);
            s.push(MetricId::BgpPeerUpdatesReceived, peer.updates_received as f64, &[name]);
            s.push(MetricId::BgpPeerWithdrawsSent, peer.withdraws_sent as f64, &[name]);
            s.push(MetricId::BgpPeerWithdrawsReceived, peer.withdraws_received as f64, &[name]);
        }

        if self.collector_succeeded("ppp") {
            s.push(MetricId::PppActiveUsers, self.ppp_sessions.len() as f64, &[]);
        }
        for user in &self.ppp_sessions {
            let name = user.name.as_str();
            s.push(
                MetricId::PppUserInfo,
                1.0,
                &[name, &user.service, &user.caller_id, &user.address, &user.uptime_text],
            );
            s.push(MetricId::PppUserUptime, user.uptime.as_secs_f64(), &[name]);
            s.push(MetricId::PppUserRxBytes, user.rx_bytes as f64, &[name]);
            s.push(MetricId::PppUserTxBytes, user.tx_bytes as f64, &[name]);
        }

        for iface in &self.wireless_interfaces {
            let name = iface.name.as_str();
            let frequency = iface.frequency.to_string();
            s.push(MetricId::WirelessInterfaceInfo, 1.0, &[name, &iface.ssid, &frequency]);
            s.push_nonzero(MetricId::WirelessInterfaceSignal, iface.signal_strength as f64, &[name]);
            s.push_nonzero(MetricId::WirelessInterfaceTxRate, iface.tx_rate_bps, &[name]);
            s.push_nonzero(MetricId::WirelessInterfaceRxRate, iface.rx_rate_bps, &[name]);
        }

        let mut clients_per_interface: BTreeMap<&str, usize> = BTreeMap::new();
        for client in &self.wireless_clients {
            *clients_per_interface.entry(&client.interface_name).or_default() += 1;
            let keys = [client.interface_name.as_str(), client.mac_address.as_str()];
            s.push(
                MetricId::WirelessClientInfo,
                1.0,
                &[keys[0], keys[1], &client.uptime_text],
            );
            s.push_nonzero(MetricId::WirelessClientSignal, client.signal_strength as f64, &keys);
            s.push_nonzero(MetricId::WirelessClientCcq, client.tx_ccq as f64, &keys);
        }
        for (interface, count) in clients_per_interface {
            s.push(MetricId::WirelessInterfaceClients, count as f64, &[interface]);
        }

        s.0
    }
}
