pub mod collector;
pub mod config;
pub mod error;
pub mod exposition;
pub mod fields;
pub mod metrics;
pub mod parse;
pub mod routeros;
pub mod scrape;
pub mod server;
pub mod session;
#[cfg(test)]
pub(crate) mod testing;

/// Common types used across modules
pub mod types {
    use smallvec::SmallVec;

    /// Prefix shared by every exported metric family.
    pub const NAMESPACE: &str = "mikrotik";

    /// A single metric measurement
    #[derive(Debug, Clone, PartialEq)]
    pub struct MetricSample {
        pub metric: MetricId,
        pub value: f64,
        pub labels: SmallVec<[Label; 4]>,
    }

    /// A label key-value pair
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Label {
        pub key: &'static str,
        pub value: String,
    }

    /// Prometheus metric type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Kind {
        Counter,
        Gauge,
    }

    impl Kind {
        pub fn as_str(&self) -> &'static str {
            match self {
                Kind::Counter => "counter",
                Kind::Gauge => "gauge",
            }
        }
    }

    /// Metric family identifier.
    ///
    /// Each variant carries its full schema: exported name, help text,
    /// type and label names. Samples must supply labels in `label_names()`
    /// order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub enum MetricId {
        Up,
        ScrapeDuration,
        LastScrapeError,
        CollectorSuccess,
        CollectorDuration,
        SystemCpuLoad,
        SystemMemoryUsage,
        SystemMemoryTotal,
        SystemUptime,
        SystemStorageTotal,
        SystemStorageFree,
        SystemStorageUsed,
        SystemInfo,
        InterfaceInfo,
        InterfaceDisabled,
        InterfaceRxBytes,
        InterfaceTxBytes,
        InterfaceRxPackets,
        InterfaceTxPackets,
        InterfaceRxErrors,
        InterfaceTxErrors,
        InterfaceRxDrops,
        InterfaceTxDrops,
        HealthTemperature,
        HealthVoltage,
        HealthCurrent,
        HealthPowerConsumed,
        HealthFanSpeed,
        BgpPeerInfo,
        BgpPeerState,
        BgpPeerUptime,
        BgpPeerPrefixCount,
        BgpPeerUpdatesSent,
        BgpPeerUpdatesReceived,
        BgpPeerWithdrawsSent,
        BgpPeerWithdrawsReceived,
        PppActiveUsers,
        PppUserInfo,
        PppUserUptime,
        PppUserRxBytes,
        PppUserTxBytes,
        WirelessInterfaceInfo,
        WirelessInterfaceSignal,
        WirelessInterfaceTxRate,
        WirelessInterfaceRxRate,
        WirelessInterfaceClients,
        WirelessClientInfo,
        WirelessClientSignal,
        WirelessClientCcq,
    }

    impl MetricId {
        /// Every family, in exposition order.
        pub const ALL: &'static [MetricId] = &[
            MetricId::Up,
            MetricId::ScrapeDuration,
            MetricId::LastScrapeError,
            MetricId::CollectorSuccess,
            MetricId::CollectorDuration,
            MetricId::SystemCpuLoad,
            MetricId::SystemMemoryUsage,
            MetricId::SystemMemoryTotal,
            MetricId::SystemUptime,
            MetricId::SystemStorageTotal,
            MetricId::SystemStorageFree,
            MetricId::SystemStorageUsed,
            MetricId::SystemInfo,
            MetricId::InterfaceInfo,
            MetricId::InterfaceDisabled,
            MetricId::InterfaceRxBytes,
            MetricId::InterfaceTxBytes,
            MetricId::InterfaceRxPackets,
            MetricId::InterfaceTxPackets,
            MetricId::InterfaceRxErrors,
            MetricId::InterfaceTxErrors,
            MetricId::InterfaceRxDrops,
            MetricId::InterfaceTxDrops,
            MetricId::HealthTemperature,
            MetricId::HealthVoltage,
            MetricId::HealthCurrent,
            MetricId::HealthPowerConsumed,
            MetricId::HealthFanSpeed,
            MetricId::BgpPeerInfo,
            MetricId::BgpPeerState,
            MetricId::BgpPeerUptime,
            MetricId::BgpPeerPrefixCount,
            MetricId::BgpPeerUpdatesSent,
            MetricId::BgpPeerUpdatesReceived,
            MetricId::BgpPeerWithdrawsSent,
            MetricId::BgpPeerWithdrawsReceived,
            MetricId::PppActiveUsers,
            MetricId::PppUserInfo,
            MetricId::PppUserUptime,
            MetricId::PppUserRxBytes,
            MetricId::PppUserTxBytes,
            MetricId::WirelessInterfaceInfo,
            MetricId::WirelessInterfaceSignal,
            MetricId::WirelessInterfaceTxRate,
            MetricId::WirelessInterfaceRxRate,
            MetricId::WirelessInterfaceClients,
            MetricId::WirelessClientInfo,
            MetricId::WirelessClientSignal,
            MetricId::WirelessClientCcq,
        ];

        pub fn name(&self) -> &'static str {
            match self {
                MetricId::Up => "mikrotik_up",
                MetricId::ScrapeDuration => "mikrotik_scrape_duration_seconds",
                MetricId::LastScrapeError => "mikrotik_last_scrape_error",
                MetricId::CollectorSuccess => "mikrotik_scrape_collector_success",
                MetricId::CollectorDuration => "mikrotik_scrape_collector_duration_seconds",
                MetricId::SystemCpuLoad => "mikrotik_system_cpu_load_percent",
                MetricId::SystemMemoryUsage => "mikrotik_system_memory_usage_bytes",
                MetricId::SystemMemoryTotal => "mikrotik_system_memory_total_bytes",
                MetricId::SystemUptime => "mikrotik_system_uptime_seconds",
                MetricId::SystemStorageTotal => "mikrotik_system_storage_total_bytes",
                MetricId::SystemStorageFree => "mikrotik_system_storage_free_bytes",
                MetricId::SystemStorageUsed => "mikrotik_system_storage_used_bytes",
                MetricId::SystemInfo => "mikrotik_system_info",
                MetricId::InterfaceInfo => "mikrotik_interface_info",
                MetricId::InterfaceDisabled => "mikrotik_interface_disabled",
                MetricId::InterfaceRxBytes => "mikrotik_interface_receive_bytes_total",
                MetricId::InterfaceTxBytes => "mikrotik_interface_transmit_bytes_total",
                MetricId::InterfaceRxPackets => "mikrotik_interface_receive_packets_total",
                MetricId::InterfaceTxPackets => "mikrotik_interface_transmit_packets_total",
                MetricId::InterfaceRxErrors => "mikrotik_interface_receive_errors_total",
                MetricId::InterfaceTxErrors => "mikrotik_interface_transmit_errors_total",
                MetricId::InterfaceRxDrops => "mikrotik_interface_receive_drops_total",
                MetricId::InterfaceTxDrops => "mikrotik_interface_transmit_drops_total",
                MetricId::HealthTemperature => "mikrotik_health_temperature_celsius",
                MetricId::HealthVoltage => "mikrotik_health_voltage_volts",
                MetricId::HealthCurrent => "mikrotik_health_current_amperes",
                MetricId::HealthPowerConsumed => "mikrotik_health_power_consumed_watts",
                MetricId::HealthFanSpeed => "mikrotik_health_fan_speed_rpm",
                MetricId::BgpPeerInfo => "mikrotik_bgp_peer_info",
                MetricId::BgpPeerState => "mikrotik_bgp_peer_state",
                MetricId::BgpPeerUptime => "mikrotik_bgp_peer_uptime_seconds",
                MetricId::BgpPeerPrefixCount => "mikrotik_bgp_peer_prefix_count",
                MetricId::BgpPeerUpdatesSent => "mikrotik_bgp_peer_updates_sent_total",
                MetricId::BgpPeerUpdatesReceived => "mikrotik_bgp_peer_updates_received_total",
                MetricId::BgpPeerWithdrawsSent => "mikrotik_bgp_peer_withdraws_sent_total",
                MetricId::BgpPeerWithdrawsReceived => "mikrotik_bgp_peer_withdraws_received_total",
                MetricId::PppActiveUsers => "mikrotik_ppp_active_users_count",
                MetricId::PppUserInfo => "mikrotik_ppp_user_info",
                MetricId::PppUserUptime => "mikrotik_ppp_user_uptime_seconds",
                MetricId::PppUserRxBytes => "mikrotik_ppp_user_receive_bytes",
                MetricId::PppUserTxBytes => "mikrotik_ppp_user_transmit_bytes",
                MetricId::WirelessInterfaceInfo => "mikrotik_wireless_interface_info",
                MetricId::WirelessInterfaceSignal => "mikrotik_wireless_interface_signal_strength_dbm",
                MetricId::WirelessInterfaceTxRate => "mikrotik_wireless_interface_transmit_rate_bps",
                MetricId::WirelessInterfaceRxRate => "mikrotik_wireless_interface_receive_rate_bps",
                MetricId::WirelessInterfaceClients => "mikrotik_wireless_interface_active_clients_count",
                MetricId::WirelessClientInfo => "mikrotik_wireless_client_info",
                MetricId::WirelessClientSignal => "mikrotik_wireless_client_signal_strength_dbm",
                MetricId::WirelessClientCcq => "mikrotik_wireless_client_transmit_ccq_percent",
            }
        }

        pub fn help(&self) -> &'static str {
            match self {
                MetricId::Up => "Was the last scrape of the MikroTik router successful.",
                MetricId::ScrapeDuration => "Duration of the last scrape.",
                MetricId::LastScrapeError => "Whether the last scrape of metrics resulted in an error (1 for error, 0 for success).",
                MetricId::CollectorSuccess => "Whether a collector succeeded (unsupported features count as success).",
                MetricId::CollectorDuration => "Time spent in one collector during the last scrape.",
                MetricId::SystemCpuLoad => "Current CPU load percentage.",
                MetricId::SystemMemoryUsage => "Currently used memory in bytes.",
                MetricId::SystemMemoryTotal => "Total available memory in bytes.",
                MetricId::SystemUptime => "System uptime in seconds.",
                MetricId::SystemStorageTotal => "Total system storage (HDD) size in bytes.",
                MetricId::SystemStorageFree => "Free system storage (HDD) space in bytes.",
                MetricId::SystemStorageUsed => "Used system storage (HDD) space in bytes.",
                MetricId::SystemInfo => "Non-numeric information about the router board.",
                MetricId::InterfaceInfo => "Interface information; value is the running status.",
                MetricId::InterfaceDisabled => "Whether the interface is administratively disabled.",
                MetricId::InterfaceRxBytes => "Total number of bytes received.",
                MetricId::InterfaceTxBytes => "Total number of bytes transmitted.",
                MetricId::InterfaceRxPackets => "Total number of packets received.",
                MetricId::InterfaceTxPackets => "Total number of packets transmitted.",
                MetricId::InterfaceRxErrors => "Total number of receive errors.",
                MetricId::InterfaceTxErrors => "Total number of transmit errors.",
                MetricId::InterfaceRxDrops => "Total number of received packets dropped.",
                MetricId::InterfaceTxDrops => "Total number of transmitted packets dropped.",
                MetricId::HealthTemperature => "Temperature in degrees Celsius.",
                MetricId::HealthVoltage => "System voltage.",
                MetricId::HealthCurrent => "System current draw in Amperes (if available).",
                MetricId::HealthPowerConsumed => "System power consumption in Watts (if available).",
                MetricId::HealthFanSpeed => "Fan speed in RPM (if available).",
                MetricId::BgpPeerInfo => "BGP peer information.",
                MetricId::BgpPeerState => "BGP peer state (1 = Established, 0 = Other).",
                MetricId::BgpPeerUptime => "BGP peer session uptime in seconds.",
                MetricId::BgpPeerPrefixCount => "Number of prefixes received from the BGP peer.",
                MetricId::BgpPeerUpdatesSent => "Total number of BGP update messages sent.",
                MetricId::BgpPeerUpdatesReceived => "Total number of BGP update messages received.",
                MetricId::BgpPeerWithdrawsSent => "Total number of BGP withdraw messages sent.",
                MetricId::BgpPeerWithdrawsReceived => "Total number of BGP withdraw messages received.",
                MetricId::PppActiveUsers => "Total number of active PPP users.",
                MetricId::PppUserInfo => "PPP user session information (1 = active).",
                MetricId::PppUserUptime => "PPP user session uptime in seconds.",
                MetricId::PppUserRxBytes => "Bytes received from the PPP user in this session.",
                MetricId::PppUserTxBytes => "Bytes sent to the PPP user in this session.",
                MetricId::WirelessInterfaceInfo => "Wireless interface information.",
                MetricId::WirelessInterfaceSignal => "Wireless interface signal strength in dBm (primarily for station mode).",
                MetricId::WirelessInterfaceTxRate => "Wireless interface transmit rate in bits per second.",
                MetricId::WirelessInterfaceRxRate => "Wireless interface receive rate in bits per second.",
                MetricId::WirelessInterfaceClients => "Number of active clients connected to a wireless interface (AP mode).",
                MetricId::WirelessClientInfo => "Connected wireless client information (1 = connected).",
                MetricId::WirelessClientSignal => "Connected wireless client signal strength in dBm.",
                MetricId::WirelessClientCcq => "Connected wireless client transmit CCQ (Client Connection Quality) in percent.",
            }
        }

        pub fn kind(&self) -> Kind {
            match self {
                MetricId::InterfaceRxBytes
                | MetricId::InterfaceTxBytes
                | MetricId::InterfaceRxPackets
                | MetricId::InterfaceTxPackets
                | MetricId::InterfaceRxErrors
                | MetricId::InterfaceTxErrors
                | MetricId::InterfaceRxDrops
                | MetricId::InterfaceTxDrops
                | MetricId::BgpPeerUpdatesSent
                | MetricId::BgpPeerUpdatesReceived
                | MetricId::BgpPeerWithdrawsSent
                | MetricId::BgpPeerWithdrawsReceived => Kind::Counter,
                _ => Kind::Gauge,
            }
        }

        pub fn label_names(&self) -> &'static [&'static str] {
            match self {
                MetricId::Up
                | MetricId::ScrapeDuration
                | MetricId::LastScrapeError
                | MetricId::SystemCpuLoad
                | MetricId::SystemMemoryUsage
                | MetricId::SystemMemoryTotal
                | MetricId::SystemUptime
                | MetricId::SystemStorageTotal
                | MetricId::SystemStorageFree
                | MetricId::SystemStorageUsed
                | MetricId::HealthVoltage
                | MetricId::HealthCurrent
                | MetricId::HealthPowerConsumed
                | MetricId::PppActiveUsers => &[],
                MetricId::CollectorSuccess | MetricId::CollectorDuration => &["collector"],
                MetricId::SystemInfo => &[
                    "board_name",
                    "model",
                    "serial_number",
                    "firmware_type",
                    "factory_firmware",
                    "current_firmware",
                    "upgrade_firmware",
                ],
                MetricId::InterfaceInfo => &["name", "type", "comment", "mac_address"],
                MetricId::InterfaceDisabled
                | MetricId::InterfaceRxBytes
                | MetricId::InterfaceTxBytes
                | MetricId::InterfaceRxPackets
                | MetricId::InterfaceTxPackets
                | MetricId::InterfaceRxErrors
                | MetricId::InterfaceTxErrors
                | MetricId::InterfaceRxDrops
                | MetricId::InterfaceTxDrops => &["name"],
                MetricId::HealthTemperature => &["sensor"],
                MetricId::HealthFanSpeed => &["fan"],
                MetricId::BgpPeerInfo => &[
                    "name",
                    "instance",
                    "remote_address",
                    "remote_as",
                    "local_address",
                    "local_role",
                    "remote_role",
                    "disabled",
                ],
                MetricId::BgpPeerState => &["name", "state_text"],
                MetricId::BgpPeerUptime
                | MetricId::BgpPeerPrefixCount
                | MetricId::BgpPeerUpdatesSent
                | MetricId::BgpPeerUpdatesReceived
                | MetricId::BgpPeerWithdrawsSent
                | MetricId::BgpPeerWithdrawsReceived => &["name"],
                MetricId::PppUserInfo => &["name", "service", "caller_id", "address", "uptime_text"],
                MetricId::PppUserUptime | MetricId::PppUserRxBytes | MetricId::PppUserTxBytes => {
                    &["name"]
                }
                MetricId::WirelessInterfaceInfo => &["name", "ssid", "frequency"],
                MetricId::WirelessInterfaceSignal
                | MetricId::WirelessInterfaceTxRate
                | MetricId::WirelessInterfaceRxRate => &["name"],
                MetricId::WirelessInterfaceClients => &["interface"],
                MetricId::WirelessClientInfo => &["interface", "mac_address", "uptime_text"],
                MetricId::WirelessClientSignal | MetricId::WirelessClientCcq => {
                    &["interface", "mac_address"]
                }
            }
        }
    }

    impl std::fmt::Display for MetricId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.name())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::collections::HashSet;

        #[test]
        fn schema_is_consistent() {
            let mut names = HashSet::new();
            for id in MetricId::ALL {
                assert!(names.insert(id.name()), "duplicate {}", id);
                assert!(id.name().starts_with(NAMESPACE));
                assert_eq!(
                    id.kind() == Kind::Counter,
                    id.name().ends_with("_total"),
                    "{}",
                    id
                );
                assert!(!id.help().is_empty());
            }
        }

        #[test]
        fn all_lists_families_in_order() {
            let mut sorted = MetricId::ALL.to_vec();
            sorted.sort();
            assert_eq!(sorted, MetricId::ALL);
        }
    }
}
