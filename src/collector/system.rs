use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::Collector;
use crate::error::ScrapeError;
use crate::fields::{resolve, resolve_duration, resolve_str, resolve_u64, Aliases};
use crate::parse::parse_measurement;
use crate::routeros::Record;
use crate::scrape::ScrapeResult;
use crate::session::CommandSession;

const RESOURCE_PRINT: &str = "/system/resource/print";
const ROUTERBOARD_PRINT: &str = "/system/routerboard/print";
const HEALTH_PRINT: &str = "/system/health/print";

/// Snapshot of `/system/resource`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemResource {
    pub uptime: Duration,
    pub free_memory: u64,
    pub total_memory: u64,
    pub cpu_load_percent: u64,
    /// Bytes; the device reports KiB.
    pub free_storage: u64,
    pub total_storage: u64,
    pub board_name: String,
    pub model: String,
    pub serial_number: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouterboardIdentity {
    pub board_name: String,
    pub model: String,
    pub serial_number: String,
    pub firmware_type: String,
    pub factory_firmware: String,
    pub current_firmware: String,
    pub upgrade_firmware: String,
}

/// Sensor readings; zero means the sensor is absent or unreadable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemHealth {
    pub cpu_temperature: f64,
    pub board_temperature: f64,
    pub voltage: f64,
    pub current: f64,
    pub power_consumed: f64,
    pub fan_speed: f64,
}

fn first_record(reply_records: Vec<Record>, command: &str) -> Result<Record, ScrapeError> {
    reply_records
        .into_iter()
        .next()
        .ok_or_else(|| ScrapeError::Collection(format!("no data received from {}", command)))
}

/// Memory, CPU, storage and uptime.
pub struct SystemResourceCollector;

#[async_trait]
impl Collector for SystemResourceCollector {
    fn name(&self) -> &str {
        "system"
    }

    async fn collect(
        &self,
        session: &mut CommandSession,
        out: &mut ScrapeResult,
    ) -> Result<(), ScrapeError> {
        let reply = session.execute(&[RESOURCE_PRINT]).await?;
        let record = first_record(reply.records, RESOURCE_PRINT)?;

        let resource = SystemResource {
            uptime: resolve_duration(&record, &["uptime"]),
            free_memory: resolve_u64(&record, &["free-memory"]),
            total_memory: resolve_u64(&record, &["total-memory"]),
            cpu_load_percent: resolve_u64(&record, &["cpu-load"]),
            free_storage: resolve_u64(&record, &["free-hdd-space"]).saturating_mul(1024),
            total_storage: resolve_u64(&record, &["total-hdd-space"]).saturating_mul(1024),
            board_name: resolve_str(&record, &["board-name"]),
            model: resolve_str(&record, &["model"]),
            serial_number: resolve_str(&record, &["serial-number"]),
        };
        debug!(cpu_load = resource.cpu_load_percent, uptime = ?resource.uptime, "system resources");
        out.system = Some(resource);
        Ok(())
    }
}

/// Board identity and firmware versions.
pub struct RouterboardCollector;

#[async_trait]
impl Collector for RouterboardCollector {
    fn name(&self) -> &str {
        "routerboard"
    }

    async fn collect(
        &self,
        session: &mut CommandSession,
        out: &mut ScrapeResult,
    ) -> Result<(), ScrapeError> {
        let reply = session.execute(&[ROUTERBOARD_PRINT]).await?;
        let record = first_record(reply.records, ROUTERBOARD_PRINT)?;

        out.routerboard = Some(RouterboardIdentity {
            board_name: resolve_str(&record, &["board-name"]),
            model: resolve_str(&record, &["model"]),
            serial_number: resolve_str(&record, &["serial-number"]),
            firmware_type: resolve_str(&record, &["firmware-type"]),
            factory_firmware: resolve_str(&record, &["factory-firmware"]),
            current_firmware: resolve_str(&record, &["current-firmware"]),
            upgrade_firmware: resolve_str(&record, &["upgrade-firmware"]),
        });
        Ok(())
    }
}

const CPU_TEMPERATURE: Aliases = &["cpu-temperature", "temperature"];
const BOARD_TEMPERATURE: Aliases = &["board-temperature", "board-temperature1"];
const VOLTAGE: Aliases = &["voltage", "psu-voltage"];
const CURRENT: Aliases = &["current", "psu-current"];
const POWER: Aliases = &["power-consumption", "power"];
const FAN_SPEED: Aliases = &["fan1-speed", "fan-speed"];

const TEMPERATURE_UNITS: &[&str] = &["C"];
const VOLTAGE_UNITS: &[&str] = &["V"];
const CURRENT_UNITS: &[&str] = &["mA", "A"];
const POWER_UNITS: &[&str] = &["W"];
const FAN_UNITS: &[&str] = &["RPM"];

/// Voltage, temperature and fan sensors. Many models have none.
pub struct HealthCollector;

/// Merge the per-sensor shape (`name`/`value`/`type` records, RouterOS 7)
/// into the flat single-record shape older firmware returns.
fn fold_sensors(records: Vec<Record>) -> Record {
    let per_sensor = records
        .iter()
        .all(|r| r.contains_key("name") && r.contains_key("value"));
    if !per_sensor {
        return records.into_iter().next().unwrap_or_default();
    }
    let mut folded = HashMap::with_capacity(records.len());
    for mut record in records {
        if let (Some(name), Some(value)) = (record.remove("name"), record.remove("value")) {
            folded.insert(name, value);
        }
    }
    folded
}

fn reading(record: &Record, aliases: Aliases, units: &[&str]) -> f64 {
    let Some((field, value)) = resolve(record, aliases) else {
        return 0.0;
    };
    match parse_measurement(value, units) {
        Ok(v) => v,
        Err(e) => {
            warn!(field, error = %e, "unreadable health sensor");
            0.0
        }
    }
}

#[async_trait]
impl Collector for HealthCollector {
    fn name(&self) -> &str {
        "health"
    }

    async fn collect(
        &self,
        session: &mut CommandSession,
        out: &mut ScrapeResult,
    ) -> Result<(), ScrapeError> {
        let reply = match session.execute(&[HEALTH_PRINT]).await {
            Ok(reply) => reply,
            Err(e) if e.is_unsupported() => {
                info!(address = %session.target().address, "health sensors not supported");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        if reply.records.is_empty() {
            info!(address = %session.target().address, "no health data received");
            return Ok(());
        }

        let record = fold_sensors(reply.records);
        let mut health = SystemHealth {
            cpu_temperature: reading(&record, CPU_TEMPERATURE, TEMPERATURE_UNITS),
            board_temperature: reading(&record, BOARD_TEMPERATURE, TEMPERATURE_UNITS),
            voltage: reading(&record, VOLTAGE, VOLTAGE_UNITS),
            current: reading(&record, CURRENT, CURRENT_UNITS),
            power_consumed: reading(&record, POWER, POWER_UNITS),
            fan_speed: reading(&record, FAN_SPEED, FAN_UNITS),
        };
        // some boards report milliamps
        if resolve(&record, CURRENT).is_some_and(|(_, v)| v.trim_end().ends_with("mA")) {
            health.current /= 1000.0;
        }
        out.health = Some(health);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record, session, FakeDevice, Response};

    async fn run(collector: &dyn Collector, device: &FakeDevice) -> (ScrapeResult, Result<(), ScrapeError>) {
        let mut session = session(device);
        let mut out = ScrapeResult::default();
        let result = collector.collect(&mut session, &mut out).await;
        (out, result)
    }

    #[tokio::test]
    async fn system_resource_scales_storage() {
        let device = FakeDevice::new().respond(
            RESOURCE_PRINT,
            Response::records(vec![record(&[
                ("uptime", "1d2h"),
                ("free-memory", "100"),
                ("total-memory", "300"),
                ("cpu-load", "7"),
                ("free-hdd-space", "2"),
                ("total-hdd-space", "4"),
                ("board-name", "hEX"),
            ])]),
        );
        let (out, result) = run(&SystemResourceCollector, &device).await;
        result.unwrap();
        let system = out.system.unwrap();
        assert_eq!(system.uptime, Duration::from_secs(26 * 3600));
        assert_eq!(system.cpu_load_percent, 7);
        assert_eq!(system.free_storage, 2048);
        assert_eq!(system.total_storage, 4096);
        assert_eq!(system.board_name, "hEX");
    }

    #[tokio::test]
    async fn system_resource_requires_a_record() {
        let device = FakeDevice::new().respond(RESOURCE_PRINT, Response::records(vec![]));
        let (out, result) = run(&SystemResourceCollector, &device).await;
        assert!(matches!(result, Err(ScrapeError::Collection(_))));
        assert!(out.system.is_none());
    }

    #[tokio::test]
    async fn bad_field_defaults_to_zero() {
        let device = FakeDevice::new().respond(
            RESOURCE_PRINT,
            Response::records(vec![record(&[("uptime", "forever"), ("cpu-load", "high")])]),
        );
        let (out, result) = run(&SystemResourceCollector, &device).await;
        result.unwrap();
        let system = out.system.unwrap();
        assert_eq!(system.uptime, Duration::ZERO);
        assert_eq!(system.cpu_load_percent, 0);
    }

    #[tokio::test]
    async fn routerboard_identity() {
        let device = FakeDevice::new().respond(
            ROUTERBOARD_PRINT,
            Response::records(vec![record(&[
                ("model", "RB4011"),
                ("serial-number", "ABC123"),
                ("current-firmware", "7.12"),
            ])]),
        );
        let (out, result) = run(&RouterboardCollector, &device).await;
        result.unwrap();
        let rb = out.routerboard.unwrap();
        assert_eq!(rb.model, "RB4011");
        assert_eq!(rb.current_firmware, "7.12");
        assert_eq!(rb.upgrade_firmware, "");
    }

    #[tokio::test]
    async fn routerboard_empty_is_an_error() {
        let device = FakeDevice::new().respond(ROUTERBOARD_PRINT, Response::records(vec![]));
        let (_, result) = run(&RouterboardCollector, &device).await;
        assert!(result.unwrap_err().is_failure());
    }

    #[tokio::test]
    async fn health_flat_shape() {
        let device = FakeDevice::new().respond(
            HEALTH_PRINT,
            Response::records(vec![record(&[
                ("temperature", "41C"),
                ("voltage", "24.1V"),
                ("fan1-speed", "3200RPM"),
            ])]),
        );
        let (out, result) = run(&HealthCollector, &device).await;
        result.unwrap();
        let health = out.health.unwrap();
        assert_eq!(health.cpu_temperature, 41.0);
        assert_eq!(health.voltage, 24.1);
        assert_eq!(health.fan_speed, 3200.0);
        assert_eq!(health.board_temperature, 0.0);
    }

    #[tokio::test]
    async fn health_per_sensor_shape() {
        let device = FakeDevice::new().respond(
            HEALTH_PRINT,
            Response::records(vec![
                record(&[("name", "cpu-temperature"), ("value", "52"), ("type", "C")]),
                record(&[("name", "board-temperature1"), ("value", "38"), ("type", "C")]),
                record(&[("name", "power-consumption"), ("value", "11.5"), ("type", "W")]),
            ]),
        );
        let (out, result) = run(&HealthCollector, &device).await;
        result.unwrap();
        let health = out.health.unwrap();
        assert_eq!(health.cpu_temperature, 52.0);
        assert_eq!(health.board_temperature, 38.0);
        assert_eq!(health.power_consumed, 11.5);
    }

    #[tokio::test]
    async fn health_unknown_unit_is_unreadable() {
        let device = FakeDevice::new().respond(
            HEALTH_PRINT,
            Response::records(vec![record(&[("temperature", "105F")])]),
        );
        let (out, result) = run(&HealthCollector, &device).await;
        result.unwrap();
        assert_eq!(out.health.unwrap().cpu_temperature, 0.0);
    }

    #[tokio::test]
    async fn health_absent_is_not_an_error() {
        let device = FakeDevice::new();
        let (out, result) = run(&HealthCollector, &device).await;
        result.unwrap();
        assert!(out.health.is_none());

        let device = FakeDevice::new().respond(HEALTH_PRINT, Response::records(vec![]));
        let (out, result) = run(&HealthCollector, &device).await;
        result.unwrap();
        assert!(out.health.is_none());
    }

    #[tokio::test]
    async fn health_disabled_is_not_an_error() {
        let device = FakeDevice::new().respond(HEALTH_PRINT, Response::trap("health feature is disabled"));
        let (out, result) = run(&HealthCollector, &device).await;
        result.unwrap();
        assert!(out.health.is_none());
    }
}
