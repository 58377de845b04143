use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

use crate::scrape::ScrapeOptions;

/// Top-level configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub exporter: ExporterConfig,
    #[serde(default)]
    pub collectors: CollectorDefaults,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExporterConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
    /// Connect timeout and per-command deadline.
    #[serde(default = "default_scrape_timeout")]
    pub scrape_timeout_secs: u64,
    #[serde(default = "default_username")]
    pub default_username: String,
    #[serde(default = "default_port")]
    pub default_port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            metrics_path: default_metrics_path(),
            scrape_timeout_secs: default_scrape_timeout(),
            default_username: default_username(),
            default_port: default_port(),
            log_level: default_log_level(),
        }
    }
}

/// Optional collectors used when a request does not say.
#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct CollectorDefaults {
    #[serde(default)]
    pub bgp: bool,
    #[serde(default)]
    pub ppp: bool,
    #[serde(default)]
    pub wireless: bool,
}

impl CollectorDefaults {
    pub fn options(&self) -> ScrapeOptions {
        ScrapeOptions {
            collect_bgp: self.bgp,
            collect_ppp: self.ppp,
            collect_wireless: self.wireless,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let expanded = expand_env_vars(&content)?;

        let config: Config = toml::from_str(&expanded)
            .with_context(|| format!("Failed to parse configuration: {}", path))?;

        Ok(config)
    }

    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.exporter.scrape_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        self.exporter
            .listen_address
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid listen_address: {}", self.exporter.listen_address))?;

        let path = &self.exporter.metrics_path;
        if !path.starts_with('/') || path.len() < 2 {
            bail!("metrics_path must start with '/' and not be the root: {}", path);
        }
        if matches!(path.as_str(), "/health") {
            bail!("metrics_path collides with the health endpoint: {}", path);
        }
        if self.exporter.scrape_timeout_secs == 0 {
            bail!("scrape_timeout_secs must be greater than zero");
        }
        if self.exporter.default_port == 0 {
            bail!("default_port must be greater than zero");
        }
        if self.exporter.default_username.is_empty() {
            bail!("default_username must not be empty");
        }
        Ok(())
    }
}

/// Expand `${VAR}` references; unset variables become empty strings.
fn expand_env_vars(input: &str) -> Result<String> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").context("Invalid env var pattern")?;
    Ok(re
        .replace_all(input, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_default()
        })
        .to_string())
}

// Default value functions
fn default_listen_address() -> String { "0.0.0.0:9483".to_string() }
fn default_metrics_path() -> String { "/metrics".to_string() }
fn default_scrape_timeout() -> u64 { 10 }
fn default_username() -> String { "prometheus".to_string() }
fn default_port() -> u16 { crate::routeros::DEFAULT_API_PORT }
fn default_log_level() -> String { "info".to_string() }
