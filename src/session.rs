//! One device, one scrape, one connection.
//!
//! The session connects lazily, runs every command on its own task raced
//! against the target timeout, and drops the connection whenever a command
//! fails or times out so the next command starts from a clean socket.

use std::net::{Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::ScrapeError;
use crate::routeros::{Connection, Connector, Reply, DEFAULT_API_PORT};

/// Per-command wait when nothing else is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where and how to reach a device for one scrape.
#[derive(Clone)]
pub struct Target {
    pub address: String,
    pub username: String,
    pub password: String,
    pub port: Option<u16>,
    /// Used when neither `port` nor the address names one.
    pub default_port: u16,
    /// Applies to connecting and to each command.
    pub timeout: Duration,
}

impl Target {
    pub fn new(address: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            username: username.into(),
            password: password.into(),
            port: None,
            default_port: DEFAULT_API_PORT,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    pub fn with_default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.timeout = timeout;
        }
        self
    }

    /// `host:port` to dial, filling in the API port when none is given.
    pub fn socket_address(&self) -> String {
        match self.port {
            Some(port) => join_host_port(&self.address, port),
            None if has_port(&self.address) => self.address.clone(),
            None => join_host_port(&self.address, self.default_port),
        }
    }
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("default_port", &self.default_port)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn has_port(address: &str) -> bool {
    if address.parse::<SocketAddr>().is_ok() {
        return true;
    }
    if address.starts_with('[') {
        return address.contains("]:");
    }
    address.matches(':').count() == 1
}

fn join_host_port(host: &str, port: u16) -> String {
    if host.parse::<Ipv6Addr>().is_ok() {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Borrows only the connector and target; the returned future must be `Send`.
async fn open(connector: &dyn Connector, target: &Target) -> Result<Box<dyn Connection>, ScrapeError> {
    let address = target.socket_address();
    info!(address = %address, timeout = ?target.timeout, "connecting to router");
    connector.connect(target).await.map_err(|source| {
        warn!(address = %address, error = %source, "connect failed");
        ScrapeError::Connect { address, source }
    })
}

pub struct CommandSession {
    target: Target,
    connector: Arc<dyn Connector>,
    conn: Option<Box<dyn Connection>>,
}

impl CommandSession {
    pub fn new(target: Target, connector: Arc<dyn Connector>) -> Self {
        Self {
            target,
            connector,
            conn: None,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Open the connection unless one is already live.
    pub async fn connect(&mut self) -> Result<(), ScrapeError> {
        if self.conn.is_none() {
            self.conn = Some(open(self.connector.as_ref(), &self.target).await?);
        }
        Ok(())
    }

    /// Run one command, given as its path followed by API arguments.
    pub async fn execute(&mut self, sentence: &[&str]) -> Result<Reply, ScrapeError> {
        let mut conn = match self.conn.take() {
            Some(conn) => conn,
            None => open(self.connector.as_ref(), &self.target).await?,
        };

        let command = sentence.join(" ");
        let words: Vec<String> = sentence.iter().map(|w| w.to_string()).collect();
        debug!(address = %self.target.address, command = %command, "running command");

        let task = tokio::spawn(async move {
            let result = conn.run(&words).await;
            (conn, result)
        });
        let abort = task.abort_handle();

        match tokio::time::timeout(self.target.timeout, task).await {
            Ok(Ok((conn, Ok(reply)))) => {
                self.conn = Some(conn);
                Ok(reply)
            }
            Ok(Ok((mut conn, Err(source)))) => {
                conn.close().await;
                if source.is_unsupported() {
                    debug!(command = %command, error = %source, "command not supported");
                    return Err(ScrapeError::Unsupported {
                        command,
                        message: source.to_string(),
                    });
                }
                warn!(address = %self.target.address, command = %command, error = %source, "command failed");
                Err(ScrapeError::Command { command, source })
            }
            Ok(Err(join_error)) => {
                warn!(address = %self.target.address, command = %command, error = %join_error, "command task died");
                Err(ScrapeError::Command {
                    command,
                    source: crate::routeros::ApiError::Protocol(join_error.to_string()),
                })
            }
            Err(_) => {
                // Aborting drops the connection the task owns, closing the socket.
                abort.abort();
                warn!(address = %self.target.address, command = %command, "command timed out");
                Err(ScrapeError::Timeout {
                    command,
                    after: self.target.timeout,
                })
            }
        }
    }

    /// Try each command in order until one is supported.
    ///
    /// Stops at the first success or the first failure that is not
    /// "unsupported". Returns `Ok(None)` when every candidate was rejected.
    pub async fn execute_first_supported(
        &mut self,
        candidates: &[&[&str]],
    ) -> Result<Option<Reply>, ScrapeError> {
        for sentence in candidates {
            match self.execute(sentence).await {
                Ok(reply) => return Ok(Some(reply)),
                Err(e) if e.is_unsupported() => {
                    debug!(error = %e, "trying next command path");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    pub async fn close(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            debug!(address = %self.target.address, "closing connection");
            conn.close().await;
        }
    }
}
