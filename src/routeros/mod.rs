//! Client side of the RouterOS API (TCP 8728).
//!
//! The engine only needs three things from the device: connect with a
//! deadline, run one command and get its reply, close. `Connector` and
//! `Connection` capture exactly that so the session can be driven by a
//! scripted device in tests.

pub mod proto;

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::io::{BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

use crate::session::Target;

pub const DEFAULT_API_PORT: u16 = 8728;

/// Attributes of one `!re` sentence.
pub type Record = HashMap<String, String>;

/// Everything the device sent back for one command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    pub records: Vec<Record>,
    /// Attributes carried on the closing `!done`.
    pub done: Record,
}

/// Trap messages meaning the command or its package is not available.
/// A bare "disabled" is not enough: `failure: interface is disabled` is a
/// real error.
const UNSUPPORTED_SIGNALS: &[&str] = &[
    "no such command",
    "unknown command name",
    "package is disabled",
    "package disabled",
    "feature is disabled",
    "feature disabled",
];

#[derive(Debug)]
pub enum ApiError {
    Io(std::io::Error),
    /// Command rejected by the device (`!trap`).
    Trap { message: String, category: Option<u32> },
    /// Device closed the session (`!fatal`).
    Fatal(String),
    Auth(String),
    Protocol(String),
}

impl ApiError {
    /// Whether the device is saying the feature does not exist here.
    pub fn is_unsupported(&self) -> bool {
        match self {
            ApiError::Trap { message, .. } => {
                let message = message.to_lowercase();
                UNSUPPORTED_SIGNALS.iter().any(|s| message.contains(s))
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Io(e) => write!(f, "I/O error: {}", e),
            ApiError::Trap { message, .. } => write!(f, "from RouterOS device: {}", message),
            ApiError::Fatal(msg) => write!(f, "fatal from RouterOS device: {}", msg),
            ApiError::Auth(msg) => write!(f, "authentication failed: {}", msg),
            ApiError::Protocol(msg) => write!(f, "protocol error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::Io(e)
    }
}

/// An authenticated channel to one device.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Send one sentence (command path followed by its arguments) and wait
    /// for the complete reply.
    async fn run(&mut self, sentence: &[String]) -> Result<Reply, ApiError>;

    async fn close(&mut self);
}

/// Opens connections to devices.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, target: &Target) -> Result<Box<dyn Connection>, ApiError>;
}

/// Plain-TCP RouterOS API connector.
#[derive(Debug, Clone, Default)]
pub struct ApiConnector;

#[async_trait]
impl Connector for ApiConnector {
    async fn connect(&self, target: &Target) -> Result<Box<dyn Connection>, ApiError> {
        let address = target.socket_address();
        let dial = async {
            let stream = TcpStream::connect(&address).await?;
            stream.set_nodelay(true)?;
            let mut conn = ApiConnection::new(stream);
            conn.login(&target.username, &target.password).await?;
            Ok::<_, ApiError>(conn)
        };
        match tokio::time::timeout(target.timeout, dial).await {
            Ok(Ok(conn)) => Ok(Box::new(conn)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ApiError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("connect to {} timed out after {:?}", address, target.timeout),
            ))),
        }
    }
}

pub struct ApiConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl ApiConnection {
    fn new(stream: TcpStream) -> Self {
        let (read, write) = stream.into_split();
        Self {
            reader: BufReader::new(read),
            writer: BufWriter::new(write),
        }
    }

    async fn login(&mut self, username: &str, password: &str) -> Result<(), ApiError> {
        let sentence = [
            "/login".to_string(),
            format!("=name={}", username),
            format!("=password={}", password),
        ];
        let reply = match self.run(&sentence).await {
            Ok(reply) => reply,
            Err(ApiError::Trap { message, .. }) => return Err(ApiError::Auth(message)),
            Err(e) => return Err(e),
        };
        if reply.done.contains_key("ret") {
            // Pre-6.43 firmware answers with an MD5 challenge instead.
            return Err(ApiError::Auth(
                "device requested legacy challenge login".to_string(),
            ));
        }
        debug!(username, "logged in");
        Ok(())
    }
}

#[async_trait]
impl Connection for ApiConnection {
    async fn run(&mut self, sentence: &[String]) -> Result<Reply, ApiError> {
        proto::write_sentence(&mut self.writer, sentence).await?;
        proto::read_reply(&mut self.reader).await
    }

    async fn close(&mut self) {
        use tokio::io::AsyncWriteExt;
        let _ = proto::write_sentence(&mut self.writer, &["/quit"]).await;
        let _ = self.writer.shutdown().await;
    }
}
