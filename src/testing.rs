//! Scripted in-memory RouterOS device for engine tests.
//!
//! Responses are looked up by the full sentence first (`"/interface/print =stats="`)
//! and then by the command path alone. Commands with no script answer with the
//! trap a real device sends for an unknown path.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::routeros::{ApiError, Connection, Connector, Record, Reply};
use crate::session::{CommandSession, Target};

pub fn record(pairs: &[(&str, &str)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn target() -> Target {
    Target::new("192.0.2.1", "prometheus", "secret").with_timeout(Duration::from_millis(200))
}

/// A fresh session against `device` with a short command timeout.
pub fn session(device: &FakeDevice) -> CommandSession {
    CommandSession::new(target(), device.connector())
}

#[derive(Debug, Clone)]
pub enum Response {
    Records(Vec<Record>),
    Trap(String),
    Fatal(String),
    /// Never answers.
    Hang,
    /// Answers after a pause.
    Delayed(Duration, Box<Response>),
}

impl Response {
    pub fn records(records: Vec<Record>) -> Self {
        Response::Records(records)
    }

    pub fn trap(message: &str) -> Self {
        Response::Trap(message.to_string())
    }
}

#[derive(Default)]
struct DeviceState {
    responses: HashMap<String, Response>,
    unreachable: bool,
    connects: usize,
    commands: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakeDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device that refuses every connection.
    pub fn unreachable() -> Self {
        let device = Self::default();
        device.state.lock().unwrap().unreachable = true;
        device
    }

    pub fn respond(self, command: &str, response: Response) -> Self {
        self.state
            .lock()
            .unwrap()
            .responses
            .insert(command.to_string(), response);
        self
    }

    pub fn connector(&self) -> Arc<dyn Connector> {
        Arc::new(self.clone())
    }

    pub fn connect_count(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    /// Every sentence issued, words joined by spaces, in order.
    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }

    fn lookup(&self, sentence: &[String]) -> Response {
        let mut state = self.state.lock().unwrap();
        let full = sentence.join(" ");
        state.commands.push(full.clone());
        let path = sentence.first().cloned().unwrap_or_default();
        state
            .responses
            .get(&full)
            .or_else(|| state.responses.get(&path))
            .cloned()
            .unwrap_or_else(|| Response::trap("no such command prefix"))
    }
}

#[async_trait]
impl Connector for FakeDevice {
    async fn connect(&self, _target: &Target) -> Result<Box<dyn Connection>, ApiError> {
        let mut state = self.state.lock().unwrap();
        if state.unreachable {
            return Err(ApiError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }
        state.connects += 1;
        Ok(Box::new(FakeConnection {
            device: self.clone(),
        }))
    }
}

struct FakeConnection {
    device: FakeDevice,
}

#[async_trait]
impl Connection for FakeConnection {
    async fn run(&mut self, sentence: &[String]) -> Result<Reply, ApiError> {
        let mut response = self.device.lookup(sentence);
        loop {
            match response {
                Response::Records(records) => {
                    return Ok(Reply {
                        records,
                        done: Record::new(),
                    })
                }
                Response::Trap(message) => {
                    return Err(ApiError::Trap {
                        message,
                        category: None,
                    })
                }
                Response::Fatal(message) => return Err(ApiError::Fatal(message)),
                Response::Hang => return std::future::pending().await,
                Response::Delayed(pause, next) => {
                    tokio::time::sleep(pause).await;
                    response = *next;
                }
            }
        }
    }

    async fn close(&mut self) {}
}
