use std::time::Duration;

use crate::routeros::ApiError;

/// Failure of one step of a scrape.
///
/// Only `Connect` is fatal to a whole scrape. `Unsupported` means the device
/// lacks the feature and is reported as an empty result, not a failure.
#[derive(Debug)]
pub enum ScrapeError {
    /// Could not open or authenticate the session.
    Connect { address: String, source: ApiError },
    /// A command did not answer within the target timeout.
    Timeout { command: String, after: Duration },
    /// The device does not know the command or has the package disabled.
    Unsupported { command: String, message: String },
    /// The device or the transport failed the command.
    Command { command: String, source: ApiError },
    /// The reply lacked data the collector cannot do without.
    Collection(String),
}

impl ScrapeError {
    /// Whether this outcome counts against data completeness.
    pub fn is_failure(&self) -> bool {
        !matches!(self, ScrapeError::Unsupported { .. })
    }

    pub fn is_unsupported(&self) -> bool {
        !self.is_failure()
    }
}

impl std::fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScrapeError::Connect { address, source } => {
                write!(f, "connect to {} failed: {}", address, source)
            }
            ScrapeError::Timeout { command, after } => {
                write!(f, "command '{}' timed out after {:?}", command, after)
            }
            ScrapeError::Unsupported { command, message } => {
                write!(f, "command '{}' not supported: {}", command, message)
            }
            ScrapeError::Command { command, source } => {
                write!(f, "command '{}' failed: {}", command, source)
            }
            ScrapeError::Collection(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ScrapeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScrapeError::Connect { source, .. } | ScrapeError::Command { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}
