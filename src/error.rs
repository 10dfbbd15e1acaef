use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;

use crate::properties::AgentId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum PerspectiveError {
    /// Registry, sink or tick-rate misconfiguration. The only fatal class: it is surfaced at
    /// startup and never retried per tick.
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Empty identifier: {0}")]
    EmptyIdentifier(String),
    #[error("Invalid fact: {0}")]
    InvalidFact(String),
    #[error("Index {index} out of range for a store of {len} facts")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("No fact store for agent {0}")]
    UnknownAgent(AgentId),
    #[error("File System error: {0}")]
    Io(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Tick service is not running")]
    ServiceStopped,
}

impl PerspectiveError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, PerspectiveError::Configuration(_))
    }
}

impl From<toml::de::Error> for PerspectiveError {
    fn from(src: toml::de::Error) -> PerspectiveError {
        PerspectiveError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for PerspectiveError {
    fn from(src: toml::ser::Error) -> PerspectiveError {
        PerspectiveError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for PerspectiveError {
    fn from(src: JsonError) -> PerspectiveError {
        PerspectiveError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<io::Error> for PerspectiveError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => PerspectiveError::Io(format!("Not found: {x}")),
            _ => PerspectiveError::Io(format!("IOError: {}", x.kind())),
        }
    }
}
