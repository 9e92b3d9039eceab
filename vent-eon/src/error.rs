use std::time::Duration;

use thiserror::Error;

use crate::SessionState;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PublishError {
    #[error("Session not live. state={0:?}")]
    NotReady(SessionState),
    #[error("No metrics provided.")]
    NoMetrics,
    #[error("Transport rejected the publish.")]
    Transport,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command: {0}")]
    Unknown(String),
    #[error("Invalid actuator code: {0}")]
    InvalidCode(String),
    #[error("Interval requires a number of seconds")]
    MissingInterval,
    #[error("Invalid interval: {0}")]
    InvalidInterval(String),
    #[error("Interval out of range: {0:?}")]
    IntervalOutOfRange(Duration),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("group id must be provided")]
    MissingGroupId,
    #[error("node id must be provided")]
    MissingNodeId,
    #[error("device id must be provided")]
    MissingDeviceId,
    #[error("{0}")]
    InvalidName(String),
    #[error("Poll interval out of range: {0:?}")]
    InvalidPollInterval(Duration),
    #[error("Catalog has no registers")]
    EmptyCatalog,
}
