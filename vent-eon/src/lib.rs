//! Part of the ventilation edge bridge.
//!
//! A Sparkplug edge node that polls a Modbus ventilation unit and publishes its readings
//! as device metrics.
//!
//! The session follows the birth/death discipline: an NBIRTH (seq 0) and DBIRTH (seq 1)
//! are published on every (re)connect before any DDATA, and DDATA sequence numbers
//! increase by one modulo 256 until the next birth.
//!
//! See [BridgeBuilder] on how to create a [Bridge].

mod birth;
mod bridge;
mod builder;
mod command;
mod error;
mod metric;
mod publisher;
mod session;

pub use bridge::{Bridge, BridgeHandle, BridgeStatus};
pub use builder::BridgeBuilder;
pub use command::{Command, MAX_POLL_INTERVAL, MIN_POLL_INTERVAL};
pub use error::{BuildError, CommandError, PublishError};
pub use metric::MetricEnvelope;
pub use publisher::{MetricPublisher, SessionTopics};
pub use session::{
    SequenceCounter, SessionState, SessionStateMachine, SessionStats, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_RECONNECT_BACKOFF,
};
