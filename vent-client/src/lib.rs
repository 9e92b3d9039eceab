//! Part of the ventilation edge bridge.
//!
//! This library defines the traits and types the edge node uses to talk to its
//! publish/subscribe transport. Outbound traffic is births, data and deaths; the only
//! inbound traffic is node and device commands.
//!
//! # Feature Flags
//!
//! - `channel-client`: Enables the channel based [EventLoop] and [Client] implementation. Disabled by default.
//!

mod traits;
mod types;
mod utils;

pub use traits::{Client, DynClient, DynEventLoop, EventLoop};
pub use types::*;
pub use utils::{parse_command, publish_to_event};

/// A basic [EventLoop] and [Client] implementation based on channels
///
/// Useful for writing tests where it is not appropriate to be running a real MQTT client and broker setup
#[cfg(feature = "channel-client")]
pub mod channel;
