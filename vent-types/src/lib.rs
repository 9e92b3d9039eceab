//! Sparkplug B types shared by the ventilation edge bridge crates.
//!
//! Contains the protobuf payload messages, topic construction and the
//! [MetricValue] sum type used to build metrics.

pub mod constants;

/// Sparkplug B protobuf messages
pub mod payload;

pub mod topic;

pub mod utils;

mod value;

pub use value::*;
