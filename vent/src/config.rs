//! Configuration file for the `vent-edge` binary.
//!
//! Only the broker host and the serial port have no default; everything else falls back
//! to the values the DV10 unit ships with.

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vent_client_rumqtt::{DEFAULT_REQUEST_CAPACITY, MIN_REQUEST_CAPACITY};
use vent_eon::Command;
use vent_modbus::RegisterKind;
use vent_types::utils::validate_name;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// MQTT broker connection settings
    pub mqtt: MqttConfig,

    /// Sparkplug identity of the edge node and its device
    #[serde(default)]
    pub sparkplug: SparkplugConfig,

    /// Serial link to the ventilation unit
    pub modbus: ModbusConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    /// Log filter, e.g. "info" or "vent_eon=debug". `RUST_LOG` takes precedence.
    #[serde(default)]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub host: String,

    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,

    /// Wait before retrying a failed connect
    #[serde(default = "default_reconnect_backoff")]
    pub reconnect_backoff_secs: u64,

    /// Give up on a connect attempt after this long
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Publishes and subscribes that can be queued between event loop polls
    #[serde(default = "default_request_capacity")]
    pub request_capacity: usize,
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "vent-edge".to_string()
}

fn default_keep_alive() -> u64 {
    30
}

fn default_reconnect_backoff() -> u64 {
    5
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_capacity() -> usize {
    DEFAULT_REQUEST_CAPACITY
}

impl MqttConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_secs(self.reconnect_backoff_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Username and password, if both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some((username.as_str(), password.as_str())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparkplugConfig {
    #[serde(default = "default_group_id")]
    pub group_id: String,

    #[serde(default = "default_edge_node_id")]
    pub edge_node_id: String,

    #[serde(default = "default_device_id")]
    pub device_id: String,
}

fn default_group_id() -> String {
    "Ventilation".to_string()
}

fn default_edge_node_id() -> String {
    "DV10_ESP32".to_string()
}

fn default_device_id() -> String {
    "Sensor_Unit".to_string()
}

impl Default for SparkplugConfig {
    fn default() -> Self {
        Self {
            group_id: default_group_id(),
            edge_node_id: default_edge_node_id(),
            device_id: default_device_id(),
        }
    }
}

/// Register table polled by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterTable {
    #[default]
    Input,
    Holding,
}

impl From<RegisterTable> for RegisterKind {
    fn from(value: RegisterTable) -> Self {
        match value {
            RegisterTable::Input => RegisterKind::Input,
            RegisterTable::Holding => RegisterKind::Holding,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModbusConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0" or "COM1")
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Modbus slave ID (1-247)
    #[serde(default = "default_slave_id")]
    pub slave_id: u8,

    #[serde(default)]
    pub register_kind: RegisterTable,

    /// Timeout of a single register read or write
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Pause between consecutive register reads
    #[serde(default = "default_read_spacing_ms")]
    pub read_spacing_ms: u64,
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_slave_id() -> u8 {
    1
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_read_spacing_ms() -> u64 {
    50
}

impl ModbusConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn read_spacing(&self) -> Duration {
        Duration::from_millis(self.read_spacing_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_auto_read")]
    pub auto_read: bool,

    /// Poll interval in seconds (5-300)
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
}

fn default_auto_read() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    5
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            auto_read: default_auto_read(),
            interval_secs: default_poll_interval(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.host.is_empty() {
            return Err(ConfigError::Validation(
                "MQTT host cannot be empty".to_string(),
            ));
        }
        if self.mqtt.client_id.is_empty() {
            return Err(ConfigError::Validation(
                "MQTT client_id cannot be empty".to_string(),
            ));
        }
        if self.mqtt.request_capacity < MIN_REQUEST_CAPACITY {
            return Err(ConfigError::Validation(format!(
                "mqtt.request_capacity must be at least {MIN_REQUEST_CAPACITY}, got {}",
                self.mqtt.request_capacity
            )));
        }
        if self.mqtt.username.is_some() != self.mqtt.password.is_some() {
            return Err(ConfigError::Validation(
                "MQTT username and password must be set together".to_string(),
            ));
        }

        for (field, name) in [
            ("group_id", &self.sparkplug.group_id),
            ("edge_node_id", &self.sparkplug.edge_node_id),
            ("device_id", &self.sparkplug.device_id),
        ] {
            validate_name(name)
                .map_err(|e| ConfigError::Validation(format!("sparkplug.{field}: {e}")))?;
        }

        if self.modbus.port.is_empty() {
            return Err(ConfigError::Validation(
                "Serial port cannot be empty".to_string(),
            ));
        }
        if !(1..=247).contains(&self.modbus.slave_id) {
            return Err(ConfigError::Validation(format!(
                "slave_id must be 1-247, got {}",
                self.modbus.slave_id
            )));
        }
        if self.modbus.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "timeout_ms must be greater than 0".to_string(),
            ));
        }

        Command::validate_interval(self.polling.interval())
            .map_err(|e| ConfigError::Validation(format!("polling.interval_secs: {e}")))?;

        Ok(())
    }
}
