use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{error, info};
use vent::{
    client::mqtt_client::rumqtt,
    config::Config,
    console,
    eon::BridgeBuilder,
    modbus::{Bus, RtuTransceiver},
};

/// Sparkplug B edge bridge for a DV10 ventilation unit.
#[derive(Parser, Debug)]
#[command(name = "vent-edge")]
#[command(about = "Polls a DV10 ventilation unit over Modbus RTU and publishes Sparkplug B telemetry")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "vent.json")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Do not read commands from stdin.
    #[arg(long)]
    no_console: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    let level = args
        .log_level
        .clone()
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    info!("Loaded configuration from {:?}", args.config);

    let mut options =
        rumqtt::MqttOptions::new(&config.mqtt.client_id, &config.mqtt.host, config.mqtt.port);
    options.set_keep_alive(config.mqtt.keep_alive());
    if let Some((username, password)) = config.mqtt.credentials() {
        options.set_credentials(username, password);
    }
    let (eventloop, client) = rumqtt::EventLoop::new(options, config.mqtt.request_capacity);

    let transceiver = RtuTransceiver::open(
        &config.modbus.port,
        config.modbus.baud_rate,
        config.modbus.slave_id,
        config.modbus.register_kind.into(),
    )
    .with_context(|| format!("Failed to open serial port {}", config.modbus.port))?;
    let bus = Bus::new(transceiver).with_timeout(config.modbus.timeout());

    let (bridge, handle) = BridgeBuilder::new(eventloop, client, bus)
        .with_group_id(&config.sparkplug.group_id)
        .with_node_id(&config.sparkplug.edge_node_id)
        .with_device_id(&config.sparkplug.device_id)
        .with_poll_interval(config.polling.interval())
        .with_read_spacing(config.modbus.read_spacing())
        .with_reconnect_backoff(config.mqtt.reconnect_backoff())
        .with_connect_timeout(config.mqtt.connect_timeout())
        .with_auto_read(config.polling.auto_read)
        .build()
        .context("Invalid bridge configuration")?;

    if !args.no_console {
        let console_handle = handle.clone();
        tokio::spawn(async move {
            let lines = console::stdin_lines();
            if let Err(e) = console::run(lines, tokio::io::stdout(), console_handle).await {
                error!("Console stopped. error={e}");
            }
        });
    }

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to register CTRL-C handler: {e}");
            return;
        }
        info!("Received shutdown signal");
        handle.cancel().await;
    });

    info!(
        "Starting bridge. broker={}:{} port={}",
        config.mqtt.host, config.mqtt.port, config.modbus.port
    );
    bridge.run().await;
    info!("vent-edge stopped");

    Ok(())
}
