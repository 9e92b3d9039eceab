use std::{sync::Arc, time::Duration};

use vent_client::{Client, DynClient, DynEventLoop, EventLoop};
use vent_modbus::{Bus, ControlChannel, PollingEngine, RegisterCatalog, DEFAULT_READ_SPACING};
use vent_types::utils::validate_name;

use crate::{
    bridge::BridgeParts, Bridge, BridgeHandle, BuildError, Command, MetricPublisher,
    SessionStateMachine, DEFAULT_CONNECT_TIMEOUT, DEFAULT_RECONNECT_BACKOFF, MIN_POLL_INTERVAL,
};

/// A builder for creating and configuring [Bridge] instances.
pub struct BridgeBuilder {
    group_id: Option<String>,
    node_id: Option<String>,
    device_id: Option<String>,
    eventloop_client: (Box<DynEventLoop>, Arc<DynClient>),
    bus: Bus,
    catalog: RegisterCatalog,
    poll_interval: Duration,
    read_spacing: Duration,
    reconnect_backoff: Duration,
    connect_timeout: Duration,
    auto_read: bool,
}

impl BridgeBuilder {
    /// Creates a new builder with the specified event loop, client and device bus.
    ///
    /// Defaults to the DV10 register catalog with auto read enabled.
    pub fn new<E, C>(eventloop: E, client: C, bus: Bus) -> Self
    where
        E: EventLoop + Send + 'static,
        C: Client + Send + Sync + 'static,
    {
        Self {
            group_id: None,
            node_id: None,
            device_id: None,
            eventloop_client: (Box::new(eventloop), Arc::new(client)),
            bus,
            catalog: RegisterCatalog::dv10(),
            poll_interval: MIN_POLL_INTERVAL,
            read_spacing: DEFAULT_READ_SPACING,
            reconnect_backoff: DEFAULT_RECONNECT_BACKOFF,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            auto_read: true,
        }
    }

    /// Sets the group ID the edge node belongs to.
    pub fn with_group_id<S: Into<String>>(mut self, group_id: S) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Sets the edge node ID.
    pub fn with_node_id<S: Into<String>>(mut self, node_id: S) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    /// Sets the ID of the device the catalog registers are published under.
    pub fn with_device_id<S: Into<String>>(mut self, device_id: S) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn with_catalog(mut self, catalog: RegisterCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Sets the automatic poll interval. Must be between 5 and 300 seconds.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_read_spacing(mut self, spacing: Duration) -> Self {
        self.read_spacing = spacing;
        self
    }

    pub fn with_reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enable or disable polling on the interval. `ReadNow` commands work either way.
    pub fn with_auto_read(mut self, auto_read: bool) -> Self {
        self.auto_read = auto_read;
        self
    }

    /// Builds the bridge and the handle used to control it.
    pub fn build(self) -> Result<(Bridge, BridgeHandle), BuildError> {
        let group_id = self.group_id.ok_or(BuildError::MissingGroupId)?;
        let node_id = self.node_id.ok_or(BuildError::MissingNodeId)?;
        let device_id = self.device_id.ok_or(BuildError::MissingDeviceId)?;
        validate_name(&group_id).map_err(BuildError::InvalidName)?;
        validate_name(&node_id).map_err(BuildError::InvalidName)?;
        validate_name(&device_id).map_err(BuildError::InvalidName)?;
        let poll_interval = Command::validate_interval(self.poll_interval)
            .map_err(|_| BuildError::InvalidPollInterval(self.poll_interval))?;
        if self.catalog.is_empty() {
            return Err(BuildError::EmptyCatalog);
        }

        let (eventloop, client) = self.eventloop_client;
        let catalog = Arc::new(self.catalog);
        let bus = self.bus.shared();

        let parts = BridgeParts {
            eventloop,
            publisher: MetricPublisher::new(&group_id, &node_id, &device_id, catalog.clone(), client),
            session: SessionStateMachine::new(self.reconnect_backoff, self.connect_timeout),
            engine: PollingEngine::new(catalog, bus.clone()).with_read_spacing(self.read_spacing),
            control: ControlChannel::fan_mode(bus.clone()),
            bus,
            poll_interval,
            auto_read: self.auto_read,
        };
        Ok(Bridge::new(parts))
    }
}
