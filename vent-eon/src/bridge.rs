use std::time::Duration;

use log::{debug, info, warn};
use tokio::{
    select,
    sync::{mpsc, watch},
    time::{sleep_until, timeout, Instant},
};
use vent_client::{DynEventLoop, Event, InboundCommand};
use vent_modbus::{ControlChannel, ControlStats, PollStats, PollingEngine, SharedBus};
use vent_types::{
    constants::NODE_CONTROL_REBIRTH,
    payload::{metric::Value, DataType, Metric},
    MetricValue,
};

use crate::{Command, MetricPublisher, SessionState, SessionStateMachine, SessionStats};

/// Name of the DCMD metric carrying a fan mode code.
pub(crate) const FAN_MODE_METRIC: &str = "FanMode";

/// A point in time view of the bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeStatus {
    pub state: SessionState,
    pub bdseq: u8,
    pub auto_read: bool,
    pub poll_interval: Duration,
    pub last_success_count: u32,
    pub last_total_count: u32,
    pub session: SessionStats,
    pub poll: PollStats,
    pub control: ControlStats,
    pub invalid_commands: u64,
}

#[derive(Debug)]
struct BridgeShutdown;

/// A handle for interacting with a running [Bridge].
#[derive(Clone)]
pub struct BridgeHandle {
    command_tx: mpsc::Sender<Command>,
    stop_tx: mpsc::Sender<BridgeShutdown>,
    status_rx: watch::Receiver<BridgeStatus>,
}

impl BridgeHandle {
    /// Queue a command for the bridge.
    ///
    /// Returns the command back if the bridge has stopped.
    pub async fn send_command(&self, command: Command) -> Result<(), Command> {
        self.command_tx.send(command).await.map_err(|e| e.0)
    }

    /// Stop the bridge, sending a death certificate and disconnecting from the broker.
    ///
    /// This will end [Bridge::run()]
    pub async fn cancel(&self) {
        _ = self.stop_tx.send(BridgeShutdown).await;
    }

    pub fn status(&self) -> BridgeStatus {
        self.status_rx.borrow().clone()
    }

    /// Wait until the status satisfies `predicate`.
    ///
    /// Returns `None` if the bridge stopped first.
    pub async fn wait_for_status<F>(&self, predicate: F) -> Option<BridgeStatus>
    where
        F: FnMut(&BridgeStatus) -> bool,
    {
        let mut rx = self.status_rx.clone();
        let status = rx.wait_for(predicate).await.ok()?;
        Some(status.clone())
    }
}

pub(crate) struct BridgeParts {
    pub eventloop: Box<DynEventLoop>,
    pub publisher: MetricPublisher,
    pub session: SessionStateMachine,
    pub engine: PollingEngine,
    pub control: ControlChannel,
    pub bus: SharedBus,
    pub poll_interval: Duration,
    pub auto_read: bool,
}

/// The edge bridge.
///
/// A single cooperative loop that services commands, keeps the session connected,
/// polls the device on schedule and publishes the readings.
///
/// See [BridgeBuilder](crate::BridgeBuilder) on how to create a [Bridge].
pub struct Bridge {
    eventloop: Box<DynEventLoop>,
    publisher: MetricPublisher,
    session: SessionStateMachine,
    engine: PollingEngine,
    control: ControlChannel,
    bus: SharedBus,
    poll_interval: Duration,
    auto_read: bool,
    next_poll: Instant,
    transport_online: bool,
    will_bdseq: Option<u8>,
    last_counts: (u32, u32),
    invalid_commands: u64,
    stop_requested: bool,
    command_rx: mpsc::Receiver<Command>,
    stop_rx: mpsc::Receiver<BridgeShutdown>,
    status_tx: watch::Sender<BridgeStatus>,
}

impl Bridge {
    pub(crate) fn new(parts: BridgeParts) -> (Self, BridgeHandle) {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (stop_tx, stop_rx) = mpsc::channel(1);

        let (status_tx, status_rx) = watch::channel(Self::initial_status());

        let bridge = Self {
            eventloop: parts.eventloop,
            publisher: parts.publisher,
            session: parts.session,
            engine: parts.engine,
            control: parts.control,
            bus: parts.bus,
            poll_interval: parts.poll_interval,
            auto_read: parts.auto_read,
            next_poll: Instant::now(),
            transport_online: false,
            will_bdseq: None,
            last_counts: (0, 0),
            invalid_commands: 0,
            stop_requested: false,
            command_rx,
            stop_rx,
            status_tx,
        };
        bridge.publish_status();

        let handle = BridgeHandle {
            command_tx,
            stop_tx,
            status_rx,
        };
        (bridge, handle)
    }

    fn initial_status() -> BridgeStatus {
        BridgeStatus {
            state: SessionState::Disconnected,
            bdseq: 0,
            auto_read: false,
            poll_interval: Duration::ZERO,
            last_success_count: 0,
            last_total_count: 0,
            session: SessionStats::default(),
            poll: PollStats::default(),
            control: ControlStats::default(),
            invalid_commands: 0,
        }
    }

    fn status(&self) -> BridgeStatus {
        BridgeStatus {
            state: self.session.state(),
            bdseq: self.session.bdseq(),
            auto_read: self.auto_read,
            poll_interval: self.poll_interval,
            last_success_count: self.last_counts.0,
            last_total_count: self.last_counts.1,
            session: self.session.stats(),
            poll: self.engine.stats(),
            control: self.control.stats(),
            invalid_commands: self.invalid_commands,
        }
    }

    fn publish_status(&self) {
        let status = self.status();
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }

    /// Keep the transport last will in step with the session bdSeq.
    fn sync_last_will(&mut self) {
        let bdseq = self.session.bdseq();
        if self.will_bdseq == Some(bdseq) {
            return;
        }
        self.eventloop
            .set_last_will(self.publisher.death_certificate(bdseq));
        self.will_bdseq = Some(bdseq);
    }

    async fn upkeep(&mut self) {
        let now = Instant::now();
        self.session.check_connect_timeout(now);
        if self.session.begin_connect(now) && self.transport_online {
            // the link survived a failed birth, so no Online event will follow
            self.on_online().await;
        }
    }

    async fn on_online(&mut self) {
        info!(
            "Transport online. node={} device={}",
            self.publisher.node_id(),
            self.publisher.device_id()
        );
        if let Err(e) = self.session.on_connected(&self.publisher).await {
            warn!("Session birth failed. error={e}");
        }
    }

    fn on_offline(&mut self) {
        info!("Transport offline. node={}", self.publisher.node_id());
        self.session.on_connection_lost(Instant::now());
    }

    async fn handle_event(&mut self, event: Event) {
        match event {
            Event::Online => {
                self.transport_online = true;
                self.on_online().await
            }
            Event::Offline => {
                self.transport_online = false;
                self.on_offline()
            }
            Event::ConnectFailed(reason) => {
                self.transport_online = false;
                self.session.on_connect_failed(Instant::now(), &reason)
            }
            Event::Command(command) => self.on_inbound_command(command).await,
            Event::InvalidPublish { reason, .. } => {
                warn!("Ignoring invalid inbound message. reason={reason}")
            }
        }
    }

    async fn on_inbound_command(&mut self, command: InboundCommand) {
        let InboundCommand { target, payload } = command;
        if target.group_id() != self.publisher.group_id()
            || target.node_id() != self.publisher.node_id()
        {
            debug!("Ignoring command for another node. target={target:?}");
            return;
        }
        match target.device_id() {
            None => self.on_node_command(&payload.metrics).await,
            Some(device_id) if device_id == self.publisher.device_id() => {
                self.on_device_command(&payload.metrics).await
            }
            Some(device_id) => debug!("Ignoring command for unknown device. device={device_id}"),
        }
    }

    async fn on_node_command(&mut self, metrics: &[Metric]) {
        let mut rebirth = false;
        for metric in metrics {
            if metric.name.as_deref() != Some(NODE_CONTROL_REBIRTH) {
                continue;
            }
            rebirth = matches!(metric.value, Some(Value::BooleanValue(true)));
            if !rebirth {
                warn!("Received invalid CMD Rebirth metric - ignoring request")
            }
        }

        if rebirth {
            info!("Got Rebirth CMD - Rebirthing Node");
            if let Err(e) = self.session.rebirth(&self.publisher).await {
                warn!("Rebirth failed. error={e}");
            }
        }
    }

    async fn on_device_command(&mut self, metrics: &[Metric]) {
        for metric in metrics {
            if metric.name.as_deref() != Some(FAN_MODE_METRIC) {
                continue;
            }
            match command_code(metric) {
                Some(code) => {
                    info!("Got FanMode CMD. code={code}");
                    self.on_command(Command::SetActuator(code)).await
                }
                None => {
                    self.invalid_commands += 1;
                    warn!("Received invalid FanMode CMD metric - ignoring request")
                }
            }
        }
    }

    async fn on_command(&mut self, command: Command) {
        debug!("Handling command. command={command:?}");
        match command {
            Command::SetActuator(code) => {
                // outcome is logged and counted by the control channel
                _ = self.control.set_actuator(code).await;
            }
            Command::ReadNow => self.poll_and_publish().await,
            Command::ToggleAutoRead => {
                self.auto_read = !self.auto_read;
                if self.auto_read {
                    self.next_poll = Instant::now() + self.poll_interval;
                }
                info!("Auto read toggled. enabled={}", self.auto_read);
            }
            Command::SetInterval(interval) => match Command::validate_interval(interval) {
                Ok(interval) => {
                    self.poll_interval = interval;
                    self.next_poll = Instant::now() + interval;
                    info!("Poll interval changed. interval={interval:?}");
                }
                Err(e) => {
                    self.invalid_commands += 1;
                    warn!("Rejected interval command. error={e}");
                }
            },
            Command::Menu | Command::Status => debug!("Console command ignored by bridge"),
        }
    }

    async fn poll_and_publish(&mut self) {
        self.next_poll = Instant::now() + self.poll_interval;

        let snapshot = select! {
            biased;
            Some(_) = self.stop_rx.recv() => {
                info!("Poll cycle aborted for shutdown");
                self.stop_requested = true;
                return;
            }
            snapshot = self.engine.poll() => snapshot,
        };
        self.last_counts = (snapshot.success_count(), snapshot.total_count());

        if !snapshot.is_valid() {
            warn!("Skipping publish of snapshot with no readings");
            return;
        }

        if let Ok(seq) = self.publisher.publish(&mut self.session, &snapshot).await {
            debug!(
                "Snapshot published. seq={seq} metrics={}",
                snapshot.success_count()
            );
        }
    }

    async fn shutdown(&mut self) {
        info!("Bridge stopping. node={}", self.publisher.node_id());
        if self.session.is_live()
            && self
                .publisher
                .publish_node_death(self.session.bdseq())
                .await
                .is_err()
        {
            debug!("Unable to publish node death certificate on exit");
        }
        self.publisher.disconnect().await;
        self.session.on_shutdown();

        if self.transport_online {
            let eventloop = &mut self.eventloop;
            let drained = timeout(Duration::from_secs(1), async {
                while eventloop.poll().await != Event::Offline {}
            })
            .await;
            if drained.is_err() {
                debug!("Transport did not report offline before exit");
            }
            self.transport_online = false;
        }

        self.bus.lock().await.release();
        self.publish_status();
        info!("Bridge stopped. node={}", self.publisher.node_id());
    }

    /// Run the bridge until [BridgeHandle::cancel()] is called.
    pub async fn run(mut self) {
        info!(
            "Bridge running. group={} node={} device={}",
            self.publisher.group_id(),
            self.publisher.node_id(),
            self.publisher.device_id()
        );
        self.next_poll = Instant::now();

        loop {
            self.sync_last_will();
            self.upkeep().await;
            self.sync_last_will();
            self.publish_status();

            let poll_transport = self.session.state() != SessionState::Disconnected;
            let retry_at = self.session.retry_at();
            let connect_deadline = self.session.connect_deadline();

            select! {
                biased;
                Some(_) = self.stop_rx.recv() => break,
                Some(command) = self.command_rx.recv() => self.on_command(command).await,
                event = self.eventloop.poll(), if poll_transport => self.handle_event(event).await,
                _ = sleep_until(retry_at.unwrap_or_else(Instant::now)), if retry_at.is_some() => (),
                _ = sleep_until(connect_deadline.unwrap_or_else(Instant::now)), if connect_deadline.is_some() => (),
                _ = sleep_until(self.next_poll), if self.auto_read => self.poll_and_publish().await,
            }

            if self.stop_requested {
                break;
            }
        }

        self.shutdown().await;
    }
}

/// Integer value of a command metric.
fn command_code(metric: &Metric) -> Option<u16> {
    let value = metric.value.clone()?;
    let code = match metric.datatype.and_then(|d| DataType::try_from(d).ok()) {
        Some(datatype) => MetricValue::from_proto(datatype, value)?.as_i64()?,
        None => match value {
            Value::IntValue(v) => v as i64,
            Value::LongValue(v) => i64::try_from(v).ok()?,
            _ => return None,
        },
    };
    u16::try_from(code).ok()
}
