use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use tokio::sync::mpsc;
use vent_types::{
    payload::Payload,
    topic::{DeviceTopic, NodeTopic, TopicFilter},
};

use crate::{Event, LastWill};

/// Everything a [ChannelClient] hands to the transport, in the order it was requested.
#[derive(Clone, Debug, PartialEq)]
pub enum OutboundMessage {
    Disconnect,
    NodeMessage { topic: NodeTopic, payload: Payload },
    DeviceMessage { topic: DeviceTopic, payload: Payload },
    Subscribe(Vec<TopicFilter>),
}

impl OutboundMessage {
    /// The topic string of a publish, `None` for other requests.
    pub fn topic(&self) -> Option<&str> {
        match self {
            OutboundMessage::NodeMessage { topic, .. } => Some(&topic.topic),
            OutboundMessage::DeviceMessage { topic, .. } => Some(&topic.topic),
            OutboundMessage::Disconnect | OutboundMessage::Subscribe(_) => None,
        }
    }
}

#[derive(Default)]
struct Shared {
    last_will: Mutex<Option<LastWill>>,
    reject_publishes: AtomicBool,
}

/// [Client](crate::Client) half of the in-process transport.
#[derive(Clone)]
pub struct ChannelClient {
    tx: mpsc::UnboundedSender<OutboundMessage>,
    shared: Arc<Shared>,
}

impl ChannelClient {
    fn forward(&self, message: OutboundMessage) -> Result<(), ()> {
        self.tx.send(message).map_err(|_| ())
    }

    fn forward_publish(&self, message: OutboundMessage) -> Result<(), ()> {
        if self.shared.reject_publishes.load(Ordering::SeqCst) {
            return Err(());
        }
        self.forward(message)
    }
}

#[async_trait]
impl crate::Client for ChannelClient {
    async fn disconnect(&self) -> Result<(), ()> {
        self.forward(OutboundMessage::Disconnect)
    }

    async fn publish_node_message(&self, topic: NodeTopic, payload: Payload) -> Result<(), ()> {
        self.forward_publish(OutboundMessage::NodeMessage { topic, payload })
    }

    async fn try_publish_node_message(&self, topic: NodeTopic, payload: Payload) -> Result<(), ()> {
        self.forward_publish(OutboundMessage::NodeMessage { topic, payload })
    }

    async fn publish_device_message(&self, topic: DeviceTopic, payload: Payload) -> Result<(), ()> {
        self.forward_publish(OutboundMessage::DeviceMessage { topic, payload })
    }

    async fn subscribe_many(&self, topics: Vec<TopicFilter>) -> Result<(), ()> {
        self.forward(OutboundMessage::Subscribe(topics))
    }
}

/// The test side of the in-process transport.
///
/// Events pushed into `tx_event` come out of [ChannelEventLoop::poll]; requests made
/// through the [ChannelClient] arrive on `rx_outbound`.
///
/// ```no_run
/// use vent_client::{Event, channel::ChannelEventLoop};
///
/// # async fn demo() {
/// let (eventloop, client, mut broker) = ChannelEventLoop::new();
/// // hand `eventloop` and `client` to the bridge under test
/// broker.send_event(Event::Online);
/// let subscribe = broker.rx_outbound.recv().await;
/// # }
/// ```
pub struct ChannelBroker {
    pub rx_outbound: mpsc::UnboundedReceiver<OutboundMessage>,
    pub tx_event: mpsc::UnboundedSender<Event>,
    shared: Arc<Shared>,
}

impl ChannelBroker {
    /// Queue `event` for the event loop. Returns false once the event loop is gone.
    pub fn send_event(&self, event: Event) -> bool {
        self.tx_event.send(event).is_ok()
    }

    /// The will most recently registered by the event loop.
    pub fn last_will(&self) -> Option<LastWill> {
        match self.shared.last_will.lock() {
            Ok(will) => will.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// While set, every publish made by the client fails. Subscribe and disconnect still succeed.
    pub fn reject_publishes(&self, reject: bool) {
        self.shared.reject_publishes.store(reject, Ordering::SeqCst);
    }

    /// Drain everything the client has sent so far without waiting.
    pub fn drain_outbound(&mut self) -> Vec<OutboundMessage> {
        let mut drained = Vec::new();
        while let Ok(message) = self.rx_outbound.try_recv() {
            drained.push(message);
        }
        drained
    }
}

/// [EventLoop](crate::EventLoop) half of the in-process transport. See [ChannelBroker].
pub struct ChannelEventLoop {
    rx: mpsc::UnboundedReceiver<Event>,
    shared: Arc<Shared>,
}

impl ChannelEventLoop {
    pub fn new() -> (Self, ChannelClient, ChannelBroker) {
        let (tx_event, rx) = mpsc::unbounded_channel();
        let (tx, rx_outbound) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::default());
        (
            Self {
                rx,
                shared: shared.clone(),
            },
            ChannelClient {
                tx,
                shared: shared.clone(),
            },
            ChannelBroker {
                rx_outbound,
                tx_event,
                shared,
            },
        )
    }
}

#[async_trait]
impl crate::EventLoop for ChannelEventLoop {
    async fn poll(&mut self) -> Event {
        match self.rx.recv().await {
            Some(event) => event,
            // broker dropped, nothing will ever arrive
            None => std::future::pending().await,
        }
    }

    fn set_last_will(&mut self, will: LastWill) {
        let mut current = match self.shared.last_will.lock() {
            Ok(current) => current,
            Err(poisoned) => poisoned.into_inner(),
        };
        *current = Some(will);
    }
}
