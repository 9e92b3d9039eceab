use async_trait::async_trait;
use log::{debug, error, trace, warn};
use rumqttc::{
    v5::{
        mqttbytes::{
            v5::{ConnectProperties, Filter, Packet},
            QoS,
        },
        AsyncClient, ConnectionError, Event as RuEvent, EventLoop as RuEventLoop, MqttOptions,
    },
    Outgoing,
};
use vent_types::{
    payload::Payload,
    topic::{self, DeviceTopic, NodeTopic, TopicFilter},
};

use vent_client::{publish_to_event, Event, LastWill};

/// Request queue capacity used when the caller has no better figure.
pub const DEFAULT_REQUEST_CAPACITY: usize = 64;

/// Smallest request queue [EventLoop::new] will create.
///
/// A connect queues a subscribe, NBIRTH and DBIRTH before the event loop is polled
/// again, and shutdown queues NDEATH and a disconnect.
pub const MIN_REQUEST_CAPACITY: usize = 16;

fn mqtt_qos(qos: topic::QoS) -> QoS {
    match qos {
        topic::QoS::AtMostOnce => QoS::AtMostOnce,
        topic::QoS::AtLeastOnce => QoS::AtLeastOnce,
        topic::QoS::ExactlyOnce => QoS::ExactlyOnce,
    }
}

/// A [vent_client::Client] backed by a rumqttc [AsyncClient].
#[derive(Clone)]
pub struct Client {
    inner: AsyncClient,
}

impl Client {
    async fn send(
        &self,
        topic: String,
        (qos, retain): (topic::QoS, bool),
        payload: Payload,
    ) -> Result<(), ()> {
        self.inner
            .publish(topic, mqtt_qos(qos), retain, Vec::<u8>::from(payload))
            .await
            .map_err(|e| debug!("Publish rejected by client: {e}"))
    }

    fn try_send(
        &self,
        topic: String,
        (qos, retain): (topic::QoS, bool),
        payload: Payload,
    ) -> Result<(), ()> {
        self.inner
            .try_publish(topic, mqtt_qos(qos), retain, Vec::<u8>::from(payload))
            .map_err(|e| debug!("Publish could not be queued: {e}"))
    }
}

#[async_trait]
impl vent_client::Client for Client {
    async fn disconnect(&self) -> Result<(), ()> {
        self.inner
            .disconnect()
            .await
            .map_err(|e| debug!("Disconnect request failed: {e}"))
    }

    async fn publish_node_message(&self, topic: NodeTopic, payload: Payload) -> Result<(), ()> {
        let delivery = topic.delivery();
        self.send(topic.topic, delivery, payload).await
    }

    async fn try_publish_node_message(&self, topic: NodeTopic, payload: Payload) -> Result<(), ()> {
        let delivery = topic.delivery();
        self.try_send(topic.topic, delivery, payload)
    }

    async fn publish_device_message(&self, topic: DeviceTopic, payload: Payload) -> Result<(), ()> {
        let delivery = topic.delivery();
        self.send(topic.topic, delivery, payload).await
    }

    async fn subscribe_many(&self, topics: Vec<TopicFilter>) -> Result<(), ()> {
        let filters = topics
            .into_iter()
            .map(|filter| Filter::new(String::from(filter.topic), mqtt_qos(filter.qos)));
        self.inner
            .subscribe_many(filters)
            .await
            .map_err(|e| debug!("Subscribe request failed: {e}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Link {
    /// No connection yet, or the last one was lost.
    Down,
    Up,
    /// We asked for the disconnect.
    Closed,
}

/// A [vent_client::EventLoop] backed by a rumqttc event loop (MQTT v5).
///
/// rumqttc only reconnects while polled. A failed attempt surfaces as
/// [Event::ConnectFailed] and the next one is made on the following `poll`.
pub struct EventLoop {
    link: Link,
    inner: RuEventLoop,
}

impl EventLoop {
    /// Wrap `options` in a client and event loop pair.
    ///
    /// Clean start is forced on and the session expiry interval forced to 0.
    /// `cap` is the capacity of the request channel between the two halves. Requests
    /// are queued without waiting on `poll`, so `cap` is raised to at least
    /// [MIN_REQUEST_CAPACITY].
    pub fn new(mut options: MqttOptions, cap: usize) -> (Self, Client) {
        let mut properties = options
            .connect_properties()
            .unwrap_or_else(ConnectProperties::new);
        properties.session_expiry_interval = Some(0);
        options
            .set_clean_start(true)
            .set_connect_properties(properties);

        let (inner_client, inner) = AsyncClient::new(options, cap.max(MIN_REQUEST_CAPACITY));
        (
            EventLoop {
                link: Link::Down,
                inner,
            },
            Client {
                inner: inner_client,
            },
        )
    }

    fn on_event(&mut self, event: RuEvent) -> Option<Event> {
        match event {
            RuEvent::Incoming(Packet::ConnAck(_)) => {
                self.link = Link::Up;
                Some(Event::Online)
            }
            RuEvent::Incoming(Packet::Disconnect(_)) => {
                warn!("Broker closed the connection");
                self.link = Link::Down;
                Some(Event::Offline)
            }
            RuEvent::Incoming(Packet::Publish(publish)) => {
                Some(publish_to_event(&publish.topic, &publish.payload))
            }
            RuEvent::Outgoing(Outgoing::Disconnect) => {
                self.link = Link::Closed;
                Some(Event::Offline)
            }
            _ => None,
        }
    }

    async fn on_error(&mut self, e: ConnectionError) -> Option<Event> {
        match self.link {
            Link::Up => {
                error!("Connection lost: {e}");
                self.link = Link::Down;
                Some(Event::Offline)
            }
            Link::Down => {
                error!("Connect attempt failed: {e}");
                Some(Event::ConnectFailed(e.to_string()))
            }
            Link::Closed => {
                tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
                None
            }
        }
    }
}

#[async_trait]
impl vent_client::EventLoop for EventLoop {
    async fn poll(&mut self) -> Event {
        loop {
            let mapped = match self.inner.poll().await {
                Ok(event) => {
                    trace!("{event:?}");
                    self.on_event(event)
                }
                Err(e) => self.on_error(e).await,
            };
            if let Some(event) = mapped {
                return event;
            }
        }
    }

    fn set_last_will(&mut self, will: LastWill) {
        self.inner
            .options
            .set_last_will(rumqttc::v5::mqttbytes::v5::LastWill::new(
                will.topic,
                will.payload,
                mqtt_qos(will.qos),
                will.retain,
                None,
            ));
    }
}
