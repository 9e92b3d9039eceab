use std::sync::Arc;

use log::{debug, error};
use vent_client::{DynClient, LastWill};
use vent_modbus::{RegisterCatalog, SensorSnapshot};
use vent_types::{
    topic::{
        DeviceMessage as DeviceMessageType, DeviceTopic, NodeMessage as NodeMessageType,
        NodeTopic, QoS, Topic, TopicFilter,
    },
    utils::timestamp,
};

use crate::{
    birth::{data_payload, device_birth_payload, node_birth_payload, node_death_payload},
    MetricEnvelope, PublishError, SessionStateMachine,
};

/// The topics of one edge node and its device, built once.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTopics {
    pub nbirth: NodeTopic,
    pub ndeath: NodeTopic,
    pub ncmd: NodeTopic,
    pub dbirth: DeviceTopic,
    pub ddata: DeviceTopic,
    pub dcmd: DeviceTopic,
}

impl SessionTopics {
    pub fn new(group_id: &str, node_id: &str, device_id: &str) -> Self {
        Self {
            nbirth: NodeTopic::new(group_id, NodeMessageType::NBirth, node_id),
            ndeath: NodeTopic::new(group_id, NodeMessageType::NDeath, node_id),
            ncmd: NodeTopic::new(group_id, NodeMessageType::NCmd, node_id),
            dbirth: DeviceTopic::new(group_id, DeviceMessageType::DBirth, node_id, device_id),
            ddata: DeviceTopic::new(group_id, DeviceMessageType::DData, node_id, device_id),
            dcmd: DeviceTopic::new(group_id, DeviceMessageType::DCmd, node_id, device_id),
        }
    }

    /// The command topics subscribed to after every connect.
    pub fn subscriptions(&self) -> Vec<TopicFilter> {
        vec![
            TopicFilter::new(Topic::NodeTopic(self.ncmd.clone()), QoS::AtLeastOnce),
            TopicFilter::new(Topic::DeviceTopic(self.dcmd.clone()), QoS::AtLeastOnce),
        ]
    }
}

/// Turns snapshots and session metadata into payloads and hands them to the transport.
///
/// Every publish is attempted once; delivery guarantees are left to the transport.
pub struct MetricPublisher {
    group_id: String,
    node_id: String,
    device_id: String,
    topics: SessionTopics,
    catalog: Arc<RegisterCatalog>,
    client: Arc<DynClient>,
}

impl MetricPublisher {
    pub fn new(
        group_id: &str,
        node_id: &str,
        device_id: &str,
        catalog: Arc<RegisterCatalog>,
        client: Arc<DynClient>,
    ) -> Self {
        Self {
            group_id: group_id.to_string(),
            node_id: node_id.to_string(),
            device_id: device_id.to_string(),
            topics: SessionTopics::new(group_id, node_id, device_id),
            catalog,
            client,
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn topics(&self) -> &SessionTopics {
        &self.topics
    }

    /// Publish the readings of `snapshot` as a DDATA payload.
    ///
    /// Registers missing from the snapshot are omitted. Returns the sequence number used.
    pub async fn publish(
        &self,
        session: &mut SessionStateMachine,
        snapshot: &SensorSnapshot,
    ) -> Result<u8, PublishError> {
        session.ensure_live()?;

        let captured_at = snapshot.captured_at_millis();
        let envelopes: Vec<MetricEnvelope> = self
            .catalog
            .iter()
            .filter_map(|register| {
                snapshot
                    .get(&register.name)
                    .map(|sample| MetricEnvelope::from_sample(register, sample, captured_at))
            })
            .collect();
        if envelopes.is_empty() {
            return Err(PublishError::NoMetrics);
        }

        let seq = session.claim_data_seq();
        let payload = data_payload(seq, envelopes, timestamp());
        match self
            .client
            .publish_device_message(self.topics.ddata.clone(), payload)
            .await
        {
            Ok(_) => {
                session.record_published();
                debug!("Published data. seq={seq}");
                Ok(seq)
            }
            Err(_) => {
                session.record_publish_failure();
                error!("Publishing data failed. device={} seq={seq}", self.device_id);
                Err(PublishError::Transport)
            }
        }
    }

    pub(crate) async fn subscribe(&self) -> Result<(), PublishError> {
        self.client
            .subscribe_many(self.topics.subscriptions())
            .await
            .map_err(|_| PublishError::Transport)
    }

    pub(crate) async fn publish_node_birth(&self, seq: u8, bdseq: u8) -> Result<(), PublishError> {
        let payload = node_birth_payload(seq, bdseq, timestamp());
        match self
            .client
            .publish_node_message(self.topics.nbirth.clone(), payload)
            .await
        {
            Ok(_) => Ok(()),
            Err(_) => {
                error!("Publishing node birth message failed. node={}", self.node_id);
                Err(PublishError::Transport)
            }
        }
    }

    pub(crate) async fn publish_device_birth(&self, seq: u8) -> Result<(), PublishError> {
        let payload = device_birth_payload(seq, &self.catalog, timestamp());
        match self
            .client
            .publish_device_message(self.topics.dbirth.clone(), payload)
            .await
        {
            Ok(_) => Ok(()),
            Err(_) => {
                error!(
                    "Publishing device birth message failed. device={}",
                    self.device_id
                );
                Err(PublishError::Transport)
            }
        }
    }

    pub(crate) async fn publish_node_death(&self, bdseq: u8) -> Result<(), PublishError> {
        self.client
            .try_publish_node_message(self.topics.ndeath.clone(), node_death_payload(bdseq))
            .await
            .map_err(|_| PublishError::Transport)
    }

    pub(crate) async fn disconnect(&self) {
        if self.client.disconnect().await.is_err() {
            debug!("Transport disconnect failed");
        }
    }

    /// The NDEATH to register as the transport last will for `bdseq`.
    pub fn death_certificate(&self, bdseq: u8) -> LastWill {
        LastWill::node_death(&self.topics.ndeath, node_death_payload(bdseq))
    }
}
