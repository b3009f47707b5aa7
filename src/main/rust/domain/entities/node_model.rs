use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use super::connection_resource::ConnectionResource;
use super::node::{Device, Node};
use super::resources::{Resource, Resources};
use crate::domain::value_objects::{make_id, NodeSettings, ResourceType};

/// Everything the node knows: the resource graph, connection resources and the
/// side settings kept per resource. Guarded by a single lock in the application layer.
#[derive(Debug, Clone)]
pub struct NodeModel {
    settings: NodeSettings,
    pub resources: Resources,
    pub connections: BTreeMap<Uuid, ConnectionResource>,
    /// Session description each sender or receiver was created from.
    sdp_configs: BTreeMap<Uuid, String>,
    /// PTP domain number per clock name.
    ptp_domains: BTreeMap<String, u8>,
}

/// Serialisable copy of the node model.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub resources: Vec<Resource>,
    pub connections: Vec<ConnectionResource>,
}

impl NodeModel {
    /// A model holding just the node and its device.
    pub fn new(settings: NodeSettings) -> Self {
        let mut resources = Resources::new();
        resources.insert(Node::new(&settings));
        resources.insert(Device::new(&settings));
        Self {
            settings,
            resources,
            connections: BTreeMap::new(),
            sdp_configs: BTreeMap::new(),
            ptp_domains: BTreeMap::new(),
        }
    }

    pub fn settings(&self) -> &NodeSettings {
        &self.settings
    }

    pub fn node_id(&self) -> Uuid {
        self.id_for(ResourceType::Node, "")
    }

    pub fn device_id(&self) -> Uuid {
        self.id_for(ResourceType::Device, "")
    }

    pub fn id_for(&self, kind: ResourceType, internal_id: &str) -> Uuid {
        make_id(self.settings.seed_id(), kind, internal_id)
    }

    pub fn node(&self) -> Option<&Node> {
        self.resources.find(&self.node_id())
    }

    pub fn device(&self) -> Option<&Device> {
        self.resources.find(&self.device_id())
    }

    /// Apply `mutator` to the node; false if the node is missing.
    pub fn modify_node(&mut self, mutator: impl FnOnce(&mut Node)) -> bool {
        let id = self.node_id();
        self.resources.modify(&id, mutator)
    }

    pub fn modify_device(&mut self, mutator: impl FnOnce(&mut Device)) -> bool {
        let id = self.device_id();
        self.resources.modify(&id, mutator)
    }

    pub fn ptp_domain(&self, clock_name: &str) -> u8 {
        self.ptp_domains.get(clock_name).copied().unwrap_or(0)
    }

    pub fn set_ptp_domain(&mut self, clock_name: &str, domain: u8) {
        self.ptp_domains.insert(clock_name.to_string(), domain);
    }

    pub fn sdp_config(&self, id: &Uuid) -> Option<&str> {
        self.sdp_configs.get(id).map(String::as_str)
    }

    pub fn set_sdp_config(&mut self, id: Uuid, sdp: &str) {
        self.sdp_configs.insert(id, sdp.to_string());
    }

    pub fn remove_sdp_config(&mut self, id: &Uuid) -> Option<String> {
        self.sdp_configs.remove(id)
    }

    /// Id of the live sender or receiver with this internal id, if any.
    pub fn find_internal_id(&self, kind: ResourceType, internal_id: &str) -> Option<Uuid> {
        let id = self.id_for(kind, internal_id);
        self.resources
            .iter()
            .any(|r| r.id() == id && r.resource_type() == kind)
            .then_some(id)
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            resources: self.resources.iter().cloned().collect(),
            connections: self.connections.values().cloned().collect(),
        }
    }
}
