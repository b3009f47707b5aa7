use serde::Serialize;
use uuid::Uuid;

use super::resources::ResourceCore;
use crate::domain::value_objects::{
    make_id, Clock, NodeInterface, NodeSettings, ResourceType, DEFAULT_CLOCK_NAME,
};

/// The node as a whole: shared clocks and the interfaces it advertises.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    #[serde(flatten)]
    pub core: ResourceCore,
    pub href: String,
    pub hostname: String,
    pub clocks: Vec<Clock>,
    pub interfaces: Vec<NodeInterface>,
}

impl Node {
    /// A node with a single internal clock and no interfaces yet.
    pub fn new(settings: &NodeSettings) -> Self {
        let id = make_id(settings.seed_id(), ResourceType::Node, "");
        let mut core = ResourceCore::new(id, settings.node_label(), settings.node_description());
        core.tags = settings.node_tags().clone();
        Self {
            core,
            href: format!("http://{}:{}/", settings.host_name(), settings.http_port()),
            hostname: settings.host_name().to_string(),
            clocks: vec![Clock::internal(DEFAULT_CLOCK_NAME)],
            interfaces: Vec::new(),
        }
    }

    pub fn clock(&self, name: &str) -> Option<&Clock> {
        self.clocks.iter().find(|clock| clock.name == name)
    }

    /// Replace the clock of the same name. Returns whether anything changed;
    /// the version is only bumped when it did.
    pub fn update_clock(&mut self, clock: Clock) -> bool {
        match self.clocks.iter_mut().find(|c| c.name == clock.name) {
            Some(current) if *current != clock => {
                *current = clock;
                self.core.bump_version();
                true
            }
            _ => false,
        }
    }

    /// Replace the advertised interfaces, bumping the version only on change.
    pub fn update_interfaces(&mut self, interfaces: Vec<NodeInterface>) -> bool {
        if self.interfaces == interfaces {
            return false;
        }
        self.interfaces = interfaces;
        self.core.bump_version();
        true
    }
}

/// The single logical device that owns every sender and receiver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    #[serde(flatten)]
    pub core: ResourceCore,
    pub node_id: Uuid,
    #[serde(rename = "type")]
    pub device_type: String,
    pub senders: Vec<Uuid>,
    pub receivers: Vec<Uuid>,
}

impl Device {
    pub const GENERIC: &'static str = "urn:x-nmos:device:generic";

    pub fn new(settings: &NodeSettings) -> Self {
        let id = make_id(settings.seed_id(), ResourceType::Device, "");
        let mut core = ResourceCore::new(id, settings.device_label(), settings.device_description());
        core.tags = settings.device_tags().clone();
        Self {
            core,
            node_id: make_id(settings.seed_id(), ResourceType::Node, ""),
            device_type: Self::GENERIC.to_string(),
            senders: Vec::new(),
            receivers: Vec::new(),
        }
    }

    fn references_mut(&mut self, kind: ResourceType) -> Option<&mut Vec<Uuid>> {
        match kind {
            ResourceType::Sender => Some(&mut self.senders),
            ResourceType::Receiver => Some(&mut self.receivers),
            _ => None,
        }
    }

    /// Record a sender or receiver in the legacy reference arrays.
    pub fn add_reference(&mut self, kind: ResourceType, id: Uuid) {
        if let Some(references) = self.references_mut(kind) {
            if !references.contains(&id) {
                references.push(id);
                self.core.bump_version();
            }
        }
    }

    pub fn remove_reference(&mut self, kind: ResourceType, id: &Uuid) -> bool {
        let Some(references) = self.references_mut(kind) else {
            return false;
        };
        let before = references.len();
        references.retain(|r| r != id);
        let removed = references.len() != before;
        if removed {
            self.core.bump_version();
        }
        removed
    }
}
