use serde::Serialize;
use uuid::Uuid;

use super::resources::ResourceCore;

pub const RTP_TRANSPORT: &str = "urn:x-nmos:transport:rtp";

/// Mirrors the master enable of the paired connection resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Subscription {
    pub peer_id: Option<Uuid>,
    pub active: bool,
}

/// Transmits a flow over the network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sender {
    #[serde(flatten)]
    pub core: ResourceCore,
    pub device_id: Uuid,
    pub flow_id: Uuid,
    pub transport: String,
    pub manifest_href: String,
    pub interface_bindings: Vec<String>,
    pub subscription: Subscription,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_rate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packet_transmission_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub st2110_21_sender_type: Option<String>,
}

impl Sender {
    /// Returns whether the subscription changed; the version is bumped either way
    /// so that every activation is observable.
    pub fn set_subscription(&mut self, active: bool, peer_id: Option<Uuid>) -> bool {
        let subscription = Subscription { peer_id, active };
        let changed = self.subscription != subscription;
        self.subscription = subscription;
        self.core.bump_version();
        changed
    }
}
