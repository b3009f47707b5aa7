use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::{
    ActivationState, ConstraintSet, ReceiverLeg, ResourceType, SenderLeg, TransportParams, Version,
};

pub const SDP_MEDIA_TYPE: &str = "application/sdp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationMode {
    ActivateImmediate,
    ActivateScheduledAbsolute,
    ActivateScheduledRelative,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Activation {
    pub mode: Option<ActivationMode>,
    pub requested_time: Option<Version>,
    pub activation_time: Option<Version>,
}

impl Activation {
    pub fn immediate(at: Version) -> Self {
        Self {
            mode: Some(ActivationMode::ActivateImmediate),
            requested_time: None,
            activation_time: Some(at),
        }
    }
}

/// A receiver's transport file, as staged or activated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TransportFile {
    pub data: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
}

impl TransportFile {
    pub fn sdp(data: &str) -> Self {
        Self {
            data: Some(data.to_string()),
            media_type: Some(SDP_MEDIA_TYPE.to_string()),
        }
    }

    /// The session description text, when one has been set.
    pub fn text(&self) -> Option<&str> {
        self.data.as_deref().filter(|data| !data.is_empty())
    }
}

/// Staged or active half of a connection resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Endpoint {
    pub master_enable: bool,
    pub peer_id: Option<Uuid>,
    pub activation: Activation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_file: Option<TransportFile>,
    pub transport_params: TransportParams,
}

impl Endpoint {
    fn new(transport_params: TransportParams, transport_file: Option<TransportFile>) -> Self {
        Self {
            master_enable: false,
            peer_id: None,
            activation: Activation::default(),
            transport_file,
            transport_params,
        }
    }
}

/// Changes requested on a staged endpoint. Fields left `None` keep their value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageRequest {
    pub master_enable: Option<bool>,
    pub peer_id: Option<Uuid>,
    pub transport_params: Option<TransportParams>,
    pub transport_file: Option<String>,
}

/// The staged/active transport parameter pair of one sender or receiver.
/// Shares its id with the resource it controls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionResource {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub version: Version,
    pub staged: Endpoint,
    pub active: Endpoint,
    pub constraints: Vec<ConstraintSet>,
    /// Sender only: the session description describing the active stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transportfile: Option<String>,
}

impl ConnectionResource {
    /// One automatic leg per constraint set.
    pub fn for_sender(id: Uuid, constraints: Vec<ConstraintSet>) -> Self {
        let params = TransportParams::Sender(vec![SenderLeg::default(); constraints.len()]);
        Self::new(id, ResourceType::Sender, params, None, constraints)
    }

    pub fn for_receiver(id: Uuid, constraints: Vec<ConstraintSet>) -> Self {
        let params = TransportParams::Receiver(vec![ReceiverLeg::default(); constraints.len()]);
        Self::new(id, ResourceType::Receiver, params, Some(TransportFile::default()), constraints)
    }

    fn new(
        id: Uuid,
        kind: ResourceType,
        params: TransportParams,
        transport_file: Option<TransportFile>,
        constraints: Vec<ConstraintSet>,
    ) -> Self {
        Self {
            id,
            kind,
            version: Version::now(),
            staged: Endpoint::new(params.clone(), transport_file.clone()),
            active: Endpoint::new(params, transport_file),
            constraints,
            transportfile: None,
        }
    }

    pub fn state(&self) -> ActivationState {
        ActivationState::from_master_enable(self.active.master_enable)
    }

    pub fn legs(&self) -> usize {
        self.constraints.len()
    }

    pub fn bump_version(&mut self) {
        self.version = Version::now();
    }
}
