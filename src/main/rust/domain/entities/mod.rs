mod connection_resource;
mod essence;
mod node;
mod node_model;
mod receiver;
mod resources;
mod sender;

pub use connection_resource::{
    Activation, ActivationMode, ConnectionResource, Endpoint, StageRequest, TransportFile,
    SDP_MEDIA_TYPE,
};
pub use essence::{
    make_source_and_flow, Channel, Component, EssenceIds, Flow, FlowEssence, Source, VideoEssence,
};
pub use node::{Device, Node};
pub use node_model::{NodeModel, NodeSnapshot};
pub use receiver::{make_capabilities, Capabilities, Receiver};
pub use resources::{
    Resource, ResourceCore, Resources, TypedResource, GROUP_HINT_TAG, INTERNAL_ID_TAG,
};
pub use sender::{Sender, Subscription, RTP_TRANSPORT};
