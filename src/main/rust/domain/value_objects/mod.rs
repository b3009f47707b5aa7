mod activation_state;
mod clock;
mod constraints;
mod host_interface;
mod media_format;
mod node_settings;
mod rational;
mod resource_type;
mod transport_params;
mod version;

pub use activation_state::ActivationState;
pub use clock::{Clock, ClockRef, TsRefClk, DEFAULT_CLOCK_NAME, NULL_GMID, PTP_VERSION};
pub use constraints::{caps, params, Constraint, ConstraintSet, ConstraintValue};
pub use host_interface::{find_interface, HostInterface, NodeInterface};
pub use media_format::{Format, MediaType};
pub use node_settings::{NodeSettings, Tags};
pub use rational::Rational;
pub use resource_type::{make_id, make_seed_id, ResourceType};
pub use transport_params::{
    ReceiverLeg, Resolvable, SenderLeg, TransportParams, DEFAULT_RTP_PORT,
};
pub use version::{next_session_version, Version};
