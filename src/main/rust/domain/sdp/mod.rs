mod format_parameters;
mod mapper;
mod sdp_parameters;
mod session_description;

pub use format_parameters::{
    AudioParameters, DataParameters, DidSdid, FormatParameters, JxsvParameters,
    PacketTransmissionMode, VideoParameters,
};
pub use mapper::{
    format_bit_rate, group_hint, internal_id, make_internal_session_description,
    make_session_description, session_info, transport_bit_rate, transport_params, ParsedSession,
    FORMAT_BIT_RATE, GROUP_HINT, INACTIVE, INTERFACE_IP, INTERNAL_ID, SOURCE_PORT,
    TRANSPORT_BIT_RATE,
};
pub use sdp_parameters::{Group, RtpMap, SdpParameters, CUSTOM_FMTP_PREFIX, DUPLICATION};
pub use session_description::{
    Attribute, Bandwidth, Connection, MediaDescription, Origin, SessionDescription,
};
