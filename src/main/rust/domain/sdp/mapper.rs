//! Maps session descriptions onto node resources and back.
//!
//! Vendor attributes used on the wire:
//! - `a=x-nvnmos-id:<internal id>` (session level, required)
//! - `a=x-nvnmos-group-hint:<group hint>` (session level)
//! - `a=x-nvnmos-iface-ip:<address>` (media level; receiver interface, sender source)
//! - `a=x-nvnmos-src-port:<port>` (media level, senders)
//! - `a=inactive` (media level, leg disabled)

use std::net::IpAddr;

use super::format_parameters::FormatParameters;
use super::sdp_parameters::SdpParameters;
use super::session_description::{
    attribute_values, find_attribute, Attribute, Connection, MediaDescription, SessionDescription,
};
use crate::domain::errors::{DomainError, Result};
use crate::domain::value_objects::{
    MediaType, ReceiverLeg, ResourceType, Resolvable, SenderLeg, TransportParams, TsRefClk,
    DEFAULT_RTP_PORT,
};

pub const INTERNAL_ID: &str = "x-nvnmos-id";
pub const GROUP_HINT: &str = "x-nvnmos-group-hint";
pub const INTERFACE_IP: &str = "x-nvnmos-iface-ip";
pub const SOURCE_PORT: &str = "x-nvnmos-src-port";
pub const INACTIVE: &str = "inactive";

pub const FORMAT_BIT_RATE: &str = "x-nvnmos-format-bit-rate";
pub const TRANSPORT_BIT_RATE: &str = "x-nvnmos-transport-bit-rate";

/// Approximate IP/UDP/RTP overhead.
const TRANSPORT_BIT_RATE_FACTOR: f64 = 1.05;

const DEFAULT_MULTICAST_TTL: u32 = 32;

/// Everything a node reads from one session description.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSession {
    pub internal_id: String,
    pub group_hint: Option<String>,
    pub session_info: Option<String>,
    pub media_type: MediaType,
    pub params: SdpParameters,
    pub format: FormatParameters,
    pub transport_params: TransportParams,
}

impl ParsedSession {
    pub fn parse(kind: ResourceType, text: &str) -> Result<Self> {
        let sdp = SessionDescription::parse(text)?;
        let params = SdpParameters::from_session_description(&sdp)?;
        let media_type = params.media_type()?;
        let format = FormatParameters::parse(&params)?;
        Ok(Self {
            internal_id: internal_id(&sdp)?,
            group_hint: group_hint(&sdp),
            session_info: session_info(&sdp),
            media_type,
            transport_params: transport_params(kind, &sdp)?,
            format,
            params,
        })
    }

    /// Clock references declared for each leg.
    pub fn ts_refclks(&self) -> &[Vec<TsRefClk>] {
        &self.params.ts_refclk
    }
}

pub fn internal_id(sdp: &SessionDescription) -> Result<String> {
    sdp.find_attribute(INTERNAL_ID)
        .and_then(|a| a.value.as_deref())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| DomainError::parse(format!("missing {} attribute", INTERNAL_ID)))
}

pub fn group_hint(sdp: &SessionDescription) -> Option<String> {
    sdp.find_attribute(GROUP_HINT)
        .and_then(|a| a.value.clone())
        .filter(|hint| !hint.is_empty())
}

pub fn session_info(sdp: &SessionDescription) -> Option<String> {
    sdp.information.clone().filter(|info| !info.is_empty())
}

/// Per-leg transport parameters, one leg per media description.
pub fn transport_params(kind: ResourceType, sdp: &SessionDescription) -> Result<TransportParams> {
    match kind {
        ResourceType::Sender => sdp
            .media_descriptions
            .iter()
            .map(|media| sender_leg(sdp, media))
            .collect::<Result<_>>()
            .map(TransportParams::Sender),
        ResourceType::Receiver => sdp
            .media_descriptions
            .iter()
            .map(|media| receiver_leg(sdp, media))
            .collect::<Result<_>>()
            .map(TransportParams::Receiver),
        other => Err(DomainError::InternalInconsistency(format!(
            "{} has no transport parameters",
            other
        ))),
    }
}

/// Connection address of a leg and the source address a source-filter names, if any.
fn leg_addresses(
    sdp: &SessionDescription,
    media: &MediaDescription,
) -> Result<(IpAddr, Option<IpAddr>)> {
    let connection = media
        .connections
        .first()
        .or(sdp.connection.as_ref())
        .ok_or_else(|| DomainError::parse("missing connection (c=) line"))?;
    let address = parse_address(&connection.address)?;

    // a=source-filter: incl IN IP4 <destination> <source>
    let source = attribute_values(&media.attributes, "source-filter")
        .chain(attribute_values(&sdp.attributes, "source-filter"))
        .next()
        .and_then(|filter| filter.split_whitespace().nth(4))
        .map(parse_address)
        .transpose()?;

    Ok((address, source))
}

fn sender_leg(sdp: &SessionDescription, media: &MediaDescription) -> Result<SenderLeg> {
    let (destination_ip, filter_source) = leg_addresses(sdp, media)?;
    let source_ip = match interface_ip(media)? {
        Some(address) => Resolvable::Value(address),
        None => filter_source.map_or(Resolvable::Auto, Resolvable::Value),
    };
    let source_port = find_attribute(&media.attributes, SOURCE_PORT)
        .and_then(|a| a.value.as_deref())
        .map(|port| {
            port.trim()
                .parse()
                .map_err(|_| DomainError::parse(format!("invalid {}: {}", SOURCE_PORT, port)))
        })
        .transpose()?
        .map_or(Resolvable::Auto, Resolvable::Value);

    Ok(SenderLeg {
        source_ip,
        destination_ip: Resolvable::Value(destination_ip),
        source_port,
        destination_port: Resolvable::Value(media.port),
        rtp_enabled: !is_inactive(media),
    })
}

fn receiver_leg(sdp: &SessionDescription, media: &MediaDescription) -> Result<ReceiverLeg> {
    let (address, source_ip) = leg_addresses(sdp, media)?;
    let multicast_ip = address.is_multicast().then_some(address);
    let interface_ip = match interface_ip(media)? {
        Some(interface) => Resolvable::Value(interface),
        None if multicast_ip.is_none() => Resolvable::Value(address),
        None => Resolvable::Auto,
    };

    Ok(ReceiverLeg {
        source_ip,
        multicast_ip,
        interface_ip,
        destination_port: Resolvable::Value(media.port),
        rtp_enabled: !is_inactive(media),
    })
}

fn interface_ip(media: &MediaDescription) -> Result<Option<IpAddr>> {
    find_attribute(&media.attributes, INTERFACE_IP)
        .and_then(|a| a.value.as_deref())
        .map(parse_address)
        .transpose()
}

fn is_inactive(media: &MediaDescription) -> bool {
    find_attribute(&media.attributes, INACTIVE).is_some()
}

fn parse_address(address: &str) -> Result<IpAddr> {
    address
        .trim()
        .parse()
        .map_err(|_| DomainError::parse(format!("invalid address: {}", address)))
}

fn fmtp_number(params: &SdpParameters, name: &str) -> Option<u64> {
    params.find_fmtp(name).and_then(|value| value.trim().parse().ok())
}

fn application_bandwidth(params: &SdpParameters) -> Option<u64> {
    params
        .bandwidth
        .as_ref()
        .filter(|b| b.is_application_specific())
        .map(|b| b.bandwidth)
}

/// Format bit rate from the custom attribute, or estimated from the transport
/// rate or the bandwidth line. 0 when unknown.
pub fn format_bit_rate(params: &SdpParameters) -> u64 {
    if let Some(rate) = fmtp_number(params, FORMAT_BIT_RATE) {
        return rate;
    }
    if let Some(rate) = fmtp_number(params, TRANSPORT_BIT_RATE) {
        return (rate as f64 / TRANSPORT_BIT_RATE_FACTOR) as u64;
    }
    application_bandwidth(params)
        .map(|rate| (rate as f64 / TRANSPORT_BIT_RATE_FACTOR) as u64)
        .unwrap_or(0)
}

/// Transport bit rate from the custom attribute, or estimated from the format
/// rate (rounded to the nearest 1000), or the bandwidth line as is. 0 when unknown.
pub fn transport_bit_rate(params: &SdpParameters) -> u64 {
    if let Some(rate) = fmtp_number(params, TRANSPORT_BIT_RATE) {
        return rate;
    }
    if let Some(rate) = fmtp_number(params, FORMAT_BIT_RATE) {
        return (rate as f64 * TRANSPORT_BIT_RATE_FACTOR / 1e3 + 0.5) as u64 * 1000;
    }
    application_bandwidth(params).unwrap_or(0)
}

fn connection_for(address: IpAddr, ttl: Option<u32>) -> Connection {
    let ttl = address
        .is_multicast()
        .then(|| ttl.unwrap_or(DEFAULT_MULTICAST_TTL));
    Connection::new(address, ttl)
}

/// Addresses a leg is written with: (connection, source, bound interface, port).
struct LegAddresses {
    connection: IpAddr,
    source: Option<IpAddr>,
    bound: Option<IpAddr>,
    port: u16,
    rtp_enabled: bool,
}

fn leg_addresses_of(transport_params: &TransportParams) -> Result<Vec<LegAddresses>> {
    let unresolved = |leg: usize| {
        DomainError::InternalInconsistency(format!("unresolved destination on leg {}", leg))
    };
    match transport_params {
        TransportParams::Sender(legs) => legs
            .iter()
            .enumerate()
            .map(|(index, leg)| {
                Ok(LegAddresses {
                    connection: *leg.destination_ip.value().ok_or_else(|| unresolved(index))?,
                    source: leg.source_ip.value().copied(),
                    bound: leg.source_ip.value().copied(),
                    port: leg.destination_port.value().copied().unwrap_or(DEFAULT_RTP_PORT),
                    rtp_enabled: leg.rtp_enabled,
                })
            })
            .collect(),
        TransportParams::Receiver(legs) => legs
            .iter()
            .enumerate()
            .map(|(index, leg)| {
                let interface = leg.interface_ip.value().copied();
                Ok(LegAddresses {
                    connection: leg
                        .multicast_ip
                        .or(interface)
                        .ok_or_else(|| unresolved(index))?,
                    source: leg.source_ip,
                    bound: interface,
                    port: leg.destination_port.value().copied().unwrap_or(DEFAULT_RTP_PORT),
                    rtp_enabled: leg.rtp_enabled,
                })
            })
            .collect(),
    }
}

/// Standard session description for the parameters and resolved transport legs,
/// one media description per leg.
pub fn make_session_description(
    params: &SdpParameters,
    transport_params: &TransportParams,
) -> Result<SessionDescription> {
    let legs = leg_addresses_of(transport_params)?;

    let mut origin = params.origin.clone();
    if let Some(source) = legs.first().and_then(|leg| leg.bound) {
        origin.unicast_address = source.to_string();
        origin.address_type = if source.is_ipv4() { "IP4" } else { "IP6" }.to_string();
    }

    let mut attributes = Vec::new();
    if !params.group.is_empty() {
        attributes.push(Attribute::new("group", params.group.to_string()));
    }

    let media_descriptions = legs
        .iter()
        .enumerate()
        .map(|(index, leg)| {
            let mut media_attributes = Vec::new();
            if let (true, Some(source)) = (leg.connection.is_multicast(), leg.source) {
                let address_type = if source.is_ipv4() { "IP4" } else { "IP6" };
                media_attributes.push(Attribute::new(
                    "source-filter",
                    format!(" incl IN {} {} {}", address_type, leg.connection, source),
                ));
            }
            media_attributes.push(Attribute::new("rtpmap", params.rtpmap.to_string()));
            if let Some(fmtp) = params.fmtp_line() {
                media_attributes.push(Attribute::new("fmtp", fmtp));
            }
            if let Some(ptime) = params.packet_time {
                media_attributes.push(Attribute::new("ptime", ptime.to_string()));
            }
            if let Some(maxptime) = params.max_packet_time {
                media_attributes.push(Attribute::new("maxptime", maxptime.to_string()));
            }
            if let Some(framerate) = params.framerate {
                media_attributes.push(Attribute::new("framerate", framerate.to_string()));
            }
            for ts_refclk in params.ts_refclk.get(index).into_iter().flatten() {
                media_attributes.push(Attribute::new("ts-refclk", ts_refclk.to_string()));
            }
            if let Some(mediaclk) = &params.mediaclk {
                media_attributes.push(Attribute::new("mediaclk", mediaclk.clone()));
            }
            if !params.group.is_empty() {
                if let Some(mid) = params.group.media_stream_ids.get(index) {
                    media_attributes.push(Attribute::new("mid", mid.clone()));
                }
            }

            MediaDescription {
                media: params.media.clone(),
                port: leg.port,
                protocol: params.protocol.clone(),
                formats: vec![params.rtpmap.payload_type.to_string()],
                information: None,
                connections: vec![connection_for(leg.connection, params.ttl)],
                bandwidths: params.bandwidth.iter().cloned().collect(),
                attributes: media_attributes,
            }
        })
        .collect();

    Ok(SessionDescription {
        origin,
        session_name: params.session_name.clone(),
        information: None,
        connection: None,
        bandwidths: Vec::new(),
        timing: (0, 0),
        attributes,
        media_descriptions,
    })
}

/// Session description handed to the application: the standard description
/// plus the vendor attributes that let it be read back as a resource.
pub fn make_internal_session_description(
    internal_id: &str,
    group_hint: Option<&str>,
    session_info: Option<&str>,
    params: &SdpParameters,
    transport_params: &TransportParams,
) -> Result<SessionDescription> {
    let mut sdp = make_session_description(params, transport_params)?;

    sdp.attributes.push(Attribute::new(INTERNAL_ID, internal_id));
    if let Some(group_hint) = group_hint.filter(|hint| !hint.is_empty()) {
        sdp.attributes.push(Attribute::new(GROUP_HINT, group_hint));
    }
    sdp.information = session_info
        .filter(|info| !info.is_empty())
        .map(str::to_string);

    let legs = leg_addresses_of(transport_params)?;
    for (index, (media, leg)) in sdp.media_descriptions.iter_mut().zip(&legs).enumerate() {
        if let TransportParams::Sender(senders) = transport_params {
            if let Some(port) = senders.get(index).and_then(|s| s.source_port.value()) {
                media.attributes.push(Attribute::new(SOURCE_PORT, port.to_string()));
            }
        }
        if let Some(bound) = leg.bound {
            media.attributes.push(Attribute::new(INTERFACE_IP, bound.to_string()));
        }
        if !leg.rtp_enabled {
            media.attributes.push(Attribute::flag(INACTIVE));
        }
    }

    Ok(sdp)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENDER: &str = "v=0\r\n\
o=- 100 100 IN IP4 192.0.2.10\r\n\
s=Programme 1\r\n\
i=Main programme\r\n\
t=0 0\r\n\
a=x-nvnmos-id:source-0\r\n\
a=x-nvnmos-group-hint:rx-0:audio\r\n\
m=audio 5020 RTP/AVP 97\r\n\
c=IN IP4 239.20.0.1/32\r\n\
a=source-filter: incl IN IP4 239.20.0.1 192.0.2.10\r\n\
a=x-nvnmos-src-port:5030\r\n\
a=rtpmap:97 L24/48000/2\r\n\
a=ptime:1\r\n\
a=ts-refclk:ptp=IEEE1588-2008:08-00-11-FF-FE-22-39-E4:0\r\n\
a=mediaclk:direct=0\r\n";

    fn with_fmtp(fmtp: &str, bandwidth: Option<u64>) -> SdpParameters {
        let text = format!(
            "v=0\r\no=- 1 1 IN IP4 192.0.2.1\r\ns=x\r\nt=0 0\r\n\
             m=video 5004 RTP/AVP 112\r\nc=IN IP4 239.0.0.1/32\r\n{}a=rtpmap:112 jxsv/90000\r\n{}",
            bandwidth.map(|b| format!("b=AS:{}\r\n", b)).unwrap_or_default(),
            if fmtp.is_empty() { String::new() } else { format!("a=fmtp:112 {}\r\n", fmtp) },
        );
        SdpParameters::from_session_description(&SessionDescription::parse(&text).unwrap()).unwrap()
    }

    #[test]
    fn test_parse_sender_session() {
        let parsed = ParsedSession::parse(ResourceType::Sender, SENDER).unwrap();
        assert_eq!(parsed.internal_id, "source-0");
        assert_eq!(parsed.group_hint.as_deref(), Some("rx-0:audio"));
        assert_eq!(parsed.session_info.as_deref(), Some("Main programme"));
        assert_eq!(parsed.media_type, MediaType::AudioL24);

        let TransportParams::Sender(legs) = &parsed.transport_params else {
            panic!("expected sender legs");
        };
        assert_eq!(legs[0].source_ip, Resolvable::Value("192.0.2.10".parse().unwrap()));
        assert_eq!(legs[0].destination_ip, Resolvable::Value("239.20.0.1".parse().unwrap()));
        assert_eq!(legs[0].source_port, Resolvable::Value(5030));
        assert_eq!(legs[0].destination_port, Resolvable::Value(5020));
        assert!(legs[0].rtp_enabled);
    }

    #[test]
    fn test_missing_internal_id_is_parse_error() {
        let text = SENDER.replace("a=x-nvnmos-id:source-0\r\n", "");
        let result = ParsedSession::parse(ResourceType::Sender, &text);
        assert!(matches!(result.unwrap_err(), DomainError::ParseError(_)));
    }

    #[test]
    fn test_receiver_legs() {
        let text = SENDER
            .replace("a=x-nvnmos-src-port:5030\r\n", "a=x-nvnmos-iface-ip:192.0.2.20\r\na=inactive\r\n");
        let params = transport_params(
            ResourceType::Receiver,
            &SessionDescription::parse(&text).unwrap(),
        )
        .unwrap();
        let TransportParams::Receiver(legs) = params else {
            panic!("expected receiver legs");
        };
        assert_eq!(legs[0].interface_ip, Resolvable::Value("192.0.2.20".parse().unwrap()));
        assert_eq!(legs[0].multicast_ip, Some("239.20.0.1".parse().unwrap()));
        assert_eq!(legs[0].source_ip, Some("192.0.2.10".parse().unwrap()));
        assert!(!legs[0].rtp_enabled);
    }

    #[test]
    fn test_unicast_receiver_binds_to_connection_address() {
        let text = SENDER
            .replace("c=IN IP4 239.20.0.1/32", "c=IN IP4 192.0.2.30")
            .replace("a=source-filter: incl IN IP4 239.20.0.1 192.0.2.10\r\n", "");
        let params = transport_params(
            ResourceType::Receiver,
            &SessionDescription::parse(&text).unwrap(),
        )
        .unwrap();
        let TransportParams::Receiver(legs) = params else {
            panic!("expected receiver legs");
        };
        assert_eq!(legs[0].interface_ip, Resolvable::Value("192.0.2.30".parse().unwrap()));
        assert_eq!(legs[0].multicast_ip, None);
    }

    #[test]
    fn test_transport_bit_rate_from_bandwidth_line() {
        assert_eq!(transport_bit_rate(&with_fmtp("", Some(270000))), 270000);
        assert_eq!(format_bit_rate(&with_fmtp("", Some(270000))), 257142);
    }

    #[test]
    fn test_transport_bit_rate_from_format_bit_rate() {
        let params = with_fmtp("x-nvnmos-format-bit-rate=200000", None);
        assert_eq!(transport_bit_rate(&params), 210000);
        assert_eq!(format_bit_rate(&params), 200000);
    }

    #[test]
    fn test_bit_rates_prefer_custom_attributes() {
        let params = with_fmtp("x-nvnmos-transport-bit-rate=100000", Some(1));
        assert_eq!(transport_bit_rate(&params), 100000);
        assert_eq!(format_bit_rate(&params), 95238);
        assert_eq!(transport_bit_rate(&with_fmtp("", None)), 0);
        assert_eq!(format_bit_rate(&with_fmtp("", None)), 0);
    }

    #[test]
    fn test_internal_description_round_trips() {
        let parsed = ParsedSession::parse(ResourceType::Sender, SENDER).unwrap();
        let sdp = make_internal_session_description(
            &parsed.internal_id,
            parsed.group_hint.as_deref(),
            parsed.session_info.as_deref(),
            &parsed.params,
            &parsed.transport_params,
        )
        .unwrap();
        let reparsed = ParsedSession::parse(ResourceType::Sender, &sdp.to_string()).unwrap();
        assert_eq!(reparsed.internal_id, parsed.internal_id);
        assert_eq!(reparsed.group_hint, parsed.group_hint);
        assert_eq!(reparsed.session_info, parsed.session_info);
        assert_eq!(reparsed.format, parsed.format);
        assert_eq!(reparsed.transport_params, parsed.transport_params);
        assert_eq!(reparsed.params.ts_refclk, parsed.params.ts_refclk);
    }

    #[test]
    fn test_disabled_leg_is_marked_inactive() {
        let parsed = ParsedSession::parse(ResourceType::Sender, SENDER).unwrap();
        let TransportParams::Sender(mut legs) = parsed.transport_params.clone() else {
            panic!("expected sender legs");
        };
        legs[0].rtp_enabled = false;
        let sdp = make_internal_session_description(
            "source-0",
            None,
            None,
            &parsed.params,
            &TransportParams::Sender(legs),
        )
        .unwrap();
        assert!(sdp.to_string().contains("a=inactive\r\n"));
        assert!(sdp.information.is_none());
    }

    #[test]
    fn test_unresolved_destination_is_rejected() {
        let parsed = ParsedSession::parse(ResourceType::Sender, SENDER).unwrap();
        let result = make_session_description(
            &parsed.params,
            &TransportParams::Sender(vec![SenderLeg::default()]),
        );
        assert!(matches!(result.unwrap_err(), DomainError::InternalInconsistency(_)));
    }
}
