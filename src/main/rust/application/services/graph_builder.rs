//! Builds and tears down the resources behind each sender and receiver.

use std::net::IpAddr;

use uuid::Uuid;

use super::activation_engine::{leg_port_ids, make_sender_transportfile};
use crate::domain::entities::{
    make_capabilities, make_source_and_flow, ConnectionResource, EssenceIds, Flow, NodeModel,
    Receiver, ResourceCore, Sender, Subscription, TypedResource, RTP_TRANSPORT,
};
use crate::domain::errors::{DomainError, Result};
use crate::domain::sdp::{
    format_bit_rate, transport_bit_rate, FormatParameters, PacketTransmissionMode, ParsedSession,
};
use crate::domain::services::{
    interface_bindings, resolve_auto, resolve_clock, update_clock, update_node_interfaces,
};
use crate::domain::value_objects::{
    params, Constraint, ConstraintSet, HostInterface, ResourceType, DEFAULT_CLOCK_NAME,
};

/// Primary and secondary network paths.
const MAX_LEGS: usize = 2;

fn check_legs(session: &ParsedSession) -> Result<()> {
    match session.transport_params.len() {
        0 => Err(DomainError::parse("no media descriptions")),
        legs if legs > MAX_LEGS => Err(DomainError::parse(format!(
            "{} legs described for {}, at most {} supported",
            legs, session.internal_id, MAX_LEGS
        ))),
        _ => Ok(()),
    }
}

/// Address each leg is bound to. Sender legs without an explicit source
/// address fall back to the origin address.
fn leg_addresses(kind: ResourceType, session: &ParsedSession) -> Result<Vec<IpAddr>> {
    let origin = session.params.origin.unicast_address.parse::<IpAddr>().ok();
    session
        .transport_params
        .bound_addresses()
        .into_iter()
        .enumerate()
        .map(|(leg, address)| {
            address
                .or(if kind == ResourceType::Sender { origin } else { None })
                .ok_or_else(|| {
                    DomainError::parse(format!(
                        "no interface address for leg {} of {}",
                        leg, session.internal_id
                    ))
                })
        })
        .collect()
}

/// Reject ids already taken, and internal ids already used by the other kind.
fn check_unused(model: &NodeModel, internal_id: &str, kind: ResourceType, ids: &[Uuid]) -> Result<()> {
    let other = match kind {
        ResourceType::Sender => ResourceType::Receiver,
        _ => ResourceType::Sender,
    };
    let taken = ids
        .iter()
        .any(|id| model.resources.contains(id) || model.connections.contains_key(id));
    if taken || model.find_internal_id(other, internal_id).is_some() {
        return Err(DomainError::DuplicateResource(format!("{} {}", kind, internal_id)));
    }
    Ok(())
}

fn endpoint_constraints(key: &str, addresses: &[IpAddr]) -> Vec<ConstraintSet> {
    addresses
        .iter()
        .map(|address| ConstraintSet::new().with(key, Constraint::address(*address)))
        .collect()
}

/// Create the source, flow, sender and connection resource described by `sdp`.
/// Returns the internal id.
pub fn add_sender(model: &mut NodeModel, host: &[HostInterface], sdp: &str) -> Result<String> {
    let session = ParsedSession::parse(ResourceType::Sender, sdp)?;
    check_legs(&session)?;
    let internal_id = session.internal_id.clone();

    let sender_id = model.id_for(ResourceType::Sender, &internal_id);
    let flow_id = model.id_for(ResourceType::Flow, &internal_id);
    let source_id = model.id_for(ResourceType::Source, &internal_id);
    check_unused(model, &internal_id, ResourceType::Sender, &[sender_id, flow_id, source_id])?;

    let addresses = leg_addresses(ResourceType::Sender, &session)?;
    let bindings = interface_bindings(host, &addresses, &internal_id)?;

    let label = session.params.session_name.clone();
    let description = session.session_info.clone().unwrap_or_default();
    let ids = EssenceIds {
        source_id,
        flow_id,
        device_id: model.device_id(),
        clock_name: DEFAULT_CLOCK_NAME,
        label: &label,
        description: &description,
    };
    let (source, flow) = make_source_and_flow(
        &ids,
        session.media_type,
        &session.format,
        format_bit_rate(&session.params),
    );

    let mut sender = Sender {
        core: ResourceCore::new(sender_id, &label, &description),
        device_id: model.device_id(),
        flow_id,
        transport: RTP_TRANSPORT.to_string(),
        manifest_href: format!(
            "{}/single/senders/{}/transportfile",
            model.settings().connection_api_base(),
            sender_id
        ),
        interface_bindings: bindings,
        subscription: Subscription::default(),
        bit_rate: None,
        packet_transmission_mode: None,
        st2110_21_sender_type: None,
    };
    sender.core.set_internal_id(&internal_id);
    if let Some(group_hint) = &session.group_hint {
        sender.core.set_group_hint(group_hint);
    }
    if let FormatParameters::VideoJxsv(jxsv) = &session.format {
        let rate = transport_bit_rate(&session.params);
        sender.bit_rate = (rate != 0).then_some(rate);
        if jxsv.packet_transmission_mode != PacketTransmissionMode::Codestream {
            sender.packet_transmission_mode = Some(jxsv.packet_transmission_mode.as_str().to_string());
        }
        sender.st2110_21_sender_type = jxsv.video.tp.clone();
    }

    let mut connection = ConnectionResource::for_sender(
        sender_id,
        endpoint_constraints(params::SOURCE_IP, &addresses),
    );
    connection.staged.transport_params = session.transport_params.clone();
    connection.active.transport_params = session.transport_params.clone();
    resolve_auto(&sender_id, &mut connection.active.transport_params, &connection.constraints);

    let resolved = resolve_clock(DEFAULT_CLOCK_NAME, session.ts_refclks());
    let domain = resolved
        .domain
        .unwrap_or_else(|| model.ptp_domain(DEFAULT_CLOCK_NAME));
    connection.transportfile = Some(make_sender_transportfile(
        sdp,
        &connection.active.transport_params,
        &resolved.clock,
        domain,
        &leg_port_ids(host, &connection.active.transport_params),
    )?);

    model.resources.insert_all(vec![
        source.into_resource(),
        flow.into_resource(),
        sender.into_resource(),
    ])?;
    model.connections.insert(sender_id, connection);

    model.modify_device(|device| device.add_reference(ResourceType::Sender, sender_id));
    update_clock(model, DEFAULT_CLOCK_NAME, session.ts_refclks());
    update_node_interfaces(model, host);
    model.set_sdp_config(sender_id, sdp);

    tracing::info!(internal_id = %internal_id, sender_id = %sender_id, "Sender added");
    Ok(internal_id)
}

/// Create the receiver and connection resource described by `sdp`.
/// Returns the internal id.
pub fn add_receiver(model: &mut NodeModel, host: &[HostInterface], sdp: &str) -> Result<String> {
    let session = ParsedSession::parse(ResourceType::Receiver, sdp)?;
    check_legs(&session)?;
    let internal_id = session.internal_id.clone();

    let receiver_id = model.id_for(ResourceType::Receiver, &internal_id);
    check_unused(model, &internal_id, ResourceType::Receiver, &[receiver_id])?;

    let addresses = leg_addresses(ResourceType::Receiver, &session)?;
    let bindings = interface_bindings(host, &addresses, &internal_id)?;

    let mut receiver = Receiver {
        core: ResourceCore::new(
            receiver_id,
            &session.params.session_name,
            session.session_info.as_deref().unwrap_or_default(),
        ),
        device_id: model.device_id(),
        format: session.media_type.format(),
        transport: RTP_TRANSPORT.to_string(),
        interface_bindings: bindings,
        caps: make_capabilities(&session),
        subscription: Subscription::default(),
    };
    receiver.core.set_internal_id(&internal_id);
    if let Some(group_hint) = &session.group_hint {
        receiver.core.set_group_hint(group_hint);
    }

    let mut connection = ConnectionResource::for_receiver(
        receiver_id,
        endpoint_constraints(params::INTERFACE_IP, &addresses),
    );
    connection.staged.transport_params = session.transport_params.clone();
    connection.active.transport_params = session.transport_params;
    resolve_auto(&receiver_id, &mut connection.active.transport_params, &connection.constraints);

    model.resources.insert_all(vec![receiver.into_resource()])?;
    model.connections.insert(receiver_id, connection);

    model.modify_device(|device| device.add_reference(ResourceType::Receiver, receiver_id));
    update_node_interfaces(model, host);
    model.set_sdp_config(receiver_id, sdp);

    tracing::info!(internal_id = %internal_id, receiver_id = %receiver_id, "Receiver added");
    Ok(internal_id)
}

/// Remove a sender with its flow, source and connection resource.
pub fn remove_sender(model: &mut NodeModel, host: &[HostInterface], internal_id: &str) -> Result<()> {
    let sender_id = model
        .find_internal_id(ResourceType::Sender, internal_id)
        .ok_or_else(|| DomainError::NotFound(format!("sender {}", internal_id)))?;
    let flow_id = model
        .resources
        .find::<Sender>(&sender_id)
        .map(|sender| sender.flow_id);
    let source_id = flow_id
        .and_then(|id| model.resources.find::<Flow>(&id))
        .map(|flow| flow.source_id);

    model.connections.remove(&sender_id);
    model.resources.erase(&sender_id);
    for id in flow_id.into_iter().chain(source_id) {
        model.resources.erase(&id);
    }

    model.modify_device(|device| {
        device.remove_reference(ResourceType::Sender, &sender_id);
    });
    update_node_interfaces(model, host);
    model.remove_sdp_config(&sender_id);

    tracing::info!(internal_id = %internal_id, sender_id = %sender_id, "Sender removed");
    Ok(())
}

/// Remove a receiver and its connection resource.
pub fn remove_receiver(model: &mut NodeModel, host: &[HostInterface], internal_id: &str) -> Result<()> {
    let receiver_id = model
        .find_internal_id(ResourceType::Receiver, internal_id)
        .ok_or_else(|| DomainError::NotFound(format!("receiver {}", internal_id)))?;

    model.connections.remove(&receiver_id);
    model.resources.erase(&receiver_id);

    model.modify_device(|device| {
        device.remove_reference(ResourceType::Receiver, &receiver_id);
    });
    update_node_interfaces(model, host);
    model.remove_sdp_config(&receiver_id);

    tracing::info!(internal_id = %internal_id, receiver_id = %receiver_id, "Receiver removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Device, Source};
    use crate::domain::sdp::SessionDescription;
    use crate::domain::value_objects::{NodeSettings, Resolvable, TransportParams};

    const VIDEO: &str = "v=0\r\n\
o=- 1 1 IN IP4 192.0.2.1\r\n\
s=Camera 1\r\n\
i=Main camera\r\n\
t=0 0\r\n\
a=x-nvnmos-id:tx-video\r\n\
a=x-nvnmos-group-hint:cam1:video\r\n\
m=video 5004 RTP/AVP 96\r\n\
c=IN IP4 239.0.0.10/64\r\n\
a=source-filter: incl IN IP4 239.0.0.10 192.0.2.1\r\n\
a=rtpmap:96 raw/90000\r\n\
a=fmtp:96 sampling=YCbCr-4:2:2; width=1920; height=1080; exactframerate=50; depth=10; TCS=SDR; colorimetry=BT709; PM=2110GPM; SSN=ST2110-20:2017; TP=2110TPN\r\n\
a=ts-refclk:ptp=IEEE1588-2008:08-00-11-FF-FE-22-39-E4:42\r\n\
a=mediaclk:direct=0\r\n";

    const AUDIO_RX: &str = "v=0\r\n\
o=- 1 1 IN IP4 192.0.2.1\r\n\
s=Monitor\r\n\
t=0 0\r\n\
a=x-nvnmos-id:rx-audio\r\n\
m=audio 5020 RTP/AVP 97\r\n\
c=IN IP4 239.0.0.20/64\r\n\
a=x-nvnmos-iface-ip:192.0.2.1\r\n\
a=rtpmap:97 L24/48000/2\r\n\
a=ptime:1\r\n";

    fn host() -> Vec<HostInterface> {
        vec![HostInterface::new("eth0", vec!["192.0.2.1".parse().unwrap()]).with_port_id("ca:fe:00:00:00:01")]
    }

    fn model() -> NodeModel {
        NodeModel::new(NodeSettings::new("seed", "node.local", 8080).unwrap())
    }

    #[test]
    fn test_add_sender_builds_graph() {
        let mut model = model();
        assert_eq!(add_sender(&mut model, &host(), VIDEO).unwrap(), "tx-video");

        let sender_id = model.id_for(ResourceType::Sender, "tx-video");
        let sender = model.resources.find::<Sender>(&sender_id).unwrap();
        assert_eq!(sender.core.label, "Camera 1");
        assert_eq!(sender.core.description, "Main camera");
        assert_eq!(sender.core.group_hint(), Some("cam1:video"));
        assert_eq!(sender.interface_bindings, vec!["eth0"]);
        assert!(sender.manifest_href.ends_with(&format!("/single/senders/{}/transportfile", sender_id)));

        let flow = model.resources.find::<Flow>(&sender.flow_id).unwrap();
        assert!(model.resources.find::<Source>(&flow.source_id).is_some());
        assert_eq!(model.device().unwrap().senders, vec![sender_id]);

        let node = model.node().unwrap();
        assert_eq!(node.interfaces.len(), 1);
        assert!(node.clock(DEFAULT_CLOCK_NAME).unwrap().is_ptp());
        assert_eq!(model.ptp_domain(DEFAULT_CLOCK_NAME), 42);
        assert_eq!(model.sdp_config(&sender_id), Some(VIDEO));

        let transportfile = model.connections[&sender_id].transportfile.as_deref().unwrap();
        assert!(transportfile.contains("a=ts-refclk:ptp=IEEE1588-2008:08-00-11-FF-FE-22-39-E4:42"));
        assert!(!transportfile.contains("x-nvnmos"));
    }

    #[test]
    fn test_add_sender_twice_is_duplicate() {
        let mut model = model();
        add_sender(&mut model, &host(), VIDEO).unwrap();
        let before = model.resources.len();
        let err = add_sender(&mut model, &host(), VIDEO).unwrap_err();
        assert!(matches!(err, DomainError::DuplicateResource(_)));
        assert_eq!(model.resources.len(), before);
    }

    #[test]
    fn test_internal_id_shared_with_receiver_is_duplicate() {
        let mut model = model();
        add_receiver(&mut model, &host(), &AUDIO_RX.replace("rx-audio", "tx-video")).unwrap();
        let err = add_sender(&mut model, &host(), VIDEO).unwrap_err();
        assert!(matches!(err, DomainError::DuplicateResource(_)));
    }

    #[test]
    fn test_unknown_interface_inserts_nothing() {
        let mut model = model();
        let other_host = vec![HostInterface::new("eth9", vec!["203.0.113.1".parse().unwrap()])];
        let err = add_sender(&mut model, &other_host, VIDEO).unwrap_err();
        assert!(matches!(err, DomainError::NoMatchingInterface { .. }));
        assert_eq!(model.resources.len(), 2);
        assert!(model.connections.is_empty());
    }

    #[test]
    fn test_add_receiver_resolves_interface() {
        let mut model = model();
        add_receiver(&mut model, &host(), AUDIO_RX).unwrap();

        let receiver_id = model.id_for(ResourceType::Receiver, "rx-audio");
        let receiver = model.resources.find::<Receiver>(&receiver_id).unwrap();
        assert_eq!(receiver.interface_bindings, vec!["eth0"]);
        assert_eq!(model.device().unwrap().receivers, vec![receiver_id]);

        let TransportParams::Receiver(legs) = &model.connections[&receiver_id].active.transport_params else {
            panic!("expected receiver legs");
        };
        assert_eq!(legs[0].interface_ip, Resolvable::Value("192.0.2.1".parse().unwrap()));
        assert_eq!(legs[0].multicast_ip, Some("239.0.0.20".parse().unwrap()));
    }

    #[test]
    fn test_remove_sender_erases_everything() {
        let mut model = model();
        add_sender(&mut model, &host(), VIDEO).unwrap();
        remove_sender(&mut model, &host(), "tx-video").unwrap();

        assert_eq!(model.resources.len(), 2);
        assert!(model.connections.is_empty());
        assert!(model.device().unwrap().senders.is_empty());
        assert!(model.node().unwrap().interfaces.is_empty());
        assert!(model.resources.find::<Device>(&model.device_id()).is_some());

        let err = remove_sender(&mut model, &host(), "tx-video").unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn test_internal_clock_names_each_leg_interface() {
        let dual = "v=0\r\n\
o=- 1 1 IN IP4 192.0.2.1\r\n\
s=Playout\r\n\
t=0 0\r\n\
a=x-nvnmos-id:tx-dual\r\n\
a=group:DUP primary secondary\r\n\
m=audio 5004 RTP/AVP 97\r\n\
c=IN IP4 239.0.4.1/64\r\n\
a=source-filter: incl IN IP4 239.0.4.1 192.0.2.1\r\n\
a=rtpmap:97 L24/48000/2\r\n\
a=mid:primary\r\n\
m=audio 5004 RTP/AVP 97\r\n\
c=IN IP4 239.0.5.1/64\r\n\
a=source-filter: incl IN IP4 239.0.5.1 198.51.100.1\r\n\
a=rtpmap:97 L24/48000/2\r\n\
a=mid:secondary\r\n";
        let host = vec![
            HostInterface::new("eth0", vec!["192.0.2.1".parse().unwrap()]).with_port_id("ca:fe:00:00:00:01"),
            HostInterface::new("eth1", vec!["198.51.100.1".parse().unwrap()]).with_port_id("ca:fe:00:00:00:02"),
        ];
        let mut model = model();
        add_sender(&mut model, &host, dual).unwrap();

        let sender_id = model.id_for(ResourceType::Sender, "tx-dual");
        let transportfile = model.connections[&sender_id].transportfile.as_deref().unwrap();
        let sdp = SessionDescription::parse(transportfile).unwrap();
        let refclks: Vec<Vec<String>> = sdp
            .media_descriptions
            .iter()
            .map(|media| {
                media
                    .attributes
                    .iter()
                    .filter(|a| a.name == "ts-refclk")
                    .filter_map(|a| a.value.clone())
                    .collect()
            })
            .collect();
        assert_eq!(refclks, vec![vec!["localmac=CA-FE-00-00-00-01"], vec!["localmac=CA-FE-00-00-00-02"]]);
    }

    #[test]
    fn test_remove_receiver_requires_receiver() {
        let mut model = model();
        add_sender(&mut model, &host(), VIDEO).unwrap();
        let err = remove_receiver(&mut model, &host(), "tx-video").unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }
}
