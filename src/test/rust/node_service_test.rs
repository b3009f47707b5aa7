use std::sync::{Arc, Mutex};

use nmos_node::domain::sdp::{ParsedSession, SessionDescription, DUPLICATION};
use nmos_node::domain::services::multicast_address;
use nmos_node::domain::value_objects::{make_id, make_seed_id, Resolvable, TransportParams};
use nmos_node::{
    ActivationState, DomainError, HostInterface, MetricsReporter, NodeService, NodeSettings,
    Resource, ResourceType, StageRequest, StaticInterfaces,
};

type Calls = Arc<Mutex<Vec<(String, Option<String>)>>>;

struct NoMetrics;

impl MetricsReporter for NoMetrics {
    fn report_resource_added(&self, _kind: ResourceType) {}
    fn report_resource_removed(&self, _kind: ResourceType) {}
    fn report_activation(&self, _kind: ResourceType, _state: ActivationState) {}
}

const AUDIO: &str = "v=0\r\n\
o=- 1 1 IN IP4 192.0.2.1\r\n\
s=Programme\r\n\
t=0 0\r\n\
a=x-nvnmos-id:tx-audio\r\n\
m=audio 5004 RTP/AVP 97\r\n\
c=IN IP4 239.0.0.30/64\r\n\
a=source-filter: incl IN IP4 239.0.0.30 192.0.2.1\r\n\
a=rtpmap:97 L24/48000/2\r\n\
a=ptime:1\r\n\
a=ts-refclk:ptp=IEEE1588-2008:08-00-11-FF-FE-22-39-E4:0\r\n\
a=mediaclk:direct=0\r\n";

const AUDIO_MOVED: &str = "v=0\r\n\
o=- 1 2 IN IP4 192.0.2.1\r\n\
s=Programme\r\n\
t=0 0\r\n\
a=x-nvnmos-id:tx-audio\r\n\
m=audio 5006 RTP/AVP 97\r\n\
c=IN IP4 239.0.0.31/64\r\n\
a=source-filter: incl IN IP4 239.0.0.31 192.0.2.1\r\n\
a=rtpmap:97 L24/48000/2\r\n\
a=ptime:1\r\n\
a=ts-refclk:ptp=IEEE1588-2008:08-00-11-FF-FE-22-39-E4:0\r\n\
a=mediaclk:direct=0\r\n";

const DUPLICATED: &str = "v=0\r\n\
o=- 1 1 IN IP4 192.0.2.1\r\n\
s=Sink\r\n\
t=0 0\r\n\
a=x-nvnmos-id:sink-0\r\n\
a=group:DUP primary secondary\r\n\
m=video 5004 RTP/AVP 96\r\n\
c=IN IP4 239.0.1.1/64\r\n\
a=source-filter: incl IN IP4 239.0.1.1 192.0.2.1\r\n\
a=rtpmap:96 raw/90000\r\n\
a=fmtp:96 sampling=YCbCr-4:2:2; width=1280; height=720; exactframerate=50; depth=10; TCS=SDR; colorimetry=BT709; PM=2110GPM; SSN=ST2110-20:2017; TP=2110TPN\r\n\
a=mediaclk:direct=0\r\n\
a=mid:primary\r\n\
m=video 5004 RTP/AVP 96\r\n\
c=IN IP4 239.0.2.1/64\r\n\
a=source-filter: incl IN IP4 239.0.2.1 198.51.100.1\r\n\
a=rtpmap:96 raw/90000\r\n\
a=fmtp:96 sampling=YCbCr-4:2:2; width=1280; height=720; exactframerate=50; depth=10; TCS=SDR; colorimetry=BT709; PM=2110GPM; SSN=ST2110-20:2017; TP=2110TPN\r\n\
a=mediaclk:direct=0\r\n\
a=mid:secondary\r\n";

const SINGLE_CLOCK: &str = "v=0\r\n\
o=- 1 2 IN IP4 192.0.2.1\r\n\
s=Sink\r\n\
t=0 0\r\n\
a=x-nvnmos-id:sink-0\r\n\
m=video 5004 RTP/AVP 96\r\n\
c=IN IP4 239.0.1.2/64\r\n\
a=source-filter: incl IN IP4 239.0.1.2 192.0.2.1\r\n\
a=rtpmap:96 raw/90000\r\n\
a=fmtp:96 sampling=YCbCr-4:2:2; width=1280; height=720; exactframerate=50; depth=10; TCS=SDR; colorimetry=BT709; PM=2110GPM; SSN=ST2110-20:2017; TP=2110TPN\r\n\
a=ts-refclk:ptp=IEEE1588-2008:08-00-11-FF-FE-22-39-E4:127\r\n\
a=mediaclk:direct=0\r\n";

const JXSV: &str = "v=0\r\n\
o=- 1 1 IN IP4 192.0.2.1\r\n\
s=Compressed\r\n\
t=0 0\r\n\
a=x-nvnmos-id:tx-jxsv\r\n\
m=video 5004 RTP/AVP 112\r\n\
c=IN IP4 239.0.3.1/64\r\n\
a=source-filter: incl IN IP4 239.0.3.1 192.0.2.1\r\n\
a=rtpmap:112 jxsv/90000\r\n\
a=fmtp:112 packetmode=0; profile=High444.12; level=2k-1; sublevel=Sublev3bpp; sampling=YCbCr-4:2:2; width=1920; height=1080; exactframerate=50; depth=10; TP=2110TPNL; x-nvnmos-format-bit-rate=200000\r\n";

const MONITOR: &str = "v=0\r\n\
o=- 1 1 IN IP4 192.0.2.1\r\n\
s=Monitor\r\n\
t=0 0\r\n\
a=x-nvnmos-id:rx-audio\r\n\
m=audio 5020 RTP/AVP 97\r\n\
c=IN IP4 239.0.0.20/64\r\n\
a=x-nvnmos-iface-ip:192.0.2.1\r\n\
a=rtpmap:97 L24/48000/2\r\n\
a=ptime:1\r\n";

// What a controller would stage: another sender's description, no interface binding
const MONITOR_PATCH: &str = "v=0\r\n\
o=- 7 7 IN IP4 192.0.2.99\r\n\
s=Remote\r\n\
t=0 0\r\n\
m=audio 6000 RTP/AVP 97\r\n\
c=IN IP4 239.9.9.9/64\r\n\
a=rtpmap:97 L24/48000/2\r\n\
a=ptime:1\r\n";

fn service(calls: Calls) -> NodeService {
    let host = StaticInterfaces::new(vec![
        HostInterface::new("eth0", vec!["192.0.2.1".parse().unwrap()]),
        HostInterface::new("eth1", vec!["198.51.100.1".parse().unwrap()]),
    ]);
    let handler = move |id: &str, sdp: Option<&str>| {
        calls.lock().unwrap().push((id.to_string(), sdp.map(str::to_string)));
    };
    NodeService::new(
        NodeSettings::new("studio-a", "node.local", 8080).unwrap(),
        Arc::new(host),
        Arc::new(handler),
        Arc::new(NoMetrics),
    )
}

fn last_sdp(calls: &Calls) -> String {
    calls
        .lock()
        .unwrap()
        .last()
        .and_then(|(_, sdp)| sdp.clone())
        .expect("activation with a session description")
}

#[test]
fn test_ids_are_derived_from_seed_and_internal_id() {
    let seed = make_seed_id("studio-a");
    assert_eq!(seed, make_seed_id("studio-a"));

    let first = make_id(&seed, ResourceType::Sender, "tx-0");
    assert_eq!(first, make_id(&seed, ResourceType::Sender, "tx-0"));
    assert_ne!(first, make_id(&seed, ResourceType::Sender, "tx-1"));
    assert_ne!(first, make_id(&seed, ResourceType::Flow, "tx-0"));
    assert_ne!(first, make_id(&make_seed_id("studio-b"), ResourceType::Sender, "tx-0"));

    let ids: std::collections::HashSet<_> = (0..256)
        .map(|i| make_id(&seed, ResourceType::Receiver, &format!("rx-{}", i)))
        .collect();
    assert_eq!(ids.len(), 256);
}

#[test]
fn test_multicast_address_is_deterministic() {
    let address = multicast_address("abc", 0);
    assert_eq!(address, multicast_address("abc", 0));
    assert_eq!(address.octets()[0], 232);
    assert_eq!(address.octets()[2] % 2, 1);
}

#[tokio::test]
async fn test_activation_keeps_codec_and_takes_new_transport() {
    let calls = Calls::default();
    let service = service(calls.clone());
    service.add_sender(AUDIO).await.unwrap();

    let state = service.force_activate("tx-audio", Some(AUDIO_MOVED)).await.unwrap();
    assert_eq!(state, ActivationState::Active);

    let original = ParsedSession::parse(ResourceType::Sender, AUDIO).unwrap();
    let moved = ParsedSession::parse(ResourceType::Sender, AUDIO_MOVED).unwrap();
    let activated = ParsedSession::parse(ResourceType::Sender, &last_sdp(&calls)).unwrap();

    assert_eq!(activated.internal_id, "tx-audio");
    assert_eq!(activated.format, original.format);
    assert_eq!(activated.params.rtpmap, original.params.rtpmap);

    let (TransportParams::Sender(expected), TransportParams::Sender(actual)) =
        (&moved.transport_params, &activated.transport_params)
    else {
        panic!("expected sender legs");
    };
    assert_eq!(actual.len(), 1);
    assert_eq!(actual[0].destination_ip, expected[0].destination_ip);
    assert_eq!(actual[0].destination_port, Resolvable::Value(5006));
    assert_eq!(actual[0].source_ip, expected[0].source_ip);
}

#[tokio::test]
async fn test_two_legs_share_clock_reference_and_duplication() {
    let calls = Calls::default();
    let service = service(calls.clone());
    service.add_sender(DUPLICATED).await.unwrap();

    service.force_activate("sink-0", Some(SINGLE_CLOCK)).await.unwrap();
    let sdp = SessionDescription::parse(&last_sdp(&calls)).unwrap();

    assert_eq!(sdp.media_descriptions.len(), 2);
    let group = sdp
        .attributes
        .iter()
        .find(|a| a.name == "group")
        .and_then(|a| a.value.clone())
        .unwrap();
    assert!(group.starts_with(DUPLICATION));

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
    assert!(!refclks[0].is_empty());
    assert_eq!(refclks[0], refclks[1]);
    assert!(refclks[0].iter().any(|r| r.ends_with(":127")));
}

#[tokio::test]
async fn test_removal_leaves_no_dangling_resources() {
    let service = service(Calls::default());
    service.add_sender(DUPLICATED).await.unwrap();
    let sender_id = service.find_internal_id(ResourceType::Sender, "sink-0").await.unwrap();

    service.remove_sender("sink-0").await.unwrap();

    let Resource::Device(device) = service.find_resource(ResourceType::Device, "").await.unwrap() else {
        panic!("expected device");
    };
    assert!(!device.senders.contains(&sender_id));

    for kind in [ResourceType::Sender, ResourceType::Flow, ResourceType::Source] {
        let err = service.find_resource(kind, "sink-0").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }
    assert!(service.snapshot().await.connections.is_empty());
}

#[tokio::test]
async fn test_compressed_sender_transport_bit_rate() {
    let service = service(Calls::default());
    service.add_sender(JXSV).await.unwrap();

    let Resource::Sender(sender) = service.find_resource(ResourceType::Sender, "tx-jxsv").await.unwrap() else {
        panic!("expected sender");
    };
    assert_eq!(sender.bit_rate, Some(210000));
    assert_eq!(sender.st2110_21_sender_type.as_deref(), Some("2110TPNL"));
    assert_eq!(sender.packet_transmission_mode, None);
}

#[tokio::test]
async fn test_deactivation_always_signals_without_payload() {
    let calls = Calls::default();
    let service = service(calls.clone());
    service.add_sender(AUDIO).await.unwrap();
    let sender_id = service.find_internal_id(ResourceType::Sender, "tx-audio").await.unwrap();

    service.force_activate("tx-audio", Some(AUDIO)).await.unwrap();
    for _ in 0..2 {
        let state = service.force_activate("tx-audio", None).await.unwrap();
        assert_eq!(state, ActivationState::Inactive);
        assert_eq!(calls.lock().unwrap().last().unwrap(), &("tx-audio".to_string(), None));

        let snapshot = service.snapshot().await;
        let connection = snapshot.connections.iter().find(|c| c.id == sender_id).unwrap();
        assert!(!connection.active.master_enable);
    }
    assert_eq!(calls.lock().unwrap().len(), 3);
}

fn enable(master_enable: bool) -> StageRequest {
    StageRequest {
        master_enable: Some(master_enable),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_receiver_without_staged_file_activates_creation_description() {
    let calls = Calls::default();
    let service = service(calls.clone());
    service.add_receiver(MONITOR).await.unwrap();

    service.stage("rx-audio", enable(true)).await.unwrap();
    let state = service.activate_staged("rx-audio").await.unwrap();
    assert_eq!(state, ActivationState::Active);

    let sdp = last_sdp(&calls);
    assert!(sdp.contains("m=audio 5020 "));
    assert!(sdp.contains("c=IN IP4 239.0.0.20/64"));
    assert!(sdp.contains("a=x-nvnmos-id:rx-audio"));
    assert!(sdp.contains("a=x-nvnmos-iface-ip:192.0.2.1"));
}

#[tokio::test]
async fn test_receiver_activates_staged_transport_file() {
    let calls = Calls::default();
    let service = service(calls.clone());
    service.add_receiver(MONITOR).await.unwrap();

    let request = StageRequest {
        master_enable: Some(true),
        transport_file: Some(MONITOR_PATCH.to_string()),
        ..Default::default()
    };
    service.stage("rx-audio", request).await.unwrap();
    service.activate_staged("rx-audio").await.unwrap();

    let sdp = last_sdp(&calls);
    assert!(sdp.contains("m=audio 6000 "));
    assert!(sdp.contains("c=IN IP4 239.9.9.9/64"));
    assert!(!sdp.contains("239.0.0.20"));
    assert!(sdp.contains("a=x-nvnmos-id:rx-audio"));
    assert!(sdp.contains("a=x-nvnmos-iface-ip:192.0.2.1"));
}

#[tokio::test]
async fn test_sender_transport_file_is_rejected_when_staged() {
    let service = service(Calls::default());
    service.add_sender(AUDIO).await.unwrap();

    let request = StageRequest {
        transport_file: Some(AUDIO_MOVED.to_string()),
        ..Default::default()
    };
    let err = service.stage("tx-audio", request).await.unwrap_err();
    assert!(matches!(err, DomainError::ParseError(_)));
}

#[tokio::test]
async fn test_staged_master_enable_drives_sender_handler() {
    let calls = Calls::default();
    let service = service(calls.clone());
    service.add_sender(AUDIO).await.unwrap();

    service.stage("tx-audio", enable(true)).await.unwrap();
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(service.activate_staged("tx-audio").await.unwrap(), ActivationState::Active);
    let sdp = last_sdp(&calls);
    assert!(sdp.contains("a=x-nvnmos-id:tx-audio"));
    assert!(sdp.contains("c=IN IP4 239.0.0.30/64"));

    service.stage("tx-audio", enable(false)).await.unwrap();
    assert_eq!(service.activate_staged("tx-audio").await.unwrap(), ActivationState::Inactive);
    assert_eq!(calls.lock().unwrap().len(), 2);
    assert_eq!(calls.lock().unwrap().last().unwrap(), &("tx-audio".to_string(), None));
}
