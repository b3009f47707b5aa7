use serde::Serialize;
use uuid::Uuid;

use super::resources::ResourceCore;
use super::sender::Subscription;
use crate::domain::sdp::{format_bit_rate, transport_bit_rate, FormatParameters, ParsedSession};
use crate::domain::value_objects::{caps, Constraint, ConstraintSet, Format, MediaType, Version};

/// What a receiver accepts: its media type and per-format constraint sets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Capabilities {
    pub media_types: Vec<MediaType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constraint_sets: Vec<ConstraintSet>,
    pub version: Version,
}

/// Accepts a stream matching its declared capabilities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Receiver {
    #[serde(flatten)]
    pub core: ResourceCore,
    pub device_id: Uuid,
    pub format: Format,
    pub transport: String,
    pub interface_bindings: Vec<String>,
    pub caps: Capabilities,
    pub subscription: Subscription,
}

impl Receiver {
    pub fn set_subscription(&mut self, active: bool, peer_id: Option<Uuid>) -> bool {
        let subscription = Subscription { peer_id, active };
        let changed = self.subscription != subscription;
        self.subscription = subscription;
        self.core.bump_version();
        changed
    }
}

/// Capabilities implied by the session description a receiver was created from.
pub fn make_capabilities(session: &ParsedSession) -> Capabilities {
    let constraint_set = match &session.format {
        FormatParameters::VideoRaw(video) => ConstraintSet::new()
            .with(caps::GRAIN_RATE, Constraint::rationals(&[video.exactframerate]))
            .with(caps::FRAME_WIDTH, Constraint::integers(&[video.width as i64]))
            .with(caps::FRAME_HEIGHT, Constraint::integers(&[video.height as i64]))
            .with(caps::INTERLACE_MODE, Constraint::strings(interlace_modes(video.interlace)))
            .with(caps::COLOR_SAMPLING, Constraint::strings(&[video.sampling.as_str()])),
        FormatParameters::VideoJxsv(jxsv) => {
            let format_rate = format_bit_rate(&session.params);
            let transport_rate = transport_bit_rate(&session.params);
            let mode = jxsv.packet_transmission_mode.as_str();
            ConstraintSet::new()
                .with_if(jxsv.profile.is_some(), caps::PROFILE, Constraint::strings(jxsv.profile.as_slice()))
                .with_if(jxsv.level.is_some(), caps::LEVEL, Constraint::strings(jxsv.level.as_slice()))
                .with_if(jxsv.sublevel.is_some(), caps::SUBLEVEL, Constraint::strings(jxsv.sublevel.as_slice()))
                .with_if(format_rate != 0, caps::FORMAT_BIT_RATE, Constraint::at_most(format_rate as i64))
                .with_if(transport_rate != 0, caps::TRANSPORT_BIT_RATE, Constraint::at_most(transport_rate as i64))
                .with(caps::PACKET_TRANSMISSION_MODE, Constraint::strings(&[mode]))
        }
        FormatParameters::Audio(audio) => ConstraintSet::new()
            .with(caps::CHANNEL_COUNT, Constraint::integers(&[audio.channel_count as i64]))
            .with(caps::SAMPLE_RATE, Constraint::rationals(&[audio.sample_rate]))
            .with(caps::SAMPLE_DEPTH, Constraint::integers(&[audio.bit_depth as i64]))
            .with_if(
                session.params.packet_time.is_some(),
                caps::PACKET_TIME,
                Constraint::numbers(session.params.packet_time.as_slice()),
            )
            .with_if(
                session.params.max_packet_time.is_some(),
                caps::MAX_PACKET_TIME,
                Constraint::numbers(session.params.max_packet_time.as_slice()),
            ),
        FormatParameters::Data(data) => ConstraintSet::new().with_if(
            data.exactframerate.is_some(),
            caps::GRAIN_RATE,
            Constraint::rationals(data.exactframerate.as_slice()),
        ),
        FormatParameters::Mux => ConstraintSet::new(),
    };

    Capabilities {
        media_types: vec![session.media_type],
        constraint_sets: if constraint_set.is_empty() {
            Vec::new()
        } else {
            vec![constraint_set]
        },
        version: Version::now(),
    }
}

fn interlace_modes(interlaced: bool) -> &'static [&'static str] {
    if interlaced {
        &["interlaced_bff", "interlaced_tff", "interlaced_psf"]
    } else {
        &["progressive"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{ConstraintValue, Rational, ResourceType};

    fn session(media: &str, rtpmap: &str, fmtp: &str, extra: &str) -> ParsedSession {
        let text = format!(
            "v=0\r\no=- 1 1 IN IP4 192.0.2.1\r\ns=rx\r\nt=0 0\r\na=x-nvnmos-id:rx-0\r\n\
             m={} 5004 RTP/AVP 96\r\nc=IN IP4 239.0.0.1/32\r\na=x-nvnmos-iface-ip:192.0.2.1\r\n\
             a=rtpmap:96 {}\r\na=fmtp:96 {}\r\n{}",
            media, rtpmap, fmtp, extra
        );
        ParsedSession::parse(ResourceType::Receiver, &text).unwrap()
    }

    #[test]
    fn test_raw_video_capabilities() {
        let session = session(
            "video",
            "raw/90000",
            "sampling=YCbCr-4:2:2; width=1920; height=1080; exactframerate=25; depth=10; interlace",
            "",
        );
        let capabilities = make_capabilities(&session);
        assert_eq!(capabilities.media_types, vec![MediaType::VideoRaw]);
        let set = &capabilities.constraint_sets[0];
        assert_eq!(
            set.get(caps::GRAIN_RATE).unwrap().enumeration,
            vec![ConstraintValue::Rational(Rational::whole(25))]
        );
        assert_eq!(set.get(caps::INTERLACE_MODE).unwrap().enumeration.len(), 3);
        assert!(set.get(caps::PROFILE).is_none());
    }

    #[test]
    fn test_audio_capabilities_include_packet_time() {
        let session = session("audio", "L24/48000/8", "channel-order=SMPTE2110.(SGRP,SGRP)", "a=ptime:0.125\r\n");
        let set = &make_capabilities(&session).constraint_sets[0];
        assert_eq!(
            set.get(caps::CHANNEL_COUNT).unwrap().enumeration,
            vec![ConstraintValue::Integer(8)]
        );
        assert_eq!(
            set.get(caps::PACKET_TIME).unwrap().enumeration,
            vec![ConstraintValue::Number(0.125)]
        );
        assert!(set.get(caps::MAX_PACKET_TIME).is_none());
    }

    #[test]
    fn test_jxsv_capabilities_bit_rate_limits() {
        let session = session(
            "video",
            "jxsv/90000",
            "profile=High444.12; level=1k-1; sampling=YCbCr-4:2:2; width=1280; height=720; exactframerate=50; depth=10; x-nvnmos-format-bit-rate=200000",
            "",
        );
        let set = &make_capabilities(&session).constraint_sets[0];
        assert_eq!(set.get(caps::FORMAT_BIT_RATE).unwrap().maximum, Some(ConstraintValue::Integer(200000)));
        assert_eq!(set.get(caps::TRANSPORT_BIT_RATE).unwrap().maximum, Some(ConstraintValue::Integer(210000)));
        assert!(set.get(caps::SUBLEVEL).is_none());
        assert_eq!(
            set.get(caps::PACKET_TRANSMISSION_MODE).unwrap().enumeration,
            vec![ConstraintValue::String("codestream".to_string())]
        );
    }
}
