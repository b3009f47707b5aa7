use serde::Serialize;
use uuid::Uuid;

use super::resources::ResourceCore;
use crate::domain::sdp::{DidSdid, FormatParameters, VideoParameters};
use crate::domain::value_objects::{Format, MediaType, Rational};

/// Grain rate of a multiplexed (ST 2022-6) flow.
const MUX_GRAIN_RATE: Rational = Rational::whole(50);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Channel {
    pub label: String,
    pub symbol: String,
}

impl Channel {
    /// Undefined channel `U01`..`U64`.
    pub fn undefined(index: usize) -> Self {
        Self {
            label: String::new(),
            symbol: format!("U{:02}", index + 1),
        }
    }
}

/// An essence-producing abstraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    #[serde(flatten)]
    pub core: ResourceCore,
    pub device_id: Uuid,
    pub format: Format,
    pub clock_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grain_rate: Option<Rational>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<Channel>,
    pub parents: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Component {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub bit_depth: u32,
}

/// Picture attributes shared by raw and JPEG XS video flows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoEssence {
    pub frame_width: u32,
    pub frame_height: u32,
    pub interlace_mode: &'static str,
    pub colorspace: String,
    pub transfer_characteristic: String,
    pub components: Vec<Component>,
}

impl VideoEssence {
    fn from_parameters(video: &VideoParameters) -> Self {
        Self {
            frame_width: video.width,
            frame_height: video.height,
            interlace_mode: if video.interlace {
                "interlaced_tff"
            } else {
                "progressive"
            },
            colorspace: video.colorimetry.clone(),
            transfer_characteristic: video.tcs.clone(),
            components: components(&video.sampling, video.width, video.height, video.depth),
        }
    }
}

/// Format-specific flow attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FlowEssence {
    RawVideo {
        #[serde(flatten)]
        video: VideoEssence,
    },
    JxsvVideo {
        #[serde(flatten)]
        video: VideoEssence,
        #[serde(skip_serializing_if = "Option::is_none")]
        profile: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        level: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        sublevel: Option<String>,
        bit_rate: u64,
    },
    Audio {
        sample_rate: Rational,
        bit_depth: u32,
    },
    Data {
        #[serde(rename = "DID_SDID")]
        did_sdid: Vec<DidSdid>,
    },
    Mux,
}

/// A concrete encoded representation of a [`Source`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flow {
    #[serde(flatten)]
    pub core: ResourceCore,
    pub source_id: Uuid,
    pub device_id: Uuid,
    pub format: Format,
    pub media_type: MediaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grain_rate: Option<Rational>,
    #[serde(flatten)]
    pub essence: FlowEssence,
    pub parents: Vec<Uuid>,
}

/// Ids and naming shared by the source and flow built for one sender.
pub struct EssenceIds<'a> {
    pub source_id: Uuid,
    pub flow_id: Uuid,
    pub device_id: Uuid,
    pub clock_name: &'a str,
    pub label: &'a str,
    pub description: &'a str,
}

/// Build the source and flow described by one media kind's parameters.
pub fn make_source_and_flow(
    ids: &EssenceIds<'_>,
    media_type: MediaType,
    format: &FormatParameters,
    format_bit_rate: u64,
) -> (Source, Flow) {
    let essence = match format {
        FormatParameters::VideoRaw(video) => FlowEssence::RawVideo {
            video: VideoEssence::from_parameters(video),
        },
        FormatParameters::VideoJxsv(jxsv) => FlowEssence::JxsvVideo {
            video: VideoEssence::from_parameters(&jxsv.video),
            profile: jxsv.profile.clone(),
            level: jxsv.level.clone(),
            sublevel: jxsv.sublevel.clone(),
            bit_rate: format_bit_rate,
        },
        FormatParameters::Audio(audio) => FlowEssence::Audio {
            sample_rate: audio.sample_rate,
            bit_depth: audio.bit_depth,
        },
        FormatParameters::Data(data) => FlowEssence::Data {
            did_sdid: data.did_sdids.clone(),
        },
        FormatParameters::Mux => FlowEssence::Mux,
    };

    let grain_rate = match format {
        FormatParameters::Mux => Some(MUX_GRAIN_RATE),
        other => other.grain_rate(),
    };

    let channels = match format {
        FormatParameters::Audio(audio) => (0..audio.channel_count as usize)
            .map(Channel::undefined)
            .collect(),
        _ => Vec::new(),
    };

    let source = Source {
        core: ResourceCore::new(ids.source_id, ids.label, ids.description),
        device_id: ids.device_id,
        format: media_type.format(),
        clock_name: Some(ids.clock_name.to_string()),
        grain_rate,
        channels,
        parents: Vec::new(),
    };

    let flow = Flow {
        core: ResourceCore::new(ids.flow_id, ids.label, ids.description),
        source_id: ids.source_id,
        device_id: ids.device_id,
        format: media_type.format(),
        media_type,
        grain_rate,
        essence,
        parents: Vec::new(),
    };

    (source, flow)
}

/// Picture components for a sampling structure.
fn components(sampling: &str, width: u32, height: u32, bit_depth: u32) -> Vec<Component> {
    let component = |name, width, height| Component {
        name,
        width,
        height,
        bit_depth,
    };
    match sampling {
        "YCbCr-4:4:4" => vec![
            component("Y", width, height),
            component("Cb", width, height),
            component("Cr", width, height),
        ],
        "YCbCr-4:2:2" => vec![
            component("Y", width, height),
            component("Cb", width / 2, height),
            component("Cr", width / 2, height),
        ],
        "YCbCr-4:2:0" => vec![
            component("Y", width, height),
            component("Cb", width / 2, height / 2),
            component("Cr", width / 2, height / 2),
        ],
        "RGB" => vec![
            component("R", width, height),
            component("G", width, height),
            component("B", width, height),
        ],
        "RGBA" => vec![
            component("R", width, height),
            component("G", width, height),
            component("B", width, height),
            component("A", width, height),
        ],
        _ => vec![component("Y", width, height)],
    }
}
