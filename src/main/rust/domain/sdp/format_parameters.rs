use serde::Serialize;

use super::sdp_parameters::SdpParameters;
use crate::domain::errors::{DomainError, Result};
use crate::domain::value_objects::{MediaType, Rational};

/// Video parameters common to ST 2110-20 and the JPEG XS profile.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoParameters {
    pub sampling: String,
    pub depth: u32,
    pub width: u32,
    pub height: u32,
    pub exactframerate: Rational,
    pub interlace: bool,
    pub colorimetry: String,
    pub tcs: String,
    pub tp: Option<String>,
}

/// JPEG XS (`video/jxsv`) adds profile, level and packetization.
#[derive(Debug, Clone, PartialEq)]
pub struct JxsvParameters {
    pub video: VideoParameters,
    pub profile: Option<String>,
    pub level: Option<String>,
    pub sublevel: Option<String>,
    pub packet_transmission_mode: PacketTransmissionMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioParameters {
    pub channel_count: u32,
    pub bit_depth: u32,
    pub sample_rate: Rational,
    pub channel_order: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataParameters {
    pub did_sdids: Vec<DidSdid>,
    pub exactframerate: Option<Rational>,
}

/// SMPTE ST 291-1 ancillary data identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DidSdid {
    #[serde(rename = "DID", serialize_with = "hex_byte")]
    pub did: u8,
    #[serde(rename = "SDID", serialize_with = "hex_byte")]
    pub sdid: u8,
}

fn hex_byte<S: serde::Serializer>(value: &u8, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("0x{:02x}", value))
}

impl DidSdid {
    /// Parse `{0x41,0x05}`.
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || DomainError::parse(format!("invalid DID_SDID: {}", value));
        let inner = value
            .trim()
            .strip_prefix('{')
            .and_then(|v| v.strip_suffix('}'))
            .ok_or_else(invalid)?;
        let (did, sdid) = inner.split_once(',').ok_or_else(invalid)?;
        let byte = |s: &str| {
            let s = s.trim();
            let digits = s
                .strip_prefix("0x")
                .or_else(|| s.strip_prefix("0X"))
                .ok_or_else(invalid)?;
            u8::from_str_radix(digits, 16).map_err(|_| invalid())
        };
        Ok(Self {
            did: byte(did)?,
            sdid: byte(sdid)?,
        })
    }
}

/// JPEG XS packetization (RFC 9134 K and T bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacketTransmissionMode {
    #[default]
    Codestream,
    SliceSequential,
    SliceOutOfOrder,
}

impl PacketTransmissionMode {
    pub fn from_modes(packetmode: Option<u32>, transmode: Option<u32>) -> Self {
        match (packetmode.unwrap_or(0), transmode.unwrap_or(1)) {
            (0, _) => Self::Codestream,
            (_, 0) => Self::SliceOutOfOrder,
            _ => Self::SliceSequential,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Codestream => "codestream",
            Self::SliceSequential => "slice_sequential",
            Self::SliceOutOfOrder => "slice_out_of_order",
        }
    }
}

/// Codec parameters of a session description, one variant per supported media kind.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatParameters {
    VideoRaw(VideoParameters),
    VideoJxsv(JxsvParameters),
    Audio(AudioParameters),
    Data(DataParameters),
    Mux,
}

impl FormatParameters {
    pub fn parse(params: &SdpParameters) -> Result<Self> {
        match params.media_type()? {
            MediaType::VideoRaw => Ok(Self::VideoRaw(video_parameters(params)?)),
            MediaType::VideoJxsv => Ok(Self::VideoJxsv(JxsvParameters {
                video: video_parameters(params)?,
                profile: params.find_fmtp("profile").map(str::to_string),
                level: params.find_fmtp("level").map(str::to_string),
                sublevel: params.find_fmtp("sublevel").map(str::to_string),
                packet_transmission_mode: PacketTransmissionMode::from_modes(
                    optional_number(params, "packetmode")?,
                    optional_number(params, "transmode")?,
                ),
            })),
            media_type @ (MediaType::AudioL24 | MediaType::AudioL16) => {
                Ok(Self::Audio(AudioParameters {
                    channel_count: params.rtpmap.channels.unwrap_or(1),
                    bit_depth: if media_type == MediaType::AudioL24 { 24 } else { 16 },
                    sample_rate: Rational::whole(params.rtpmap.clock_rate),
                    channel_order: params.find_fmtp("channel-order").map(str::to_string),
                }))
            }
            MediaType::VideoSmpte291 => Ok(Self::Data(DataParameters {
                did_sdids: params
                    .fmtp
                    .iter()
                    .filter(|(key, _)| key == "DID_SDID")
                    .map(|(_, value)| DidSdid::parse(value))
                    .collect::<Result<_>>()?,
                exactframerate: params
                    .find_fmtp("exactframerate")
                    .map(str::parse)
                    .transpose()?,
            })),
            MediaType::VideoSmpte2022_6 => Ok(Self::Mux),
        }
    }

    /// Frame or grain rate, where the format declares one.
    pub fn grain_rate(&self) -> Option<Rational> {
        match self {
            Self::VideoRaw(video) => Some(video.exactframerate),
            Self::VideoJxsv(jxsv) => Some(jxsv.video.exactframerate),
            Self::Audio(audio) => Some(audio.sample_rate),
            Self::Data(data) => data.exactframerate,
            Self::Mux => None,
        }
    }
}

fn video_parameters(params: &SdpParameters) -> Result<VideoParameters> {
    Ok(VideoParameters {
        sampling: required(params, "sampling")?.to_string(),
        depth: required(params, "depth")?
            .parse()
            .map_err(|_| DomainError::parse("invalid depth"))?,
        width: required(params, "width")?
            .parse()
            .map_err(|_| DomainError::parse("invalid width"))?,
        height: required(params, "height")?
            .parse()
            .map_err(|_| DomainError::parse("invalid height"))?,
        exactframerate: required(params, "exactframerate")?.parse()?,
        interlace: params.find_fmtp("interlace").is_some(),
        colorimetry: params.find_fmtp("colorimetry").unwrap_or("BT709").to_string(),
        tcs: params.find_fmtp("TCS").unwrap_or("SDR").to_string(),
        tp: params.find_fmtp("TP").map(str::to_string),
    })
}

fn required<'a>(params: &'a SdpParameters, name: &str) -> Result<&'a str> {
    params
        .find_fmtp(name)
        .ok_or_else(|| DomainError::parse(format!("missing format parameter: {}", name)))
}

fn optional_number(params: &SdpParameters, name: &str) -> Result<Option<u32>> {
    params
        .find_fmtp(name)
        .map(|value| {
            value
                .parse()
                .map_err(|_| DomainError::parse(format!("invalid {}: {}", name, value)))
        })
        .transpose()
}
