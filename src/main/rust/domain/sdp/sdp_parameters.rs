use std::fmt;
use std::str::FromStr;

use super::session_description::{attribute_values, Bandwidth, Origin, SessionDescription};
use crate::domain::errors::{DomainError, Result};
use crate::domain::value_objects::{MediaType, TsRefClk};

/// Grouping semantics used for redundant legs (RFC 7104).
pub const DUPLICATION: &str = "DUP";

/// Prefix of the vendor format parameters that never leave the node.
pub const CUSTOM_FMTP_PREFIX: &str = "x-nvnmos-";

/// `a=group:<semantics> <mid> ...`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Group {
    pub semantics: String,
    pub media_stream_ids: Vec<String>,
}

impl Group {
    pub fn is_empty(&self) -> bool {
        self.semantics.is_empty()
    }
}

impl FromStr for Group {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        let mut fields = s.split_whitespace();
        let semantics = fields
            .next()
            .ok_or_else(|| DomainError::parse(format!("invalid group: {}", s)))?;
        Ok(Self {
            semantics: semantics.to_string(),
            media_stream_ids: fields.map(str::to_string).collect(),
        })
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.semantics)?;
        for id in &self.media_stream_ids {
            write!(f, " {}", id)?;
        }
        Ok(())
    }
}

/// `a=rtpmap:<payload type> <encoding name>/<clock rate>[/<channels>]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpMap {
    pub payload_type: u8,
    pub encoding_name: String,
    pub clock_rate: u64,
    pub channels: Option<u32>,
}

impl FromStr for RtpMap {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || DomainError::parse(format!("invalid rtpmap: {}", s));
        let (payload_type, encoding) = s.trim().split_once(' ').ok_or_else(invalid)?;
        let mut parts = encoding.trim().split('/');
        let encoding_name = parts.next().filter(|n| !n.is_empty()).ok_or_else(invalid)?;
        let clock_rate = parts.next().ok_or_else(invalid)?.parse().map_err(|_| invalid())?;
        let channels = parts.next().map(|c| c.parse()).transpose().map_err(|_| invalid())?;
        Ok(Self {
            payload_type: payload_type.parse().map_err(|_| invalid())?,
            encoding_name: encoding_name.to_string(),
            clock_rate,
            channels,
        })
    }
}

impl fmt::Display for RtpMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.payload_type, self.encoding_name, self.clock_rate)?;
        if let Some(channels) = self.channels {
            write!(f, "/{}", channels)?;
        }
        Ok(())
    }
}

/// The media-level parameters shared by every leg of a session description,
/// plus the clock references declared for each leg.
#[derive(Debug, Clone, PartialEq)]
pub struct SdpParameters {
    pub origin: Origin,
    pub session_name: String,
    pub ttl: Option<u32>,
    pub bandwidth: Option<Bandwidth>,
    pub group: Group,
    pub media: String,
    pub protocol: String,
    pub rtpmap: RtpMap,
    pub fmtp: Vec<(String, String)>,
    pub packet_time: Option<f64>,
    pub max_packet_time: Option<f64>,
    pub framerate: Option<f64>,
    pub mediaclk: Option<String>,
    /// Per leg; a leg without its own ts-refclk lines takes the session-level ones.
    pub ts_refclk: Vec<Vec<TsRefClk>>,
}

impl SdpParameters {
    pub fn from_session_description(sdp: &SessionDescription) -> Result<Self> {
        let first = sdp
            .media_descriptions
            .first()
            .ok_or_else(|| DomainError::parse("no media descriptions"))?;

        let rtpmap: RtpMap = attribute_values(&first.attributes, "rtpmap")
            .next()
            .ok_or_else(|| DomainError::parse("missing rtpmap attribute"))?
            .parse()?;

        let fmtp = attribute_values(&first.attributes, "fmtp")
            .next()
            .map(parse_fmtp)
            .unwrap_or_default();

        let number = |name: &str| -> Result<Option<f64>> {
            attribute_values(&first.attributes, name)
                .next()
                .map(|value| {
                    value
                        .trim()
                        .parse()
                        .map_err(|_| DomainError::parse(format!("invalid {}: {}", name, value)))
                })
                .transpose()
        };

        let group = attribute_values(&sdp.attributes, "group")
            .next()
            .map(str::parse::<Group>)
            .transpose()?
            .unwrap_or_default();

        let session_ts_refclk = parse_ts_refclks(attribute_values(&sdp.attributes, "ts-refclk"));
        let ts_refclk = sdp
            .media_descriptions
            .iter()
            .map(|media| {
                let ts_refclk = parse_ts_refclks(attribute_values(&media.attributes, "ts-refclk"));
                if ts_refclk.is_empty() {
                    session_ts_refclk.clone()
                } else {
                    ts_refclk
                }
            })
            .collect();

        let ttl = first
            .connections
            .first()
            .or(sdp.connection.as_ref())
            .and_then(|c| c.ttl);

        let bandwidth = sdp
            .bandwidths
            .iter()
            .chain(first.bandwidths.iter())
            .find(|b| b.is_application_specific())
            .cloned();

        Ok(Self {
            origin: sdp.origin.clone(),
            session_name: sdp.session_name.clone(),
            ttl,
            bandwidth,
            group,
            media: first.media.clone(),
            protocol: first.protocol.clone(),
            rtpmap,
            fmtp,
            packet_time: number("ptime")?,
            max_packet_time: number("maxptime")?,
            framerate: number("framerate")?,
            mediaclk: attribute_values(&first.attributes, "mediaclk")
                .next()
                .map(str::to_string),
            ts_refclk,
        })
    }

    pub fn media_type(&self) -> Result<MediaType> {
        MediaType::from_sdp(&self.media, &self.rtpmap.encoding_name)
    }

    pub fn find_fmtp(&self, name: &str) -> Option<&str> {
        self.fmtp
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Drop the vendor format parameters that are only meaningful inside the node.
    pub fn without_custom_fmtp(mut self) -> Self {
        self.fmtp.retain(|(key, _)| !key.starts_with(CUSTOM_FMTP_PREFIX));
        self
    }

    /// The `a=fmtp` value, payload type first.
    pub fn fmtp_line(&self) -> Option<String> {
        if self.fmtp.is_empty() {
            return None;
        }
        let params: Vec<String> = self
            .fmtp
            .iter()
            .map(|(key, value)| {
                if value.is_empty() {
                    key.clone()
                } else {
                    format!("{}={}", key, value)
                }
            })
            .collect();
        Some(format!("{} {}", self.rtpmap.payload_type, params.join("; ")))
    }
}

fn parse_fmtp(value: &str) -> Vec<(String, String)> {
    // skip the payload type
    let params = value.trim().split_once(' ').map_or("", |(_, params)| params);
    params
        .split(';')
        .map(str::trim)
        .filter(|param| !param.is_empty())
        .map(|param| match param.split_once('=') {
            Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
            None => (param.to_string(), String::new()),
        })
        .collect()
}

fn parse_ts_refclks<'a>(values: impl Iterator<Item = &'a str>) -> Vec<TsRefClk> {
    values.filter_map(TsRefClk::parse).collect()
}
