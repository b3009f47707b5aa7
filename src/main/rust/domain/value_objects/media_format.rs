use std::fmt;

use serde::Serialize;

use crate::domain::errors::{DomainError, Result};

/// The media types a node can describe with a session description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MediaType {
    #[serde(rename = "video/raw")]
    VideoRaw,
    #[serde(rename = "video/jxsv")]
    VideoJxsv,
    #[serde(rename = "audio/L24")]
    AudioL24,
    #[serde(rename = "audio/L16")]
    AudioL16,
    #[serde(rename = "video/smpte291")]
    VideoSmpte291,
    #[serde(rename = "video/SMPTE2022-6")]
    VideoSmpte2022_6,
}

impl MediaType {
    /// Identify a media type from the `m=` media and the `a=rtpmap` encoding name.
    pub fn from_sdp(media: &str, encoding_name: &str) -> Result<Self> {
        let media_type = format!("{}/{}", media, encoding_name);
        Self::parse(&media_type)
    }

    pub fn parse(media_type: &str) -> Result<Self> {
        match media_type.to_ascii_lowercase().as_str() {
            "video/raw" => Ok(MediaType::VideoRaw),
            "video/jxsv" => Ok(MediaType::VideoJxsv),
            "audio/l24" => Ok(MediaType::AudioL24),
            "audio/l16" => Ok(MediaType::AudioL16),
            "video/smpte291" => Ok(MediaType::VideoSmpte291),
            "video/smpte2022-6" => Ok(MediaType::VideoSmpte2022_6),
            _ => Err(DomainError::UnsupportedFormat(media_type.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::VideoRaw => "video/raw",
            MediaType::VideoJxsv => "video/jxsv",
            MediaType::AudioL24 => "audio/L24",
            MediaType::AudioL16 => "audio/L16",
            MediaType::VideoSmpte291 => "video/smpte291",
            MediaType::VideoSmpte2022_6 => "video/SMPTE2022-6",
        }
    }

    pub fn format(&self) -> Format {
        match self {
            MediaType::VideoRaw | MediaType::VideoJxsv => Format::Video,
            MediaType::AudioL24 | MediaType::AudioL16 => Format::Audio,
            MediaType::VideoSmpte291 => Format::Data,
            MediaType::VideoSmpte2022_6 => Format::Mux,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Essence format of a source, flow or receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Format {
    #[serde(rename = "urn:x-nmos:format:video")]
    Video,
    #[serde(rename = "urn:x-nmos:format:audio")]
    Audio,
    #[serde(rename = "urn:x-nmos:format:data")]
    Data,
    #[serde(rename = "urn:x-nmos:format:mux")]
    Mux,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Video => "urn:x-nmos:format:video",
            Format::Audio => "urn:x-nmos:format:audio",
            Format::Data => "urn:x-nmos:format:data",
            Format::Mux => "urn:x-nmos:format:mux",
        }
    }
}
