use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::Serialize;

use super::Rational;

/// Parameter constraint URNs used in receiver capabilities.
pub mod caps {
    pub const GRAIN_RATE: &str = "urn:x-nmos:cap:format:grain_rate";
    pub const FRAME_WIDTH: &str = "urn:x-nmos:cap:format:frame_width";
    pub const FRAME_HEIGHT: &str = "urn:x-nmos:cap:format:frame_height";
    pub const INTERLACE_MODE: &str = "urn:x-nmos:cap:format:interlace_mode";
    pub const COLOR_SAMPLING: &str = "urn:x-nmos:cap:format:color_sampling";
    pub const PROFILE: &str = "urn:x-nmos:cap:format:profile";
    pub const LEVEL: &str = "urn:x-nmos:cap:format:level";
    pub const SUBLEVEL: &str = "urn:x-nmos:cap:format:sublevel";
    pub const FORMAT_BIT_RATE: &str = "urn:x-nmos:cap:format:bit_rate";
    pub const CHANNEL_COUNT: &str = "urn:x-nmos:cap:format:channel_count";
    pub const SAMPLE_RATE: &str = "urn:x-nmos:cap:format:sample_rate";
    pub const SAMPLE_DEPTH: &str = "urn:x-nmos:cap:format:sample_depth";
    pub const TRANSPORT_BIT_RATE: &str = "urn:x-nmos:cap:transport:bit_rate";
    pub const PACKET_TIME: &str = "urn:x-nmos:cap:transport:packet_time";
    pub const MAX_PACKET_TIME: &str = "urn:x-nmos:cap:transport:max_packet_time";
    pub const PACKET_TRANSMISSION_MODE: &str = "urn:x-nmos:cap:transport:packet_transmission_mode";
}

/// Transport parameter names used in endpoint constraints.
pub mod params {
    pub const SOURCE_IP: &str = "source_ip";
    pub const INTERFACE_IP: &str = "interface_ip";
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConstraintValue {
    Integer(i64),
    Number(f64),
    String(String),
    Rational(Rational),
    Address(IpAddr),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Constraint {
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enumeration: Vec<ConstraintValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<ConstraintValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<ConstraintValue>,
}

impl Constraint {
    pub fn enumerated(values: Vec<ConstraintValue>) -> Self {
        Self {
            enumeration: values,
            ..Default::default()
        }
    }

    pub fn integers(values: &[i64]) -> Self {
        Self::enumerated(values.iter().copied().map(ConstraintValue::Integer).collect())
    }

    pub fn strings<S: AsRef<str>>(values: &[S]) -> Self {
        Self::enumerated(
            values
                .iter()
                .map(|s| ConstraintValue::String(s.as_ref().to_string()))
                .collect(),
        )
    }

    pub fn rationals(values: &[Rational]) -> Self {
        Self::enumerated(values.iter().copied().map(ConstraintValue::Rational).collect())
    }

    pub fn numbers(values: &[f64]) -> Self {
        Self::enumerated(values.iter().copied().map(ConstraintValue::Number).collect())
    }

    pub fn address(address: IpAddr) -> Self {
        Self::enumerated(vec![ConstraintValue::Address(address)])
    }

    pub fn at_most(maximum: i64) -> Self {
        Self {
            maximum: Some(ConstraintValue::Integer(maximum)),
            ..Default::default()
        }
    }

    /// The single address a constraint enumerates first, if any.
    pub fn first_address(&self) -> Option<IpAddr> {
        self.enumeration.iter().find_map(|value| match value {
            ConstraintValue::Address(address) => Some(*address),
            ConstraintValue::String(s) => s.parse().ok(),
            _ => None,
        })
    }
}

/// Constraints keyed by parameter name or capability URN.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ConstraintSet(BTreeMap<String, Constraint>);

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, constraint: Constraint) -> Self {
        self.0.insert(key.to_string(), constraint);
        self
    }

    /// Adds the constraint only when `include` holds.
    pub fn with_if(self, include: bool, key: &str, constraint: Constraint) -> Self {
        if include {
            self.with(key, constraint)
        } else {
            self
        }
    }

    pub fn get(&self, key: &str) -> Option<&Constraint> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}
