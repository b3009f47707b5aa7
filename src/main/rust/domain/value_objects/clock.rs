use std::fmt;

use serde::Serialize;

pub const PTP_VERSION: &str = "IEEE1588-2008";

/// Placeholder grandmaster id for a clock known only to be traceable.
pub const NULL_GMID: &str = "ff-ff-ff-ff-ff-ff-ff-ff";

/// The single clock shared by all sources.
pub const DEFAULT_CLOCK_NAME: &str = "clk0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clock {
    pub name: String,
    #[serde(flatten)]
    pub reference: ClockRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "ref_type", rename_all = "lowercase")]
pub enum ClockRef {
    Internal,
    Ptp {
        traceable: bool,
        version: String,
        gmid: String,
        locked: bool,
    },
}

impl Clock {
    pub fn internal(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reference: ClockRef::Internal,
        }
    }

    pub fn ptp(name: &str, traceable: bool, gmid: &str, locked: bool) -> Self {
        Self {
            name: name.to_string(),
            reference: ClockRef::Ptp {
                traceable,
                version: PTP_VERSION.to_string(),
                gmid: gmid.to_string(),
                locked,
            },
        }
    }

    pub fn is_ptp(&self) -> bool {
        matches!(self.reference, ClockRef::Ptp { .. })
    }
}

/// One `a=ts-refclk` value (RFC 7273), restricted to the clock sources a node uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TsRefClk {
    /// `ptp=<version>:<gmid>[:<domain>]`, or `ptp=<version>:traceable` when `server` is `None`.
    Ptp {
        version: String,
        server: Option<String>,
    },
    /// `localmac=<mac>`
    LocalMac(String),
}

impl TsRefClk {
    pub fn ptp(server: &str) -> Self {
        TsRefClk::Ptp {
            version: PTP_VERSION.to_string(),
            server: Some(server.to_string()),
        }
    }

    pub fn ptp_traceable() -> Self {
        TsRefClk::Ptp {
            version: PTP_VERSION.to_string(),
            server: None,
        }
    }

    /// Parse an attribute value; other clock sources (ntp, gps, ...) give `None`.
    pub fn parse(value: &str) -> Option<Self> {
        let (source, rest) = value.trim().split_once('=')?;
        match source {
            "ptp" => {
                let (version, server) = match rest.split_once(':') {
                    Some((version, server)) => (version, Some(server)),
                    None => (rest, None),
                };
                let server = server
                    .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("traceable"))
                    .map(str::to_string);
                Some(TsRefClk::Ptp {
                    version: version.to_string(),
                    server,
                })
            }
            "localmac" if !rest.is_empty() => Some(TsRefClk::LocalMac(rest.to_string())),
            _ => None,
        }
    }

    pub fn is_ieee1588_2008(&self) -> bool {
        matches!(self, TsRefClk::Ptp { version, .. } if version == PTP_VERSION)
    }
}

impl fmt::Display for TsRefClk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TsRefClk::Ptp {
                version,
                server: Some(server),
            } => write!(f, "ptp={}:{}", version, server),
            TsRefClk::Ptp {
                version,
                server: None,
            } => write!(f, "ptp={}:traceable", version),
            TsRefClk::LocalMac(mac) => write!(f, "localmac={}", mac),
        }
    }
}
