use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::domain::errors::{DomainError, Result};

/// `o=<username> <sess-id> <sess-version> IN IP4 <unicast-address>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub user_name: String,
    pub session_id: u64,
    pub session_version: u64,
    pub network_type: String,
    pub address_type: String,
    pub unicast_address: String,
}

impl Default for Origin {
    fn default() -> Self {
        Self {
            user_name: "-".to_string(),
            session_id: 0,
            session_version: 0,
            network_type: "IN".to_string(),
            address_type: "IP4".to_string(),
            unicast_address: "127.0.0.1".to_string(),
        }
    }
}

impl FromStr for Origin {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        let [user_name, session_id, session_version, network_type, address_type, unicast_address] =
            fields[..]
        else {
            return Err(DomainError::parse(format!("invalid origin: {}", s)));
        };
        let number = |value: &str| {
            value
                .parse::<u64>()
                .map_err(|_| DomainError::parse(format!("invalid origin: {}", s)))
        };
        Ok(Self {
            user_name: user_name.to_string(),
            session_id: number(session_id)?,
            session_version: number(session_version)?,
            network_type: network_type.to_string(),
            address_type: address_type.to_string(),
            unicast_address: unicast_address.to_string(),
        })
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.user_name,
            self.session_id,
            self.session_version,
            self.network_type,
            self.address_type,
            self.unicast_address
        )
    }
}

/// `c=IN IP4 <address>[/<ttl>]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub network_type: String,
    pub address_type: String,
    pub address: String,
    pub ttl: Option<u32>,
}

impl Connection {
    pub fn new(address: IpAddr, ttl: Option<u32>) -> Self {
        let address_type = if address.is_ipv4() { "IP4" } else { "IP6" };
        Self {
            network_type: "IN".to_string(),
            address_type: address_type.to_string(),
            address: address.to_string(),
            ttl,
        }
    }
}

impl FromStr for Connection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        let [network_type, address_type, address] = fields[..] else {
            return Err(DomainError::parse(format!("invalid connection: {}", s)));
        };
        let (address, ttl) = match address.split_once('/') {
            Some((address, ttl)) => {
                // a second suffix is the number of addresses, which is not used here
                let ttl = ttl.split('/').next().unwrap_or_default();
                let ttl = ttl
                    .parse()
                    .map_err(|_| DomainError::parse(format!("invalid connection ttl: {}", s)))?;
                (address, Some(ttl))
            }
            None => (address, None),
        };
        Ok(Self {
            network_type: network_type.to_string(),
            address_type: address_type.to_string(),
            address: address.to_string(),
            ttl,
        })
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.network_type, self.address_type, self.address)?;
        if let Some(ttl) = self.ttl {
            write!(f, "/{}", ttl)?;
        }
        Ok(())
    }
}

/// `b=<type>:<bandwidth>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bandwidth {
    pub bandwidth_type: String,
    pub bandwidth: u64,
}

impl Bandwidth {
    pub const APPLICATION_SPECIFIC: &'static str = "AS";

    pub fn is_application_specific(&self) -> bool {
        self.bandwidth_type == Self::APPLICATION_SPECIFIC
    }
}

impl FromStr for Bandwidth {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        let (bandwidth_type, bandwidth) = s
            .split_once(':')
            .ok_or_else(|| DomainError::parse(format!("invalid bandwidth: {}", s)))?;
        let bandwidth = bandwidth
            .trim()
            .parse()
            .map_err(|_| DomainError::parse(format!("invalid bandwidth: {}", s)))?;
        Ok(Self {
            bandwidth_type: bandwidth_type.trim().to_string(),
            bandwidth,
        })
    }
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.bandwidth_type, self.bandwidth)
    }
}

/// `a=<name>[:<value>]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

impl Attribute {
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: Some(value.into()),
        }
    }

    pub fn flag(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: None,
        }
    }

    fn parse(s: &str) -> Self {
        match s.split_once(':') {
            Some((name, value)) => Self::new(name, value),
            None => Self::flag(s),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}:{}", self.name, value),
            None => f.write_str(&self.name),
        }
    }
}

/// First value of the named attribute.
pub fn find_attribute<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a Attribute> {
    attributes.iter().find(|a| a.name == name)
}

/// Values of every attribute with this name, in order.
pub fn attribute_values<'a>(attributes: &'a [Attribute], name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    attributes
        .iter()
        .filter(move |a| a.name == name)
        .filter_map(|a| a.value.as_deref())
}

/// `m=<media> <port> <proto> <fmt> ...` and the lines that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDescription {
    pub media: String,
    pub port: u16,
    pub protocol: String,
    pub formats: Vec<String>,
    pub information: Option<String>,
    pub connections: Vec<Connection>,
    pub bandwidths: Vec<Bandwidth>,
    pub attributes: Vec<Attribute>,
}

impl FromStr for MediaDescription {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        let mut fields = s.split_whitespace();
        let (Some(media), Some(port), Some(protocol)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(DomainError::parse(format!("invalid media description: {}", s)));
        };
        // "<port>/<number of ports>" is accepted, the count is dropped
        let port = port
            .split('/')
            .next()
            .unwrap_or_default()
            .parse()
            .map_err(|_| DomainError::parse(format!("invalid media port: {}", s)))?;
        Ok(Self {
            media: media.to_string(),
            port,
            protocol: protocol.to_string(),
            formats: fields.map(str::to_string).collect(),
            information: None,
            connections: Vec::new(),
            bandwidths: Vec::new(),
            attributes: Vec::new(),
        })
    }
}

/// A session description as written on the wire (RFC 4566), covering the
/// lines the broadcast profiles use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub origin: Origin,
    pub session_name: String,
    pub information: Option<String>,
    pub connection: Option<Connection>,
    pub bandwidths: Vec<Bandwidth>,
    pub timing: (u64, u64),
    pub attributes: Vec<Attribute>,
    pub media_descriptions: Vec<MediaDescription>,
}

impl SessionDescription {
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.trim().is_empty());

        match lines.next() {
            Some("v=0") => {}
            Some(line) => return Err(DomainError::parse(format!("expected v=0, found: {}", line))),
            None => return Err(DomainError::parse("empty session description")),
        }

        let mut origin = None;
        let mut session_name = None;
        let mut information = None;
        let mut connection = None;
        let mut bandwidths = Vec::new();
        let mut timing = (0, 0);
        let mut attributes = Vec::new();
        let mut media_descriptions: Vec<MediaDescription> = Vec::new();

        for line in lines {
            let (kind, value) = line
                .split_once('=')
                .filter(|(kind, _)| kind.len() == 1)
                .ok_or_else(|| DomainError::parse(format!("invalid line: {}", line)))?;

            if kind == "m" {
                media_descriptions.push(value.parse()?);
                continue;
            }

            if let Some(media) = media_descriptions.last_mut() {
                match kind {
                    "i" => media.information = Some(value.to_string()),
                    "c" => media.connections.push(value.parse()?),
                    "b" => media.bandwidths.push(value.parse()?),
                    "a" => media.attributes.push(Attribute::parse(value)),
                    // k= and anything unknown is not used at media level
                    _ => {}
                }
                continue;
            }

            match kind {
                "o" => origin = Some(value.parse()?),
                "s" => session_name = Some(value.to_string()),
                "i" => information = Some(value.to_string()),
                "c" => connection = Some(value.parse()?),
                "b" => bandwidths.push(value.parse()?),
                "t" => timing = parse_timing(value)?,
                "a" => attributes.push(Attribute::parse(value)),
                // u=, e=, p=, z=, k= and r= carry nothing a node needs
                _ => {}
            }
        }

        Ok(Self {
            origin: origin.ok_or_else(|| DomainError::parse("missing origin (o=) line"))?,
            session_name: session_name
                .ok_or_else(|| DomainError::parse("missing session name (s=) line"))?,
            information,
            connection,
            bandwidths,
            timing,
            attributes,
            media_descriptions,
        })
    }

    pub fn find_attribute(&self, name: &str) -> Option<&Attribute> {
        find_attribute(&self.attributes, name)
    }
}

fn parse_timing(value: &str) -> Result<(u64, u64)> {
    let invalid = || DomainError::parse(format!("invalid timing: {}", value));
    let (start, stop) = value.trim().split_once(' ').ok_or_else(invalid)?;
    Ok((
        start.trim().parse().map_err(|_| invalid())?,
        stop.trim().parse().map_err(|_| invalid())?,
    ))
}

impl FromStr for SessionDescription {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SessionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v=0\r\n")?;
        write!(f, "o={}\r\n", self.origin)?;
        write!(f, "s={}\r\n", self.session_name)?;
        if let Some(information) = &self.information {
            write!(f, "i={}\r\n", information)?;
        }
        if let Some(connection) = &self.connection {
            write!(f, "c={}\r\n", connection)?;
        }
        for bandwidth in &self.bandwidths {
            write!(f, "b={}\r\n", bandwidth)?;
        }
        write!(f, "t={} {}\r\n", self.timing.0, self.timing.1)?;
        for attribute in &self.attributes {
            write!(f, "a={}\r\n", attribute)?;
        }
        for media in &self.media_descriptions {
            write!(f, "m={} {} {}", media.media, media.port, media.protocol)?;
            for format in &media.formats {
                write!(f, " {}", format)?;
            }
            write!(f, "\r\n")?;
            if let Some(information) = &media.information {
                write!(f, "i={}\r\n", information)?;
            }
            for connection in &media.connections {
                write!(f, "c={}\r\n", connection)?;
            }
            for bandwidth in &media.bandwidths {
                write!(f, "b={}\r\n", bandwidth)?;
            }
            for attribute in &media.attributes {
                write!(f, "a={}\r\n", attribute)?;
            }
        }
        Ok(())
    }
}
