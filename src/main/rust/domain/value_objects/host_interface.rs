use std::net::IpAddr;

use serde::Serialize;

/// A network interface the host reports, with every address bound to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInterface {
    pub name: String,
    /// MAC address in `aa-bb-cc-dd-ee-ff` form, when the platform reports one.
    pub port_id: Option<String>,
    pub addresses: Vec<IpAddr>,
}

impl HostInterface {
    pub fn new(name: &str, addresses: Vec<IpAddr>) -> Self {
        Self {
            name: name.to_string(),
            port_id: None,
            addresses,
        }
    }

    pub fn with_port_id(mut self, port_id: &str) -> Self {
        self.port_id = Some(port_id.to_ascii_lowercase().replace(':', "-"));
        self
    }

    pub fn has_address(&self, address: &IpAddr) -> bool {
        self.addresses.contains(address)
    }
}

/// Find the interface an address is bound to.
pub fn find_interface<'a>(interfaces: &'a [HostInterface], address: &IpAddr) -> Option<&'a HostInterface> {
    interfaces.iter().find(|interface| interface.has_address(address))
}

/// An interface as advertised on the Node resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeInterface {
    pub name: String,
    pub chassis_id: Option<String>,
    pub port_id: Option<String>,
}

impl From<&HostInterface> for NodeInterface {
    fn from(interface: &HostInterface) -> Self {
        Self {
            name: interface.name.clone(),
            chassis_id: None,
            port_id: interface.port_id.clone(),
        }
    }
}
