use std::net::IpAddr;

use crate::domain::ports::HostInterfaces;
use crate::domain::value_objects::HostInterface;

/// Host interfaces as the operating system reports them.
pub struct SystemInterfaces;

impl SystemInterfaces {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemInterfaces {
    fn default() -> Self {
        Self::new()
    }
}

impl HostInterfaces for SystemInterfaces {
    fn host_interfaces(&self) -> Vec<HostInterface> {
        let addrs = match get_if_addrs::get_if_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                tracing::warn!("Failed to enumerate network interfaces: {}", e);
                return Vec::new();
            }
        };
        group_by_name(
            addrs
                .into_iter()
                .filter(|iface| !iface.is_loopback())
                .map(|iface| {
                    let ip = iface.ip();
                    (iface.name, ip)
                }),
        )
        .into_iter()
        .map(|interface| match hardware_address(&interface.name) {
            Some(mac) => interface.with_port_id(&mac),
            None => interface,
        })
        .collect()
    }
}

/// MAC address the kernel reports for an interface (Linux sysfs).
fn hardware_address(name: &str) -> Option<String> {
    let mac = std::fs::read_to_string(format!("/sys/class/net/{}/address", name)).ok()?;
    let mac = mac.trim();
    (mac.len() == 17 && mac != "00:00:00:00:00:00").then(|| mac.to_string())
}

/// One interface per name, in the order names first appear.
fn group_by_name(addrs: impl IntoIterator<Item = (String, IpAddr)>) -> Vec<HostInterface> {
    let mut interfaces: Vec<HostInterface> = Vec::new();
    for (name, address) in addrs {
        match interfaces.iter_mut().find(|i| i.name == name) {
            Some(interface) => interface.addresses.push(address),
            None => interfaces.push(HostInterface::new(&name, vec![address])),
        }
    }
    interfaces
}

/// A fixed interface list, from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticInterfaces {
    interfaces: Vec<HostInterface>,
}

impl StaticInterfaces {
    pub fn new(interfaces: Vec<HostInterface>) -> Self {
        Self { interfaces }
    }
}

impl HostInterfaces for StaticInterfaces {
    fn host_interfaces(&self) -> Vec<HostInterface> {
        self.interfaces.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by_name_keeps_order() {
        let addrs = vec![
            ("eth1".to_string(), "198.51.100.1".parse().unwrap()),
            ("eth0".to_string(), "192.0.2.1".parse().unwrap()),
            ("eth1".to_string(), "2001:db8::1".parse().unwrap()),
        ];
        let interfaces = group_by_name(addrs);
        assert_eq!(interfaces.len(), 2);
        assert_eq!(interfaces[0].name, "eth1");
        assert_eq!(interfaces[0].addresses.len(), 2);
        assert_eq!(interfaces[1].name, "eth0");
    }

    #[test]
    fn test_unknown_interface_has_no_hardware_address() {
        assert_eq!(hardware_address("no-such-interface0"), None);
    }

    #[test]
    fn test_static_interfaces() {
        let eth0 = HostInterface::new("eth0", vec!["192.0.2.1".parse().unwrap()]);
        let host = StaticInterfaces::new(vec![eth0.clone()]);
        assert_eq!(host.host_interfaces(), vec![eth0]);
    }
}
