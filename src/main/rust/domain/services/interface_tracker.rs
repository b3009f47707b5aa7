use std::collections::BTreeSet;
use std::net::IpAddr;

use crate::domain::entities::{NodeModel, Receiver, Sender};
use crate::domain::errors::{DomainError, Result};
use crate::domain::value_objects::{find_interface, HostInterface, NodeInterface};

/// Name of the host interface each leg address is bound to.
pub fn interface_bindings(
    host: &[HostInterface],
    addresses: &[IpAddr],
    internal_id: &str,
) -> Result<Vec<String>> {
    addresses
        .iter()
        .map(|address| {
            find_interface(host, address)
                .map(|interface| interface.name.clone())
                .ok_or_else(|| DomainError::NoMatchingInterface {
                    address: *address,
                    internal_id: internal_id.to_string(),
                })
        })
        .collect()
}

/// Advertise exactly the host interfaces some sender or receiver is bound to.
/// Returns whether the node changed.
pub fn update_node_interfaces(model: &mut NodeModel, host: &[HostInterface]) -> bool {
    let bound: BTreeSet<&str> = model
        .resources
        .iter_of::<Sender>()
        .flat_map(|sender| sender.interface_bindings.iter())
        .chain(
            model
                .resources
                .iter_of::<Receiver>()
                .flat_map(|receiver| receiver.interface_bindings.iter()),
        )
        .map(String::as_str)
        .collect();

    let mut seen = BTreeSet::new();
    let interfaces: Vec<NodeInterface> = host
        .iter()
        .filter(|interface| bound.contains(interface.name.as_str()))
        .filter(|interface| seen.insert(interface.name.as_str()))
        .map(NodeInterface::from)
        .collect();

    let mut changed = false;
    model.modify_node(|node| changed = node.update_interfaces(interfaces));
    changed
}
