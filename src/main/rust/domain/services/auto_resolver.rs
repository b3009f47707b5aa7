//! Fills `auto` transport parameters before a sender or receiver goes active.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use uuid::Uuid;

use crate::domain::value_objects::{params, ConstraintSet, TransportParams, DEFAULT_RTP_PORT};

/// Source-specific multicast address for one leg of a sender.
///
/// CRC-32 (IEEE) of `"<id>/<leg>"` read as an IPv4 address, moved into
/// 232.x.y.z with an odd third octet. Changing the hash moves every address
/// already assigned to a deployment.
pub fn multicast_address(id: impl fmt::Display, leg: usize) -> Ipv4Addr {
    let hash = crc32fast::hash(format!("{}/{}", id, leg).as_bytes());
    let mut octets = Ipv4Addr::from(hash).octets();
    octets[0] = 232;
    octets[2] |= 1;
    Ipv4Addr::from(octets)
}

/// Resolve every `auto` value in `transport_params`, leg by leg, from the
/// endpoint constraints of the connection resource `id`.
pub fn resolve_auto(id: &Uuid, transport_params: &mut TransportParams, constraints: &[ConstraintSet]) {
    let constrained = |leg: usize, key: &str| -> Option<IpAddr> {
        constraints
            .get(leg)
            .and_then(|set| set.get(key))
            .and_then(|constraint| constraint.first_address())
    };

    match transport_params {
        TransportParams::Sender(legs) => {
            for (index, leg) in legs.iter_mut().enumerate() {
                leg.source_ip.resolve_with(|| constrained(index, params::SOURCE_IP));
                leg.destination_ip.resolve_with(|| {
                    let address = multicast_address(id, index);
                    tracing::debug!(sender_id = %id, leg = index, %address, "Generated multicast address");
                    Some(IpAddr::V4(address))
                });
                leg.source_port.resolve_with(|| Some(DEFAULT_RTP_PORT));
                leg.destination_port.resolve_with(|| Some(DEFAULT_RTP_PORT));
            }
        }
        TransportParams::Receiver(legs) => {
            for (index, leg) in legs.iter_mut().enumerate() {
                leg.interface_ip.resolve_with(|| constrained(index, params::INTERFACE_IP));
                leg.destination_port.resolve_with(|| Some(DEFAULT_RTP_PORT));
            }
        }
    }
}
