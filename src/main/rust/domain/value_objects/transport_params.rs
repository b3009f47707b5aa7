use std::net::IpAddr;

use serde::{Serialize, Serializer};

/// Default RTP port applied to unresolved ports.
pub const DEFAULT_RTP_PORT: u16 = 5004;

/// A transport parameter that may be left for the node to choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolvable<T> {
    Auto,
    Value(T),
}

impl<T> Default for Resolvable<T> {
    fn default() -> Self {
        Resolvable::Auto
    }
}

impl<T> Resolvable<T> {
    pub fn is_auto(&self) -> bool {
        matches!(self, Resolvable::Auto)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Resolvable::Auto => None,
            Resolvable::Value(value) => Some(value),
        }
    }

    /// Replace `Auto` with the supplied value, if one can be produced.
    pub fn resolve_with(&mut self, resolve: impl FnOnce() -> Option<T>) {
        if self.is_auto() {
            if let Some(value) = resolve() {
                *self = Resolvable::Value(value);
            }
        }
    }
}

impl<T: Serialize> Serialize for Resolvable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Resolvable::Auto => serializer.serialize_str("auto"),
            Resolvable::Value(value) => value.serialize(serializer),
        }
    }
}

/// RTP sender leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SenderLeg {
    pub source_ip: Resolvable<IpAddr>,
    pub destination_ip: Resolvable<IpAddr>,
    pub source_port: Resolvable<u16>,
    pub destination_port: Resolvable<u16>,
    pub rtp_enabled: bool,
}

impl Default for SenderLeg {
    fn default() -> Self {
        Self {
            source_ip: Resolvable::Auto,
            destination_ip: Resolvable::Auto,
            source_port: Resolvable::Auto,
            destination_port: Resolvable::Auto,
            rtp_enabled: true,
        }
    }
}

/// RTP receiver leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiverLeg {
    pub source_ip: Option<IpAddr>,
    pub multicast_ip: Option<IpAddr>,
    pub interface_ip: Resolvable<IpAddr>,
    pub destination_port: Resolvable<u16>,
    pub rtp_enabled: bool,
}

impl Default for ReceiverLeg {
    fn default() -> Self {
        Self {
            source_ip: None,
            multicast_ip: None,
            interface_ip: Resolvable::Auto,
            destination_port: Resolvable::Auto,
            rtp_enabled: true,
        }
    }
}

/// Per-leg transport parameters of a sender or a receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TransportParams {
    Sender(Vec<SenderLeg>),
    Receiver(Vec<ReceiverLeg>),
}

impl TransportParams {
    pub fn len(&self) -> usize {
        match self {
            TransportParams::Sender(legs) => legs.len(),
            TransportParams::Receiver(legs) => legs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rtp_enabled(&self, leg: usize) -> bool {
        match self {
            TransportParams::Sender(legs) => legs.get(leg).map_or(false, |l| l.rtp_enabled),
            TransportParams::Receiver(legs) => legs.get(leg).map_or(false, |l| l.rtp_enabled),
        }
    }

    /// Address each leg is bound to: the source address of a sender leg,
    /// the interface address of a receiver leg.
    pub fn bound_addresses(&self) -> Vec<Option<IpAddr>> {
        match self {
            TransportParams::Sender(legs) => {
                legs.iter().map(|l| l.source_ip.value().copied()).collect()
            }
            TransportParams::Receiver(legs) => {
                legs.iter().map(|l| l.interface_ip.value().copied()).collect()
            }
        }
    }

    /// Adopt `other` leg by leg. Legs `other` does not describe keep their
    /// previous values but are disabled.
    pub fn overlay(&self, other: &TransportParams) -> TransportParams {
        match (self, other) {
            (TransportParams::Sender(current), TransportParams::Sender(new)) => {
                TransportParams::Sender(overlay_legs(current, new, |l| l.rtp_enabled = false))
            }
            (TransportParams::Receiver(current), TransportParams::Receiver(new)) => {
                TransportParams::Receiver(overlay_legs(current, new, |l| l.rtp_enabled = false))
            }
            _ => other.clone(),
        }
    }
}

fn overlay_legs<L: Clone>(current: &[L], new: &[L], disable: impl Fn(&mut L)) -> Vec<L> {
    current
        .iter()
        .enumerate()
        .map(|(leg, previous)| match new.get(leg) {
            Some(replacement) => replacement.clone(),
            None => {
                let mut kept = previous.clone();
                disable(&mut kept);
                kept
            }
        })
        .collect()
}
