//! Derives the node's shared clock from the ts-refclk lines of sender legs.

use crate::domain::entities::NodeModel;
use crate::domain::value_objects::{Clock, ClockRef, TsRefClk, NULL_GMID, PTP_VERSION};

/// A clock description plus the PTP domain number, when the lines carried one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedClock {
    pub clock: Clock,
    pub domain: Option<u8>,
}

/// Resolve the clock named `name` from per-leg ts-refclk lists.
///
/// The first leg naming a PTP grandmaster decides; failing that, any traceable
/// PTP reference gives a traceable clock with no known grandmaster; otherwise
/// the clock is internal.
pub fn resolve_clock(name: &str, ts_refclks: &[Vec<TsRefClk>]) -> ResolvedClock {
    let grandmaster = ts_refclks.iter().find_map(|leg| {
        leg.iter().find_map(|refclk| match refclk {
            TsRefClk::Ptp {
                server: Some(server),
                ..
            } if refclk.is_ieee1588_2008() => Some((leg, server)),
            _ => None,
        })
    });

    if let Some((leg, server)) = grandmaster {
        let (gmid, domain) = match server.split_once(':') {
            Some((gmid, domain)) => (gmid, domain.trim().parse().ok()),
            None => (server.as_str(), None),
        };
        let traceable = leg.iter().any(is_traceable);
        return ResolvedClock {
            clock: Clock::ptp(name, traceable, &gmid.to_ascii_lowercase(), true),
            domain,
        };
    }

    if ts_refclks.iter().flatten().any(is_traceable) {
        return ResolvedClock {
            clock: Clock::ptp(name, true, NULL_GMID, true),
            domain: None,
        };
    }

    ResolvedClock {
        clock: Clock::internal(name),
        domain: None,
    }
}

fn is_traceable(refclk: &TsRefClk) -> bool {
    matches!(refclk, TsRefClk::Ptp { server: None, .. }) && refclk.is_ieee1588_2008()
}

/// Apply the clock resolved from `ts_refclks` to the node. Returns whether the
/// node clock changed; the node version is only bumped when it did.
pub fn update_clock(model: &mut NodeModel, clock_name: &str, ts_refclks: &[Vec<TsRefClk>]) -> bool {
    let resolved = resolve_clock(clock_name, ts_refclks);
    if let Some(domain) = resolved.domain {
        model.set_ptp_domain(clock_name, domain);
    }
    let mut changed = false;
    model.modify_node(|node| changed = node.update_clock(resolved.clock));
    if changed {
        tracing::info!(clock = %clock_name, "Node clock updated");
    }
    changed
}

/// The ts-refclk lines describing `clock` in an outgoing session description.
pub fn clock_ts_refclks(clock: &Clock, domain: u8, port_id: Option<&str>) -> Vec<TsRefClk> {
    match &clock.reference {
        ClockRef::Ptp {
            traceable, gmid, ..
        } => {
            let mut refclks = Vec::new();
            if *traceable {
                refclks.push(TsRefClk::ptp_traceable());
            }
            if gmid != NULL_GMID {
                refclks.push(TsRefClk::Ptp {
                    version: PTP_VERSION.to_string(),
                    server: Some(format!("{}:{}", gmid.to_ascii_uppercase(), domain)),
                });
            }
            refclks
        }
        ClockRef::Internal => port_id
            .map(|mac| vec![TsRefClk::LocalMac(mac.to_ascii_uppercase())])
            .unwrap_or_default(),
    }
}
