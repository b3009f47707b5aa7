//! Moves senders and receivers between inactive and active, regenerating the
//! session descriptions that go with each state.

use uuid::Uuid;

use crate::domain::entities::{
    Activation, ConnectionResource, Flow, NodeModel, Receiver, Resource, Sender, Source,
    StageRequest, TransportFile,
};
use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::ActivationHandler;
use crate::domain::sdp::{
    make_internal_session_description, make_session_description, transport_params, Group,
    SdpParameters, SessionDescription, DUPLICATION,
};
use crate::domain::services::{
    clock_ts_refclks, resolve_auto, resolve_clock, update_clock, ResolvedClock,
};
use crate::domain::value_objects::{
    find_interface, next_session_version, ActivationState, Clock, HostInterface, ResourceType,
    TransportParams, TsRefClk, Version,
};

/// The sender or receiver an activation applies to.
#[derive(Debug, Clone)]
struct Target {
    kind: ResourceType,
    id: Uuid,
    internal_id: String,
}

fn locate(model: &NodeModel, internal_id: &str) -> Result<Target> {
    [ResourceType::Sender, ResourceType::Receiver]
        .into_iter()
        .find_map(|kind| {
            model.find_internal_id(kind, internal_id).map(|id| Target {
                kind,
                id,
                internal_id: internal_id.to_string(),
            })
        })
        .ok_or_else(|| DomainError::NotFound(internal_id.to_string()))
}

fn connection_of(model: &NodeModel, target: &Target) -> Result<ConnectionResource> {
    model.connections.get(&target.id).cloned().ok_or_else(|| {
        DomainError::InternalInconsistency(format!(
            "no connection resource for {} {}",
            target.kind, target.internal_id
        ))
    })
}

/// Give a multi-leg description duplication grouping and a ts-refclk list per leg.
fn expand_for_legs(params: &mut SdpParameters, legs: usize) {
    if legs > 1 {
        params.group.semantics = DUPLICATION.to_string();
        if params.group.media_stream_ids.len() < legs {
            params.group = Group {
                semantics: DUPLICATION.to_string(),
                media_stream_ids: (0..legs).map(|leg| leg.to_string()).collect(),
            };
        }
    }
    if let Some(first) = params.ts_refclk.first().cloned() {
        params.ts_refclk.resize(legs.max(params.ts_refclk.len()), first);
    }
}

fn parse_parameters(text: &str) -> Result<SdpParameters> {
    SdpParameters::from_session_description(&SessionDescription::parse(text)?)
}

/// The sender transportfile: the original description without vendor format
/// parameters, the given transport legs, and ts-refclk lines for `clock`.
/// `port_ids` holds the port id of the interface each leg is bound to.
pub fn make_sender_transportfile(
    original: &str,
    transport_params: &TransportParams,
    clock: &Clock,
    domain: u8,
    port_ids: &[Option<&str>],
) -> Result<String> {
    let mut params = parse_parameters(original)?.without_custom_fmtp();
    params.ts_refclk = (0..transport_params.len())
        .map(|leg| clock_ts_refclks(clock, domain, port_ids.get(leg).copied().flatten()))
        .collect();
    expand_for_legs(&mut params, transport_params.len());
    params.origin.session_version = next_session_version();
    Ok(make_session_description(&params, transport_params)?.to_string())
}

/// Clock name of the source behind a sender.
fn sender_clock_name(model: &NodeModel, sender_id: &Uuid) -> Result<String> {
    let missing = |what: &str| DomainError::InternalInconsistency(format!("{} of sender {} not found", what, sender_id));
    let sender = model
        .resources
        .find::<Sender>(sender_id)
        .ok_or_else(|| missing("sender"))?;
    let flow = model
        .resources
        .find::<Flow>(&sender.flow_id)
        .ok_or_else(|| missing("flow"))?;
    let source = model
        .resources
        .find::<Source>(&flow.source_id)
        .ok_or_else(|| missing("source"))?;
    source.clock_name.clone().ok_or_else(|| missing("clock"))
}

/// Port id of the interface each leg is bound to.
pub(super) fn leg_port_ids<'a>(host: &'a [HostInterface], transport_params: &TransportParams) -> Vec<Option<&'a str>> {
    transport_params
        .bound_addresses()
        .into_iter()
        .map(|address| {
            address
                .and_then(|address| find_interface(host, &address))
                .and_then(|interface| interface.port_id.as_deref())
        })
        .collect()
}

/// Session description handed to the activation handler for an active endpoint.
fn activation_sdp(model: &NodeModel, target: &Target, connection: &ConnectionResource) -> Result<String> {
    let data = match target.kind {
        ResourceType::Sender => connection.transportfile.as_deref(),
        _ => connection
            .active
            .transport_file
            .as_ref()
            .and_then(TransportFile::text),
    }
    .filter(|data| !data.is_empty())
    .or_else(|| model.sdp_config(&target.id))
    .ok_or_else(|| {
        DomainError::InternalInconsistency(format!("no session description for {}", target.internal_id))
    })?;

    let mut params = parse_parameters(data)?;
    expand_for_legs(&mut params, connection.legs());
    params.origin.session_version = next_session_version();

    let core = model
        .resources
        .iter()
        .find(|r| r.id() == target.id)
        .map(Resource::core)
        .ok_or_else(|| DomainError::InternalInconsistency(format!("{} not found", target.internal_id)))?;

    let sdp = make_internal_session_description(
        &target.internal_id,
        core.group_hint(),
        Some(core.description.as_str()),
        &params,
        &connection.active.transport_params,
    )?;
    Ok(sdp.to_string())
}

/// Check and apply everything `candidate` implies, then tell the handler.
/// Nothing is changed unless every step succeeds.
fn commit(
    model: &mut NodeModel,
    host: &[HostInterface],
    handler: &dyn ActivationHandler,
    target: &Target,
    mut candidate: ConnectionResource,
    ts_refclks: Option<Vec<Vec<TsRefClk>>>,
) -> Result<(ResourceType, ActivationState)> {
    let mut clock_update = None;
    if target.kind == ResourceType::Sender {
        let clock_name = sender_clock_name(model, &target.id)?;
        let resolved = match &ts_refclks {
            Some(ts_refclks) => resolve_clock(&clock_name, ts_refclks),
            None => ResolvedClock {
                clock: model
                    .node()
                    .and_then(|node| node.clock(&clock_name))
                    .cloned()
                    .ok_or_else(|| DomainError::InternalInconsistency(format!("clock {} not found", clock_name)))?,
                domain: None,
            },
        };
        let domain = resolved.domain.unwrap_or_else(|| model.ptp_domain(&clock_name));
        let original = model.sdp_config(&target.id).ok_or_else(|| {
            DomainError::InternalInconsistency(format!("no session description for {}", target.internal_id))
        })?;
        candidate.transportfile = Some(make_sender_transportfile(
            original,
            &candidate.active.transport_params,
            &resolved.clock,
            domain,
            &leg_port_ids(host, &candidate.active.transport_params),
        )?);
        if let Some(ts_refclks) = ts_refclks {
            clock_update = Some((clock_name, ts_refclks));
        }
    }

    let state = candidate.state();
    let sdp = match state {
        ActivationState::Active => Some(activation_sdp(model, target, &candidate)?),
        ActivationState::Inactive => None,
    };

    if let Some((clock_name, ts_refclks)) = clock_update {
        update_clock(model, &clock_name, &ts_refclks);
    }
    let (active, peer_id) = (candidate.active.master_enable, candidate.active.peer_id);
    model.connections.insert(target.id, candidate);
    match target.kind {
        ResourceType::Sender => model
            .resources
            .modify::<Sender>(&target.id, |sender| {
                sender.set_subscription(active, peer_id);
            }),
        _ => model
            .resources
            .modify::<Receiver>(&target.id, |receiver| {
                receiver.set_subscription(active, peer_id);
            }),
    };

    tracing::info!(internal_id = %target.internal_id, kind = %target.kind, %state, "Activation applied");
    handler.on_activation(&target.internal_id, sdp.as_deref());

    Ok((target.kind, state))
}

/// Activate with the given session description, or deactivate when there is none.
pub fn force_activate(
    model: &mut NodeModel,
    host: &[HostInterface],
    handler: &dyn ActivationHandler,
    internal_id: &str,
    sdp: Option<&str>,
) -> Result<(ResourceType, ActivationState)> {
    let target = locate(model, internal_id)?;
    let mut candidate = connection_of(model, &target)?;
    let now = Version::now();

    let mut ts_refclks = None;
    if let Some(text) = sdp {
        let session = SessionDescription::parse(text)?;
        let extracted = transport_params(target.kind, &session)?;
        if extracted.len() > candidate.legs() {
            return Err(DomainError::parse(format!(
                "{} legs described, {} has {}",
                extracted.len(),
                internal_id,
                candidate.legs()
            )));
        }
        let mut params = candidate.active.transport_params.overlay(&extracted);
        resolve_auto(&target.id, &mut params, &candidate.constraints);
        candidate.active.transport_params = params;
        if target.kind == ResourceType::Receiver {
            candidate.active.transport_file = Some(TransportFile::sdp(text));
        } else {
            ts_refclks = Some(SdpParameters::from_session_description(&session)?.ts_refclk);
        }
    }

    candidate.active.master_enable = sdp.is_some();
    candidate.active.peer_id = None;
    candidate.active.activation = Activation::immediate(now);
    candidate.staged = candidate.active.clone();
    candidate.staged.activation = Activation::default();
    candidate.version = now;

    commit(model, host, handler, &target, candidate, ts_refclks)
}

/// Record changes on the staged endpoint without activating them.
pub fn stage(model: &mut NodeModel, internal_id: &str, request: StageRequest) -> Result<()> {
    let target = locate(model, internal_id)?;
    let mut candidate = connection_of(model, &target)?;
    let legs = candidate.legs();
    let overlay = |staged: &TransportParams, extracted: TransportParams| -> Result<TransportParams> {
        if extracted.len() > legs || std::mem::discriminant(staged) != std::mem::discriminant(&extracted) {
            return Err(DomainError::parse(format!("transport parameters do not fit {}", internal_id)));
        }
        Ok(staged.overlay(&extracted))
    };

    if let Some(text) = &request.transport_file {
        if target.kind != ResourceType::Receiver {
            return Err(DomainError::parse("only receivers take a transport file"));
        }
        let extracted = transport_params(target.kind, &SessionDescription::parse(text)?)?;
        candidate.staged.transport_params = overlay(&candidate.staged.transport_params, extracted)?;
        candidate.staged.transport_file = Some(TransportFile::sdp(text));
    }
    if let Some(params) = request.transport_params {
        candidate.staged.transport_params = overlay(&candidate.staged.transport_params, params)?;
    }
    if let Some(master_enable) = request.master_enable {
        candidate.staged.master_enable = master_enable;
    }
    if request.peer_id.is_some() {
        candidate.staged.peer_id = request.peer_id;
    }
    candidate.bump_version();

    tracing::debug!(internal_id = %internal_id, "Staged connection parameters");
    model.connections.insert(target.id, candidate);
    Ok(())
}

/// Make the staged endpoint active, resolving `auto` values first.
pub fn activate_staged(
    model: &mut NodeModel,
    host: &[HostInterface],
    handler: &dyn ActivationHandler,
    internal_id: &str,
) -> Result<(ResourceType, ActivationState)> {
    let target = locate(model, internal_id)?;
    let mut candidate = connection_of(model, &target)?;
    let now = Version::now();

    let mut active = candidate.staged.clone();
    resolve_auto(&target.id, &mut active.transport_params, &candidate.constraints);
    if !active.master_enable {
        active.peer_id = None;
    }
    active.activation = Activation::immediate(now);
    candidate.active = active;
    candidate.staged.activation = Activation::default();
    candidate.version = now;

    commit(model, host, handler, &target, candidate, None)
}
