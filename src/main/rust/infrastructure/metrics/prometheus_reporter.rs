use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::domain::ports::MetricsReporter;
use crate::domain::value_objects::{ActivationState, ResourceType};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref LIVE_RESOURCES: IntGaugeVec = IntGaugeVec::new(
        Opts::new("nmos_resources", "Number of live senders and receivers"),
        &["type"]
    ).expect("metric can be created");
    pub static ref ACTIVATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("nmos_activations_total", "Total number of activations since node start"),
        &["type", "state"]
    ).expect("metric can be created");
}

pub struct PrometheusReporter;

impl PrometheusReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn init_metrics() -> Result<(), prometheus::Error> {
        REGISTRY.register(Box::new(LIVE_RESOURCES.clone()))?;
        REGISTRY.register(Box::new(ACTIVATIONS.clone()))?;
        Ok(())
    }

    pub fn gather_metrics() -> Vec<u8> {
        let encoder = TextEncoder::new();
        let metric_families = REGISTRY.gather();
        let mut buffer = vec![];
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
            return b"# Error encoding metrics\n".to_vec();
        }
        buffer
    }
}

impl Default for PrometheusReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn state_label(state: ActivationState) -> &'static str {
    match state {
        ActivationState::Active => "active",
        ActivationState::Inactive => "inactive",
    }
}

impl MetricsReporter for PrometheusReporter {
    fn report_resource_added(&self, kind: ResourceType) {
        LIVE_RESOURCES.with_label_values(&[kind.as_str()]).inc();
    }

    fn report_resource_removed(&self, kind: ResourceType) {
        LIVE_RESOURCES.with_label_values(&[kind.as_str()]).dec();
    }

    fn report_activation(&self, kind: ResourceType, state: ActivationState) {
        ACTIVATIONS
            .with_label_values(&[kind.as_str(), state_label(state)])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_update_metrics() {
        let reporter = PrometheusReporter::new();
        let senders = LIVE_RESOURCES.with_label_values(&[ResourceType::Sender.as_str()]);
        let before = senders.get();

        reporter.report_resource_added(ResourceType::Sender);
        reporter.report_resource_added(ResourceType::Sender);
        reporter.report_resource_removed(ResourceType::Sender);
        assert_eq!(senders.get(), before + 1);

        let activations = ACTIVATIONS.with_label_values(&[ResourceType::Receiver.as_str(), "active"]);
        let before = activations.get();
        reporter.report_activation(ResourceType::Receiver, ActivationState::Active);
        assert_eq!(activations.get(), before + 1);
    }
}
