use crate::domain::value_objects::{ActivationState, ResourceType};

/// Port for metrics reporting
pub trait MetricsReporter: Send + Sync {
    fn report_resource_added(&self, kind: ResourceType);
    fn report_resource_removed(&self, kind: ResourceType);
    fn report_activation(&self, kind: ResourceType, state: ActivationState);
}
