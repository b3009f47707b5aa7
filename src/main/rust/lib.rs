pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-exports for convenience
pub use application::services::NodeService;
pub use config::Config;
pub use domain::entities::{ConnectionResource, NodeModel, NodeSnapshot, Resource, StageRequest};
pub use domain::errors::{DomainError, Result};
pub use domain::ports::{ActivationHandler, HostInterfaces, MetricsReporter};
pub use domain::value_objects::{ActivationState, HostInterface, NodeSettings, ResourceType};
pub use infrastructure::metrics::{serve_metrics, PrometheusReporter};
pub use infrastructure::network::{StaticInterfaces, SystemInterfaces};
