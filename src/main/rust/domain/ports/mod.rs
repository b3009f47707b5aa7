mod activation_handler;
mod host_interfaces;
mod metrics_reporter;

pub use activation_handler::ActivationHandler;
pub use host_interfaces::HostInterfaces;
pub use metrics_reporter::MetricsReporter;
