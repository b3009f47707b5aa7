use crate::domain::value_objects::HostInterface;

/// Port for enumerating the host's network interfaces
pub trait HostInterfaces: Send + Sync {
    /// Interfaces in host order, each with every address bound to it
    fn host_interfaces(&self) -> Vec<HostInterface>;
}
