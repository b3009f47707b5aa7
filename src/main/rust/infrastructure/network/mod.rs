mod system_interfaces;

pub use system_interfaces::{StaticInterfaces, SystemInterfaces};
