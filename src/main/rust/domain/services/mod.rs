mod auto_resolver;
mod clock_resolver;
mod interface_tracker;

pub use auto_resolver::{multicast_address, resolve_auto};
pub use clock_resolver::{clock_ts_refclks, resolve_clock, update_clock, ResolvedClock};
pub use interface_tracker::{interface_bindings, update_node_interfaces};
