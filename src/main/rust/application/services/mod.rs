pub mod activation_engine;
pub mod graph_builder;
mod node_service;

pub use node_service::NodeService;
