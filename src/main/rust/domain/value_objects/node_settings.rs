use std::collections::BTreeMap;

use uuid::Uuid;

use super::resource_type::make_seed_id;
use crate::domain::errors::{DomainError, Result};

/// Resource tags: each key maps to a list of values.
pub type Tags = BTreeMap<String, Vec<String>>;

/// Node-wide settings fixed at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSettings {
    seed_id: Uuid,
    host_name: String,
    http_port: u16,
    node_label: String,
    node_description: String,
    node_tags: Tags,
    device_label: String,
    device_description: String,
    device_tags: Tags,
}

impl NodeSettings {
    pub fn new(seed: &str, host_name: &str, http_port: u16) -> Result<Self> {
        Self::validate_seed(seed)?;
        Self::validate_host_name(host_name)?;
        Self::validate_port(http_port)?;

        Ok(Self {
            seed_id: make_seed_id(seed),
            host_name: host_name.to_string(),
            http_port,
            node_label: String::new(),
            node_description: String::new(),
            node_tags: Tags::new(),
            device_label: String::new(),
            device_description: String::new(),
            device_tags: Tags::new(),
        })
    }

    pub fn with_node_label(mut self, label: &str, description: &str) -> Self {
        self.node_label = label.to_string();
        self.node_description = description.to_string();
        self
    }

    pub fn with_device_label(mut self, label: &str, description: &str) -> Self {
        self.device_label = label.to_string();
        self.device_description = description.to_string();
        self
    }

    pub fn with_node_tags(mut self, tags: Tags) -> Self {
        self.node_tags = tags;
        self
    }

    pub fn with_device_tags(mut self, tags: Tags) -> Self {
        self.device_tags = tags;
        self
    }

    pub fn seed_id(&self) -> &Uuid {
        &self.seed_id
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub fn node_label(&self) -> &str {
        &self.node_label
    }

    pub fn node_description(&self) -> &str {
        &self.node_description
    }

    pub fn node_tags(&self) -> &Tags {
        &self.node_tags
    }

    pub fn device_label(&self) -> &str {
        &self.device_label
    }

    pub fn device_description(&self) -> &str {
        &self.device_description
    }

    pub fn device_tags(&self) -> &Tags {
        &self.device_tags
    }

    /// Base URL of the Connection API served for this node.
    pub fn connection_api_base(&self) -> String {
        format!("http://{}:{}/x-nmos/connection/v1.1", self.host_name, self.http_port)
    }

    fn validate_seed(seed: &str) -> Result<()> {
        if seed.trim().is_empty() {
            return Err(DomainError::InvalidSettings("seed cannot be empty".to_string()));
        }
        Ok(())
    }

    fn validate_host_name(host_name: &str) -> Result<()> {
        if host_name.is_empty() || host_name.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidSettings(format!(
                "invalid host name: {:?}",
                host_name
            )));
        }
        Ok(())
    }

    fn validate_port(port: u16) -> Result<()> {
        if port == 0 {
            return Err(DomainError::InvalidSettings("HTTP port cannot be 0".to_string()));
        }
        Ok(())
    }
}
