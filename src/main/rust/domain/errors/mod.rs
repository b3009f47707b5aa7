use std::net::IpAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid session description: {0}")]
    ParseError(String),

    #[error("No network interface corresponding to the connection address: {address} for: {internal_id}")]
    NoMatchingInterface { address: IpAddr, internal_id: String },

    #[error("Duplicate resource: {0}")]
    DuplicateResource(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal inconsistency: {0}")]
    InternalInconsistency(String),

    #[error("Invalid node settings: {0}")]
    InvalidSettings(String),
}

impl DomainError {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::ParseError(message.into())
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
