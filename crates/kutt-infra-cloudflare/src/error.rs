//! Cloudflare error types

use kutt_infra_core::GraphError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudflareError {
    #[error("Zone not found: {0}")]
    ZoneNotFound(String),

    #[error("Unsupported record type: {0}")]
    UnsupportedRecordType(String),

    #[error("Invalid record '{name}': {message}")]
    InvalidRecord { name: String, message: String },
}

impl From<CloudflareError> for GraphError {
    fn from(err: CloudflareError) -> Self {
        GraphError::ProviderFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CloudflareError>;
