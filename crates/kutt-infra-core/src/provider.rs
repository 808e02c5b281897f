//! Resource provider trait definition

use crate::error::Result;
use crate::resource::Urn;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// Provider abstraction trait
///
/// Each package of resource types (`aws`, `random`, `cloudflare`) is backed by
/// one provider. The backend hands a provider fully-resolved inputs and merges
/// the attributes it computes into the resource's outputs.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Package served by this provider (e.g., "aws", "random")
    fn package(&self) -> &str;

    /// Display name for UI
    fn display_name(&self) -> &str;

    /// Create the resource identified by `urn` from resolved inputs
    async fn create(&self, urn: &Urn, inputs: &Value) -> Result<ProviderOutputs>;

    /// Evaluate a data-source function (e.g., a VPC lookup)
    async fn invoke(&self, token: &str, args: &Value) -> Result<Value>;
}

/// Attributes computed by a provider
#[derive(Debug, Clone, Default)]
pub struct ProviderOutputs {
    pub values: Map<String, Value>,

    /// Computed keys that must be masked
    pub secret_keys: BTreeSet<String>,
}

impl ProviderOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn with_secret(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.secret_keys.insert(key.to_string());
        self.with(key, value)
    }
}

/// Stable hex fingerprint of the given parts
///
/// Simulated providers derive identifiers from it so repeated runs produce the
/// same ids for the same URN.
pub fn fingerprint(parts: &[&str], len: usize) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hex::encode(hasher.finalize());
    digest[..len.min(digest.len())].to_string()
}

/// Read a string input
pub fn input_str<'a>(inputs: &'a Value, key: &str) -> Option<&'a str> {
    inputs.get(key).and_then(Value::as_str)
}
