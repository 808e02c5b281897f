//! Simulated Cloudflare provider

use crate::dns::{AUTOMATIC_TTL, RECORD, RecordType};
use crate::error::CloudflareError;
use async_trait::async_trait;
use kutt_infra_core::{
    GraphError, ProviderOutputs, ResourceProvider, Result, Urn, fingerprint, input_str,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Serves the `cloudflare` package
#[derive(Debug, Default)]
pub struct CloudflareProvider {
    /// Zone id to domain
    zones: BTreeMap<String, String>,
}

impl CloudflareProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zone(mut self, zone_id: impl Into<String>, domain: impl Into<String>) -> Self {
        self.zones.insert(zone_id.into(), domain.into());
        self
    }

    /// Fully qualified record name; `@` and bare labels are placed in the zone
    fn hostname(domain: &str, name: &str) -> String {
        let name = name.trim_end_matches('.');
        if name == "@" || name == domain {
            domain.to_string()
        } else if name.ends_with(&format!(".{}", domain)) {
            name.to_string()
        } else {
            format!("{}.{}", name, domain)
        }
    }

    fn create_record(
        &self,
        urn: &Urn,
        inputs: &Value,
    ) -> std::result::Result<ProviderOutputs, CloudflareError> {
        let invalid = |message: &str| CloudflareError::InvalidRecord {
            name: urn.name().to_string(),
            message: message.to_string(),
        };

        let zone_id = input_str(inputs, "zone_id").unwrap_or_default();
        let domain = self
            .zones
            .get(zone_id)
            .ok_or_else(|| CloudflareError::ZoneNotFound(zone_id.to_string()))?;

        let name = input_str(inputs, "name")
            .filter(|name| !name.is_empty())
            .ok_or_else(|| invalid("name is required"))?;
        let record_type: RecordType = input_str(inputs, "type")
            .ok_or_else(|| invalid("type is required"))?
            .parse()?;
        let content = input_str(inputs, "content")
            .filter(|content| !content.is_empty())
            .ok_or_else(|| invalid("content is required"))?;

        match record_type {
            RecordType::A if content.parse::<Ipv4Addr>().is_err() => {
                return Err(invalid("A record content must be an IPv4 address"));
            }
            RecordType::Aaaa if content.parse::<Ipv6Addr>().is_err() => {
                return Err(invalid("AAAA record content must be an IPv6 address"));
            }
            RecordType::Cname if content.parse::<Ipv4Addr>().is_ok() => {
                return Err(invalid("CNAME record content must be a hostname"));
            }
            _ => {}
        }

        let ttl = inputs
            .get("ttl")
            .and_then(Value::as_u64)
            .unwrap_or(u64::from(AUTOMATIC_TTL));
        if ttl != u64::from(AUTOMATIC_TTL) && !(60..=86400).contains(&ttl) {
            return Err(invalid("ttl must be 1 (automatic) or between 60 and 86400"));
        }
        let proxied = inputs
            .get("proxied")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if proxied && ttl != u64::from(AUTOMATIC_TTL) {
            return Err(invalid("proxied records use automatic ttl"));
        }

        Ok(ProviderOutputs::new()
            .with("id", fingerprint(&[urn.as_str(), zone_id], 32))
            .with("hostname", Self::hostname(domain, name)))
    }
}

#[async_trait]
impl ResourceProvider for CloudflareProvider {
    fn package(&self) -> &str {
        "cloudflare"
    }

    fn display_name(&self) -> &str {
        "Cloudflare (simulated)"
    }

    async fn create(&self, urn: &Urn, inputs: &Value) -> Result<ProviderOutputs> {
        match urn.type_token() {
            RECORD => {
                let outputs = self.create_record(urn, inputs)?;
                tracing::debug!(urn = %urn, "Simulated Cloudflare record");
                Ok(outputs)
            }
            other => Err(GraphError::ProviderFailed(format!(
                "unsupported resource type: {}",
                other
            ))),
        }
    }

    async fn invoke(&self, token: &str, _args: &Value) -> Result<Value> {
        Err(GraphError::ProviderFailed(format!(
            "unsupported function: {}",
            token
        )))
    }
}
