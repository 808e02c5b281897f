//! Cloudflare DNS records

use crate::error::CloudflareError;
use kutt_infra_core::{
    IntoProperties, Output, PropertySet, Props, RegisteredResource, Resource, Urn,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const RECORD: &str = "cloudflare:index/record:Record";

/// TTL value Cloudflare reads as "automatic"
pub const AUTOMATIC_TTL: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Txt,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Txt => "TXT",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = CloudflareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            "CNAME" => Ok(RecordType::Cname),
            "TXT" => Ok(RecordType::Txt),
            _ => Err(CloudflareError::UnsupportedRecordType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordArgs {
    pub zone_id: Output<String>,

    /// Record name; `@` is the zone apex
    pub name: Output<String>,
    pub record_type: RecordType,
    pub content: Output<String>,
    pub ttl: u32,
    pub proxied: bool,
}

impl RecordArgs {
    /// Unproxied record with automatic TTL
    pub fn new(
        zone_id: impl Into<Output<String>>,
        name: impl Into<Output<String>>,
        record_type: RecordType,
        content: impl Into<Output<String>>,
    ) -> Self {
        Self {
            zone_id: zone_id.into(),
            name: name.into(),
            record_type,
            content: content.into(),
            ttl: AUTOMATIC_TTL,
            proxied: false,
        }
    }
}

impl IntoProperties for RecordArgs {
    fn into_properties(self) -> PropertySet {
        Props::new()
            .set("zone_id", &self.zone_id)
            .set("name", &self.name)
            .set_value("type", self.record_type)
            .set("content", &self.content)
            .set_value("ttl", self.ttl)
            .set_value("proxied", self.proxied)
            .build()
    }
}

#[derive(Debug, Clone)]
pub struct Record {
    pub urn: Urn,
    pub id: Output<String>,

    /// Fully qualified name inside the zone
    pub hostname: Output<String>,
}

impl Resource for Record {
    const TYPE_TOKEN: &'static str = RECORD;

    type Args = RecordArgs;

    fn from_registered(resource: RegisteredResource) -> Self {
        Self {
            id: resource.output("id"),
            hostname: resource.output("hostname"),
            urn: resource.urn,
        }
    }
}
