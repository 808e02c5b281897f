//! Secrets Manager

use super::Tags;
use kutt_infra_core::{
    IntoProperties, Output, PropertySet, Props, RegisteredResource, Resource, Urn,
};

pub const SECRET: &str = "aws:secretsmanager/secret:Secret";
pub const SECRET_VERSION: &str = "aws:secretsmanager/secretVersion:SecretVersion";

#[derive(Debug, Clone, Default)]
pub struct SecretArgs {
    pub description: Option<String>,
    pub tags: Tags,
}

impl IntoProperties for SecretArgs {
    fn into_properties(self) -> PropertySet {
        let props = match &self.description {
            Some(description) => Props::new().set_value("description", description),
            None => Props::new(),
        };
        props.set_value("tags", &self.tags).build()
    }
}

#[derive(Debug, Clone)]
pub struct Secret {
    pub urn: Urn,
    pub id: Output<String>,
    pub name: Output<String>,
    pub arn: Output<String>,
}

impl Secret {
    /// Reference to one key of a JSON secret, as ECS `valueFrom` expects
    pub fn key_reference(&self, key: &str) -> Output<String> {
        Output::concat([self.arn.clone(), Output::new(format!(":{}::", key))])
    }
}

impl Resource for Secret {
    const TYPE_TOKEN: &'static str = SECRET;

    type Args = SecretArgs;

    fn from_registered(resource: RegisteredResource) -> Self {
        Self {
            id: resource.output("id"),
            name: resource.output("name"),
            arn: resource.output("arn"),
            urn: resource.urn,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecretVersionArgs {
    pub secret_id: Output<String>,

    /// Always treated as secret
    pub secret_string: Output<String>,
}

impl IntoProperties for SecretVersionArgs {
    fn into_properties(self) -> PropertySet {
        Props::new()
            .set("secret_id", &self.secret_id)
            .set("secret_string", &self.secret_string.clone().as_secret())
            .build()
    }
}

#[derive(Debug, Clone)]
pub struct SecretVersion {
    pub urn: Urn,
    pub id: Output<String>,
    pub version_id: Output<String>,
}

impl Resource for SecretVersion {
    const TYPE_TOKEN: &'static str = SECRET_VERSION;

    type Args = SecretVersionArgs;

    fn from_registered(resource: RegisteredResource) -> Self {
        Self {
            id: resource.output("id"),
            version_id: resource.output("version_id"),
            urn: resource.urn,
        }
    }
}
