//! SSM parameter store

use super::Tags;
use kutt_infra_core::{
    IntoProperties, Output, PropertySet, Props, RegisteredResource, Resource, Urn,
};

pub const PARAMETER: &str = "aws:ssm/parameter:Parameter";

#[derive(Debug, Clone)]
pub struct ParameterArgs {
    /// `String`, `StringList` or `SecureString`
    pub parameter_type: String,
    pub value: Output<String>,
    pub tags: Tags,
}

impl ParameterArgs {
    /// An encrypted parameter; the value is treated as secret
    pub fn secure_string(value: Output<String>, tags: Tags) -> Self {
        Self {
            parameter_type: "SecureString".to_string(),
            value: value.as_secret(),
            tags,
        }
    }
}

impl IntoProperties for ParameterArgs {
    fn into_properties(self) -> PropertySet {
        Props::new()
            .set_value("type", &self.parameter_type)
            .set("value", &self.value)
            .set_value("tags", &self.tags)
            .build()
    }
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub urn: Urn,
    pub name: Output<String>,
    pub arn: Output<String>,
    pub parameter_type: Output<String>,
    pub version: Output<u64>,
}

impl Resource for Parameter {
    const TYPE_TOKEN: &'static str = PARAMETER;

    type Args = ParameterArgs;

    fn from_registered(resource: RegisteredResource) -> Self {
        Self {
            name: resource.output("name"),
            arn: resource.output("arn"),
            parameter_type: resource.output("type"),
            version: resource.output("version"),
            urn: resource.urn,
        }
    }
}
