//! CloudWatch log groups

use super::Tags;
use kutt_infra_core::{
    IntoProperties, Output, PropertySet, Props, RegisteredResource, Resource, Urn,
};

pub const LOG_GROUP: &str = "aws:cloudwatch/logGroup:LogGroup";

#[derive(Debug, Clone)]
pub struct LogGroupArgs {
    pub retention_in_days: u32,
    pub tags: Tags,
}

impl IntoProperties for LogGroupArgs {
    fn into_properties(self) -> PropertySet {
        Props::new()
            .set_value("retention_in_days", self.retention_in_days)
            .set_value("tags", &self.tags)
            .build()
    }
}

#[derive(Debug, Clone)]
pub struct LogGroup {
    pub urn: Urn,
    pub id: Output<String>,
    pub name: Output<String>,
    pub arn: Output<String>,
}

impl Resource for LogGroup {
    const TYPE_TOKEN: &'static str = LOG_GROUP;

    type Args = LogGroupArgs;

    fn from_registered(resource: RegisteredResource) -> Self {
        Self {
            id: resource.output("id"),
            name: resource.output("name"),
            arn: resource.output("arn"),
            urn: resource.urn,
        }
    }
}
