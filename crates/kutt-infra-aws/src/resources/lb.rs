//! Elastic Load Balancing v2 listener rules

use super::Tags;
use kutt_infra_core::{
    IntoProperties, Output, PropertySet, Props, RegisteredResource, Resource, Urn,
};

pub const LISTENER_RULE: &str = "aws:lb/listenerRule:ListenerRule";

/// Forward requests whose host header matches to a target group
#[derive(Debug, Clone)]
pub struct ListenerRuleArgs {
    pub listener_arn: Output<String>,
    pub priority: u32,
    pub host_headers: Vec<String>,
    pub target_group_arn: Output<String>,
    pub tags: Tags,
}

impl IntoProperties for ListenerRuleArgs {
    fn into_properties(self) -> PropertySet {
        let forward = Props::new()
            .set_value("type", "forward")
            .set("target_group_arn", &self.target_group_arn);
        let host_header = Props::new().set_props(
            "host_header",
            Props::new().set_value("values", &self.host_headers),
        );

        Props::new()
            .set("listener_arn", &self.listener_arn)
            .set_value("priority", self.priority)
            .set_list("actions", vec![forward])
            .set_list("conditions", vec![host_header])
            .set_value("tags", &self.tags)
            .build()
    }
}

#[derive(Debug, Clone)]
pub struct ListenerRule {
    pub urn: Urn,
    pub arn: Output<String>,
    pub priority: Output<u32>,
}

impl Resource for ListenerRule {
    const TYPE_TOKEN: &'static str = LISTENER_RULE;

    type Args = ListenerRuleArgs;

    fn from_registered(resource: RegisteredResource) -> Self {
        Self {
            arn: resource.output("arn"),
            priority: resource.output("priority"),
            urn: resource.urn,
        }
    }
}
