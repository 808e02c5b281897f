//! ECS: Fargate task definitions and services

use super::Tags;
use kutt_infra_core::{
    IntoProperties, Output, PropertySet, Props, RegisteredResource, Resource, Urn,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const TASK_DEFINITION: &str = "aws:ecs/taskDefinition:TaskDefinition";
pub const SERVICE: &str = "aws:ecs/service:Service";

/// One container of a task definition, as ECS reads it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDefinition {
    pub name: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    pub environment: Vec<KeyValuePair>,
    pub secrets: Vec<ContainerSecret>,
    pub port_mappings: Vec<PortMapping>,
    pub log_configuration: LogConfiguration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    pub name: String,
    pub value: String,
}

/// Environment variable read from a secret store at container start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSecret {
    pub name: String,
    pub value_from: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    pub container_port: u16,
    pub protocol: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfiguration {
    pub log_driver: String,
    pub options: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct TaskDefinitionArgs {
    pub family: String,
    pub cpu: String,
    pub memory: String,
    pub network_mode: String,
    pub execution_role_arn: Output<String>,
    pub task_role_arn: Option<Output<String>>,
    pub requires_compatibilities: Vec<String>,

    /// JSON array of [`ContainerDefinition`]
    pub container_definitions: Output<String>,
    pub tags: Tags,
}

impl IntoProperties for TaskDefinitionArgs {
    fn into_properties(self) -> PropertySet {
        Props::new()
            .set_value("family", &self.family)
            .set_value("cpu", &self.cpu)
            .set_value("memory", &self.memory)
            .set_value("network_mode", &self.network_mode)
            .set("execution_role_arn", &self.execution_role_arn)
            .set_opt("task_role_arn", self.task_role_arn.as_ref())
            .set_value("requires_compatibilities", &self.requires_compatibilities)
            .set("container_definitions", &self.container_definitions)
            .set_value("tags", &self.tags)
            .build()
    }
}

#[derive(Debug, Clone)]
pub struct TaskDefinition {
    pub urn: Urn,
    pub arn: Output<String>,
    pub family: Output<String>,
    pub revision: Output<u32>,
}

impl Resource for TaskDefinition {
    const TYPE_TOKEN: &'static str = TASK_DEFINITION;

    type Args = TaskDefinitionArgs;

    fn from_registered(resource: RegisteredResource) -> Self {
        Self {
            arn: resource.output("arn"),
            family: resource.output("family"),
            revision: resource.output("revision"),
            urn: resource.urn,
        }
    }
}

/// Binding of a container port to a load balancer target group
#[derive(Debug, Clone)]
pub struct ServiceLoadBalancer {
    pub container_name: String,
    pub container_port: u16,
    pub target_group_arn: Output<String>,
}

#[derive(Debug, Clone)]
pub struct NetworkConfiguration {
    pub security_groups: Output<Vec<String>>,
    pub assign_public_ip: bool,
    pub subnets: Output<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct ServiceArgs {
    pub cluster: Output<String>,
    pub desired_count: u32,
    pub launch_type: String,
    pub task_definition: Output<String>,

    /// `None` leaves the property out of the declaration entirely
    pub load_balancers: Option<Vec<ServiceLoadBalancer>>,
    pub network_configuration: NetworkConfiguration,
    pub tags: Tags,
}

impl IntoProperties for ServiceArgs {
    fn into_properties(self) -> PropertySet {
        let network = &self.network_configuration;
        let props = Props::new()
            .set("cluster", &self.cluster)
            .set_value("desired_count", self.desired_count)
            .set_value("launch_type", &self.launch_type)
            .set("task_definition", &self.task_definition);

        let props = match &self.load_balancers {
            Some(bindings) => props.set_list(
                "load_balancers",
                bindings
                    .iter()
                    .map(|binding| {
                        Props::new()
                            .set_value("container_name", &binding.container_name)
                            .set_value("container_port", binding.container_port)
                            .set("target_group_arn", &binding.target_group_arn)
                    })
                    .collect(),
            ),
            None => props,
        };

        props
            .set_props(
                "network_configuration",
                Props::new()
                    .set("security_groups", &network.security_groups)
                    .set_value("assign_public_ip", network.assign_public_ip)
                    .set("subnets", &network.subnets),
            )
            .set_value("tags", &self.tags)
            .build()
    }
}

#[derive(Debug, Clone)]
pub struct Service {
    pub urn: Urn,
    pub id: Output<String>,
    pub name: Output<String>,
}

impl Resource for Service {
    const TYPE_TOKEN: &'static str = SERVICE;

    type Args = ServiceArgs;

    fn from_registered(resource: RegisteredResource) -> Self {
        Self {
            id: resource.output("id"),
            name: resource.output("name"),
            urn: resource.urn,
        }
    }
}
