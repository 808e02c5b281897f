//! EC2: security groups and VPC lookup

use super::Tags;
use kutt_infra_core::{
    IntoProperties, Output, PropertySet, Props, RegisteredResource, Resource, Stack, Urn,
};

pub const SECURITY_GROUP: &str = "aws:ec2/securityGroup:SecurityGroup";
pub const GET_VPC: &str = "aws:ec2/getVpc:getVpc";

/// One ingress or egress rule
#[derive(Debug, Clone)]
pub struct SecurityGroupRule {
    pub protocol: String,
    pub from_port: u16,
    pub to_port: u16,
    pub cidr_blocks: Output<Vec<String>>,
}

impl SecurityGroupRule {
    /// TCP on a single port from the given ranges
    pub fn tcp(port: u16, cidr_blocks: Output<Vec<String>>) -> Self {
        Self {
            protocol: "tcp".to_string(),
            from_port: port,
            to_port: port,
            cidr_blocks,
        }
    }

    /// Every protocol to every address
    pub fn allow_all() -> Self {
        Self {
            protocol: "-1".to_string(),
            from_port: 0,
            to_port: 0,
            cidr_blocks: Output::new(vec!["0.0.0.0/0".to_string()]),
        }
    }

    fn props(&self) -> Props {
        Props::new()
            .set_value("protocol", &self.protocol)
            .set_value("from_port", self.from_port)
            .set_value("to_port", self.to_port)
            .set("cidr_blocks", &self.cidr_blocks)
    }
}

#[derive(Debug, Clone)]
pub struct SecurityGroupArgs {
    pub vpc_id: Output<String>,
    pub description: Option<String>,
    pub ingress: Vec<SecurityGroupRule>,
    pub egress: Vec<SecurityGroupRule>,
    pub tags: Tags,
}

impl IntoProperties for SecurityGroupArgs {
    fn into_properties(self) -> PropertySet {
        let props = Props::new().set("vpc_id", &self.vpc_id);
        let props = match &self.description {
            Some(description) => props.set_value("description", description),
            None => props,
        };
        props
            .set_list("ingress", self.ingress.iter().map(|r| r.props()).collect())
            .set_list("egress", self.egress.iter().map(|r| r.props()).collect())
            .set_value("tags", &self.tags)
            .build()
    }
}

#[derive(Debug, Clone)]
pub struct SecurityGroup {
    pub urn: Urn,
    pub id: Output<String>,
    pub arn: Output<String>,
}

impl Resource for SecurityGroup {
    const TYPE_TOKEN: &'static str = SECURITY_GROUP;

    type Args = SecurityGroupArgs;

    fn from_registered(resource: RegisteredResource) -> Self {
        Self {
            id: resource.output("id"),
            arn: resource.output("arn"),
            urn: resource.urn,
        }
    }
}

/// Result of a VPC lookup
#[derive(Debug, Clone)]
pub struct Vpc {
    pub id: Output<String>,
    pub cidr_block: Output<String>,
}

/// Look up a VPC by id
pub fn get_vpc(stack: &Stack, id: &Output<String>) -> Vpc {
    let result = stack.invoke(GET_VPC, Props::new().set("id", id));
    Vpc {
        id: result.json_pointer("/id"),
        cidr_block: result.json_pointer("/cidr_block"),
    }
}
