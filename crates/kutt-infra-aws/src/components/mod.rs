//! Private service components
//!
//! A component registers one grouping declaration and parents every resource
//! it creates to it (or to a sibling), so destroying the component tears its
//! children down first. Each instance owns its own security group and subnet
//! group; the only thing shared is the looked-up VPC range.

pub mod cache;
pub mod database;
pub mod webapp;

use crate::error::{ComponentError, Result};
use crate::resources::Tags;
use crate::resources::ec2::{self, SecurityGroup, SecurityGroupArgs, SecurityGroupRule};
use kutt_infra_core::{ComponentResource, Output, OutputError, Stack};

/// Check a subnet list before it is used
///
/// A list that is already known and empty is rejected right away; a deferred
/// list fails its consumers with the same message once it resolves empty.
pub(crate) fn require_subnets(
    component: &'static str,
    name: &str,
    subnet_ids: &Output<Vec<String>>,
) -> Result<Output<Vec<String>>> {
    let empty = ComponentError::EmptySubnets {
        component,
        name: name.to_string(),
    };

    if let Some(Ok(ids)) = subnet_ids.try_now() {
        if ids.is_empty() {
            return Err(empty);
        }
    }

    let message = empty.to_string();
    Ok(subnet_ids.try_apply(move |ids| {
        if ids.is_empty() {
            Err(OutputError::new(message))
        } else {
            Ok(ids)
        }
    }))
}

pub(crate) fn require_port(component: &'static str, name: &str, port: u16) -> Result<()> {
    if port == 0 {
        return Err(ComponentError::InvalidArgument {
            component,
            name: name.to_string(),
            message: "port must be between 1 and 65535".to_string(),
        });
    }
    Ok(())
}

/// Security group admitting `port` from inside the VPC only, all egress
pub(crate) fn network_boundary(
    stack: &Stack,
    owner: &ComponentResource,
    name: &str,
    description: String,
    vpc_id: &Output<String>,
    port: u16,
    tags: &Tags,
) -> Result<SecurityGroup> {
    let vpc = ec2::get_vpc(stack, vpc_id);
    let vpc_range = vpc.cidr_block.apply(|cidr| vec![cidr]);

    let security_group = stack.declare::<SecurityGroup>(
        name,
        SecurityGroupArgs {
            vpc_id: vpc_id.clone(),
            description: Some(description),
            ingress: vec![SecurityGroupRule::tcp(port, vpc_range)],
            egress: vec![SecurityGroupRule::allow_all()],
            tags: tags.clone(),
        },
        owner.child_options(),
    )?;
    Ok(security_group)
}
