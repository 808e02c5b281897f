//! Typed AWS resource declarations
//!
//! Each resource pairs an args struct (converted into a property set) with a
//! handle exposing the attributes other declarations consume. Property names
//! follow the provider schema in snake_case.

pub mod cloudwatch;
pub mod ec2;
pub mod ecs;
pub mod elasticache;
pub mod iam;
pub mod lb;
pub mod rds;
pub mod secretsmanager;
pub mod ssm;

use kutt_infra_core::{Output, Props, Stack};
use std::collections::BTreeMap;

/// Labels attached to every taggable resource of a component
pub type Tags = BTreeMap<String, String>;

/// Function token of the current region lookup
pub const GET_REGION: &str = "aws:index/getRegion:getRegion";

/// Region the provider is configured for
pub fn get_region(stack: &Stack) -> Output<String> {
    stack
        .invoke(GET_REGION, Props::new())
        .json_pointer("/name")
}

/// Resource types that accept a `tags` property
pub fn is_taggable(type_token: &str) -> bool {
    !matches!(
        type_token,
        iam::ROLE_POLICY_ATTACHMENT
            | iam::USER_POLICY_ATTACHMENT
            | iam::ACCESS_KEY
            | secretsmanager::SECRET_VERSION
    )
}

/// Wrap a single deferred id into a one-element list
pub(crate) fn one(id: &Output<String>) -> Output<Vec<String>> {
    id.apply(|id| vec![id])
}
