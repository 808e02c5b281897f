//! ElastiCache: subnet groups and cache clusters

use super::Tags;
use kutt_infra_core::{
    IntoProperties, Output, OutputError, PropertySet, Props, RegisteredResource, Resource, Urn,
};
use serde::{Deserialize, Serialize};

pub const SUBNET_GROUP: &str = "aws:elasticache/subnetGroup:SubnetGroup";
pub const CLUSTER: &str = "aws:elasticache/cluster:Cluster";

/// ElastiCache limit on nodes per cluster
pub const MAX_CACHE_NODES: u32 = 40;

#[derive(Debug, Clone)]
pub struct SubnetGroupArgs {
    pub description: String,
    pub subnet_ids: Output<Vec<String>>,
    pub tags: Tags,
}

impl IntoProperties for SubnetGroupArgs {
    fn into_properties(self) -> PropertySet {
        Props::new()
            .set_value("description", &self.description)
            .set("subnet_ids", &self.subnet_ids)
            .set_value("tags", &self.tags)
            .build()
    }
}

#[derive(Debug, Clone)]
pub struct SubnetGroup {
    pub urn: Urn,
    pub id: Output<String>,
    pub name: Output<String>,
    pub arn: Output<String>,
}

impl Resource for SubnetGroup {
    const TYPE_TOKEN: &'static str = SUBNET_GROUP;

    type Args = SubnetGroupArgs;

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
pub struct ClusterArgs {
    pub engine: String,
    pub node_type: String,
    pub port: u16,
    pub num_cache_nodes: u32,
    pub subnet_group_name: Output<String>,
    pub security_group_ids: Output<Vec<String>>,
    pub final_snapshot_identifier: String,
    pub tags: Tags,
}

impl IntoProperties for ClusterArgs {
    fn into_properties(self) -> PropertySet {
        Props::new()
            .set_value("engine", &self.engine)
            .set_value("node_type", &self.node_type)
            .set_value("port", self.port)
            .set_value("num_cache_nodes", self.num_cache_nodes)
            .set("subnet_group_name", &self.subnet_group_name)
            .set("security_group_ids", &self.security_group_ids)
            .set_value("final_snapshot_identifier", &self.final_snapshot_identifier)
            .set_value("tags", &self.tags)
            .build()
    }
}

/// Endpoint of one cache node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheNode {
    pub id: String,
    pub address: String,
    pub port: u16,
    pub availability_zone: String,
}

#[derive(Debug, Clone)]
pub struct Cluster {
    pub urn: Urn,
    pub id: Output<String>,
    pub arn: Output<String>,
    pub cache_nodes: Output<Vec<CacheNode>>,
}

impl Cluster {
    /// Address of the first node, the endpoint of a single-node cluster
    pub fn primary_address(&self) -> Output<String> {
        self.cache_nodes.try_apply(|nodes| {
            nodes
                .into_iter()
                .next()
                .map(|node| node.address)
                .ok_or_else(|| OutputError::new("cache cluster has no nodes"))
        })
    }
}

impl Resource for Cluster {
    const TYPE_TOKEN: &'static str = CLUSTER;

    type Args = ClusterArgs;

    fn from_registered(resource: RegisteredResource) -> Self {
        Self {
            id: resource.output("id"),
            arn: resource.output("arn"),
            cache_nodes: resource.output("cache_nodes"),
            urn: resource.urn,
        }
    }
}
