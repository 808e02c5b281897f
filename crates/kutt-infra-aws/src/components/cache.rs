//! Private Redis cache cluster

use super::{network_boundary, require_port, require_subnets};
use crate::error::{ComponentError, Result};
use crate::resources::elasticache::{self, ClusterArgs, SubnetGroupArgs};
use crate::resources::{Tags, ec2::SecurityGroup, one};
use kutt_infra_core::{ComponentResource, Output, ResourceOptions, Stack};

pub const TYPE_TOKEN: &str = "kutt:index:PrivateCache";

#[derive(Debug, Clone)]
pub struct PrivateCacheArgs {
    pub vpc_id: Output<String>,
    pub subnet_ids: Output<Vec<String>>,
    pub port: u16,
    pub instance_class: String,
    pub number_of_nodes: u32,
    pub tags: Tags,
}

impl PrivateCacheArgs {
    pub fn new(vpc_id: Output<String>, subnet_ids: Output<Vec<String>>) -> Self {
        Self {
            vpc_id,
            subnet_ids,
            port: 6379,
            instance_class: "cache.t2.micro".to_string(),
            number_of_nodes: 1,
            tags: Tags::new(),
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        require_port("PrivateCache", name, self.port)?;
        if !(1..=elasticache::MAX_CACHE_NODES).contains(&self.number_of_nodes) {
            return Err(ComponentError::InvalidArgument {
                component: "PrivateCache",
                name: name.to_string(),
                message: format!(
                    "number_of_nodes must be between 1 and {}",
                    elasticache::MAX_CACHE_NODES
                ),
            });
        }
        Ok(())
    }
}

/// A Redis cluster reachable only from inside its VPC
#[derive(Debug, Clone)]
pub struct PrivateCache {
    pub component: ComponentResource,
    pub subnet_group: elasticache::SubnetGroup,
    pub security_group: SecurityGroup,
    pub cluster: elasticache::Cluster,
}

impl PrivateCache {
    pub fn new(
        stack: &Stack,
        name: &str,
        args: PrivateCacheArgs,
        options: ResourceOptions,
    ) -> Result<Self> {
        args.validate(name)?;
        let subnet_ids = require_subnets("PrivateCache", name, &args.subnet_ids)?;

        let component = stack.component(TYPE_TOKEN, name, options)?;

        let subnet_group = stack.declare::<elasticache::SubnetGroup>(
            format!("{}-subnet-group", name),
            SubnetGroupArgs {
                description: format!("Subnet group for {}", name),
                subnet_ids,
                tags: args.tags.clone(),
            },
            component.child_options(),
        )?;

        let security_group = network_boundary(
            stack,
            &component,
            name,
            format!("Security group for Private Redis {}", name),
            &args.vpc_id,
            args.port,
            &args.tags,
        )?;

        // Derived from the name alone, unlike the database's random suffix
        let cluster = stack.declare::<elasticache::Cluster>(
            format!("{}-redis-cluster", name),
            ClusterArgs {
                engine: "redis".to_string(),
                node_type: args.instance_class.clone(),
                port: args.port,
                num_cache_nodes: args.number_of_nodes,
                subnet_group_name: subnet_group.name.clone(),
                security_group_ids: one(&security_group.id),
                final_snapshot_identifier: format!("{}-redis-final-snapshot", name),
                tags: args.tags.clone(),
            },
            component.child_options(),
        )?;

        tracing::debug!(name, nodes = args.number_of_nodes, "Declared PrivateCache");

        Ok(Self {
            component,
            subnet_group,
            security_group,
            cluster,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::testing::{VPC_CIDR, VPC_ID, stack, subnets, tags};
    use kutt_infra_core::{GraphError, Urn};
    use serde_json::json;

    fn args() -> PrivateCacheArgs {
        PrivateCacheArgs {
            tags: tags(),
            ..PrivateCacheArgs::new(Output::from(VPC_ID), subnets())
        }
    }

    #[tokio::test]
    async fn test_cluster_defaults() {
        let stack = stack();
        let cache = PrivateCache::new(&stack, "kutt", args(), ResourceOptions::new()).unwrap();
        let state = stack.settle().await.unwrap();

        let cluster = state.get_resource(&cache.cluster.urn).unwrap();
        assert_eq!(cluster.name, "kutt-redis-cluster");
        assert_eq!(cluster.inputs["engine"], "redis");
        assert_eq!(cluster.inputs["node_type"], "cache.t2.micro");
        assert_eq!(cluster.inputs["num_cache_nodes"], 1);
        assert_eq!(cluster.inputs["port"], 6379);
        assert_eq!(
            cluster.inputs["final_snapshot_identifier"],
            "kutt-redis-final-snapshot"
        );

        let subnet_group = state.get_resource(&cache.subnet_group.urn).unwrap();
        assert_eq!(subnet_group.name, "kutt-subnet-group");

        let security_group = state.get_resource(&cache.security_group.urn).unwrap();
        assert_eq!(
            security_group.inputs["ingress"][0]["cidr_blocks"],
            json!([VPC_CIDR])
        );
        assert_eq!(security_group.inputs["ingress"][0]["from_port"], 6379);
        assert_eq!(security_group.inputs["egress"][0]["protocol"], "-1");
    }

    #[tokio::test]
    async fn test_primary_address_is_first_node() {
        let stack = stack();
        let args = PrivateCacheArgs {
            number_of_nodes: 2,
            ..args()
        };
        let cache = PrivateCache::new(&stack, "kutt", args, ResourceOptions::new()).unwrap();

        let nodes = cache.cluster.cache_nodes.resolve().await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(
            cache.cluster.primary_address().resolve().await.unwrap(),
            nodes[0].address
        );
    }

    #[tokio::test]
    async fn test_every_child_is_owned_by_the_component() {
        let stack = stack();
        let cache = PrivateCache::new(&stack, "kutt", args(), ResourceOptions::new()).unwrap();
        let state = stack.settle().await.unwrap();

        let children: Vec<&Urn> = state
            .children_of(&cache.component.urn)
            .into_iter()
            .map(|r| &r.urn)
            .collect();
        assert_eq!(
            children,
            vec![
                &cache.subnet_group.urn,
                &cache.security_group.urn,
                &cache.cluster.urn
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_vpc_fails_the_boundary() {
        let stack = stack();
        let args = PrivateCacheArgs {
            vpc_id: Output::from("vpc-missing"),
            ..args()
        };
        PrivateCache::new(&stack, "kutt", args, ResourceOptions::new()).unwrap();

        match stack.settle().await {
            Err(GraphError::Resolution(failures)) => {
                assert!(failures.iter().any(|f| f.message.contains("vpc-missing")));
            }
            other => panic!("expected resolution failure, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_node_count_bounds() {
        let stack = stack();
        for nodes in [0, elasticache::MAX_CACHE_NODES + 1, u32::MAX] {
            let args = PrivateCacheArgs {
                number_of_nodes: nodes,
                ..args()
            };
            let result = PrivateCache::new(&stack, "kutt", args, ResourceOptions::new());
            assert!(
                matches!(result, Err(ComponentError::InvalidArgument { .. })),
                "{} nodes accepted",
                nodes
            );
        }

        let args = PrivateCacheArgs {
            number_of_nodes: elasticache::MAX_CACHE_NODES,
            ..args()
        };
        assert!(PrivateCache::new(&stack, "kutt", args, ResourceOptions::new()).is_ok());
    }
}
