//! Components declared together on one stack

use kutt_infra_aws::{
    AwsProvider, EnvVar, PrivateCache, PrivateCacheArgs, PrivateDatabase, PrivateDatabaseArgs,
    Tags, WebApp, WebAppArgs, is_taggable,
};
use kutt_infra_core::{GraphError, LocalBackend, Output, ResourceOptions, Stack, package_of};
use kutt_infra_random::{RandomProvider, RandomString, RandomStringArgs};
use serde_json::json;
use std::sync::Arc;

const VPC_ID: &str = "vpc-0a1b2c3d";

fn stack() -> Stack {
    let backend = LocalBackend::new("kutt", "prod")
        .with_provider(Arc::new(
            AwsProvider::new("123456789012", "us-west-2").with_vpc(VPC_ID, "10.0.0.0/16"),
        ))
        .with_provider(Arc::new(RandomProvider::seeded(7)));
    Stack::new(Arc::new(backend))
}

fn tags() -> Tags {
    [("Name", "kutt"), ("environment", "production"), ("project", "kutt")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn subnets() -> Output<Vec<String>> {
    Output::new(vec!["subnet-a".to_string(), "subnet-b".to_string()])
}

#[tokio::test]
async fn test_tags_reach_every_taggable_resource() {
    let stack = stack();

    let db = PrivateDatabase::new(
        &stack,
        "kutt",
        PrivateDatabaseArgs {
            production: true,
            tags: tags(),
            ..PrivateDatabaseArgs::new(Output::from(VPC_ID), subnets(), "kutt")
        },
        ResourceOptions::new(),
    )
    .unwrap();

    let cache = PrivateCache::new(
        &stack,
        "kutt",
        PrivateCacheArgs {
            tags: tags(),
            ..PrivateCacheArgs::new(Output::from(VPC_ID), subnets())
        },
        ResourceOptions::new(),
    )
    .unwrap();

    WebApp::new(
        &stack,
        "kutt",
        WebAppArgs {
            port: 3000,
            target_group_arn: Some(Output::from(
                "arn:aws:elasticloadbalancing:us-west-2:123456789012:targetgroup/web/abc",
            )),
            environment: vec![
                EnvVar::new("DB_HOST", db.instance.address.clone()),
                EnvVar::new("REDIS_HOST", cache.cluster.primary_address()),
            ],
            tags: tags(),
            ..WebAppArgs::new(
                Output::from(VPC_ID),
                subnets(),
                "jaxxstorm/kutt:latest",
                "kutt",
                Output::from("arn:aws:ecs:us-west-2:123456789012:cluster/main"),
            )
        },
        ResourceOptions::new(),
    )
    .unwrap();

    let state = stack.settle().await.unwrap();
    let expected = json!(tags());

    let aws_resources: Vec<_> = state
        .resources
        .iter()
        .filter(|r| r.custom && package_of(&r.resource_type) == "aws")
        .collect();
    assert!(aws_resources.len() >= 12);

    for resource in aws_resources {
        if is_taggable(&resource.resource_type) {
            assert_eq!(
                resource.inputs["tags"], expected,
                "{} is missing its tags",
                resource.urn
            );
        } else {
            assert!(resource.inputs.get("tags").is_none());
        }
    }
}

#[tokio::test]
async fn test_components_with_the_same_name_do_not_collide() {
    let stack = stack();

    let first = PrivateCache::new(
        &stack,
        "kutt",
        PrivateCacheArgs::new(Output::from(VPC_ID), subnets()),
        ResourceOptions::new(),
    )
    .unwrap();
    let second = PrivateDatabase::new(
        &stack,
        "kutt",
        PrivateDatabaseArgs::new(Output::from(VPC_ID), subnets(), "kutt"),
        ResourceOptions::new(),
    )
    .unwrap();

    assert_ne!(first.security_group.urn, second.security_group.urn);

    let state = stack.settle().await.unwrap();
    let first_sg = state.get_resource(&first.security_group.urn).unwrap();
    let second_sg = state.get_resource(&second.security_group.urn).unwrap();
    assert_ne!(first_sg.outputs["id"], second_sg.outputs["id"]);
}

#[tokio::test]
async fn test_deferred_empty_subnets_fail_at_resolution() {
    let stack = stack();
    let upstream = stack
        .declare::<RandomString>(
            "subnets",
            RandomStringArgs::name_safe(4),
            ResourceOptions::new(),
        )
        .unwrap();
    let deferred = upstream.result.apply(|_| Vec::<String>::new());

    PrivateCache::new(
        &stack,
        "kutt",
        PrivateCacheArgs::new(Output::from(VPC_ID), deferred),
        ResourceOptions::new(),
    )
    .unwrap();

    match stack.settle().await {
        Err(GraphError::Resolution(failures)) => {
            assert!(
                failures
                    .iter()
                    .any(|f| f.message.contains("requires at least one subnet id"))
            );
        }
        other => panic!("expected resolution failure, got {:?}", other.map(|_| ())),
    }
}
