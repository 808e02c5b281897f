//! Simulated AWS provider
//!
//! Computes the attributes AWS would assign (ids, ARNs, endpoints) without
//! calling any API. Identifiers are derived from the URN, so a resource keeps
//! its identity across runs, and the inputs AWS would reject are rejected
//! here too.

use crate::resources::{
    GET_REGION, cloudwatch, ec2, ecs, elasticache, iam, lb, rds, secretsmanager, ssm,
};
use async_trait::async_trait;
use kutt_infra_core::{
    GraphError, ProviderOutputs, ResourceProvider, Result, Urn, fingerprint, input_str,
};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Serves the `aws` package
pub struct AwsProvider {
    account_id: String,
    region: String,

    /// VPC id to CIDR block, answered by VPC lookups
    vpcs: BTreeMap<String, String>,
}

impl AwsProvider {
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            region: region.into(),
            vpcs: BTreeMap::new(),
        }
    }

    pub fn with_vpc(mut self, id: impl Into<String>, cidr_block: impl Into<String>) -> Self {
        self.vpcs.insert(id.into(), cidr_block.into());
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    fn arn(&self, service: &str, resource: &str) -> String {
        format!(
            "arn:aws:{}:{}:{}:{}",
            service, self.region, self.account_id, resource
        )
    }

    fn global_arn(&self, service: &str, resource: &str) -> String {
        format!("arn:aws:{}::{}:{}", service, self.account_id, resource)
    }

    fn create_security_group(&self, urn: &Urn, inputs: &Value) -> Result<ProviderOutputs> {
        require(urn, inputs, "vpc_id")?;
        let id = format!("sg-{}", fingerprint(&[urn.as_str()], 17));
        Ok(ProviderOutputs::new()
            .with("arn", self.arn("ec2", &format!("security-group/{}", id)))
            .with("name", physical_name(urn))
            .with("id", id))
    }

    fn create_rds_subnet_group(&self, urn: &Urn, inputs: &Value) -> Result<ProviderOutputs> {
        require_subnets(urn, inputs)?;
        let name = physical_name(urn);
        Ok(ProviderOutputs::new()
            .with("arn", self.arn("rds", &format!("subgrp:{}", name)))
            .with("id", name.clone())
            .with("name", name))
    }

    fn create_rds_instance(&self, urn: &Urn, inputs: &Value) -> Result<ProviderOutputs> {
        for key in ["db_subnet_group_name", "engine", "instance_class", "username", "password"] {
            require(urn, inputs, key)?;
        }
        let skip_final_snapshot = inputs
            .get("skip_final_snapshot")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !skip_final_snapshot && input_str(inputs, "final_snapshot_identifier").is_none() {
            return Err(failed(
                urn,
                "final_snapshot_identifier is required when skip_final_snapshot is false",
            ));
        }

        let identifier = physical_name(urn);
        let port = inputs.get("port").and_then(Value::as_u64).unwrap_or(5432);
        let address = format!(
            "{}.{}.{}.rds.amazonaws.com",
            identifier,
            fingerprint(&[&self.account_id, &self.region], 12),
            self.region
        );
        Ok(ProviderOutputs::new()
            .with("arn", self.arn("rds", &format!("db:{}", identifier)))
            .with("endpoint", format!("{}:{}", address, port))
            .with("address", address)
            .with("port", port)
            .with("id", identifier))
    }

    fn create_cache_subnet_group(&self, urn: &Urn, inputs: &Value) -> Result<ProviderOutputs> {
        require_subnets(urn, inputs)?;
        let name = physical_name(urn);
        Ok(ProviderOutputs::new()
            .with("arn", self.arn("elasticache", &format!("subnetgroup:{}", name)))
            .with("id", name.clone())
            .with("name", name))
    }

    fn create_cache_cluster(&self, urn: &Urn, inputs: &Value) -> Result<ProviderOutputs> {
        require(urn, inputs, "subnet_group_name")?;
        let nodes = inputs
            .get("num_cache_nodes")
            .and_then(Value::as_u64)
            .unwrap_or(1);
        if nodes == 0 || nodes > u64::from(elasticache::MAX_CACHE_NODES) {
            return Err(failed(
                urn,
                &format!(
                    "num_cache_nodes must be between 1 and {}",
                    elasticache::MAX_CACHE_NODES
                ),
            ));
        }
        let port = inputs.get("port").and_then(Value::as_u64).unwrap_or(6379);
        let cluster_id = physical_name(urn);
        let zone = fingerprint(&[&self.account_id, &self.region], 6);
        let short_region = self.region.replace('-', "");

        let cache_nodes: Vec<Value> = (1..=nodes)
            .map(|n| {
                json!({
                    "id": format!("{:04}", n),
                    "address": format!(
                        "{}.{}.{:04}.{}.cache.amazonaws.com",
                        cluster_id, zone, n, short_region
                    ),
                    "port": port,
                    "availability_zone": format!("{}a", self.region),
                })
            })
            .collect();

        Ok(ProviderOutputs::new()
            .with("arn", self.arn("elasticache", &format!("cluster:{}", cluster_id)))
            .with("cache_nodes", cache_nodes)
            .with("id", cluster_id))
    }

    fn create_parameter(&self, urn: &Urn, inputs: &Value) -> Result<ProviderOutputs> {
        let parameter_type = require(urn, inputs, "type")?;
        if !matches!(parameter_type, "String" | "StringList" | "SecureString") {
            return Err(failed(
                urn,
                &format!("invalid parameter type '{}'", parameter_type),
            ));
        }
        require(urn, inputs, "value")?;
        let name = physical_name(urn);
        Ok(ProviderOutputs::new()
            .with("arn", self.arn("ssm", &format!("parameter/{}", name)))
            .with("version", 1)
            .with("id", name.clone())
            .with("name", name))
    }

    fn create_role(&self, urn: &Urn, inputs: &Value) -> Result<ProviderOutputs> {
        require_policy(urn, inputs, "assume_role_policy")?;
        let name = physical_name(urn);
        Ok(ProviderOutputs::new()
            .with("arn", self.global_arn("iam", &format!("role/{}", name)))
            .with(
                "unique_id",
                format!("AROA{}", fingerprint(&[urn.as_str()], 17).to_uppercase()),
            )
            .with("id", name.clone())
            .with("name", name))
    }

    fn create_policy(&self, urn: &Urn, inputs: &Value) -> Result<ProviderOutputs> {
        require_policy(urn, inputs, "policy")?;
        let name = physical_name(urn);
        let arn = self.global_arn("iam", &format!("policy/{}", name));
        Ok(ProviderOutputs::new()
            .with("id", arn.clone())
            .with("arn", arn)
            .with("name", name))
    }

    fn create_attachment(&self, urn: &Urn, inputs: &Value, principal: &str) -> Result<ProviderOutputs> {
        let holder = require(urn, inputs, principal)?;
        require(urn, inputs, "policy_arn")?;
        Ok(ProviderOutputs::new().with(
            "id",
            format!("{}-{}", holder, fingerprint(&[urn.as_str()], 8)),
        ))
    }

    fn create_user(&self, urn: &Urn) -> Result<ProviderOutputs> {
        let name = physical_name(urn);
        Ok(ProviderOutputs::new()
            .with("arn", self.global_arn("iam", &format!("user/{}", name)))
            .with("id", name.clone())
            .with("name", name))
    }

    fn create_access_key(&self, urn: &Urn, inputs: &Value) -> Result<ProviderOutputs> {
        require(urn, inputs, "user")?;
        let id = format!("AKIA{}", fingerprint(&[urn.as_str()], 16).to_uppercase());
        let secret = fingerprint(&[urn.as_str(), "secret"], 40);
        let smtp_password = format!("B{}", fingerprint(&[urn.as_str(), "smtp"], 43));
        Ok(ProviderOutputs::new()
            .with("id", id)
            .with_secret("secret", secret)
            .with_secret("ses_smtp_password_v4", smtp_password))
    }

    fn create_log_group(&self, urn: &Urn, inputs: &Value) -> Result<ProviderOutputs> {
        const RETENTION_DAYS: [u64; 22] = [
            0, 1, 3, 5, 7, 14, 30, 60, 90, 120, 150, 180, 365, 400, 545, 731, 1096, 1827, 2192,
            2557, 2922, 3288,
        ];
        let retention = inputs
            .get("retention_in_days")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        if !RETENTION_DAYS.contains(&retention) {
            return Err(failed(
                urn,
                &format!("unsupported log retention of {} days", retention),
            ));
        }
        let name = physical_name(urn);
        Ok(ProviderOutputs::new()
            .with("arn", self.arn("logs", &format!("log-group:{}", name)))
            .with("id", name.clone())
            .with("name", name))
    }

    fn create_task_definition(&self, urn: &Urn, inputs: &Value) -> Result<ProviderOutputs> {
        let family = require(urn, inputs, "family")?;
        require(urn, inputs, "execution_role_arn")?;
        let containers: Vec<ecs::ContainerDefinition> =
            serde_json::from_str(require(urn, inputs, "container_definitions")?)
                .map_err(|e| failed(urn, &format!("invalid container_definitions: {}", e)))?;
        if containers.is_empty() {
            return Err(failed(urn, "at least one container definition is required"));
        }
        Ok(ProviderOutputs::new()
            .with("arn", self.arn("ecs", &format!("task-definition/{}:1", family)))
            .with("revision", 1))
    }

    fn create_service(&self, urn: &Urn, inputs: &Value) -> Result<ProviderOutputs> {
        let cluster = require(urn, inputs, "cluster")?;
        require(urn, inputs, "task_definition")?;
        if let Some(bindings) = inputs.get("load_balancers") {
            let valid = bindings.as_array().is_some_and(|bindings| {
                !bindings.is_empty()
                    && bindings
                        .iter()
                        .all(|b| input_str(b, "target_group_arn").is_some_and(|arn| !arn.is_empty()))
            });
            if !valid {
                return Err(failed(urn, "load_balancers entries need a target group"));
            }
        }

        let cluster_name = cluster.rsplit('/').next().unwrap_or(cluster);
        let name = physical_name(urn);
        Ok(ProviderOutputs::new()
            .with(
                "id",
                self.arn("ecs", &format!("service/{}/{}", cluster_name, name)),
            )
            .with("name", name))
    }

    fn create_secret(&self, urn: &Urn) -> Result<ProviderOutputs> {
        let name = physical_name(urn);
        let arn = self.arn(
            "secretsmanager",
            &format!("secret:{}-{}", name, fingerprint(&[urn.as_str()], 6)),
        );
        Ok(ProviderOutputs::new()
            .with("id", arn.clone())
            .with("arn", arn)
            .with("name", name))
    }

    fn create_secret_version(&self, urn: &Urn, inputs: &Value) -> Result<ProviderOutputs> {
        let secret_id = require(urn, inputs, "secret_id")?;
        let secret_string = require(urn, inputs, "secret_string")?;
        let version_id = fingerprint(&[urn.as_str(), secret_string], 32);
        Ok(ProviderOutputs::new()
            .with("id", format!("{}|{}", secret_id, version_id))
            .with("version_id", version_id))
    }

    fn create_listener_rule(&self, urn: &Urn, inputs: &Value) -> Result<ProviderOutputs> {
        let listener = require(urn, inputs, "listener_arn")?;
        let priority = inputs.get("priority").and_then(Value::as_u64).unwrap_or(0);
        if !(1..=50000).contains(&priority) {
            return Err(failed(urn, "priority must be between 1 and 50000"));
        }
        let rule = format!(
            "{}/{}",
            listener.replacen(":listener/", ":listener-rule/", 1),
            fingerprint(&[urn.as_str()], 16)
        );
        Ok(ProviderOutputs::new().with("id", rule.clone()).with("arn", rule))
    }

    fn get_vpc(&self, args: &Value) -> Result<Value> {
        let id = input_str(args, "id")
            .ok_or_else(|| GraphError::ProviderFailed("getVpc requires an id".to_string()))?;
        let cidr_block = self
            .vpcs
            .get(id)
            .ok_or_else(|| GraphError::ProviderFailed(format!("VPC not found: {}", id)))?;
        Ok(json!({
            "id": id,
            "cidr_block": cidr_block,
            "arn": self.arn("ec2", &format!("vpc/{}", id)),
        }))
    }
}

#[async_trait]
impl ResourceProvider for AwsProvider {
    fn package(&self) -> &str {
        "aws"
    }

    fn display_name(&self) -> &str {
        "AWS (simulated)"
    }

    async fn create(&self, urn: &Urn, inputs: &Value) -> Result<ProviderOutputs> {
        let outputs = match urn.type_token() {
            ec2::SECURITY_GROUP => self.create_security_group(urn, inputs),
            rds::SUBNET_GROUP => self.create_rds_subnet_group(urn, inputs),
            rds::INSTANCE => self.create_rds_instance(urn, inputs),
            elasticache::SUBNET_GROUP => self.create_cache_subnet_group(urn, inputs),
            elasticache::CLUSTER => self.create_cache_cluster(urn, inputs),
            ssm::PARAMETER => self.create_parameter(urn, inputs),
            iam::ROLE => self.create_role(urn, inputs),
            iam::POLICY => self.create_policy(urn, inputs),
            iam::ROLE_POLICY_ATTACHMENT => self.create_attachment(urn, inputs, "role"),
            iam::USER => self.create_user(urn),
            iam::USER_POLICY_ATTACHMENT => self.create_attachment(urn, inputs, "user"),
            iam::ACCESS_KEY => self.create_access_key(urn, inputs),
            cloudwatch::LOG_GROUP => self.create_log_group(urn, inputs),
            ecs::TASK_DEFINITION => self.create_task_definition(urn, inputs),
            ecs::SERVICE => self.create_service(urn, inputs),
            secretsmanager::SECRET => self.create_secret(urn),
            secretsmanager::SECRET_VERSION => self.create_secret_version(urn, inputs),
            lb::LISTENER_RULE => self.create_listener_rule(urn, inputs),
            other => Err(GraphError::ProviderFailed(format!(
                "unsupported resource type: {}",
                other
            ))),
        }?;

        tracing::debug!(urn = %urn, "Simulated AWS create");
        Ok(outputs)
    }

    async fn invoke(&self, token: &str, args: &Value) -> Result<Value> {
        match token {
            ec2::GET_VPC => self.get_vpc(args),
            GET_REGION => Ok(json!({ "name": self.region, "id": self.region })),
            other => Err(GraphError::ProviderFailed(format!(
                "unsupported function: {}",
                other
            ))),
        }
    }
}

/// Name AWS would auto-assign: the logical name plus a stable suffix
fn physical_name(urn: &Urn) -> String {
    format!("{}-{}", urn.name(), fingerprint(&[urn.as_str()], 7))
}

fn failed(urn: &Urn, message: &str) -> GraphError {
    GraphError::ProviderFailed(format!("{}: {}", urn.name(), message))
}

fn require<'a>(urn: &Urn, inputs: &'a Value, key: &str) -> Result<&'a str> {
    input_str(inputs, key)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| failed(urn, &format!("missing required property '{}'", key)))
}

fn require_subnets(urn: &Urn, inputs: &Value) -> Result<()> {
    let count = inputs
        .get("subnet_ids")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    if count == 0 {
        return Err(failed(urn, "at least one subnet id is required"));
    }
    Ok(())
}

fn require_policy(urn: &Urn, inputs: &Value, key: &str) -> Result<()> {
    let document = require(urn, inputs, key)?;
    serde_json::from_str::<iam::PolicyDocument>(document)
        .map_err(|e| failed(urn, &format!("invalid {}: {}", key, e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> AwsProvider {
        AwsProvider::new("123456789012", "us-west-2").with_vpc("vpc-0a1b2c3d", "10.0.0.0/16")
    }

    fn urn(type_token: &str, name: &str) -> Urn {
        Urn::new("prod", "kutt", type_token, name)
    }

    #[tokio::test]
    async fn test_identifiers_are_stable() {
        let provider = provider();
        let urn = urn(ec2::SECURITY_GROUP, "kutt");
        let inputs = json!({ "vpc_id": "vpc-0a1b2c3d" });

        let first = provider.create(&urn, &inputs).await.unwrap();
        let second = provider.create(&urn, &inputs).await.unwrap();
        assert_eq!(first.values["id"], second.values["id"]);
        assert!(first.values["id"].as_str().unwrap().starts_with("sg-"));
    }

    #[tokio::test]
    async fn test_vpc_lookup() {
        let provider = provider();
        let vpc = provider
            .invoke(ec2::GET_VPC, &json!({ "id": "vpc-0a1b2c3d" }))
            .await
            .unwrap();
        assert_eq!(vpc["cidr_block"], "10.0.0.0/16");

        let missing = provider
            .invoke(ec2::GET_VPC, &json!({ "id": "vpc-nope" }))
            .await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn test_rejects_what_aws_rejects() {
        let provider = provider();

        let no_subnets = provider
            .create(&urn(rds::SUBNET_GROUP, "kutt"), &json!({ "subnet_ids": [] }))
            .await;
        assert!(no_subnets.is_err());

        let no_snapshot = provider
            .create(
                &urn(rds::INSTANCE, "kutt"),
                &json!({
                    "db_subnet_group_name": "kutt-123",
                    "engine": "postgres",
                    "instance_class": "db.t3.micro",
                    "username": "administrator",
                    "password": "secret",
                    "skip_final_snapshot": false
                }),
            )
            .await;
        assert!(no_snapshot.is_err());

        let bad_retention = provider
            .create(
                &urn(cloudwatch::LOG_GROUP, "kutt"),
                &json!({ "retention_in_days": 4 }),
            )
            .await;
        assert!(bad_retention.is_err());

        let empty_binding = provider
            .create(
                &urn(ecs::SERVICE, "kutt"),
                &json!({
                    "cluster": "arn:aws:ecs:us-west-2:123456789012:cluster/main",
                    "task_definition": "arn:aws:ecs:us-west-2:123456789012:task-definition/kutt:1",
                    "load_balancers": []
                }),
            )
            .await;
        assert!(empty_binding.is_err());

        let too_many_nodes = provider
            .create(
                &urn(elasticache::CLUSTER, "kutt"),
                &json!({ "subnet_group_name": "kutt-123", "num_cache_nodes": 1_000_000_000u64 }),
            )
            .await;
        assert!(too_many_nodes.is_err());
    }

    #[tokio::test]
    async fn test_access_key_secrets_are_flagged() {
        let outputs = provider()
            .create(&urn(iam::ACCESS_KEY, "kutt"), &json!({ "user": "kutt-1a2b3c4" }))
            .await
            .unwrap();

        assert!(outputs.secret_keys.contains("secret"));
        assert!(outputs.secret_keys.contains("ses_smtp_password_v4"));
        assert!(!outputs.secret_keys.contains("id"));
        assert!(outputs.values["id"].as_str().unwrap().starts_with("AKIA"));
    }
}
