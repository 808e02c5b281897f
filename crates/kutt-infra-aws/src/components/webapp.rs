//! Load-balanced Fargate web service

use super::{network_boundary, require_port, require_subnets};
use crate::error::{ComponentError, Result};
use crate::resources::cloudwatch::{LogGroup, LogGroupArgs};
use crate::resources::ecs::{
    ContainerDefinition, ContainerSecret, KeyValuePair, LogConfiguration, NetworkConfiguration,
    PortMapping, Service, ServiceArgs, ServiceLoadBalancer, TaskDefinition, TaskDefinitionArgs,
};
use crate::resources::iam::{
    PolicyDocument, Role, RoleArgs, RolePolicyAttachment, RolePolicyAttachmentArgs,
    managed_policy,
};
use crate::resources::{Tags, ec2::SecurityGroup, get_region, one};
use kutt_infra_core::{ComponentResource, Output, OutputError, ResourceOptions, Stack};
use std::collections::BTreeMap;

pub const TYPE_TOKEN: &str = "kutt:index:WebApp";

/// Principal allowed to assume the execution role
pub const TASK_EXECUTION_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";

/// Plain environment variable
#[derive(Debug, Clone)]
pub struct EnvVar {
    pub name: String,
    pub value: Output<String>,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<Output<String>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Environment variable filled from a secret store at container start
#[derive(Debug, Clone)]
pub struct SecretRef {
    pub name: String,

    /// ARN, optionally followed by `:<json key>::`
    pub value_from: Output<String>,
}

impl SecretRef {
    pub fn new(name: impl Into<String>, value_from: Output<String>) -> Self {
        Self {
            name: name.into(),
            value_from,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebAppArgs {
    pub vpc_id: Output<String>,
    pub subnet_ids: Output<Vec<String>>,
    pub image: String,
    pub container_name: String,
    pub cluster_arn: Output<String>,
    pub register_with_loadbalancer: bool,
    pub port: u16,
    pub memory: String,
    pub cpu: String,
    pub desired_container_count: u32,

    /// Days
    pub log_group_retention: u32,

    /// Identity of the running containers, distinct from the execution role
    pub task_role_arn: Option<Output<String>>,
    pub command: Option<Vec<String>>,
    pub environment: Vec<EnvVar>,
    pub secrets: Vec<SecretRef>,
    pub target_group_arn: Option<Output<String>>,
    pub tags: Tags,
}

impl WebAppArgs {
    pub fn new(
        vpc_id: Output<String>,
        subnet_ids: Output<Vec<String>>,
        image: impl Into<String>,
        container_name: impl Into<String>,
        cluster_arn: Output<String>,
    ) -> Self {
        Self {
            vpc_id,
            subnet_ids,
            image: image.into(),
            container_name: container_name.into(),
            cluster_arn,
            register_with_loadbalancer: true,
            port: 80,
            memory: "512".to_string(),
            cpu: "256".to_string(),
            desired_container_count: 1,
            log_group_retention: 3,
            task_role_arn: None,
            command: None,
            environment: Vec::new(),
            secrets: Vec::new(),
            target_group_arn: None,
            tags: Tags::new(),
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        require_port("WebApp", name, self.port)?;
        if self.register_with_loadbalancer && self.target_group_arn.is_none() {
            return Err(ComponentError::MissingTargetGroup(name.to_string()));
        }
        Ok(())
    }
}

/// A containerized service in private subnets
#[derive(Debug, Clone)]
pub struct WebApp {
    pub component: ComponentResource,
    pub security_group: SecurityGroup,
    pub log_group: LogGroup,

    /// Exposed so callers can attach more policies
    pub task_execution_role: Role,
    pub task_execution_policy: RolePolicyAttachment,
    pub task_definition: TaskDefinition,
    pub service: Service,
}

impl WebApp {
    pub fn new(stack: &Stack, name: &str, args: WebAppArgs, options: ResourceOptions) -> Result<Self> {
        args.validate(name)?;
        let subnet_ids = require_subnets("WebApp", name, &args.subnet_ids)?;

        let component = stack.component(TYPE_TOKEN, name, options)?;

        let security_group = network_boundary(
            stack,
            &component,
            name,
            format!("Web application security group for {}", name),
            &args.vpc_id,
            args.port,
            &args.tags,
        )?;

        let log_group = stack.declare::<LogGroup>(
            name,
            LogGroupArgs {
                retention_in_days: args.log_group_retention,
                tags: args.tags.clone(),
            },
            component.child_options(),
        )?;

        let task_execution_role = stack.declare::<Role>(
            name,
            RoleArgs {
                assume_role_policy: Output::new(PolicyDocument::assume_role(
                    "2008-10-17",
                    TASK_EXECUTION_PRINCIPAL,
                )),
                tags: args.tags.clone(),
            },
            component.child_options(),
        )?;

        let task_execution_policy = stack.declare::<RolePolicyAttachment>(
            name,
            RolePolicyAttachmentArgs {
                role: task_execution_role.name.clone(),
                policy_arn: Output::from(managed_policy::AMAZON_ECS_TASK_EXECUTION_ROLE_POLICY),
            },
            ResourceOptions::parent(&task_execution_role.urn),
        )?;

        let container_definitions = container_definitions(stack, name, &args, &log_group);

        let task_definition = stack.declare::<TaskDefinition>(
            name,
            TaskDefinitionArgs {
                family: name.to_string(),
                cpu: args.cpu.clone(),
                memory: args.memory.clone(),
                network_mode: "awsvpc".to_string(),
                execution_role_arn: task_execution_role.arn.clone(),
                task_role_arn: args.task_role_arn.clone(),
                requires_compatibilities: vec!["FARGATE".to_string()],
                container_definitions,
                tags: args.tags.clone(),
            },
            component.child_options(),
        )?;

        let load_balancers = match (&args.target_group_arn, args.register_with_loadbalancer) {
            (Some(target_group_arn), true) => Some(vec![ServiceLoadBalancer {
                container_name: args.container_name.clone(),
                container_port: args.port,
                target_group_arn: target_group_arn.clone(),
            }]),
            _ => None,
        };

        let service = stack.declare::<Service>(
            name,
            ServiceArgs {
                cluster: args.cluster_arn.clone(),
                desired_count: args.desired_container_count,
                launch_type: "FARGATE".to_string(),
                task_definition: task_definition.arn.clone(),
                load_balancers,
                network_configuration: NetworkConfiguration {
                    security_groups: one(&security_group.id),
                    assign_public_ip: false,
                    subnets: subnet_ids,
                },
                tags: args.tags.clone(),
            },
            ResourceOptions::parent(&task_definition.urn),
        )?;

        tracing::debug!(
            name,
            register = args.register_with_loadbalancer,
            "Declared WebApp"
        );

        Ok(Self {
            component,
            security_group,
            log_group,
            task_execution_role,
            task_execution_policy,
            task_definition,
            service,
        })
    }
}

/// JSON document holding the single container of the task
fn container_definitions(
    stack: &Stack,
    name: &str,
    args: &WebAppArgs,
    log_group: &LogGroup,
) -> Output<String> {
    let environment = {
        let names: Vec<String> = args.environment.iter().map(|e| e.name.clone()).collect();
        Output::all(args.environment.iter().map(|e| e.value.clone())).apply(move |values| {
            names
                .into_iter()
                .zip(values)
                .map(|(name, value)| KeyValuePair { name, value })
                .collect::<Vec<_>>()
        })
    };

    let secrets = {
        let names: Vec<String> = args.secrets.iter().map(|s| s.name.clone()).collect();
        Output::all(args.secrets.iter().map(|s| s.value_from.clone())).apply(move |values| {
            names
                .into_iter()
                .zip(values)
                .map(|(name, value_from)| ContainerSecret { name, value_from })
                .collect::<Vec<_>>()
        })
    };

    let container_name = args.container_name.clone();
    let image = args.image.clone();
    let command = args.command.clone();
    let port = args.port;
    let stream_prefix = format!("{}-{}", name, args.container_name);

    environment
        .zip(&secrets)
        .zip(&log_group.name.zip(&get_region(stack)))
        .try_apply(move |((environment, secrets), (log_group, region))| {
            let options: BTreeMap<String, String> = [
                ("awslogs-group", log_group),
                ("awslogs-region", region),
                ("awslogs-stream-prefix", stream_prefix),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

            let container = ContainerDefinition {
                name: container_name,
                image,
                command,
                environment,
                secrets,
                port_mappings: vec![PortMapping {
                    container_port: port,
                    protocol: "tcp".to_string(),
                    name: "http".to_string(),
                }],
                log_configuration: LogConfiguration {
                    log_driver: "awslogs".to_string(),
                    options,
                },
            };
            serde_json::to_string(&[container]).map_err(|e| OutputError::new(e.to_string()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::testing::{VPC_ID, stack, subnets, tags};
    use crate::resources::iam;
    use kutt_infra_core::StackState;

    const TARGET_GROUP: &str =
        "arn:aws:elasticloadbalancing:us-west-2:123456789012:targetgroup/kutt/0123456789abcdef";
    const CLUSTER: &str = "arn:aws:ecs:us-west-2:123456789012:cluster/main";

    fn args() -> WebAppArgs {
        WebAppArgs {
            port: 3000,
            command: Some(vec!["npm".to_string(), "start".to_string()]),
            environment: vec![EnvVar::new("SITE_NAME", "brig.gs")],
            secrets: vec![SecretRef::new(
                "JWT_SECRET",
                Output::from("arn:aws:secretsmanager:us-west-2:123456789012:secret:kutt:JWT_SECRET::"),
            )],
            target_group_arn: Some(Output::from(TARGET_GROUP)),
            tags: tags(),
            ..WebAppArgs::new(
                Output::from(VPC_ID),
                subnets(),
                "jaxxstorm/kutt:latest",
                "kutt",
                Output::from(CLUSTER),
            )
        }
    }

    async fn deploy(args: WebAppArgs) -> (WebApp, StackState) {
        let stack = stack();
        let app = WebApp::new(&stack, "kutt", args, ResourceOptions::new()).unwrap();
        let state = stack.settle().await.unwrap();
        (app, state)
    }

    fn containers(state: &StackState, app: &WebApp) -> Vec<ContainerDefinition> {
        let task = state.get_resource(&app.task_definition.urn).unwrap();
        let json = task.inputs["container_definitions"].as_str().unwrap();
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_single_tcp_port_mapping() {
        let (app, state) = deploy(args()).await;
        let containers = containers(&state, &app);

        assert_eq!(containers.len(), 1);
        assert_eq!(
            containers[0].port_mappings,
            vec![PortMapping {
                container_port: 3000,
                protocol: "tcp".to_string(),
                name: "http".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_container_definition() {
        let (app, state) = deploy(args()).await;
        let container = containers(&state, &app).remove(0);

        assert_eq!(container.image, "jaxxstorm/kutt:latest");
        assert_eq!(
            container.command,
            Some(vec!["npm".to_string(), "start".to_string()])
        );
        assert_eq!(container.environment[0].name, "SITE_NAME");
        assert_eq!(container.environment[0].value, "brig.gs");
        assert!(container.secrets[0].value_from.ends_with(":JWT_SECRET::"));

        let options = &container.log_configuration.options;
        assert_eq!(container.log_configuration.log_driver, "awslogs");
        assert_eq!(options["awslogs-region"], "us-west-2");
        assert_eq!(options["awslogs-stream-prefix"], "kutt-kutt");
        assert_eq!(
            options["awslogs-group"],
            app.log_group.name.resolve().await.unwrap()
        );

        let task = state.get_resource(&app.task_definition.urn).unwrap();
        assert_eq!(task.inputs["family"], "kutt");
        assert_eq!(task.inputs["network_mode"], "awsvpc");
        assert_eq!(task.inputs["requires_compatibilities"], serde_json::json!(["FARGATE"]));
        assert!(task.inputs.get("task_role_arn").is_none());
    }

    #[tokio::test]
    async fn test_load_balancer_binding_when_registering() {
        let (app, state) = deploy(args()).await;
        let service = state.get_resource(&app.service.urn).unwrap();

        assert_eq!(
            service.inputs["load_balancers"],
            serde_json::json!([{
                "container_name": "kutt",
                "container_port": 3000,
                "target_group_arn": TARGET_GROUP
            }])
        );
        assert_eq!(service.parent.as_ref(), Some(&app.task_definition.urn));
    }

    #[tokio::test]
    async fn test_no_load_balancer_field_without_registration() {
        let args = WebAppArgs {
            register_with_loadbalancer: false,
            target_group_arn: None,
            ..args()
        };
        let (app, state) = deploy(args).await;
        let service = state.get_resource(&app.service.urn).unwrap();

        assert!(service.inputs.get("load_balancers").is_none());
        assert_eq!(
            service.inputs["network_configuration"]["assign_public_ip"],
            false
        );
    }

    #[tokio::test]
    async fn test_execution_role_trusts_ecs_tasks_only() {
        let (app, state) = deploy(args()).await;
        let role = state.get_resource(&app.task_execution_role.urn).unwrap();
        let policy: PolicyDocument =
            serde_json::from_str(role.inputs["assume_role_policy"].as_str().unwrap()).unwrap();

        assert_eq!(policy.statement.len(), 1);
        assert_eq!(
            policy.statement[0].principal,
            Some(serde_json::json!({ "Service": TASK_EXECUTION_PRINCIPAL }))
        );

        let attachment = state.get_resource(&app.task_execution_policy.urn).unwrap();
        assert_eq!(attachment.resource_type, iam::ROLE_POLICY_ATTACHMENT);
        assert_eq!(
            attachment.inputs["policy_arn"],
            managed_policy::AMAZON_ECS_TASK_EXECUTION_ROLE_POLICY
        );
        assert_eq!(attachment.parent.as_ref(), Some(&app.task_execution_role.urn));
    }

    #[tokio::test]
    async fn test_registration_requires_target_group() {
        let stack = stack();
        let args = WebAppArgs {
            target_group_arn: None,
            ..args()
        };
        let result = WebApp::new(&stack, "kutt", args, ResourceOptions::new());
        assert!(matches!(result, Err(ComponentError::MissingTargetGroup(_))));
    }
}
