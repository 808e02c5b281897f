//! The kutt stack: database, cache, mail credentials, secrets and the web app

use anyhow::Context;
use kutt_infra_aws::resources::iam::{
    AccessKey, AccessKeyArgs, Policy, PolicyArgs, PolicyDocument, Role, RoleArgs,
    RolePolicyAttachment, RolePolicyAttachmentArgs, User, UserArgs, UserPolicyAttachment,
    UserPolicyAttachmentArgs, managed_policy,
};
use kutt_infra_aws::resources::lb::{ListenerRule, ListenerRuleArgs};
use kutt_infra_aws::resources::secretsmanager::{
    Secret, SecretArgs, SecretVersion, SecretVersionArgs,
};
use kutt_infra_aws::{
    EnvVar, PrivateCache, PrivateCacheArgs, PrivateDatabase, PrivateDatabaseArgs, SecretRef,
    Tags, WebApp, WebAppArgs,
};
use kutt_infra_cloudflare::{Record, RecordArgs, RecordType};
use kutt_infra_config::StackConfig;
use kutt_infra_core::{Output, OutputError, ResourceOptions, Stack};
use kutt_infra_random::{RandomPassword, RandomPasswordArgs};

/// Owner of the referenced vpc, ecs and loadbalancer stacks by default
pub const DEFAULT_REFERENCE_ORG: &str = "jaxxstorm";

/// Keys of the JSON secret, in the order the container reads them
pub const SECRET_KEYS: [&str; 7] = [
    "RECAPTCHA_SECRET_KEY",
    "RECAPTCHA_SITE_KEY",
    "DB_PASSWORD",
    "JWT_SECRET",
    "MAIL_PASSWORD",
    "MAIL_USER",
    "GOOGLE_SAFE_BROWSING_KEY",
];

/// Application settings passed to the container as plain environment
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub image: String,
    pub site_name: String,
    pub default_domain: String,
    pub admin_emails: String,
    pub mail_host: String,
    pub mail_port: String,
    pub mail_from: String,
    pub mail_debug: bool,
    pub mail_log: bool,
    pub disallow_anonymous_links: bool,
}

impl AppSettings {
    /// Read from the stack file; `admin_emails` has no default
    pub fn from_config(config: &StackConfig) -> anyhow::Result<Self> {
        let site_name = config.get("site_name").unwrap_or("brig.gs").to_string();
        let flag = |key: &str, default: bool| -> anyhow::Result<bool> {
            match config.get(key) {
                Some(value) => value
                    .parse()
                    .with_context(|| format!("config '{}' must be true or false", key)),
                None => Ok(default),
            }
        };

        Ok(Self {
            image: config
                .get("image")
                .unwrap_or("jaxxstorm/kutt:latest")
                .to_string(),
            default_domain: config
                .get("default_domain")
                .unwrap_or(&site_name)
                .to_string(),
            admin_emails: config.require("admin_emails")?.to_string(),
            mail_host: config
                .get("mail_host")
                .map(str::to_string)
                .unwrap_or_else(|| format!("email-smtp.{}.amazonaws.com", config.region)),
            mail_port: config.get("mail_port").unwrap_or("587").to_string(),
            mail_from: config
                .get("mail_from")
                .map(str::to_string)
                .unwrap_or_else(|| format!("urls@mail.{}", site_name)),
            mail_debug: flag("mail_debug", true)?,
            mail_log: flag("mail_log", true)?,
            disallow_anonymous_links: flag("disallow_anonymous_links", true)?,
            site_name,
        })
    }
}

/// Custom domain in front of the shared load balancer
#[derive(Debug, Clone)]
pub struct DnsInputs {
    pub zone_id: String,
    pub domain: String,
    pub listener_priority: u32,
    pub listener_arn: Output<String>,
}

/// Every value the stack consumes from outside
#[derive(Debug, Clone)]
pub struct KuttInputs {
    pub vpc_id: Output<String>,
    pub private_subnet_ids: Output<Vec<String>>,
    pub cluster_arn: Output<String>,
    pub target_group_arn: Output<String>,
    pub lb_dns_name: Output<String>,
    pub recaptcha_site_key: Output<String>,
    pub recaptcha_secret_key: Output<String>,
    pub google_safe_browsing_key: Output<String>,
    pub app: AppSettings,
    pub tags: Tags,
    pub dns: Option<DnsInputs>,
}

impl KuttInputs {
    /// Resolve stack references and secrets for the current stack
    pub fn from_config(stack: &Stack, config: &StackConfig) -> anyhow::Result<Self> {
        let org = config.get("reference_org").unwrap_or(DEFAULT_REFERENCE_ORG);
        let reference = |project: &str| {
            stack.stack_reference(&format!("{}/{}/{}", org, project, stack.name()))
        };

        let vpc = reference("vpc");
        let cluster = reference("ecs");
        let loadbalancer = reference("loadbalancer");

        let cluster_name = cluster.name.clone();
        let cluster_arn = cluster
            .get_output::<String>("cluster_arn")
            .try_apply(move |arn| {
                arn.ok_or_else(|| {
                    OutputError::new(format!(
                        "stack reference '{}' has no output 'cluster_arn'",
                        cluster_name
                    ))
                })
            });

        let dns = config.dns.as_ref().map(|dns| DnsInputs {
            zone_id: dns.zone_id.clone(),
            domain: dns.domain.clone(),
            listener_priority: dns.listener_priority,
            listener_arn: loadbalancer.require_output(&dns.listener_output),
        });

        Ok(Self {
            vpc_id: vpc.require_output("vpc_id"),
            private_subnet_ids: vpc.require_output("private_subnet_ids"),
            cluster_arn,
            target_group_arn: loadbalancer.require_output("target_group_arn"),
            lb_dns_name: loadbalancer.require_output("lb_dns_name"),
            recaptcha_site_key: Output::secret(config.require_secret("recaptcha_site_key")?),
            recaptcha_secret_key: Output::secret(config.require_secret("recaptcha_secret_key")?),
            google_safe_browsing_key: Output::secret(
                config.require_secret("google_safe_browsing_api_key")?,
            ),
            app: AppSettings::from_config(config)?,
            tags: config.tags.clone(),
            dns,
        })
    }
}

/// Handles of everything the stack declares
#[derive(Debug, Clone)]
pub struct Kutt {
    pub database: PrivateDatabase,
    pub cache: PrivateCache,
    pub jwt_secret: RandomPassword,
    pub mail_user: User,
    pub mail_policy: UserPolicyAttachment,
    pub access_key: AccessKey,
    pub secret: Secret,
    pub secret_version: SecretVersion,
    pub task_role: Role,
    pub task_role_policy: RolePolicyAttachment,
    pub app: WebApp,
    pub secret_policy: Policy,
    pub secret_policy_attachment: RolePolicyAttachment,
    pub dns_record: Option<Record>,
    pub listener_rule: Option<ListenerRule>,
}

pub fn assemble(stack: &Stack, inputs: &KuttInputs) -> anyhow::Result<Kutt> {
    let database = PrivateDatabase::new(
        stack,
        "kutt",
        PrivateDatabaseArgs {
            production: true,
            tags: inputs.tags.clone(),
            ..PrivateDatabaseArgs::new(
                inputs.vpc_id.clone(),
                inputs.private_subnet_ids.clone(),
                "kutt",
            )
        },
        ResourceOptions::new(),
    )?;

    let cache = PrivateCache::new(
        stack,
        "kutt",
        PrivateCacheArgs {
            tags: inputs.tags.clone(),
            ..PrivateCacheArgs::new(inputs.vpc_id.clone(), inputs.private_subnet_ids.clone())
        },
        ResourceOptions::new(),
    )?;

    let jwt_secret = stack.declare::<RandomPassword>(
        "kutt-jwt-secret",
        RandomPasswordArgs::new(32),
        ResourceOptions::new(),
    )?;

    // SMTP credentials for SES
    let mail_user = stack.declare::<User>("kutt", UserArgs::default(), ResourceOptions::new())?;
    let mail_policy = stack.declare::<UserPolicyAttachment>(
        "kutt-mail-policy-attchment",
        UserPolicyAttachmentArgs {
            user: mail_user.name.clone(),
            policy_arn: Output::from(managed_policy::AMAZON_SES_FULL_ACCESS),
        },
        ResourceOptions::parent(&mail_user.urn),
    )?;
    let access_key = stack.declare::<AccessKey>(
        "kutt",
        AccessKeyArgs {
            user: mail_user.name.clone(),
        },
        ResourceOptions::parent(&mail_user.urn),
    )?;

    let secret = stack.declare::<Secret>("kutt", SecretArgs::default(), ResourceOptions::new())?;
    let secret_version = stack.declare::<SecretVersion>(
        "kutt",
        SecretVersionArgs {
            secret_id: secret.id.clone(),
            secret_string: secret_bundle(inputs, &database, &access_key, &jwt_secret),
        },
        ResourceOptions::parent(&secret.urn),
    )?;

    let task_role = stack.declare::<Role>(
        "kutt-task-role",
        RoleArgs {
            assume_role_policy: Output::new(PolicyDocument::assume_role(
                "2012-10-17",
                kutt_infra_aws::components::webapp::TASK_EXECUTION_PRINCIPAL,
            )),
            tags: Tags::new(),
        },
        ResourceOptions::new(),
    )?;
    let task_role_policy = stack.declare::<RolePolicyAttachment>(
        "kutt-iam-policy-attchment",
        RolePolicyAttachmentArgs {
            role: task_role.name.clone(),
            policy_arn: Output::from(managed_policy::AMAZON_ECS_FULL_ACCESS),
        },
        ResourceOptions::parent(&task_role.urn),
    )?;

    let app = WebApp::new(
        stack,
        "kutt",
        WebAppArgs {
            port: 3000,
            command: Some(vec!["npm".to_string(), "start".to_string()]),
            secrets: SECRET_KEYS
                .iter()
                .map(|key| SecretRef::new(*key, secret.key_reference(key)))
                .collect(),
            environment: environment(inputs, &database, &cache),
            target_group_arn: Some(inputs.target_group_arn.clone()),
            task_role_arn: Some(task_role.arn.clone()),
            register_with_loadbalancer: true,
            tags: inputs.tags.clone(),
            ..WebAppArgs::new(
                inputs.vpc_id.clone(),
                inputs.private_subnet_ids.clone(),
                inputs.app.image.clone(),
                "kutt",
                inputs.cluster_arn.clone(),
            )
        },
        ResourceOptions::new(),
    )?;

    // Let the execution role read the secret at container start
    let secret_policy = stack.declare::<Policy>(
        "kutt-secret-access-policy",
        PolicyArgs {
            description: None,
            policy: secret.arn.apply(|arn| {
                PolicyDocument::allow("2012-10-17", &["secretsmanager:GetSecretValue"], vec![arn])
            }),
            tags: Tags::new(),
        },
        ResourceOptions::parent(&app.task_execution_role.urn),
    )?;
    let secret_policy_attachment = stack.declare::<RolePolicyAttachment>(
        "kutt-secret-policy-attchment",
        RolePolicyAttachmentArgs {
            role: app.task_execution_role.name.clone(),
            policy_arn: secret_policy.arn.clone(),
        },
        ResourceOptions::parent(&app.task_execution_role.urn),
    )?;

    let (dns_record, listener_rule) = match &inputs.dns {
        Some(dns) => {
            let record = stack.declare::<Record>(
                "kutt",
                RecordArgs::new(
                    dns.zone_id.clone(),
                    dns.domain.clone(),
                    RecordType::Cname,
                    inputs.lb_dns_name.clone(),
                ),
                ResourceOptions::new(),
            )?;
            let rule = stack.declare::<ListenerRule>(
                "kutt",
                ListenerRuleArgs {
                    listener_arn: dns.listener_arn.clone(),
                    priority: dns.listener_priority,
                    host_headers: vec![dns.domain.clone()],
                    target_group_arn: inputs.target_group_arn.clone(),
                    tags: inputs.tags.clone(),
                },
                ResourceOptions::new(),
            )?;
            (Some(record), Some(rule))
        }
        None => (None, None),
    };

    stack.export("db_address", &database.instance.address)?;
    stack.export("redis_address", &cache.cluster.primary_address())?;
    stack.export("secret_arn", &secret.arn)?;
    stack.export("service_name", &app.service.name)?;
    stack.export("task_execution_role_arn", &app.task_execution_role.arn)?;

    tracing::info!(stack = stack.name(), dns = inputs.dns.is_some(), "Assembled kutt");

    Ok(Kutt {
        database,
        cache,
        jwt_secret,
        mail_user,
        mail_policy,
        access_key,
        secret,
        secret_version,
        task_role,
        task_role_policy,
        app,
        secret_policy,
        secret_policy_attachment,
        dns_record,
        listener_rule,
    })
}

/// JSON document stored in the secret, always secret itself
fn secret_bundle(
    inputs: &KuttInputs,
    database: &PrivateDatabase,
    access_key: &AccessKey,
    jwt_secret: &RandomPassword,
) -> Output<String> {
    let entries = [
        ("RECAPTCHA_SECRET_KEY", inputs.recaptcha_secret_key.clone()),
        ("RECAPTCHA_SITE_KEY", inputs.recaptcha_site_key.clone()),
        ("DB_PASSWORD", database.instance.password.clone()),
        ("MAIL_USER", access_key.id.clone()),
        ("MAIL_PASSWORD", access_key.ses_smtp_password_v4.clone()),
        ("JWT_SECRET", jwt_secret.result.clone()),
        (
            "GOOGLE_SAFE_BROWSING_KEY",
            inputs.google_safe_browsing_key.clone(),
        ),
    ];
    let keys: Vec<&'static str> = entries.iter().map(|(key, _)| *key).collect();

    Output::all(entries.into_iter().map(|(_, value)| value))
        .try_apply(move |values| {
            let bundle: serde_json::Map<String, serde_json::Value> = keys
                .into_iter()
                .zip(values)
                .map(|(key, value)| (key.to_string(), serde_json::Value::from(value)))
                .collect();
            serde_json::to_string(&bundle).map_err(|e| OutputError::new(e.to_string()))
        })
        .as_secret()
}

fn environment(inputs: &KuttInputs, database: &PrivateDatabase, cache: &PrivateCache) -> Vec<EnvVar> {
    let app = &inputs.app;
    vec![
        EnvVar::new("DB_HOST", database.instance.address.clone()),
        EnvVar::new("DB_NAME", database.instance.db_name.clone()),
        EnvVar::new("DB_USER", database.instance.username.clone()),
        EnvVar::new("REDIS_HOST", cache.cluster.primary_address()),
        EnvVar::new("SITE_NAME", app.site_name.as_str()),
        EnvVar::new("DEFAULT_DOMAIN", app.default_domain.as_str()),
        EnvVar::new(
            "DISALLOW_ANONYMOUS_LINKS",
            app.disallow_anonymous_links.to_string(),
        ),
        EnvVar::new("MAIL_HOST", app.mail_host.as_str()),
        EnvVar::new("MAIL_PORT", app.mail_port.as_str()),
        EnvVar::new("MAIL_DEBUG", app.mail_debug.to_string()),
        EnvVar::new("MAIL_FROM", app.mail_from.as_str()),
        EnvVar::new("MAIL_LOG", app.mail_log.to_string()),
        EnvVar::new("ADMIN_EMAILS", app.admin_emails.as_str()),
    ]
}
