//! IAM: roles, users, policies and their attachments

use super::Tags;
use kutt_infra_core::{
    IntoProperties, Output, OutputError, PropertySet, Props, RegisteredResource, Resource, Urn,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ROLE: &str = "aws:iam/role:Role";
pub const ROLE_POLICY_ATTACHMENT: &str = "aws:iam/rolePolicyAttachment:RolePolicyAttachment";
pub const POLICY: &str = "aws:iam/policy:Policy";
pub const USER: &str = "aws:iam/user:User";
pub const USER_POLICY_ATTACHMENT: &str = "aws:iam/userPolicyAttachment:UserPolicyAttachment";
pub const ACCESS_KEY: &str = "aws:iam/accessKey:AccessKey";

/// AWS managed policies
pub mod managed_policy {
    pub const AMAZON_ECS_FULL_ACCESS: &str = "arn:aws:iam::aws:policy/AmazonECS_FullAccess";
    pub const AMAZON_SES_FULL_ACCESS: &str = "arn:aws:iam::aws:policy/AmazonSESFullAccess";
    pub const AMAZON_ECS_TASK_EXECUTION_ROLE_POLICY: &str =
        "arn:aws:iam::aws:policy/service-role/AmazonECSTaskExecutionRolePolicy";
}

/// An IAM policy document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub effect: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Value>,
    pub action: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Vec<String>>,
}

impl PolicyDocument {
    /// Trust policy letting a service principal assume the role
    pub fn assume_role(version: &str, service: &str) -> Self {
        Self {
            version: version.to_string(),
            statement: vec![PolicyStatement {
                sid: Some(String::new()),
                effect: "Allow".to_string(),
                principal: Some(serde_json::json!({ "Service": service })),
                action: Value::from("sts:AssumeRole"),
                resource: None,
            }],
        }
    }

    /// Allow `actions` on `resources`
    pub fn allow(version: &str, actions: &[&str], resources: Vec<String>) -> Self {
        Self {
            version: version.to_string(),
            statement: vec![PolicyStatement {
                sid: None,
                effect: "Allow".to_string(),
                principal: None,
                action: Value::from(actions.to_vec()),
                resource: Some(resources),
            }],
        }
    }
}

/// Render a deferred policy document as the JSON string IAM expects
pub fn policy_json(document: &Output<PolicyDocument>) -> Output<String> {
    document.try_apply(|document| {
        serde_json::to_string(&document).map_err(|e| OutputError::new(e.to_string()))
    })
}

#[derive(Debug, Clone)]
pub struct RoleArgs {
    pub assume_role_policy: Output<PolicyDocument>,
    pub tags: Tags,
}

impl IntoProperties for RoleArgs {
    fn into_properties(self) -> PropertySet {
        Props::new()
            .set("assume_role_policy", &policy_json(&self.assume_role_policy))
            .set_value("tags", &self.tags)
            .build()
    }
}

#[derive(Debug, Clone)]
pub struct Role {
    pub urn: Urn,
    pub id: Output<String>,
    pub name: Output<String>,
    pub arn: Output<String>,
}

impl Resource for Role {
    const TYPE_TOKEN: &'static str = ROLE;

    type Args = RoleArgs;

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
pub struct RolePolicyAttachmentArgs {
    pub role: Output<String>,
    pub policy_arn: Output<String>,
}

impl IntoProperties for RolePolicyAttachmentArgs {
    fn into_properties(self) -> PropertySet {
        Props::new()
            .set("role", &self.role)
            .set("policy_arn", &self.policy_arn)
            .build()
    }
}

#[derive(Debug, Clone)]
pub struct RolePolicyAttachment {
    pub urn: Urn,
    pub id: Output<String>,
}

impl Resource for RolePolicyAttachment {
    const TYPE_TOKEN: &'static str = ROLE_POLICY_ATTACHMENT;

    type Args = RolePolicyAttachmentArgs;

    fn from_registered(resource: RegisteredResource) -> Self {
        Self {
            id: resource.output("id"),
            urn: resource.urn,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PolicyArgs {
    pub description: Option<String>,
    pub policy: Output<PolicyDocument>,
    pub tags: Tags,
}

impl IntoProperties for PolicyArgs {
    fn into_properties(self) -> PropertySet {
        let props = Props::new().set("policy", &policy_json(&self.policy));
        let props = match &self.description {
            Some(description) => props.set_value("description", description),
            None => props,
        };
        props.set_value("tags", &self.tags).build()
    }
}

#[derive(Debug, Clone)]
pub struct Policy {
    pub urn: Urn,
    pub id: Output<String>,
    pub name: Output<String>,
    pub arn: Output<String>,
}

impl Resource for Policy {
    const TYPE_TOKEN: &'static str = POLICY;

    type Args = PolicyArgs;

    fn from_registered(resource: RegisteredResource) -> Self {
        Self {
            id: resource.output("id"),
            name: resource.output("name"),
            arn: resource.output("arn"),
            urn: resource.urn,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserArgs {
    pub tags: Tags,
}

impl IntoProperties for UserArgs {
    fn into_properties(self) -> PropertySet {
        Props::new().set_value("tags", &self.tags).build()
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub urn: Urn,
    pub name: Output<String>,
    pub arn: Output<String>,
}

impl Resource for User {
    const TYPE_TOKEN: &'static str = USER;

    type Args = UserArgs;

    fn from_registered(resource: RegisteredResource) -> Self {
        Self {
            name: resource.output("name"),
            arn: resource.output("arn"),
            urn: resource.urn,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserPolicyAttachmentArgs {
    pub user: Output<String>,
    pub policy_arn: Output<String>,
}

impl IntoProperties for UserPolicyAttachmentArgs {
    fn into_properties(self) -> PropertySet {
        Props::new()
            .set("user", &self.user)
            .set("policy_arn", &self.policy_arn)
            .build()
    }
}

#[derive(Debug, Clone)]
pub struct UserPolicyAttachment {
    pub urn: Urn,
    pub id: Output<String>,
}

impl Resource for UserPolicyAttachment {
    const TYPE_TOKEN: &'static str = USER_POLICY_ATTACHMENT;

    type Args = UserPolicyAttachmentArgs;

    fn from_registered(resource: RegisteredResource) -> Self {
        Self {
            id: resource.output("id"),
            urn: resource.urn,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccessKeyArgs {
    pub user: Output<String>,
}

impl IntoProperties for AccessKeyArgs {
    fn into_properties(self) -> PropertySet {
        Props::new().set("user", &self.user).build()
    }
}

/// Access key of an IAM user
#[derive(Debug, Clone)]
pub struct AccessKey {
    pub urn: Urn,

    /// The access key id, also the SMTP user name
    pub id: Output<String>,
    pub secret: Output<String>,

    /// Secret converted into an SES SMTP password
    pub ses_smtp_password_v4: Output<String>,
}

impl Resource for AccessKey {
    const TYPE_TOKEN: &'static str = ACCESS_KEY;

    type Args = AccessKeyArgs;

    fn from_registered(resource: RegisteredResource) -> Self {
        Self {
            id: resource.output("id"),
            secret: resource.output::<String>("secret").as_secret(),
            ses_smtp_password_v4: resource
                .output::<String>("ses_smtp_password_v4")
                .as_secret(),
            urn: resource.urn,
        }
    }
}
