//! Resource declarations and handles

use crate::output::{Output, OutputValue};
use crate::props::{IntoProperties, PropertySet};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Unique name of a declared resource
///
/// Format: `urn:infra:{stack}::{project}::{qualified type}::{name}`, where the
/// qualified type is the owner's qualified type and the resource's own type
/// token joined by `$`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Urn(String);

impl Urn {
    pub fn new(stack: &str, project: &str, qualified_type: &str, name: &str) -> Self {
        Self(format!(
            "urn:infra:{}::{}::{}::{}",
            stack, project, qualified_type, name
        ))
    }

    /// Build the URN of a resource owned by `parent`
    pub fn child(
        stack: &str,
        project: &str,
        parent: Option<&Urn>,
        type_token: &str,
        name: &str,
    ) -> Self {
        match parent {
            Some(parent) => {
                let qualified = format!("{}${}", parent.qualified_type(), type_token);
                Self::new(stack, project, &qualified, name)
            }
            None => Self::new(stack, project, type_token, name),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn segments(&self) -> Vec<&str> {
        self.0.splitn(4, "::").collect()
    }

    /// Owner chain and type, e.g. `kutt:index:WebApp$aws:ecs/service:Service`
    pub fn qualified_type(&self) -> &str {
        self.segments().get(2).copied().unwrap_or_default()
    }

    /// The resource's own type token
    pub fn type_token(&self) -> &str {
        let qualified = self.qualified_type();
        qualified.rsplit('$').next().unwrap_or(qualified)
    }

    /// The logical name given at declaration time
    pub fn name(&self) -> &str {
        self.segments().get(3).copied().unwrap_or_default()
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ownership and ordering links of a declaration
#[derive(Debug, Clone, Default)]
pub struct ResourceOptions {
    /// Logical owner (at most one)
    pub parent: Option<Urn>,

    /// Additional resources that must exist first
    pub depends_on: Vec<Urn>,
}

impl ResourceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parent(urn: &Urn) -> Self {
        Self {
            parent: Some(urn.clone()),
            depends_on: Vec::new(),
        }
    }

    pub fn with_dependency(mut self, urn: &Urn) -> Self {
        self.depends_on.push(urn.clone());
        self
    }
}

/// A resource submitted to the graph backend
#[derive(Debug)]
pub struct ResourceDeclaration {
    /// Type token, e.g. `aws:ec2/securityGroup:SecurityGroup`
    pub type_token: String,

    /// Logical name
    pub name: String,

    /// Desired properties
    pub properties: PropertySet,

    /// Owner and explicit dependencies
    pub options: ResourceOptions,

    /// `false` for components, which group children and have no provider
    pub custom: bool,
}

impl ResourceDeclaration {
    pub fn custom(
        type_token: impl Into<String>,
        name: impl Into<String>,
        properties: impl IntoProperties,
        options: ResourceOptions,
    ) -> Self {
        Self {
            type_token: type_token.into(),
            name: name.into(),
            properties: properties.into_properties(),
            options,
            custom: true,
        }
    }

    pub fn component(
        type_token: impl Into<String>,
        name: impl Into<String>,
        options: ResourceOptions,
    ) -> Self {
        Self {
            type_token: type_token.into(),
            name: name.into(),
            properties: PropertySet::empty(),
            options,
            custom: false,
        }
    }

    /// Package the type token belongs to (`aws`, `random`, ...)
    pub fn package(&self) -> &str {
        package_of(&self.type_token)
    }
}

/// Package prefix of a type or function token
pub fn package_of(token: &str) -> &str {
    token.split(':').next().unwrap_or(token)
}

/// Handle returned by the backend for a registered declaration
#[derive(Debug, Clone)]
pub struct RegisteredResource {
    pub urn: Urn,

    /// Inputs merged with provider-computed attributes
    pub outputs: Output<Value>,

    /// Input keys that were declared secret
    pub secret_keys: BTreeSet<String>,
}

impl RegisteredResource {
    /// A top-level attribute
    pub fn output<T>(&self, key: &str) -> Output<T>
    where
        T: OutputValue + DeserializeOwned,
    {
        let output = self.outputs.json_pointer(&format!("/{}", key));
        if self.secret_keys.contains(key) {
            output.as_secret()
        } else {
            output
        }
    }

    /// A nested attribute addressed by JSON pointer
    pub fn output_at<T>(&self, pointer: &str) -> Output<T>
    where
        T: OutputValue + DeserializeOwned,
    {
        self.outputs.json_pointer(pointer)
    }
}

/// A typed primitive resource
pub trait Resource: Sized {
    const TYPE_TOKEN: &'static str;

    type Args: IntoProperties;

    fn from_registered(resource: RegisteredResource) -> Self;
}

/// Handle of a registered component
#[derive(Debug, Clone)]
pub struct ComponentResource {
    pub urn: Urn,
}

impl ComponentResource {
    /// Options for a child owned by this component
    pub fn child_options(&self) -> ResourceOptions {
        ResourceOptions::parent(&self.urn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urn_segments() {
        let component = Urn::new("prod", "kutt", "kutt:index:WebApp", "kutt");
        let service = Urn::child(
            "prod",
            "kutt",
            Some(&component),
            "aws:ecs/service:Service",
            "kutt",
        );

        assert_eq!(
            service.as_str(),
            "urn:infra:prod::kutt::kutt:index:WebApp$aws:ecs/service:Service::kutt"
        );
        assert_eq!(service.type_token(), "aws:ecs/service:Service");
        assert_eq!(service.name(), "kutt");
        assert_eq!(component.qualified_type(), "kutt:index:WebApp");
    }

    #[test]
    fn test_package_of() {
        assert_eq!(package_of("aws:ec2/getVpc:getVpc"), "aws");
        assert_eq!(package_of("random:index/randomPassword:RandomPassword"), "random");
    }
}
