//! The resource graph seam and the stack context components declare into

use crate::error::Result;
use crate::output::{Output, OutputValue};
use crate::props::{PropertySet, Props};
use crate::resource::{
    ComponentResource, RegisteredResource, Resource, ResourceDeclaration, ResourceOptions,
};
use crate::state::StackState;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Function token of the built-in stack reference lookup
pub const STACK_REFERENCE_TOKEN: &str = "infra:index:stackReference";

/// Backend that accepts declarations and resolves their attributes
///
/// Implementations decide real-world creation order from the parent and
/// dependency edges; callers never observe it.
#[async_trait]
pub trait ResourceGraph: Send + Sync {
    fn project(&self) -> &str;

    fn stack(&self) -> &str;

    /// Accept a declaration and hand back its deferred outputs
    ///
    /// Must reject duplicate URNs and references to resources that were not
    /// registered earlier in the same pass.
    fn register(&self, declaration: ResourceDeclaration) -> Result<RegisteredResource>;

    /// Evaluate a data-source function
    fn invoke(&self, token: &str, args: PropertySet) -> Output<Value>;

    /// Publish a stack output
    fn export(&self, name: &str, value: Output<Value>) -> Result<()>;

    /// Resolve everything declared so far
    async fn settle(&self) -> Result<StackState>;
}

/// The stack being declared
///
/// Thin typed front over a [`ResourceGraph`]; components take a `&Stack`
/// rather than reading any ambient state.
#[derive(Clone)]
pub struct Stack {
    graph: Arc<dyn ResourceGraph>,
}

impl Stack {
    pub fn new(graph: Arc<dyn ResourceGraph>) -> Self {
        Self { graph }
    }

    /// The backend declarations are submitted to
    pub fn graph(&self) -> &Arc<dyn ResourceGraph> {
        &self.graph
    }

    pub fn name(&self) -> &str {
        self.graph.stack()
    }

    pub fn project(&self) -> &str {
        self.graph.project()
    }

    /// Declare a typed primitive resource
    pub fn declare<R: Resource>(
        &self,
        name: impl Into<String>,
        args: R::Args,
        options: ResourceOptions,
    ) -> Result<R> {
        let declaration = ResourceDeclaration::custom(R::TYPE_TOKEN, name, args, options);
        self.graph.register(declaration).map(R::from_registered)
    }

    /// Declare a component that owns the resources declared with its
    /// [`ComponentResource::child_options`]
    pub fn component(
        &self,
        type_token: &str,
        name: impl Into<String>,
        options: ResourceOptions,
    ) -> Result<ComponentResource> {
        let declaration = ResourceDeclaration::component(type_token, name, options);
        let registered = self.graph.register(declaration)?;
        Ok(ComponentResource {
            urn: registered.urn,
        })
    }

    /// Evaluate a data-source function
    pub fn invoke(&self, token: &str, args: Props) -> Output<Value> {
        self.graph.invoke(token, args.build())
    }

    /// Outputs published by another, independently run stack
    pub fn stack_reference(&self, name: &str) -> StackReference {
        let outputs = self.invoke(STACK_REFERENCE_TOKEN, Props::new().set_value("name", name));
        StackReference {
            name: name.to_string(),
            outputs,
        }
    }

    /// Publish a stack output
    pub fn export<T>(&self, name: &str, value: &Output<T>) -> Result<()>
    where
        T: OutputValue + Serialize,
    {
        let json = value.to_json();
        let json = if value.is_secret() { json.as_secret() } else { json };
        self.graph.export(name, json)
    }

    /// Resolve everything declared so far
    pub async fn settle(&self) -> Result<StackState> {
        self.graph.settle().await
    }
}

/// Outputs of another stack
#[derive(Debug, Clone)]
pub struct StackReference {
    pub name: String,
    outputs: Output<Value>,
}

impl StackReference {
    /// An output that must exist; resolution fails otherwise
    pub fn require_output<T>(&self, key: &str) -> Output<T>
    where
        T: OutputValue + DeserializeOwned,
    {
        let stack = self.name.clone();
        let key = key.to_string();
        self.outputs.try_apply(move |outputs| {
            let value = outputs.get(&key).cloned().ok_or_else(|| {
                crate::OutputError::new(format!(
                    "stack reference '{}' has no output '{}'",
                    stack, key
                ))
            })?;
            serde_json::from_value(value).map_err(|e| {
                crate::OutputError::new(format!(
                    "stack reference '{}' output '{}': {}",
                    stack, key, e
                ))
            })
        })
    }

    /// An output that may be absent; a present value of the wrong type fails
    pub fn get_output<T>(&self, key: &str) -> Output<Option<T>>
    where
        T: OutputValue + DeserializeOwned,
    {
        let stack = self.name.clone();
        let key = key.to_string();
        self.outputs.try_apply(move |outputs| {
            outputs
                .get(&key)
                .cloned()
                .map(serde_json::from_value)
                .transpose()
                .map_err(|e| {
                    crate::OutputError::new(format!(
                        "stack reference '{}' output '{}': {}",
                        stack, key, e
                    ))
                })
        })
    }
}
