//! In-process resource graph backend
//!
//! `LocalBackend` resolves declarations against registered
//! [`ResourceProvider`]s and records the result as a [`StackState`]. It is what
//! `preview` and `up` run against, and what the component tests assert on.

use crate::error::{GraphError, ResolutionFailure, Result};
use crate::graph::{ResourceGraph, STACK_REFERENCE_TOKEN};
use crate::output::{Output, OutputError, Resolution};
use crate::props::PropertySet;
use crate::provider::{ProviderOutputs, ResourceProvider};
use crate::resource::{RegisteredResource, ResourceDeclaration, Urn, package_of};
use crate::state::{ResourceState, StackState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::{self, BoxFuture, FutureExt, Shared};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

type SharedResolution = Shared<BoxFuture<'static, Resolution<Resolved>>>;

/// Local resource graph backend
pub struct LocalBackend {
    project: String,
    stack: String,
    providers: HashMap<String, Arc<dyn ResourceProvider>>,
    stack_outputs: HashMap<String, Map<String, Value>>,
    prior: HashMap<Urn, ResourceState>,
    journal: Mutex<Journal>,
}

#[derive(Default)]
struct Journal {
    entries: Vec<Entry>,
    declared: HashSet<Urn>,
    exports: Vec<(String, Output<Value>)>,
}

struct Entry {
    urn: Urn,
    type_token: String,
    name: String,
    custom: bool,
    parent: Option<Urn>,
    dependencies: BTreeSet<Urn>,
    resolution: SharedResolution,
}

#[derive(Debug, Clone)]
struct Resolved {
    inputs: Value,
    outputs: Value,
    secret_keys: BTreeSet<String>,
    created_at: Option<DateTime<Utc>>,
}

impl LocalBackend {
    pub fn new(project: impl Into<String>, stack: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            stack: stack.into(),
            providers: HashMap::new(),
            stack_outputs: HashMap::new(),
            prior: HashMap::new(),
            journal: Mutex::new(Journal::default()),
        }
    }

    /// Serve a package with a provider
    pub fn with_provider(mut self, provider: Arc<dyn ResourceProvider>) -> Self {
        tracing::debug!(package = provider.package(), "Registered provider");
        self.providers
            .insert(provider.package().to_string(), provider);
        self
    }

    /// Make another stack's outputs available to stack references
    pub fn with_stack_outputs(
        mut self,
        name: impl Into<String>,
        outputs: Map<String, Value>,
    ) -> Self {
        self.stack_outputs.insert(name.into(), outputs);
        self
    }

    /// Reuse outputs of unchanged resources from a previous run
    pub fn with_prior_state(mut self, state: &StackState) -> Self {
        self.prior = state
            .resources
            .iter()
            .map(|r| (r.urn.clone(), r.clone()))
            .collect();
        self
    }

    fn journal(&self) -> MutexGuard<'_, Journal> {
        self.journal
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn provider(&self, package: &str) -> Result<Arc<dyn ResourceProvider>> {
        self.providers
            .get(package)
            .cloned()
            .ok_or_else(|| GraphError::ProviderNotFound(package.to_string()))
    }

    fn resolve_custom(
        &self,
        urn: &Urn,
        properties: PropertySet,
        provider: Arc<dyn ResourceProvider>,
    ) -> SharedResolution {
        let urn = urn.clone();
        let prior = self.prior.get(&urn).cloned();
        let input_secrets = properties.secret_keys;
        let inputs = properties.value;

        async move {
            let inputs = inputs.resolve().await?;

            if let Some(prior) = prior.filter(|p| p.inputs == inputs) {
                tracing::debug!(urn = %urn, "Inputs unchanged, reusing recorded outputs");
                return Ok(Resolved {
                    inputs,
                    outputs: prior.outputs,
                    secret_keys: prior.secret_keys,
                    created_at: Some(prior.created_at),
                });
            }

            let ProviderOutputs {
                values,
                secret_keys: computed_secrets,
            } = provider
                .create(&urn, &inputs)
                .await
                .map_err(|e| OutputError::new(e.to_string()))?;
            tracing::debug!(urn = %urn, provider = provider.package(), "Resolved resource");

            let mut outputs = inputs.as_object().cloned().unwrap_or_default();
            outputs.extend(values);

            Ok(Resolved {
                inputs,
                outputs: Value::Object(outputs),
                secret_keys: input_secrets.union(&computed_secrets).cloned().collect(),
                created_at: None,
            })
        }
        .boxed()
        .shared()
    }

    fn resolve_stack_reference(&self, args: PropertySet) -> Output<Value> {
        let stacks = self.stack_outputs.clone();
        let dependencies = args.value.dependencies().clone();
        let args = args.value;
        Output::from_future(
            async move {
                let args = args.resolve().await?;
                let name = args
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| OutputError::new("stack reference requires a name"))?;
                stacks
                    .get(name)
                    .cloned()
                    .map(Value::Object)
                    .ok_or_else(|| OutputError::new(format!("unknown stack reference '{}'", name)))
            },
            dependencies,
        )
    }
}

#[async_trait]
impl ResourceGraph for LocalBackend {
    fn project(&self) -> &str {
        &self.project
    }

    fn stack(&self) -> &str {
        &self.stack
    }

    fn register(&self, declaration: ResourceDeclaration) -> Result<RegisteredResource> {
        let ResourceDeclaration {
            type_token,
            name,
            properties,
            options,
            custom,
        } = declaration;

        let urn = Urn::child(
            &self.stack,
            &self.project,
            options.parent.as_ref(),
            &type_token,
            &name,
        );

        let mut dependencies: BTreeSet<Urn> = options.depends_on.iter().cloned().collect();
        dependencies.extend(properties.value.dependencies().iter().cloned());

        let provider = if custom {
            Some(self.provider(package_of(&type_token))?)
        } else {
            None
        };

        let mut journal = self.journal();
        if journal.declared.contains(&urn) {
            return Err(GraphError::DuplicateUrn(urn));
        }
        for dependency in options.parent.iter().chain(dependencies.iter()) {
            if !journal.declared.contains(dependency) {
                return Err(GraphError::UnknownDependency {
                    urn,
                    dependency: dependency.clone(),
                });
            }
        }

        let secret_keys = properties.secret_keys.clone();
        let resolution = match provider {
            Some(provider) => self.resolve_custom(&urn, properties, provider),
            None => {
                let created_at = self.prior.get(&urn).map(|p| p.created_at);
                future::ready(Ok(Resolved {
                    inputs: Value::Object(Map::new()),
                    outputs: Value::Object(Map::new()),
                    secret_keys: BTreeSet::new(),
                    created_at,
                }))
                .boxed()
                .shared()
            }
        };

        tracing::debug!(urn = %urn, "Registered declaration");

        let outputs = {
            let resolution = resolution.clone();
            Output::from_future(
                async move { resolution.await.map(|r| r.outputs) },
                [urn.clone()],
            )
        };

        journal.declared.insert(urn.clone());
        journal.entries.push(Entry {
            urn: urn.clone(),
            type_token,
            name,
            custom,
            parent: options.parent,
            dependencies,
            resolution,
        });

        Ok(RegisteredResource {
            urn,
            outputs,
            secret_keys,
        })
    }

    fn invoke(&self, token: &str, args: PropertySet) -> Output<Value> {
        if token == STACK_REFERENCE_TOKEN {
            return self.resolve_stack_reference(args);
        }

        let provider = match self.provider(package_of(token)) {
            Ok(provider) => provider,
            Err(e) => return Output::failed(e.to_string()),
        };
        let token = token.to_string();
        let dependencies = args.value.dependencies().clone();
        let args = args.value;
        Output::from_future(
            async move {
                let args = args.resolve().await?;
                tracing::debug!(token = %token, "Invoking function");
                provider
                    .invoke(&token, &args)
                    .await
                    .map_err(|e| OutputError::new(e.to_string()))
            },
            dependencies,
        )
    }

    fn export(&self, name: &str, value: Output<Value>) -> Result<()> {
        let mut journal = self.journal();
        if journal.exports.iter().any(|(existing, _)| existing == name) {
            return Err(GraphError::DuplicateExport(name.to_string()));
        }
        journal.exports.push((name.to_string(), value));
        Ok(())
    }

    async fn settle(&self) -> Result<StackState> {
        let (entries, exports) = {
            let journal = self.journal();
            let entries: Vec<_> = journal
                .entries
                .iter()
                .map(|e| {
                    (
                        e.urn.clone(),
                        e.type_token.clone(),
                        e.name.clone(),
                        e.custom,
                        e.parent.clone(),
                        e.dependencies.clone(),
                        e.resolution.clone(),
                    )
                })
                .collect();
            (entries, journal.exports.clone())
        };

        let mut state = StackState::new(&self.project, &self.stack);
        let mut failures = Vec::new();

        for (urn, type_token, name, custom, parent, dependencies, resolution) in entries {
            match resolution.await {
                Ok(resolved) => {
                    let now = Utc::now();
                    state.resources.push(ResourceState {
                        urn,
                        resource_type: type_token,
                        name,
                        custom,
                        parent,
                        dependencies,
                        inputs: resolved.inputs,
                        outputs: resolved.outputs,
                        secret_keys: resolved.secret_keys,
                        created_at: resolved.created_at.unwrap_or(now),
                        updated_at: now,
                    });
                }
                Err(e) => failures.push(ResolutionFailure {
                    subject: urn.to_string(),
                    message: e.to_string(),
                }),
            }
        }

        let mut outputs = BTreeMap::new();
        for (name, value) in exports {
            match value.resolve().await {
                Ok(resolved) => {
                    if value.is_secret() {
                        state.secret_outputs.insert(name.clone());
                    }
                    outputs.insert(name, resolved);
                }
                Err(e) => failures.push(ResolutionFailure {
                    subject: format!("output:{}", name),
                    message: e.to_string(),
                }),
            }
        }
        state.outputs = outputs;

        if !failures.is_empty() {
            tracing::warn!("{} declaration(s) failed to resolve", failures.len());
            return Err(GraphError::Resolution(failures));
        }

        tracing::info!(
            stack = %self.stack,
            "Settled {} resources and {} outputs",
            state.resources.len(),
            state.outputs.len()
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Stack;
    use crate::props::Props;
    use crate::resource::ResourceOptions;
    use serde_json::json;

    /// Echoes inputs and computes an `id` from the URN
    struct EchoProvider;

    #[async_trait]
    impl ResourceProvider for EchoProvider {
        fn package(&self) -> &str {
            "test"
        }

        fn display_name(&self) -> &str {
            "Test"
        }

        async fn create(&self, urn: &Urn, inputs: &Value) -> Result<ProviderOutputs> {
            if inputs.get("fail").is_some() {
                return Err(GraphError::ProviderFailed(format!("{} rejected", urn.name())));
            }
            Ok(ProviderOutputs::new()
                .with("id", format!("id-{}", urn.name()))
                .with_secret("token", "t0ken"))
        }

        async fn invoke(&self, _token: &str, args: &Value) -> Result<Value> {
            Ok(json!({ "echo": args }))
        }
    }

    fn backend() -> LocalBackend {
        LocalBackend::new("kutt", "test").with_provider(Arc::new(EchoProvider))
    }

    fn thing(
        stack: &Stack,
        name: &str,
        props: Props,
        options: ResourceOptions,
    ) -> RegisteredResource {
        stack
            .graph()
            .register(ResourceDeclaration::custom("test:index:Thing", name, props, options))
            .unwrap()
    }

    #[tokio::test]
    async fn test_outputs_flow_between_declarations() {
        let stack = Stack::new(Arc::new(backend()));
        let first = thing(
            &stack,
            "first",
            Props::new().set_value("size", 1),
            ResourceOptions::new(),
        );
        let id: Output<String> = first.output("id");
        let second = thing(
            &stack,
            "second",
            Props::new().set("first_id", &id),
            ResourceOptions::new(),
        );

        let state = stack.settle().await.unwrap();
        assert_eq!(state.resources.len(), 2);

        let recorded = state.get_resource(&second.urn).unwrap();
        assert_eq!(recorded.inputs["first_id"], "id-first");
        assert!(recorded.dependencies.contains(&first.urn));
        assert!(recorded.secret_keys.contains("token"));
    }

    #[tokio::test]
    async fn test_unknown_dependency_is_rejected() {
        let stack = Stack::new(Arc::new(backend()));
        let stranger = Urn::new("test", "kutt", "test:index:Thing", "never-declared");
        let result = stack.graph().register(ResourceDeclaration::custom(
            "test:index:Thing",
            "orphan",
            Props::new(),
            ResourceOptions::parent(&stranger),
        ));

        assert!(matches!(result, Err(GraphError::UnknownDependency { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_urn_is_rejected() {
        let stack = Stack::new(Arc::new(backend()));
        thing(&stack, "twin", Props::new(), ResourceOptions::new());
        let result = stack.graph().register(ResourceDeclaration::custom(
            "test:index:Thing",
            "twin",
            Props::new(),
            ResourceOptions::new(),
        ));

        assert!(matches!(result, Err(GraphError::DuplicateUrn(_))));
    }

    #[tokio::test]
    async fn test_missing_provider_is_rejected() {
        let stack = Stack::new(Arc::new(backend()));
        let result = stack.graph().register(ResourceDeclaration::custom(
            "aws:ec2/securityGroup:SecurityGroup",
            "sg",
            Props::new(),
            ResourceOptions::new(),
        ));

        assert!(matches!(result, Err(GraphError::ProviderNotFound(p)) if p == "aws"));
    }

    #[tokio::test]
    async fn test_failures_abort_dependent_subgraph() {
        let stack = Stack::new(Arc::new(backend()));
        let broken = thing(
            &stack,
            "broken",
            Props::new().set_value("fail", true),
            ResourceOptions::new(),
        );
        let id: Output<String> = broken.output("id");
        thing(&stack, "dependent", Props::new().set("id", &id), ResourceOptions::new());
        thing(&stack, "independent", Props::new(), ResourceOptions::new());

        match stack.settle().await {
            Err(GraphError::Resolution(failures)) => {
                assert_eq!(failures.len(), 2);
                assert!(failures.iter().all(|f| f.message.contains("broken rejected")));
            }
            Err(other) => panic!("expected resolution failure, got {}", other),
            Ok(_) => panic!("expected resolution failure"),
        }
    }

    #[tokio::test]
    async fn test_prior_outputs_are_reused_when_inputs_match() {
        let first_run = {
            let stack = Stack::new(Arc::new(backend()));
            thing(
                &stack,
                "kept",
                Props::new().set_value("size", 1),
                ResourceOptions::new(),
            );
            stack.settle().await.unwrap()
        };

        let mut edited = first_run.clone();
        edited.resources[0].outputs["id"] = json!("id-from-last-run");

        let stack = Stack::new(Arc::new(backend().with_prior_state(&edited)));
        let kept = thing(
            &stack,
            "kept",
            Props::new().set_value("size", 1),
            ResourceOptions::new(),
        );
        let id: Output<String> = kept.output("id");
        assert_eq!(id.resolve().await.unwrap(), "id-from-last-run");

        let stack = Stack::new(Arc::new(backend().with_prior_state(&edited)));
        let changed = thing(
            &stack,
            "kept",
            Props::new().set_value("size", 2),
            ResourceOptions::new(),
        );
        let id: Output<String> = changed.output("id");
        assert_eq!(id.resolve().await.unwrap(), "id-kept");
    }

    #[tokio::test]
    async fn test_stack_reference_and_exports() {
        let mut vpc_outputs = Map::new();
        vpc_outputs.insert("vpc_id".to_string(), json!("vpc-0abc"));
        let stack = Stack::new(Arc::new(
            backend().with_stack_outputs("jaxxstorm/vpc/test", vpc_outputs),
        ));

        let vpc = stack.stack_reference("jaxxstorm/vpc/test");
        let vpc_id: Output<String> = vpc.require_output("vpc_id");
        let missing: Output<Option<String>> = vpc.get_output("nat_gateway_id");
        assert_eq!(vpc_id.resolve().await.unwrap(), "vpc-0abc");
        assert_eq!(missing.resolve().await.unwrap(), None);

        stack.export("vpc_id", &vpc_id).unwrap();
        stack.export("token", &Output::secret("abc".to_string())).unwrap();
        assert!(matches!(
            stack.export("vpc_id", &vpc_id),
            Err(GraphError::DuplicateExport(_))
        ));

        let state = stack.settle().await.unwrap();
        assert_eq!(state.outputs["vpc_id"], "vpc-0abc");
        assert_eq!(state.masked_outputs()["token"], "[secret]");
    }

    #[tokio::test]
    async fn test_stack_reference_type_mismatch_is_reported() {
        let mut ecs_outputs = Map::new();
        ecs_outputs.insert("cluster_arn".to_string(), json!(42));
        let stack = Stack::new(Arc::new(
            backend().with_stack_outputs("jaxxstorm/ecs/test", ecs_outputs),
        ));

        let ecs = stack.stack_reference("jaxxstorm/ecs/test");
        let optional: Output<Option<String>> = ecs.get_output("cluster_arn");
        let required: Output<String> = ecs.require_output("cluster_arn");

        for error in [
            optional.resolve().await.unwrap_err(),
            required.resolve().await.unwrap_err(),
        ] {
            assert!(error.to_string().contains("output 'cluster_arn'"), "{}", error);
            assert!(!error.to_string().contains("has no output"));
        }
    }
}
