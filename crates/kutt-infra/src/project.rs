//! Stack file loading and local backend wiring

use crate::assembly::{KuttInputs, assemble};
use kutt_infra_aws::AwsProvider;
use kutt_infra_cloudflare::CloudflareProvider;
use kutt_infra_config::{StackConfig, find_stack_file, project_root};
use kutt_infra_core::{LocalBackend, Plan, Stack, StackState, StateManager};
use kutt_infra_random::RandomProvider;
use std::path::PathBuf;
use std::sync::Arc;

/// A loaded stack file and where its state lives
pub struct Project {
    pub stack: String,
    pub stack_file: PathBuf,
    pub root: PathBuf,
    pub config: StackConfig,
}

/// Result of assembling the stack against saved state
pub struct Preview {
    pub previous: Option<StackState>,
    pub current: StackState,
    pub plan: Plan,
}

impl Project {
    pub fn load(stack: &str) -> anyhow::Result<Self> {
        let stack_file = find_stack_file(stack)?;
        let config = StackConfig::load(&stack_file)?;
        let root = project_root(&stack_file);
        tracing::debug!(stack, file = %stack_file.display(), "Using stack file");

        Ok(Self {
            stack: stack.to_string(),
            stack_file,
            root,
            config,
        })
    }

    pub fn state(&self) -> StateManager {
        StateManager::new(&self.root)
    }

    /// Local backend with every provider the stack uses
    pub fn backend(&self, prior: Option<&StackState>) -> LocalBackend {
        let simulation = &self.config.simulation;
        let aws = simulation.vpcs.iter().fold(
            AwsProvider::new(&simulation.account_id, &self.config.region),
            |aws, (id, cidr)| aws.with_vpc(id, cidr),
        );
        let cloudflare = self
            .config
            .dns
            .iter()
            .fold(CloudflareProvider::new(), |cloudflare, dns| {
                cloudflare.with_zone(&dns.zone_id, &dns.domain)
            });

        let backend = self.config.references.iter().fold(
            LocalBackend::new(&self.config.project, &self.stack)
                .with_provider(Arc::new(aws))
                .with_provider(Arc::new(RandomProvider::new()))
                .with_provider(Arc::new(cloudflare)),
            |backend, (name, outputs)| backend.with_stack_outputs(name, outputs.clone()),
        );

        match prior {
            Some(state) => backend.with_prior_state(state),
            None => backend,
        }
    }

    /// Assemble and settle the stack, then diff it against saved state
    pub async fn preview(&self) -> anyhow::Result<Preview> {
        let previous = self.state().load(&self.stack).await?;

        let stack = Stack::new(Arc::new(self.backend(previous.as_ref())));
        let inputs = KuttInputs::from_config(&stack, &self.config)?;
        assemble(&stack, &inputs)?;
        let current = stack.settle().await?;

        let plan = Plan::between(previous.as_ref(), &current);
        Ok(Preview {
            previous,
            current,
            plan,
        })
    }
}
