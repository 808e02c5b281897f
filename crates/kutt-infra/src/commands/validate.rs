use crate::assembly::{KuttInputs, assemble};
use crate::project::Project;
use colored::Colorize;
use kutt_infra_core::Stack;
use std::sync::Arc;

pub async fn handle(project: &Project) -> anyhow::Result<()> {
    println!("{}", "Validating stack file...".blue());
    println!(
        "Stack file: {}",
        project.stack_file.display().to_string().cyan()
    );

    let config = &project.config;

    // Settling against the simulated providers checks settings, references
    // and component arguments without touching saved state
    let stack = Stack::new(Arc::new(project.backend(None)));
    let inputs = KuttInputs::from_config(&stack, config)?;
    assemble(&stack, &inputs)?;
    let settled = stack.settle().await?;

    println!("{}", "✓ Stack file is valid".green().bold());
    println!();
    println!("Summary:");
    println!("  Project: {}", config.project.cyan());
    println!("  Region: {}", config.region);
    println!("  Resources: {}", settled.resources.len());
    println!("  Config values: {}", config.config.len());
    println!("  Secrets: {}", config.secrets.len());
    for key in config.secrets.keys() {
        println!("    - {}", key);
    }
    println!("  Stack references: {}", config.references.len());
    for name in config.references.keys() {
        println!("    - {}", name.cyan());
    }
    match &config.dns {
        Some(dns) => println!(
            "  DNS: {} (listener priority {})",
            dns.domain.cyan(),
            dns.listener_priority
        ),
        None => println!("  DNS: {}", "(none)".dimmed()),
    }
    Ok(())
}
