use crate::project::Project;
use crate::utils;
use colored::Colorize;
use kutt_infra_core::Plan;

pub async fn handle(project: &Project, yes: bool) -> anyhow::Result<()> {
    println!("{}", "Destroying stack...".yellow().bold());
    utils::print_stack_file(&project.stack, &project.stack_file);

    let state = project.state();
    let lock = state.acquire_lock(&project.stack).await?;

    let Some(saved) = state.load(&project.stack).await? else {
        println!("{}", "No saved state; nothing to destroy.".dimmed());
        lock.release().await?;
        return Ok(());
    };

    let plan = Plan::destroy(&saved);
    utils::print_plan(&plan, false);

    if !yes {
        println!();
        println!(
            "{}",
            "Warning: every resource above will be deleted.".yellow()
        );
        println!("Run with --yes to destroy the stack");
        lock.release().await?;
        return Ok(());
    }

    state.remove(&project.stack).await?;
    lock.release().await?;

    tracing::info!(stack = %project.stack, resources = saved.resources.len(), "Destroyed stack");
    println!();
    println!("{}", "✓ Stack destroyed".green().bold());
    Ok(())
}
