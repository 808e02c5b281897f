use crate::project::Project;
use crate::utils;
use colored::Colorize;

pub async fn handle(project: &Project, yes: bool, verbose: bool) -> anyhow::Result<()> {
    println!("{}", "Updating stack...".blue().bold());
    utils::print_stack_file(&project.stack, &project.stack_file);

    let state = project.state();
    let lock = state.acquire_lock(&project.stack).await?;

    let preview = project.preview().await?;
    utils::print_plan(&preview.plan, verbose);

    if !preview.plan.has_changes && preview.previous.is_some() {
        lock.release().await?;
        return Ok(());
    }

    if !yes {
        println!();
        println!("{}", "Nothing was applied.".yellow());
        println!("Run with --yes to apply these changes");
        lock.release().await?;
        return Ok(());
    }

    state.save(&preview.current).await?;
    lock.release().await?;

    tracing::info!(
        stack = %project.stack,
        resources = preview.current.resources.len(),
        "Saved stack state"
    );

    println!();
    println!("{}", "✓ Stack updated".green().bold());
    println!();
    println!("{}", "Outputs:".bold());
    for (name, value) in preview.current.masked_outputs() {
        println!("  {}: {}", name.cyan(), utils::display_value(&value));
    }
    Ok(())
}
