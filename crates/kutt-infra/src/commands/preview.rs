use crate::project::Project;
use crate::utils;
use colored::Colorize;

pub async fn handle(project: &Project, verbose: bool) -> anyhow::Result<()> {
    println!("{}", "Previewing changes...".blue());
    utils::print_stack_file(&project.stack, &project.stack_file);

    let preview = project.preview().await?;
    utils::print_plan(&preview.plan, verbose);

    if preview.plan.has_changes {
        println!();
        println!("Run {} to apply", "kutt-infra up --yes".cyan());
    }
    Ok(())
}
