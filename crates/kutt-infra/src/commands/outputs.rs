use crate::project::Project;
use crate::utils;
use colored::Colorize;

pub async fn handle(project: &Project, show_secrets: bool) -> anyhow::Result<()> {
    let saved = project
        .state()
        .load(&project.stack)
        .await?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Stack '{}' has no saved state. Run `kutt-infra up` first",
                project.stack
            )
        })?;

    let outputs = if show_secrets {
        saved.outputs.clone()
    } else {
        saved.masked_outputs()
    };

    println!("{}", format!("Outputs of {}:", project.stack).bold());
    for (name, value) in outputs {
        println!("  {}: {}", name.cyan(), utils::display_value(&value));
    }
    Ok(())
}
