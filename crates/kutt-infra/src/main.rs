mod assembly;
mod commands;
mod project;
mod utils;

use clap::{Parser, Subcommand};
use project::Project;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kutt-infra")]
#[command(about = "Provision the kutt URL shortener on AWS", long_about = None)]
struct Cli {
    /// Stack name (prod, staging, ...)
    #[arg(
        short,
        long,
        global = true,
        env = "KUTT_INFRA_STACK",
        default_value = "prod"
    )]
    stack: String,

    /// Also list unchanged resources
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what `up` would change
    Preview,
    /// Create or update the stack
    Up {
        /// Apply without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete every resource of the stack
    Destroy {
        /// Destroy without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Show the stack outputs
    Outputs {
        /// Print secret outputs in plain text
        #[arg(long)]
        show_secrets: bool,
    },
    /// Check the stack file
    Validate,
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries plans and outputs; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    // No stack file needed
    if matches!(cli.command, Commands::Version) {
        println!("kutt-infra {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let project = Project::load(&cli.stack)?;

    match cli.command {
        Commands::Preview => commands::preview::handle(&project, cli.verbose).await?,
        Commands::Up { yes } => commands::up::handle(&project, yes, cli.verbose).await?,
        Commands::Destroy { yes } => commands::destroy::handle(&project, yes).await?,
        Commands::Outputs { show_secrets } => {
            commands::outputs::handle(&project, show_secrets).await?
        }
        Commands::Validate => commands::validate::handle(&project).await?,
        Commands::Version => unreachable!("Version is handled before loading the stack file"),
    }

    Ok(())
}
