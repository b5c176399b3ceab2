use anyhow::Result;
use clap::Parser;

use artifact_transform::cli::{Cli, Commands};
use artifact_transform::commands;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Dispatch to appropriate command handler; each initializes logging
    // once its configuration is known
    match cli.command {
        Commands::Run(args) => commands::run::run(args).await,
        Commands::Identify(args) => commands::identify::run(args),
        Commands::Fingerprint(args) => commands::fingerprint::run(args),
        Commands::List => commands::list::run(),
        Commands::Config(args) => commands::config::run(args.command),
    }
}
