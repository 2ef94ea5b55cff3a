//! Warden CLI entry point

use anyhow::{Context, Result};
use clap::Parser;

use warden::cli::{
    commands::{action, ingest, policy, start, status},
    ActionCommands, Cli, Commands, PolicyCommands,
};
use warden::infrastructure::config::ConfigLoader;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load().context("Failed to load configuration")?,
    };

    match cli.command {
        Commands::Start { policies } => {
            start::handle_start(config, policies).await?;
        }
        Commands::Policy(policy_cmd) => match policy_cmd {
            PolicyCommands::List { file } => {
                policy::handle_list(&file, cli.json)?;
            }
            PolicyCommands::Show { file, name } => {
                policy::handle_show(&file, &name, cli.json)?;
            }
            PolicyCommands::Validate { file } => {
                policy::handle_validate(&file, cli.json)?;
            }
            PolicyCommands::Reload { file } => {
                policy::handle_reload(&config, &file, cli.json).await?;
            }
        },
        Commands::Action(action_cmd) => match action_cmd {
            ActionCommands::List {
                status,
                target,
                limit,
            } => {
                action::handle_list(&config, status, target, limit, cli.json).await?;
            }
            ActionCommands::Show { id } => {
                action::handle_show(&config, id, cli.json).await?;
            }
            ActionCommands::Cancel { id } => {
                action::handle_cancel(&config, id, cli.json).await?;
            }
        },
        Commands::Ingest { name, value, tags } => {
            ingest::handle_ingest(&config, name, value, tags, cli.json).await?;
        }
        Commands::Status => {
            status::handle_status(&config, cli.json).await?;
        }
    }

    Ok(())
}
