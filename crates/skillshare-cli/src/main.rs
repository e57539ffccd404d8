//! skillshare CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use skillshare_cli::cmd;
use skillshare_cli::{BackupCommands, CacheCommands, Cli, Commands, TargetCommands, config_path};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config_path = config_path(&cli);

    match cli.command {
        Commands::Init { source } => cmd::init::init(&config_path, &source),
        Commands::Sync {
            dry_run,
            force,
            target,
        } => cmd::sync::sync(&config_path, dry_run, force, target.as_deref()),
        Commands::Status => cmd::status::status(&config_path),
        Commands::Diff => cmd::diff::diff(&config_path),
        Commands::Collect {
            apply,
            force,
            target,
        } => cmd::collect::collect(&config_path, apply, force, target.as_deref()),
        Commands::Backup { command } => match command {
            BackupCommands::Create { target } => {
                cmd::backup::create(&config_path, target.as_deref())
            }
            BackupCommands::List => cmd::backup::list(),
            BackupCommands::Cleanup { keep } => cmd::backup::cleanup(keep),
        },
        Commands::Restore {
            backup,
            target,
            force,
        } => cmd::restore::restore(&config_path, &backup, &target, force),
        Commands::Target { command } => match command {
            TargetCommands::Add { name, path, mode } => {
                cmd::target::add(&config_path, &name, &path, mode.as_deref())
            }
            TargetCommands::Remove { name } => cmd::target::remove(&config_path, &name),
            TargetCommands::List => cmd::target::list(&config_path),
        },
        Commands::Config { path } => cmd::config::show(&config_path, path),
        Commands::Cache { command } => match command {
            CacheCommands::Info => cmd::cache::info(),
            CacheCommands::Clear => cmd::cache::clear(),
        },
        Commands::Serve { port } => cmd::serve::serve(&config_path, port).await,
        Commands::Completions { shell } => {
            cmd::completions::completions(shell);
            Ok(())
        }
    }
}
