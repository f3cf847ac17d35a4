mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{
    backup::BackupCommand, config::ConfigCommand, recycle_bin::RecycleBinCommand,
    target::TargetCommand,
};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(
    name = "backupchan",
    version,
    about = "Command-line client for a backupchan server",
    long_about = "Manage backup targets, uploads and the recycle bin of a backupchan server"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, env = "BACKUPCHAN_HOST", help = "Server host or URL")]
    host: Option<String>,

    #[arg(long, env = "BACKUPCHAN_PORT", help = "Server port")]
    port: Option<u16>,

    #[arg(long, env = "BACKUPCHAN_API_KEY", hide_env_values = true, help = "API key")]
    api_key: Option<String>,

    #[arg(long, env = "BACKUPCHAN_CONFIG", help = "Path to the config file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Request timeout in seconds")]
    timeout: Option<u64>,

    #[arg(short, long, help = "Enable verbose output")]
    verbose: bool,

    #[arg(short, long, help = "Enable quiet mode")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Manage backup targets")]
    Target(TargetCommand),

    #[command(about = "Upload, delete and recycle backups")]
    Backup(BackupCommand),

    #[command(about = "Inspect or empty the recycle bin")]
    RecycleBin(RecycleBinCommand),

    #[command(about = "Create or show the client config file")]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    debug!("Starting backupchan");

    match cli.command {
        Commands::Target(ref cmd) => cmd.run(&cli).await,
        Commands::Backup(ref cmd) => cmd.run(&cli).await,
        Commands::RecycleBin(ref cmd) => cmd.run(&cli).await,
        Commands::Config(ref cmd) => cmd.run(&cli),
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let level = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(format!(
            "backupchan={level},backupchan_core={level}"
        )))
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Setting default subscriber failed");
}
