use super::{connect, human_size};
use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Args, Debug)]
pub struct BackupCommand {
    #[command(subcommand)]
    pub command: BackupSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum BackupSubcommands {
    /// Upload a file as a new backup of a target
    Upload {
        /// Target ID
        target: String,

        /// File to upload
        file: PathBuf,

        /// Mark the backup as manual rather than scheduled
        #[arg(long)]
        manual: bool,
    },

    /// Delete a backup
    Delete {
        /// Backup ID
        id: String,

        /// Also delete the backup file on the server
        #[arg(long)]
        delete_files: bool,
    },

    /// Move a backup into the recycle bin
    Recycle {
        /// Backup ID
        id: String,
    },

    /// Take a backup back out of the recycle bin
    Restore {
        /// Backup ID
        id: String,
    },
}

impl BackupCommand {
    pub async fn run(&self, cli: &crate::Cli) -> Result<()> {
        let api = connect(cli)?;

        match &self.command {
            BackupSubcommands::Upload { target, file, manual } => {
                if !file.is_file() {
                    return Err(anyhow!("Not a file: {}", file.display()));
                }
                let size = file.metadata()?.len();
                info!("Uploading {} ({}) to target {}", file.display(), human_size(size), target);

                let pb = ProgressBar::new_spinner();
                pb.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
                );
                pb.set_message(format!("Uploading {}...", file.display()));
                pb.enable_steady_tick(Duration::from_millis(100));

                let result = api.upload_backup_file(target, file, *manual).await;
                pb.finish_and_clear();

                let id = result?;
                println!("{}", id);
            }

            BackupSubcommands::Delete { id, delete_files } => {
                api.delete_backup(id, *delete_files).await?;
                println!("Deleted backup {}", id);
            }

            BackupSubcommands::Recycle { id } => {
                api.recycle_backup(id, true).await?;
                println!("Moved backup {} to the recycle bin", id);
            }

            BackupSubcommands::Restore { id } => {
                api.recycle_backup(id, false).await?;
                println!("Restored backup {} from the recycle bin", id);
            }
        }

        Ok(())
    }
}
