use super::{connect, print_backups};
use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};

#[derive(Args, Debug)]
pub struct RecycleBinCommand {
    #[command(subcommand)]
    pub command: RecycleBinSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum RecycleBinSubcommands {
    /// List recycled backups
    List {
        /// Output format (table, json)
        #[arg(long)]
        format: Option<String>,
    },

    /// Permanently remove every recycled backup
    Clear {
        /// Also delete the backup files on the server
        #[arg(long)]
        delete_files: bool,
    },
}

impl RecycleBinCommand {
    pub async fn run(&self, cli: &crate::Cli) -> Result<()> {
        let api = connect(cli)?;

        match &self.command {
            RecycleBinSubcommands::List { format } => {
                let backups = api.list_recycled_backups().await?;
                match format.as_deref().unwrap_or("table") {
                    "table" => {
                        if backups.is_empty() {
                            println!("Recycle bin is empty");
                        } else {
                            print_backups(&backups);
                        }
                    }
                    "json" => println!("{}", serde_json::to_string_pretty(&backups)?),
                    other => return Err(anyhow!("Unsupported format: {}", other)),
                }
            }

            RecycleBinSubcommands::Clear { delete_files } => {
                api.clear_recycle_bin(*delete_files).await?;
                println!("Recycle bin cleared");
            }
        }

        Ok(())
    }
}
