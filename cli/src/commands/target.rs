use super::{connect, print_backups};
use anyhow::{Result, anyhow};
use backupchan_core::{
    BackupRecycleAction, BackupRecycleCriteria, BackupTarget, BackupType, TargetOptions,
};
use clap::{Args, Subcommand};
use tracing::info;

#[derive(Args, Debug)]
pub struct TargetCommand {
    #[command(subcommand)]
    pub command: TargetSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum TargetSubcommands {
    /// List all targets on the server
    List {
        /// Output format (table, json)
        #[arg(long)]
        format: Option<String>,
    },

    /// Show a target and its backups
    Show {
        /// Target ID
        id: String,

        /// Output format (table, json)
        #[arg(long)]
        format: Option<String>,
    },

    /// Create a new target
    New {
        /// Display name
        name: String,

        /// Backup type (single, multi)
        #[arg(long = "type", default_value = "multi")]
        backup_type: BackupType,

        /// Recycle criteria (age, count, none)
        #[arg(long, default_value = "none")]
        recycle_criteria: BackupRecycleCriteria,

        /// Days (age) or number of backups (count) to keep
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        recycle_value: i64,

        /// Recycle action (recycle, delete)
        #[arg(long, default_value = "recycle")]
        recycle_action: BackupRecycleAction,

        /// Directory on the server where backups are stored
        #[arg(long)]
        location: String,

        /// File name template for stored backups
        #[arg(long)]
        name_template: String,

        /// Deduplicate identical uploads
        #[arg(long)]
        deduplicate: bool,
    },

    /// Change settings of an existing target; unset flags keep their value
    Edit {
        /// Target ID
        id: String,

        #[command(flatten)]
        changes: TargetChanges,
    },

    /// Delete a target
    Delete {
        /// Target ID
        id: String,

        /// Also delete the backup files on the server
        #[arg(long)]
        delete_files: bool,
    },

    /// Delete every backup of a target, keeping the target
    DeleteBackups {
        /// Target ID
        id: String,

        /// Also delete the backup files on the server
        #[arg(long)]
        delete_files: bool,
    },
}

/// Settings given to `target edit`. The backup type is fixed at creation.
#[derive(Args, Debug, Default)]
pub struct TargetChanges {
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub recycle_criteria: Option<BackupRecycleCriteria>,

    #[arg(long, allow_negative_numbers = true)]
    pub recycle_value: Option<i64>,

    #[arg(long)]
    pub recycle_action: Option<BackupRecycleAction>,

    #[arg(long)]
    pub location: Option<String>,

    #[arg(long)]
    pub name_template: Option<String>,

    #[arg(long)]
    pub deduplicate: Option<bool>,
}

impl TargetCommand {
    pub async fn run(&self, cli: &crate::Cli) -> Result<()> {
        let api = connect(cli)?;

        match &self.command {
            TargetSubcommands::List { format } => {
                let targets = api.list_targets().await?;
                match format.as_deref().unwrap_or("table") {
                    "table" => {
                        if targets.is_empty() {
                            println!("No targets found");
                        } else {
                            print_targets(&targets);
                        }
                    }
                    "json" => println!("{}", serde_json::to_string_pretty(&targets)?),
                    other => return Err(anyhow!("Unsupported format: {}", other)),
                }
            }

            TargetSubcommands::Show { id, format } => {
                let details = api.get_target_details(id).await?;
                match format.as_deref().unwrap_or("table") {
                    "table" => {
                        print_target(&details.target);
                        println!();
                        if details.backups.is_empty() {
                            println!("No backups");
                        } else {
                            print_backups(&details.backups);
                        }
                    }
                    "json" => println!("{}", serde_json::to_string_pretty(&details)?),
                    other => return Err(anyhow!("Unsupported format: {}", other)),
                }
            }

            TargetSubcommands::New {
                name,
                backup_type,
                recycle_criteria,
                recycle_value,
                recycle_action,
                location,
                name_template,
                deduplicate,
            } => {
                let options = TargetOptions::new(name, *backup_type, location, name_template)
                    .with_recycling(*recycle_criteria, *recycle_value, *recycle_action)
                    .with_deduplication(*deduplicate);
                let id = api.new_target(&options).await?;
                println!("{}", id);
            }

            TargetSubcommands::Edit { id, changes } => {
                let current = api.get_target(id).await?;
                let options = edited_options(current, changes);
                api.edit_target(id, &options).await?;
                println!("Updated target {}", id);
            }

            TargetSubcommands::Delete { id, delete_files } => {
                info!("Deleting target {}", id);
                api.delete_target(id, *delete_files).await?;
                println!("Deleted target {}", id);
            }

            TargetSubcommands::DeleteBackups { id, delete_files } => {
                api.delete_target_backups(id, *delete_files).await?;
                println!("Deleted all backups of target {}", id);
            }
        }

        Ok(())
    }
}

/// Options for an edit of `current`: given flags win, everything else keeps
/// its current value.
fn edited_options(current: BackupTarget, changes: &TargetChanges) -> TargetOptions {
    TargetOptions {
        name: changes.name.clone().unwrap_or(current.name),
        backup_type: current.backup_type,
        recycle_criteria: changes.recycle_criteria.unwrap_or(current.recycle_criteria),
        recycle_value: changes.recycle_value.unwrap_or(current.recycle_value),
        recycle_action: changes.recycle_action.unwrap_or(current.recycle_action),
        location: changes.location.clone().unwrap_or(current.location),
        name_template: changes.name_template.clone().unwrap_or(current.name_template),
        deduplicate: changes.deduplicate.unwrap_or(current.deduplicate),
    }
}

fn recycle_summary(target: &BackupTarget) -> String {
    match target.recycle_criteria {
        BackupRecycleCriteria::None => "never".to_string(),
        BackupRecycleCriteria::Age => {
            format!("{} after {} days", target.recycle_action, target.recycle_value)
        }
        BackupRecycleCriteria::Count => {
            format!("{} beyond {} backups", target.recycle_action, target.recycle_value)
        }
    }
}

fn print_targets(targets: &[BackupTarget]) {
    println!(
        "{:<12} {:<24} {:<7} {:<26} {}",
        "ID", "Name", "Type", "Recycle", "Location"
    );
    println!("{:-<100}", "");

    for target in targets {
        println!(
            "{:<12} {:<24} {:<7} {:<26} {}",
            target.short_id(),
            target.name,
            target.backup_type,
            recycle_summary(target),
            target.location
        );
    }
}

fn print_target(target: &BackupTarget) {
    println!("ID:            {}", target.id);
    println!("Name:          {}", target.name);
    println!("Type:          {}", target.backup_type);
    println!("Recycle:       {}", recycle_summary(target));
    println!("Location:      {}", target.location);
    println!("Name template: {}", target.name_template);
    println!("Deduplicate:   {}", if target.deduplicate { "yes" } else { "no" });
}
