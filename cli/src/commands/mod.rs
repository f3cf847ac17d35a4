pub mod backup;
pub mod config;
pub mod recycle_bin;
pub mod target;

use crate::Cli;
use crate::config::ClientConfig;
use anyhow::{Result, anyhow};
use backupchan_core::{Api, Backup};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::debug;

pub(crate) fn config_path(cli: &Cli) -> Result<PathBuf> {
    cli.config
        .clone()
        .or_else(ClientConfig::default_path)
        .ok_or_else(|| anyhow!("Cannot determine config directory; pass --config"))
}

/// Settings given on the command line or through the environment.
pub(crate) fn flag_config(cli: &Cli) -> ClientConfig {
    ClientConfig {
        host: cli.host.clone(),
        port: cli.port,
        api_key: cli.api_key.clone(),
        timeout_secs: cli.timeout,
    }
}

/// Builds a client from the config file, env vars and flags, prompting for
/// the API key when none of them has one.
pub(crate) fn connect(cli: &Cli) -> Result<Api> {
    let path = config_path(cli)?;
    debug!("Loading config from {}", path.display());
    let settings = ClientConfig::load(&path)?.merge(flag_config(cli)).resolve()?;

    let api_key = settings
        .api_key
        .or_else(|| {
            print!("Enter API key: ");
            io::stdout().flush().ok()?;
            rpassword::read_password().ok()
        })
        .ok_or_else(|| anyhow!("API key required"))?;

    Ok(Api::with_timeout(
        &settings.host,
        settings.port,
        &api_key,
        settings.timeout,
    )?)
}

pub(crate) fn print_backups(backups: &[Backup]) {
    println!(
        "{:<12} {:<12} {:<20} {:<8} {:<9} {}",
        "ID", "Target", "Created", "Manual", "Recycled", "Size"
    );
    println!("{:-<80}", "");

    for backup in backups {
        println!(
            "{:<12} {:<12} {:<20} {:<8} {:<9} {}",
            backup.short_id(),
            backup.target_id.chars().take(8).collect::<String>(),
            backup.created_at.format("%Y-%m-%d %H:%M:%S"),
            if backup.manual { "yes" } else { "no" },
            if backup.is_recycled { "yes" } else { "no" },
            human_size(backup.filesize)
        );
    }
}

pub(crate) fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
