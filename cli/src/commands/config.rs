use super::{config_path, flag_config};
use crate::config::ClientConfig;
use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommands {
    /// Write the connection settings given by flags to the config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Print the settings that would be used, with the API key hidden
    Show,
}

impl ConfigCommand {
    pub fn run(&self, cli: &crate::Cli) -> Result<()> {
        let path = config_path(cli)?;

        match &self.command {
            ConfigSubcommands::Init { force } => {
                if path.exists() && !force {
                    return Err(anyhow!(
                        "Config file already exists at {} (use --force to overwrite)",
                        path.display()
                    ));
                }

                let mut config = flag_config(cli);
                if config.host.is_none() {
                    return Err(anyhow!("Server host required (--host or BACKUPCHAN_HOST)"));
                }
                if config.api_key.is_none() {
                    print!("Enter API key: ");
                    io::stdout().flush()?;
                    config.api_key = Some(rpassword::read_password()?);
                }

                config.save(&path)?;
                println!("Wrote config to {}", path.display());
            }

            ConfigSubcommands::Show => {
                let mut config = ClientConfig::load(&path)?.merge(flag_config(cli));
                if config.api_key.is_some() {
                    config.api_key = Some("<hidden>".to_string());
                }
                println!("# {}", path.display());
                print!("{}", toml::to_string_pretty(&config)?);
            }
        }

        Ok(())
    }
}
