use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Contents of `config.toml`. Every field is optional so the file, env vars
/// and flags can each supply part of the connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

impl ClientConfig {
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "backupchan").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Reads the config file, treating a missing file as empty.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        write_private(path, content.as_bytes())
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Values set in `overrides` win over the ones in `self`.
    pub fn merge(self, overrides: ClientConfig) -> ClientConfig {
        ClientConfig {
            host: overrides.host.or(self.host),
            port: overrides.port.or(self.port),
            api_key: overrides.api_key.or(self.api_key),
            timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
        }
    }

    pub fn resolve(self) -> Result<ConnectionSettings> {
        let host = self
            .host
            .ok_or_else(|| anyhow!("Server host required (--host, BACKUPCHAN_HOST or config file)"))?;
        Ok(ConnectionSettings {
            host,
            port: self.port.unwrap_or(DEFAULT_PORT),
            api_key: self.api_key,
            timeout: Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        })
    }
}

/// Writes a file only its owner can read, since it may hold the API key.
#[cfg(unix)]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::fs::{OpenOptions, Permissions};
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation; tighten files written by older versions.
    file.set_permissions(Permissions::from_mode(0o600))?;
    file.write_all(content)
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    fs::write(path, content)
}
