use crate::connection::{Connection, constants};
use crate::error::{Error, Result};
use crate::types::{
    Backup, BackupID, BackupRecycleAction, BackupRecycleCriteria, BackupTarget, BackupType,
    TargetDetails, TargetID, TargetOptions,
};
use reqwest::Body;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tracing::{debug, info};

/// Client for a backupchan server.
///
/// Holds the connection parameters for one server and maps each endpoint to
/// a method. Clients share no state with each other.
#[derive(Debug, Clone)]
pub struct Api {
    connection: Connection,
}

#[derive(Serialize)]
struct NewTargetRequest<'a> {
    name: &'a str,
    backup_type: BackupType,
    recycle_criteria: BackupRecycleCriteria,
    recycle_value: i64,
    recycle_action: BackupRecycleAction,
    location: &'a str,
    name_template: &'a str,
    deduplicate: bool,
}

#[derive(Serialize)]
struct EditTargetRequest<'a> {
    name: &'a str,
    recycle_criteria: BackupRecycleCriteria,
    recycle_value: i64,
    recycle_action: BackupRecycleAction,
    location: &'a str,
    name_template: &'a str,
    deduplicate: bool,
}

#[derive(Serialize)]
struct DeleteRequest {
    delete_files: bool,
}

#[derive(Serialize)]
struct RecycleRequest {
    is_recycled: bool,
}

#[derive(Deserialize)]
struct TargetListResponse {
    targets: Vec<BackupTarget>,
}

#[derive(Deserialize)]
struct TargetResponse {
    target: BackupTarget,
}

#[derive(Deserialize)]
struct CreatedResponse {
    id: String,
}

#[derive(Deserialize)]
struct BackupListResponse {
    backups: Vec<Backup>,
}

/// Body of responses that carry nothing besides the success flag.
#[derive(Deserialize)]
struct Acknowledged {}

impl<'a> From<&'a TargetOptions> for NewTargetRequest<'a> {
    fn from(options: &'a TargetOptions) -> Self {
        Self {
            name: &options.name,
            backup_type: options.backup_type,
            recycle_criteria: options.recycle_criteria,
            recycle_value: options.recycle_value,
            recycle_action: options.recycle_action,
            location: &options.location,
            name_template: &options.name_template,
            deduplicate: options.deduplicate,
        }
    }
}

impl<'a> From<&'a TargetOptions> for EditTargetRequest<'a> {
    fn from(options: &'a TargetOptions) -> Self {
        Self {
            name: &options.name,
            recycle_criteria: options.recycle_criteria,
            recycle_value: options.recycle_value,
            recycle_action: options.recycle_action,
            location: &options.location,
            name_template: &options.name_template,
            deduplicate: options.deduplicate,
        }
    }
}

impl Api {
    pub fn new(host: &str, port: u16, api_key: &str) -> Result<Self> {
        Self::with_timeout(host, port, api_key, constants::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(host: &str, port: u16, api_key: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            connection: Connection::new(host, port, api_key, timeout)?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub async fn list_targets(&self) -> Result<Vec<BackupTarget>> {
        let response: TargetListResponse = self.connection.get(&["target"]).await?;
        debug!(count = response.targets.len(), "Listed targets");
        Ok(response.targets)
    }

    /// Fetches a target without decoding its backups.
    pub async fn get_target(&self, target_id: &str) -> Result<BackupTarget> {
        require_id("target", target_id)?;
        let response: TargetResponse = self
            .connection
            .get(&["target", target_id])
            .await
            .map_err(|e| not_found_as(e, "Target", target_id))?;
        Ok(response.target)
    }

    /// Fetches a target along with every backup it holds.
    pub async fn get_target_details(&self, target_id: &str) -> Result<TargetDetails> {
        require_id("target", target_id)?;
        self.connection
            .get(&["target", target_id])
            .await
            .map_err(|e| not_found_as(e, "Target", target_id))
    }

    /// Creates a target and returns the id the server assigned to it.
    pub async fn new_target(&self, options: &TargetOptions) -> Result<TargetID> {
        options.validate()?;
        let response: CreatedResponse = self
            .connection
            .post(&["target"], &NewTargetRequest::from(options))
            .await?;
        info!(id = %response.id, name = %options.name, "Created target");
        Ok(response.id)
    }

    /// Updates an existing target. The backup type cannot be changed and is
    /// not sent.
    pub async fn edit_target(&self, target_id: &str, options: &TargetOptions) -> Result<()> {
        require_id("target", target_id)?;
        options.validate()?;
        let _: Acknowledged = self
            .connection
            .patch(&["target", target_id], &EditTargetRequest::from(options))
            .await
            .map_err(|e| not_found_as(e, "Target", target_id))?;
        info!(id = target_id, "Edited target");
        Ok(())
    }

    pub async fn delete_target(&self, target_id: &str, delete_files: bool) -> Result<()> {
        require_id("target", target_id)?;
        let _: Acknowledged = self
            .connection
            .delete(&["target", target_id], &DeleteRequest { delete_files })
            .await
            .map_err(|e| not_found_as(e, "Target", target_id))?;
        info!(id = target_id, delete_files, "Deleted target");
        Ok(())
    }

    /// Removes every backup of a target while keeping the target itself.
    pub async fn delete_target_backups(&self, target_id: &str, delete_files: bool) -> Result<()> {
        require_id("target", target_id)?;
        let _: Acknowledged = self
            .connection
            .delete(&["target", target_id, "all"], &DeleteRequest { delete_files })
            .await
            .map_err(|e| not_found_as(e, "Target", target_id))?;
        info!(id = target_id, delete_files, "Deleted all backups of target");
        Ok(())
    }

    /// Uploads `contents` as a new backup of the target and returns the new
    /// backup's id.
    pub async fn upload_backup(
        &self,
        target_id: &str,
        filename: &str,
        contents: Vec<u8>,
        manual: bool,
    ) -> Result<BackupID> {
        let size = contents.len() as u64;
        self.upload_part(target_id, filename, Part::bytes(contents), size, manual)
            .await
    }

    /// Streams a local file to the server under its own file name, without
    /// loading it into memory.
    pub async fn upload_backup_file(
        &self,
        target_id: &str,
        path: impl AsRef<Path>,
        manual: bool,
    ) -> Result<BackupID> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| {
                Error::validation(format!("'{}' does not name a file", path.display()))
            })?;
        let file = File::open(path).await?;
        let size = file.metadata().await?.len();
        let part = Part::stream_with_length(Body::from(file), size);
        self.upload_part(target_id, &filename, part, size, manual)
            .await
    }

    async fn upload_part(
        &self,
        target_id: &str,
        filename: &str,
        part: Part,
        size: u64,
        manual: bool,
    ) -> Result<BackupID> {
        require_id("target", target_id)?;
        if filename.trim().is_empty() {
            return Err(Error::validation("upload filename must not be empty"));
        }

        let form = Form::new()
            .text("manual", if manual { "1" } else { "0" })
            .part("backup_file", part.file_name(filename.to_string()));

        let response: CreatedResponse = self
            .connection
            .post_form(&["target", target_id, "upload"], form)
            .await
            .map_err(|e| not_found_as(e, "Target", target_id))?;
        info!(target_id, backup_id = %response.id, size, "Uploaded backup");
        Ok(response.id)
    }

    pub async fn delete_backup(&self, backup_id: &str, delete_files: bool) -> Result<()> {
        require_id("backup", backup_id)?;
        let _: Acknowledged = self
            .connection
            .delete(&["backup", backup_id], &DeleteRequest { delete_files })
            .await
            .map_err(|e| not_found_as(e, "Backup", backup_id))?;
        info!(id = backup_id, delete_files, "Deleted backup");
        Ok(())
    }

    /// Moves a backup into the recycle bin, or restores it with
    /// `is_recycled = false`.
    pub async fn recycle_backup(&self, backup_id: &str, is_recycled: bool) -> Result<()> {
        require_id("backup", backup_id)?;
        let _: Acknowledged = self
            .connection
            .patch(&["backup", backup_id], &RecycleRequest { is_recycled })
            .await
            .map_err(|e| not_found_as(e, "Backup", backup_id))?;
        info!(id = backup_id, is_recycled, "Updated backup recycle state");
        Ok(())
    }

    pub async fn list_recycled_backups(&self) -> Result<Vec<Backup>> {
        let response: BackupListResponse = self.connection.get(&["recycle_bin"]).await?;
        Ok(response.backups)
    }

    pub async fn clear_recycle_bin(&self, delete_files: bool) -> Result<()> {
        let _: Acknowledged = self
            .connection
            .delete(&["recycle_bin"], &DeleteRequest { delete_files })
            .await?;
        info!(delete_files, "Cleared recycle bin");
        Ok(())
    }
}

fn require_id(what: &str, id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::validation(format!("{} id must not be empty", what)));
    }
    if id.contains('/') {
        return Err(Error::validation(format!("{} id '{}' contains '/'", what, id)));
    }
    // The URL builder drops dot segments, which would address the parent.
    if id == "." || id == ".." {
        return Err(Error::validation(format!("{} id '{}' is not valid", what, id)));
    }
    Ok(())
}

fn not_found_as(err: Error, what: &'static str, id: &str) -> Error {
    match err {
        Error::NotFound { .. } => Error::NotFound {
            what,
            id: id.to_string(),
        },
        other => other,
    }
}
