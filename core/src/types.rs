use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type TargetID = String;
pub type BackupID = String;

/// How many backups a target keeps around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupType {
    Single,
    Multi,
}

/// Condition that makes the server recycle old backups of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupRecycleCriteria {
    Age,
    Count,
    None,
}

/// What the server does with backups that meet the recycle criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupRecycleAction {
    Recycle,
    Delete,
}

impl BackupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupType::Single => "single",
            BackupType::Multi => "multi",
        }
    }
}

impl BackupRecycleCriteria {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupRecycleCriteria::Age => "age",
            BackupRecycleCriteria::Count => "count",
            BackupRecycleCriteria::None => "none",
        }
    }
}

impl BackupRecycleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupRecycleAction::Recycle => "recycle",
            BackupRecycleAction::Delete => "delete",
        }
    }
}

impl FromStr for BackupType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "single" => Ok(BackupType::Single),
            "multi" => Ok(BackupType::Multi),
            other => Err(Error::validation(format!(
                "invalid backup type '{}' (expected single or multi)",
                other
            ))),
        }
    }
}

impl FromStr for BackupRecycleCriteria {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "age" => Ok(BackupRecycleCriteria::Age),
            "count" => Ok(BackupRecycleCriteria::Count),
            "none" => Ok(BackupRecycleCriteria::None),
            other => Err(Error::validation(format!(
                "invalid recycle criteria '{}' (expected age, count or none)",
                other
            ))),
        }
    }
}

impl FromStr for BackupRecycleAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "recycle" => Ok(BackupRecycleAction::Recycle),
            "delete" => Ok(BackupRecycleAction::Delete),
            other => Err(Error::validation(format!(
                "invalid recycle action '{}' (expected recycle or delete)",
                other
            ))),
        }
    }
}

impl fmt::Display for BackupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for BackupRecycleCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for BackupRecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A backup destination as stored on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupTarget {
    pub id: TargetID,
    pub name: String,
    #[serde(alias = "target_type")]
    pub backup_type: BackupType,
    pub recycle_criteria: BackupRecycleCriteria,
    pub recycle_value: i64,
    pub recycle_action: BackupRecycleAction,
    pub location: String,
    pub name_template: String,
    #[serde(default)]
    pub deduplicate: bool,
}

impl BackupTarget {
    pub fn recycling_enabled(&self) -> bool {
        self.recycle_criteria != BackupRecycleCriteria::None
    }

    pub fn short_id(&self) -> String {
        self.id.chars().take(8).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backup {
    pub id: BackupID,
    pub target_id: TargetID,
    pub created_at: DateTime<Utc>,
    pub manual: bool,
    pub is_recycled: bool,
    #[serde(default)]
    pub filesize: u64,
}

impl Backup {
    pub fn short_id(&self) -> String {
        self.id.chars().take(8).collect()
    }
}

/// A target together with the backups it currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDetails {
    pub target: BackupTarget,
    pub backups: Vec<Backup>,
}

/// Settings submitted when creating or editing a target.
///
/// `backup_type` is only honoured on creation; the server keeps the type a
/// target was created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOptions {
    pub name: String,
    pub backup_type: BackupType,
    pub recycle_criteria: BackupRecycleCriteria,
    pub recycle_value: i64,
    pub recycle_action: BackupRecycleAction,
    pub location: String,
    pub name_template: String,
    pub deduplicate: bool,
}

impl TargetOptions {
    /// Options for a target that never recycles and does not deduplicate.
    pub fn new(
        name: impl Into<String>,
        backup_type: BackupType,
        location: impl Into<String>,
        name_template: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            backup_type,
            recycle_criteria: BackupRecycleCriteria::None,
            recycle_value: 0,
            recycle_action: BackupRecycleAction::Recycle,
            location: location.into(),
            name_template: name_template.into(),
            deduplicate: false,
        }
    }

    pub fn with_recycling(
        mut self,
        criteria: BackupRecycleCriteria,
        value: i64,
        action: BackupRecycleAction,
    ) -> Self {
        self.recycle_criteria = criteria;
        self.recycle_value = value;
        self.recycle_action = action;
        self
    }

    pub fn with_deduplication(mut self, deduplicate: bool) -> Self {
        self.deduplicate = deduplicate;
        self
    }

    /// Checks everything the server would otherwise reject, so a bad call
    /// never reaches the network.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("target name must not be empty"));
        }
        if self.location.trim().is_empty() {
            return Err(Error::validation("target location must not be empty"));
        }
        if self.name_template.trim().is_empty() {
            return Err(Error::validation("name template must not be empty"));
        }
        if self.recycle_criteria != BackupRecycleCriteria::None && self.recycle_value < 0 {
            return Err(Error::validation(format!(
                "recycle value must be non-negative for criteria '{}', got {}",
                self.recycle_criteria, self.recycle_value
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn waifu_options() -> TargetOptions {
        TargetOptions::new(
            "waifu collection",
            BackupType::Multi,
            "/var/backups/waifu",
            "wf-$I_$D",
        )
        .with_recycling(BackupRecycleCriteria::Age, 10, BackupRecycleAction::Recycle)
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&BackupType::Multi).unwrap(), "\"multi\"");
        assert_eq!(serde_json::to_string(&BackupRecycleCriteria::None).unwrap(), "\"none\"");
        assert_eq!(serde_json::to_string(&BackupRecycleAction::Delete).unwrap(), "\"delete\"");
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("MULTI".parse::<BackupType>().unwrap(), BackupType::Multi);
        assert_eq!("count".parse::<BackupRecycleCriteria>().unwrap(), BackupRecycleCriteria::Count);
        assert_eq!("Recycle".parse::<BackupRecycleAction>().unwrap(), BackupRecycleAction::Recycle);

        let err = "weekly".parse::<BackupRecycleCriteria>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_valid_options_pass() {
        assert!(waifu_options().validate().is_ok());
    }

    #[test]
    fn test_negative_recycle_value_rejected() {
        for criteria in [BackupRecycleCriteria::Age, BackupRecycleCriteria::Count] {
            for action in [BackupRecycleAction::Recycle, BackupRecycleAction::Delete] {
                let options = waifu_options().with_recycling(criteria, -1, action);
                let err = options.validate().unwrap_err();
                assert_eq!(err.kind(), ErrorKind::Validation);
            }
        }
    }

    #[test]
    fn test_negative_value_ignored_without_criteria() {
        let options = waifu_options().with_recycling(
            BackupRecycleCriteria::None,
            -5,
            BackupRecycleAction::Delete,
        );
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_empty_fields_rejected() {
        let mut options = waifu_options();
        options.name = "  ".to_string();
        assert!(options.validate().is_err());

        let mut options = waifu_options();
        options.location.clear();
        assert!(options.validate().is_err());

        let mut options = waifu_options();
        options.name_template.clear();
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_target_accepts_server_type_field() {
        let json = r#"{
            "id": "0b6f",
            "name": "docs",
            "target_type": "single",
            "recycle_criteria": "count",
            "recycle_value": 3,
            "recycle_action": "delete",
            "location": "/srv/docs",
            "name_template": "docs-$D"
        }"#;
        let target: BackupTarget = serde_json::from_str(json).unwrap();
        assert_eq!(target.backup_type, BackupType::Single);
        assert!(!target.deduplicate);
        assert!(target.recycling_enabled());
    }
}
