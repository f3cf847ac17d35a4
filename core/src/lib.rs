pub mod api;
pub mod connection;
pub mod error;
pub mod types;

pub use api::Api;
pub use connection::Connection;
pub use error::{Error, ErrorKind, Result};
pub use types::{
    Backup, BackupID, BackupRecycleAction, BackupRecycleCriteria, BackupTarget, BackupType,
    TargetDetails, TargetID, TargetOptions,
};
