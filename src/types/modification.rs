//! A single source-control modification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One detected change in source control since the last integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modification {
    /// File name, without its folder.
    pub file_name: String,
    /// Folder the file lives in (provider-relative).
    pub folder_name: String,
    /// When the modification was committed, per the provider.
    pub modified_time: DateTime<Utc>,
    /// Committer, if the provider reports one.
    pub user_name: Option<String>,
    /// Commit comment, if the provider reports one.
    pub comment: Option<String>,
    /// Provider change number/revision, if any.
    pub change_number: Option<String>,
}

impl Modification {
    pub fn new(
        file_name: impl Into<String>,
        folder_name: impl Into<String>,
        modified_time: DateTime<Utc>,
    ) -> Self {
        Modification {
            file_name: file_name.into(),
            folder_name: folder_name.into(),
            modified_time,
            user_name: None,
            comment: None,
            change_number: None,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user_name = Some(user.into());
        self
    }

    pub fn with_change_number(mut self, change_number: impl Into<String>) -> Self {
        self.change_number = Some(change_number.into());
        self
    }

    /// The latest modification time in a set, if the set is non-empty.
    pub fn most_recent(modifications: &[Modification]) -> Option<DateTime<Utc>> {
        modifications.iter().map(|m| m.modified_time).max()
    }

    /// The change number of the most recently modified entry, if any.
    pub fn last_change_number(modifications: &[Modification]) -> Option<String> {
        modifications
            .iter()
            .max_by_key(|m| m.modified_time)
            .and_then(|m| m.change_number.clone())
    }
}
