//! A source-control adapter that watches a directory tree.
//!
//! Any file whose modification time is newer than the previous
//! integration's start counts as a modification. There is no real
//! get-source or labelling step for a plain directory, so those
//! operations are no-ops.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Result, SourceControl, SourceControlError};
use crate::types::{IntegrationResult, IntegrationSummary, Modification};

/// Watches a directory tree for changed files.
#[derive(Debug, Clone)]
pub struct FileSystemSourceControl {
    repository_root: PathBuf,
}

impl FileSystemSourceControl {
    pub fn new(repository_root: impl Into<PathBuf>) -> Self {
        FileSystemSourceControl {
            repository_root: repository_root.into(),
        }
    }

    pub fn repository_root(&self) -> &Path {
        &self.repository_root
    }
}

#[async_trait]
impl SourceControl for FileSystemSourceControl {
    async fn get_modifications(
        &self,
        from: &IntegrationSummary,
        _to: &IntegrationResult,
    ) -> Result<Vec<Modification>> {
        let root = self.repository_root.clone();
        // No previous integration means every file is new.
        let cutoff = from.start_time;

        tokio::task::spawn_blocking(move || {
            let mut modifications = Vec::new();
            collect_modified(&root, &root, cutoff, &mut modifications)?;
            Ok(modifications)
        })
        .await
        .map_err(|e| SourceControlError::Failed(format!("modification scan panicked: {}", e)))?
    }

    async fn get_source(&self, _result: &IntegrationResult) -> Result<()> {
        Ok(())
    }

    async fn label_source_control(&self, _result: &IntegrationResult) -> Result<()> {
        Ok(())
    }
}

/// Recursively collects files under `dir` modified after `cutoff`.
fn collect_modified(
    root: &Path,
    dir: &Path,
    cutoff: Option<DateTime<Utc>>,
    out: &mut Vec<Modification>,
) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            collect_modified(root, &path, cutoff, out)?;
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let modified: DateTime<Utc> = entry.metadata()?.modified()?.into();
        let is_new = match cutoff {
            Some(cutoff) => modified > cutoff,
            None => true,
        };
        if !is_new {
            continue;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let folder_name = path
            .parent()
            .and_then(|p| p.strip_prefix(root).ok())
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();

        out.push(Modification::new(file_name, folder_name, modified));
    }
    Ok(())
}
