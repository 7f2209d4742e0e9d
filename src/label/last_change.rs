//! Labels derived from source-control change numbers.

use super::{Labeller, split_trailing_number};
use crate::types::IntegrationResult;

/// Builds the label from the newest modification's change number.
///
/// Providers with a native change-number concept (revision counters,
/// changelists) map directly onto build labels: change 213 with prefix
/// `Foo-1-` becomes `Foo-1-213`. A forced build with no modifications has
/// no change number, so the previous label is carried forward; when
/// duplicates are not allowed, a `.n` suffix disambiguates repeats.
#[derive(Debug, Clone)]
pub struct LastChangeLabeller {
    pub prefix: String,
    pub allow_duplicate_subsequent_labels: bool,
}

impl Default for LastChangeLabeller {
    fn default() -> Self {
        LastChangeLabeller {
            prefix: String::new(),
            allow_duplicate_subsequent_labels: true,
        }
    }
}

impl LastChangeLabeller {
    pub fn new() -> Self {
        LastChangeLabeller::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn rejecting_duplicates(mut self) -> Self {
        self.allow_duplicate_subsequent_labels = false;
        self
    }

    /// `"213"` -> `"213.1"`; `"213.1"` -> `"213.2"`.
    fn increment(label: &str) -> String {
        match label.rsplit_once('.') {
            Some((base, suffix)) => match suffix.parse::<u64>() {
                Ok(n) => format!("{}.{}", base, n + 1),
                Err(_) => format!("{}.1", label),
            },
            None => format!("{}.1", label),
        }
    }
}

impl Labeller for LastChangeLabeller {
    fn generate(&self, result: &IntegrationResult) -> String {
        let change_number = result.last_change_number();
        let first_suffix = if self.allow_duplicate_subsequent_labels {
            ""
        } else {
            ".1"
        };

        if let Some(change_number) = change_number {
            return format!("{}{}{}", self.prefix, change_number, first_suffix);
        }

        let last = &result.last_integration;
        match last.label.as_deref() {
            None => format!("{}unknown{}", self.prefix, first_suffix),
            Some(label) if !self.allow_duplicate_subsequent_labels => {
                // Repeat without a new change number: bump the suffix.
                match split_trailing_number(label) {
                    Some(_) => Self::increment(label),
                    None => format!("{}.1", label),
                }
            }
            Some(label) => label.to_string(),
        }
    }
}
