//! The default incrementing labeller.

use super::{Labeller, split_trailing_number};
use crate::types::{IntegrationResult, IntegrationStatus};

/// Labels builds `<prefix>1`, `<prefix>2`, ... incrementing on every
/// successful integration.
///
/// A failed integration keeps its predecessor's label, so the next
/// successful build re-uses the number the failure burned - unless
/// `increment_on_failure` is set.
#[derive(Debug, Clone, Default)]
pub struct DefaultLabeller {
    pub prefix: String,
    pub increment_on_failure: bool,
}

impl DefaultLabeller {
    pub fn new() -> Self {
        DefaultLabeller::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn incrementing_on_failure(mut self) -> Self {
        self.increment_on_failure = true;
        self
    }
}

impl Labeller for DefaultLabeller {
    fn generate(&self, result: &IntegrationResult) -> String {
        let last = &result.last_integration;
        let Some(label) = last.label.as_deref() else {
            return format!("{}1", self.prefix);
        };
        if last.status == IntegrationStatus::Success || self.increment_on_failure {
            match split_trailing_number(label) {
                Some((_, number)) => format!("{}{}", self.prefix, number + 1),
                // Unparseable history: start the sequence over.
                None => format!("{}1", self.prefix),
            }
        } else {
            label.to_string()
        }
    }
}
