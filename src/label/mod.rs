//! Build labelling.
//!
//! A labeller computes the label for a new integration from the previous
//! integration's summary and (for some labellers) source-control metadata
//! on the current result. Labels are monotonic per project by convention
//! of the active labeller.

use crate::types::IntegrationResult;

pub mod default;
pub mod iteration;
pub mod last_change;

pub use default::DefaultLabeller;
pub use iteration::IterationLabeller;
pub use last_change::LastChangeLabeller;

/// Computes the new build label from history.
pub trait Labeller: Send + Sync {
    /// Generates the label for the integration in progress.
    fn generate(&self, result: &IntegrationResult) -> String;
}

/// Extracts the trailing decimal run of a label, with the prefix that
/// precedes it. `"v1.41"` parses as `("v1.", 41)`.
pub(crate) fn split_trailing_number(label: &str) -> Option<(&str, u64)> {
    let digits_start = label
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    let number: u64 = label[digits_start..].parse().ok()?;
    Some((&label[..digits_start], number))
}
