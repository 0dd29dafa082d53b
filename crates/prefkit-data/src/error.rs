use crate::format::Task;
use thiserror::Error;

pub type FormatResult<T> = std::result::Result<T, FormatError>;

/// Errors from the formatting pipeline. All of them are hard failures: a
/// malformed record signals a schema mismatch between the dataset and the
/// selected task, not a bad single row, so nothing here is retried or
/// skipped per-row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("could not format example for {task} task: require {required} keys but found [{found}]")]
    MissingKeys {
        task: Task,
        required: &'static str,
        found: String,
    },

    #[error("could not format example for {task} task: require open dialogue format (role + content on every turn) for all messages")]
    MalformedDialogue { task: Task },

    #[error("task {task} is not supported, expected one of [sft, generation, rm, simpo]")]
    UnsupportedTask { task: String },

    #[error("template rendering failed: {0}")]
    Template(String),
}

impl FormatError {
    /// Build a `MissingKeys` error from the record's actual key set.
    pub(crate) fn missing_keys(task: Task, required: &'static str, found: Vec<&'static str>) -> Self {
        Self::MissingKeys { task, required, found: found.join(", ") }
    }
}
