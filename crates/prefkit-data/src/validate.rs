use crate::dialogue::{is_open_format, RawRecord};
use crate::error::{FormatError, FormatResult};
use crate::format::Task;

/// Check that a raw record has the structural shape its task requires.
///
/// Validation is structural only; it does not check that `chosen` is
/// actually better than `rejected`. A failure here is a schema mismatch
/// across the whole dataset and must abort the split, not skip the row.
pub fn validate(record: &RawRecord, task: Task) -> FormatResult<()> {
    match task {
        Task::Sft | Task::Generation => {
            if record.messages.is_none() {
                return Err(FormatError::missing_keys(task, "[messages]", record.present_keys()));
            }
            Ok(())
        }
        Task::Rm | Task::Simpo => {
            let (Some(chosen), Some(rejected)) = (&record.chosen, &record.rejected) else {
                return Err(FormatError::missing_keys(
                    task,
                    "[chosen, rejected]",
                    record.present_keys(),
                ));
            };
            if task == Task::Simpo && (!is_open_format(chosen) || !is_open_format(rejected)) {
                return Err(FormatError::MalformedDialogue { task });
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::Turn;

    #[test]
    fn test_rm_rejects_missing_rejected_key() {
        let record = RawRecord {
            chosen: Some(vec![Turn::user("hi")]),
            ..Default::default()
        };
        let err = validate(&record, Task::Rm).unwrap_err();
        match err {
            FormatError::MissingKeys { task, required, found } => {
                assert_eq!(task, Task::Rm);
                assert_eq!(required, "[chosen, rejected]");
                assert_eq!(found, "chosen");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_simpo_rejects_empty_side() {
        let record = RawRecord {
            chosen: Some(vec![Turn::user("hi"), Turn::assistant("hello")]),
            rejected: Some(Vec::new()),
            ..Default::default()
        };
        let err = validate(&record, Task::Simpo).unwrap_err();
        assert!(matches!(err, FormatError::MalformedDialogue { task: Task::Simpo }));
    }

    #[test]
    fn test_simpo_accepts_chosen_and_rejected() {
        let record = RawRecord {
            chosen: Some(vec![Turn::user("hi"), Turn::assistant("hello")]),
            rejected: Some(vec![Turn::user("hi"), Turn::assistant("hey")]),
            ..Default::default()
        };
        assert!(validate(&record, Task::Simpo).is_ok());
    }

    #[test]
    fn test_sft_requires_messages() {
        let record = RawRecord::default();
        let err = validate(&record, Task::Sft).unwrap_err();
        assert!(err.to_string().contains("[messages]"));
    }
}
