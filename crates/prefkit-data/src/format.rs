use crate::dialogue::{FormattedExample, RawRecord};
use crate::error::{FormatError, FormatResult};
use crate::extract::extract_preference_pair;
use crate::normalize::ensure_system;
use crate::template::{render, ChatTokenizer, RenderMode, TemplateSpec};
use crate::validate::validate;
use serde::{Deserialize, Serialize};

/// Consumption mode a record is formatted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Supervised fine-tuning: the full conversation as one text field.
    Sft,
    /// Like sft, with an open assistant marker appended for continuation.
    Generation,
    /// Reward modeling: chosen and rejected rendered independently.
    Rm,
    /// Preference optimization: (prompt, chosen, rejected) triple.
    Simpo,
}

impl Task {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sft => "sft",
            Self::Generation => "generation",
            Self::Rm => "rm",
            Self::Simpo => "simpo",
        }
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Task {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sft" => Ok(Self::Sft),
            "generation" => Ok(Self::Generation),
            "rm" => Ok(Self::Rm),
            "simpo" => Ok(Self::Simpo),
            other => Err(FormatError::UnsupportedTask { task: other.to_string() }),
        }
    }
}

/// Route one raw record through validation, normalization, extraction and
/// rendering according to `task`, producing its flattened output fields.
///
/// Pure with respect to the record: the input is never mutated and the
/// output holds no references back into it.
pub fn format_example(
    record: &RawRecord,
    task: Task,
    tokenizer: &dyn ChatTokenizer,
    spec: TemplateSpec,
    insert_system: bool,
) -> FormatResult<FormattedExample> {
    validate(record, task)?;

    match task {
        Task::Sft | Task::Generation => {
            let mut messages = record.messages.clone().unwrap_or_default();
            ensure_system(&mut messages, insert_system);
            let mode = if task == Task::Generation {
                RenderMode::GenerationPrompt
            } else {
                RenderMode::Plain
            };
            let text = render(tokenizer, spec, &messages, mode)?;
            Ok(FormattedExample::Text { text })
        }
        Task::Rm => {
            let mut chosen = record.chosen.clone().unwrap_or_default();
            let mut rejected = record.rejected.clone().unwrap_or_default();
            ensure_system(&mut chosen, insert_system);
            ensure_system(&mut rejected, insert_system);
            Ok(FormattedExample::Pair {
                text_chosen: render(tokenizer, spec, &chosen, RenderMode::Plain)?,
                text_rejected: render(tokenizer, spec, &rejected, RenderMode::Plain)?,
            })
        }
        Task::Simpo => {
            let mut pair = extract_preference_pair(record);
            // Only the shared context gets the system turn; the compared
            // responses are rendered bare so the trainer can concatenate
            // prompt + response without a seam.
            ensure_system(&mut pair.prompt_turns, insert_system);

            let text_prompt = render(tokenizer, spec, &pair.prompt_turns, RenderMode::Plain)?;
            let text_chosen = strip_leading_bos(
                render(tokenizer, spec, &pair.chosen_turns, RenderMode::Plain)?,
                tokenizer.bos_marker(),
            );
            let text_rejected = strip_leading_bos(
                render(tokenizer, spec, &pair.rejected_turns, RenderMode::Plain)?,
                tokenizer.bos_marker(),
            );
            Ok(FormattedExample::Triple { text_prompt, text_chosen, text_rejected })
        }
    }
}

/// Remove exactly one leading occurrence of the beginning-of-sequence
/// marker, so concatenating prompt and response later does not duplicate it.
fn strip_leading_bos(text: String, bos_marker: &str) -> String {
    if !bos_marker.is_empty() && text.starts_with(bos_marker) {
        text[bos_marker.len()..].to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::Turn;
    use crate::template::ChatMlTokenizer;
    use std::str::FromStr;

    fn tokenizer() -> ChatMlTokenizer {
        ChatMlTokenizer::new()
    }

    fn preference_record() -> RawRecord {
        RawRecord {
            chosen: Some(vec![Turn::user("Hi"), Turn::assistant("Hello")]),
            rejected: Some(vec![Turn::user("Hi"), Turn::assistant("Hey")]),
            ..Default::default()
        }
    }

    #[test]
    fn test_unknown_task_names_supported_set() {
        let err = Task::from_str("dpo").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("dpo"));
        assert!(message.contains("[sft, generation, rm, simpo]"));
    }

    #[test]
    fn test_sft_renders_single_text_field() {
        let record = RawRecord {
            messages: Some(vec![Turn::user("Hi"), Turn::assistant("Hello")]),
            ..Default::default()
        };
        let tok = tokenizer();
        let out = format_example(&record, Task::Sft, &tok, TemplateSpec::Default, true).unwrap();
        let FormattedExample::Text { text } = out else {
            panic!("expected text output");
        };
        // Normalizer inserted the empty system turn before rendering.
        assert!(text.contains("<|im_start|>system\n"));
        assert!(text.contains("<|im_start|>user\nHi"));
        assert!(!text.ends_with("<|im_start|>assistant\n"));
    }

    #[test]
    fn test_generation_appends_open_assistant_marker() {
        let record = RawRecord {
            messages: Some(vec![Turn::user("Hi")]),
            ..Default::default()
        };
        let tok = tokenizer();
        let out =
            format_example(&record, Task::Generation, &tok, TemplateSpec::Default, true).unwrap();
        let FormattedExample::Text { text } = out else {
            panic!("expected text output");
        };
        assert!(text.ends_with("<|im_start|>assistant\n"));
    }

    #[test]
    fn test_rm_renders_both_sides() {
        let tok = tokenizer();
        let out =
            format_example(&preference_record(), Task::Rm, &tok, TemplateSpec::Default, true)
                .unwrap();
        let FormattedExample::Pair { text_chosen, text_rejected } = out else {
            panic!("expected pair output");
        };
        assert!(text_chosen.contains("Hello"));
        assert!(text_rejected.contains("Hey"));
        // Both sides were normalized independently.
        assert!(text_chosen.contains("<|im_start|>system\n"));
        assert!(text_rejected.contains("<|im_start|>system\n"));
    }

    #[test]
    fn test_simpo_end_to_end_strips_single_bos() {
        let tok = tokenizer();
        let out =
            format_example(&preference_record(), Task::Simpo, &tok, TemplateSpec::Default, true)
                .unwrap();
        let FormattedExample::Triple { text_prompt, text_chosen, text_rejected } = out else {
            panic!("expected triple output");
        };

        assert!(text_prompt.starts_with("<s>"));
        assert!(text_prompt.contains("<|im_start|>system\n"));
        assert!(text_prompt.contains("<|im_start|>user\nHi"));

        // The responses lost their leading marker so the trainer's
        // prompt + response concatenation carries exactly one.
        assert!(!text_chosen.starts_with("<s>"));
        assert!(text_chosen.contains("<|im_start|>assistant\nHello"));
        assert!(!text_rejected.starts_with("<s>"));
        assert!(text_rejected.contains("<|im_start|>assistant\nHey"));
    }

    #[test]
    fn test_bos_strip_removes_one_occurrence_only() {
        assert_eq!(strip_leading_bos("<s><s>text".to_string(), "<s>"), "<s>text");
        assert_eq!(strip_leading_bos("text".to_string(), "<s>"), "text");
        assert_eq!(strip_leading_bos("text".to_string(), ""), "text");
    }

    #[test]
    fn test_simpo_missing_keys_is_hard_error() {
        let record = RawRecord {
            chosen: Some(vec![Turn::user("Hi"), Turn::assistant("Hello")]),
            ..Default::default()
        };
        let tok = tokenizer();
        let err = format_example(&record, Task::Simpo, &tok, TemplateSpec::Default, true)
            .unwrap_err();
        assert!(matches!(err, FormatError::MissingKeys { task: Task::Simpo, .. }));
    }

    #[test]
    fn test_simpo_under_mistral_spec() {
        let tok = tokenizer();
        let out =
            format_example(&preference_record(), Task::Simpo, &tok, TemplateSpec::Mistral, true)
                .unwrap();
        let FormattedExample::Triple { text_prompt, text_chosen, .. } = out else {
            panic!("expected triple output");
        };
        assert_eq!(text_prompt, "[INST] Hi [/INST]");
        assert_eq!(text_chosen, " Hello <|im_end|>");
    }
}
