use crate::dialogue::{Role, Turn};
use crate::error::{FormatError, FormatResult};
use serde::{Deserialize, Serialize};

/// How a dialogue is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Render the turns as-is.
    Plain,
    /// Render the turns and leave an open, content-less assistant marker at
    /// the end, used to prompt continuation.
    GenerationPrompt,
}

/// Chat-template engine boundary. Implementations render an ordered turn
/// sequence into a single string and expose the marker strings the
/// formatting pipeline needs for token-boundary bookkeeping.
pub trait ChatTokenizer: Send + Sync {
    /// Render `turns` into a flat string. When `add_generation_marker` is
    /// set, the output must be a strict prefix-extension of the plain
    /// rendering with exactly one open assistant marker appended.
    fn apply_template(&self, turns: &[Turn], add_generation_marker: bool) -> FormatResult<String>;

    /// The literal beginning-of-sequence marker this engine prepends.
    fn bos_marker(&self) -> &str;

    /// The literal end-of-sequence marker terminating assistant turns.
    fn eos_marker(&self) -> &str;
}

/// Named rendering rule, selected once per run from the model identity and
/// threaded through every render call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateSpec {
    /// Delegate to the tokenizer's own chat template.
    Default,
    /// Bracketed instruction style used by the Mistral family.
    Mistral,
}

impl TemplateSpec {
    /// Select the spec for a model identifier.
    #[must_use]
    pub fn for_model(model_id: &str) -> Self {
        if model_id.to_lowercase().contains("mistral") {
            Self::Mistral
        } else {
            Self::Default
        }
    }
}

impl std::fmt::Display for TemplateSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Mistral => f.write_str("mistral"),
        }
    }
}

impl std::str::FromStr for TemplateSpec {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "mistral" => Ok(Self::Mistral),
            other => Err(FormatError::Template(format!(
                "unknown template spec {other}, expected one of [default, mistral]"
            ))),
        }
    }
}

/// Render a dialogue under the given spec. Assumes the system-message
/// normalizer already ran; rendering an ill-formed dialogue is unspecified.
pub fn render(
    tokenizer: &dyn ChatTokenizer,
    spec: TemplateSpec,
    turns: &[Turn],
    mode: RenderMode,
) -> FormatResult<String> {
    match spec {
        TemplateSpec::Default => {
            tokenizer.apply_template(turns, mode == RenderMode::GenerationPrompt)
        }
        // The bracketed style has no generation-prompt form; an assistant
        // continuation follows `[/INST]` directly.
        TemplateSpec::Mistral => Ok(render_mistral(turns, tokenizer.eos_marker())),
    }
}

/// Bracketed instruction rendering: a leading system turn is merged into the
/// first following turn's content (system + blank line + content), user
/// content is wrapped as `[INST] ... [/INST]`, assistant content becomes
/// `" " + trimmed + " " + eos`. Turns of any other role produce no output.
fn render_mistral(turns: &[Turn], eos_marker: &str) -> String {
    let (system_message, body) = match turns.first() {
        Some(first) if first.role == Role::System => {
            (format!("{}\n\n", first.content.trim()), &turns[1..])
        }
        _ => (String::new(), turns),
    };

    let mut out = String::new();
    for (i, turn) in body.iter().enumerate() {
        let content = if i == 0 {
            format!("{system_message}{}", turn.content)
        } else {
            turn.content.clone()
        };
        match turn.role {
            Role::User => {
                out.push_str("[INST] ");
                out.push_str(content.trim());
                out.push_str(" [/INST]");
            }
            Role::Assistant => {
                out.push(' ');
                out.push_str(content.trim());
                out.push(' ');
                out.push_str(eos_marker);
            }
            Role::System => {}
        }
    }
    out
}

/// Default chat-template engine shipping with the pipeline, rendering the
/// ChatML turn format (`<|im_start|>role\ncontent<|im_end|>`) with a
/// configurable beginning-of-sequence marker prepended.
#[derive(Debug, Clone)]
pub struct ChatMlTokenizer {
    bos: String,
    eos: String,
}

impl ChatMlTokenizer {
    #[must_use]
    pub fn new() -> Self {
        Self::with_markers("<s>", "<|im_end|>")
    }

    #[must_use]
    pub fn with_markers(bos: impl Into<String>, eos: impl Into<String>) -> Self {
        Self { bos: bos.into(), eos: eos.into() }
    }
}

impl Default for ChatMlTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatTokenizer for ChatMlTokenizer {
    fn apply_template(&self, turns: &[Turn], add_generation_marker: bool) -> FormatResult<String> {
        let mut text = self.bos.clone();
        for turn in turns {
            text.push_str("<|im_start|>");
            text.push_str(&turn.role.to_string());
            text.push('\n');
            text.push_str(&turn.content);
            text.push_str(&self.eos);
            text.push('\n');
        }
        if add_generation_marker {
            text.push_str("<|im_start|>assistant\n");
        }
        Ok(text)
    }

    fn bos_marker(&self) -> &str {
        &self.bos
    }

    fn eos_marker(&self) -> &str {
        &self.eos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer() -> ChatMlTokenizer {
        ChatMlTokenizer::new()
    }

    #[test]
    fn test_generation_prompt_is_strict_prefix_extension() {
        let turns = vec![Turn::system(""), Turn::user("Hi")];
        let tok = tokenizer();
        let plain = render(&tok, TemplateSpec::Default, &turns, RenderMode::Plain).unwrap();
        let gen = render(&tok, TemplateSpec::Default, &turns, RenderMode::GenerationPrompt).unwrap();

        assert!(gen.starts_with(&plain));
        assert_eq!(&gen[plain.len()..], "<|im_start|>assistant\n");
    }

    #[test]
    fn test_mistral_merges_system_into_first_user_turn() {
        let turns = vec![Turn::system("S"), Turn::user("U")];
        let tok = tokenizer();
        let text = render(&tok, TemplateSpec::Mistral, &turns, RenderMode::Plain).unwrap();
        assert_eq!(text, "[INST] S\n\nU [/INST]");
    }

    #[test]
    fn test_mistral_assistant_turn_is_space_padded_with_eos() {
        let turns = vec![Turn::user("U"), Turn::assistant(" A ")];
        let tok = tokenizer();
        let text = render(&tok, TemplateSpec::Mistral, &turns, RenderMode::Plain).unwrap();
        assert_eq!(text, "[INST] U [/INST] A <|im_end|>");
    }

    #[test]
    fn test_mistral_empty_system_leaves_user_content_untouched() {
        let turns = vec![Turn::system(""), Turn::user("U")];
        let tok = tokenizer();
        let text = render(&tok, TemplateSpec::Mistral, &turns, RenderMode::Plain).unwrap();
        assert_eq!(text, "[INST] U [/INST]");
    }

    #[test]
    fn test_spec_selected_from_model_id() {
        assert_eq!(TemplateSpec::for_model("mistralai/Mistral-7B-v0.1"), TemplateSpec::Mistral);
        assert_eq!(
            TemplateSpec::for_model("princeton-nlp/Llama-3-Base-8B-SFT"),
            TemplateSpec::Default
        );
    }

    #[test]
    fn test_chatml_prepends_bos_marker() {
        let tok = tokenizer();
        let text = tok.apply_template(&[Turn::assistant("Hello")], false).unwrap();
        assert!(text.starts_with("<s>"));
        assert!(text.contains("<|im_start|>assistant\nHello<|im_end|>"));
    }
}
