use serde::{Deserialize, Serialize};

/// Speaker role of a single conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => f.write_str("system"),
            Self::User => f.write_str("user"),
            Self::Assistant => f.write_str("assistant"),
        }
    }
}

/// One message in a conversation. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A dialogue is well-formed for rendering when it is non-empty and any
/// system turn, if present, comes first.
#[must_use]
pub fn is_well_formed(turns: &[Turn]) -> bool {
    !turns.is_empty() && !turns.iter().skip(1).any(|t| t.role == Role::System)
}

/// Open preference format: every element carries both a role and content.
/// With typed turns that reduces to the dialogue being non-empty; records
/// whose turns were missing either field fail deserialization upstream.
#[must_use]
pub fn is_open_format(turns: &[Turn]) -> bool {
    !turns.is_empty()
}

/// One raw dataset row. Which fields are present depends on the task the
/// dataset was built for; the validator checks the shape at dispatch entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Full conversation, for sft/generation datasets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Turn>>,
    /// Explicit shared context for preference datasets. When absent it is
    /// derived from `chosen` minus its final turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<Vec<Turn>>,
    /// Context plus the preferred continuation (final-turn convention).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chosen: Option<Vec<Turn>>,
    /// Context plus the dispreferred continuation (final-turn convention).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected: Option<Vec<Turn>>,
}

impl RawRecord {
    /// Names of the fields actually present, for error reporting.
    #[must_use]
    pub fn present_keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        if self.messages.is_some() {
            keys.push("messages");
        }
        if self.prompt.is_some() {
            keys.push("prompt");
        }
        if self.chosen.is_some() {
            keys.push("chosen");
        }
        if self.rejected.is_some() {
            keys.push("rejected");
        }
        keys
    }
}

/// Flattened output of the task dispatcher. Created once per record,
/// immutable, with no aliasing back into the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormattedExample {
    /// sft/generation output.
    Text { text: String },
    /// simpo (preference) output. Listed before `Pair` so untagged
    /// deserialization tries the wider shape first.
    Triple {
        text_prompt: String,
        text_chosen: String,
        text_rejected: String,
    },
    /// rm output.
    Pair {
        text_chosen: String,
        text_rejected: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        let role: Role = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(role, Role::System);
    }

    #[test]
    fn test_well_formed_requires_leading_system_only() {
        let ok = vec![Turn::system("s"), Turn::user("u"), Turn::assistant("a")];
        assert!(is_well_formed(&ok));

        let no_system = vec![Turn::user("u"), Turn::assistant("a")];
        assert!(is_well_formed(&no_system));

        let late_system = vec![Turn::user("u"), Turn::system("s")];
        assert!(!is_well_formed(&late_system));

        assert!(!is_well_formed(&[]));
    }

    #[test]
    fn test_raw_record_present_keys() {
        let record = RawRecord {
            chosen: Some(vec![Turn::user("hi")]),
            rejected: Some(vec![Turn::user("hi")]),
            ..Default::default()
        };
        assert_eq!(record.present_keys(), vec!["chosen", "rejected"]);
    }

    #[test]
    fn test_raw_record_ignores_extra_columns() {
        let json = r#"{"messages": [{"role": "user", "content": "hi"}], "score": 0.5}"#;
        let record: RawRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.messages.unwrap().len(), 1);
        assert!(record.chosen.is_none());
    }

    #[test]
    fn test_formatted_example_round_trips_flat() {
        let triple = FormattedExample::Triple {
            text_prompt: "p".to_string(),
            text_chosen: "c".to_string(),
            text_rejected: "r".to_string(),
        };
        let json = serde_json::to_string(&triple).unwrap();
        assert!(json.contains("text_prompt"));
        let back: FormattedExample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, triple);
    }
}
