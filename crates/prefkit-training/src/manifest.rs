use crate::error::TrainingResult;
use crate::split::SplitId;
use crate::trainer::TrainMetrics;
use chrono::{DateTime, Utc};
use prefkit_data::{Task, TemplateSpec};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Identifier for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Record of what one run consumed and produced, written as
/// `run_manifest.json` in the output directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub created_at: DateTime<Utc>,
    pub model_id: String,
    pub task: Task,
    pub template: TemplateSpec,
    pub train_split_id: SplitId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_split_id: Option<SplitId>,
    pub train_rows: u64,
    pub eval_rows: u64,
    #[serde(default)]
    pub metrics: TrainMetrics,
}

/// Pretty-printed JSON write, used for manifests and metrics files.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> TrainingResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_round_trips() {
        let manifest = RunManifest {
            run_id: RunId::new(),
            created_at: Utc::now(),
            model_id: "princeton-nlp/Llama-3-Base-8B-SFT".to_string(),
            task: Task::Simpo,
            template: TemplateSpec::Default,
            train_split_id: SplitId("abc".to_string()),
            eval_split_id: None,
            train_rows: 10_000,
            eval_rows: 1_000,
            metrics: TrainMetrics::default(),
        };

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run_manifest.json");
        write_json(&path, &manifest).unwrap();

        let back: RunManifest =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.run_id, manifest.run_id);
        assert_eq!(back.task, Task::Simpo);
        assert_eq!(back.train_rows, 10_000);
    }
}
