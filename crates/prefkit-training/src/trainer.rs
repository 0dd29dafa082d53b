use crate::error::TrainingResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Metrics reported by the trainer, augmented by the orchestrator with the
/// row counts of the splits it was fed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainMetrics {
    pub train_loss: Option<f64>,
    pub eval_loss: Option<f64>,
    pub steps: Option<u64>,
    pub train_samples: Option<u64>,
    pub eval_samples: Option<u64>,
}

/// Metadata attached to the model card and hub push.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCardMetadata {
    pub finetuned_from: String,
    pub dataset: Vec<String>,
    pub dataset_tags: Vec<String>,
    pub tags: Vec<String>,
}

/// External training backend. The orchestrator drives this strictly
/// sequentially; any internal parallelism is the backend's own concern.
#[async_trait]
pub trait Trainer: Send + Sync {
    fn id(&self) -> &'static str;

    /// Whether this process is the designated writer. Model-card creation
    /// and partial saves only happen on the main process.
    fn is_main_process(&self) -> bool;

    /// Run the training loop, optionally resuming from a checkpoint.
    async fn train(&self, resume_from: Option<&Path>) -> TrainingResult<TrainMetrics>;

    async fn evaluate(&self) -> TrainingResult<TrainMetrics>;

    async fn save_model(&self, path: &Path) -> TrainingResult<()>;

    async fn save_state(&self) -> TrainingResult<()>;

    async fn create_model_card(&self, metadata: &ModelCardMetadata) -> TrainingResult<()>;

    async fn push(&self, metadata: &ModelCardMetadata) -> TrainingResult<()>;
}
