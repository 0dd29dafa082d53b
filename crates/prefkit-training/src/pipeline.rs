use crate::checkpoint::find_last_checkpoint;
use crate::error::TrainingResult;
use crate::manifest::{write_json, RunId, RunManifest};
use crate::split::{compute_split_id, format_split, FormatOptions, Split, SplitId};
use crate::trainer::{ModelCardMetadata, TrainMetrics, Trainer};
use chrono::Utc;
use prefkit_data::{ChatTokenizer, FormattedExample, Task, TemplateSpec};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Process-level configuration for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Which dispatch branch records are formatted for.
    pub task: Task,
    /// Base model identifier; also drives template auto-selection.
    pub model_id: String,
    /// Explicit template override. `None` selects from the model id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateSpec>,
    /// Toggle for empty-system-message insertion.
    pub insert_system: bool,
    /// Worker threads for the formatting map (0 = one per core).
    pub workers: usize,
    /// Leading-prefix row cap for the training split.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_cap: Option<usize>,
    /// Leading-prefix row cap for the evaluation split.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_cap: Option<usize>,
    /// Where the trainer writes the model and where run artifacts land.
    pub output_dir: PathBuf,
    /// Explicit checkpoint to resume from; `None` scans `output_dir`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_from: Option<PathBuf>,
    /// Whether to publish after a successful run.
    pub push_to_hub: bool,
    /// Dataset names recorded on the model card.
    #[serde(default)]
    pub dataset_tags: Vec<String>,
    pub seed: u64,
}

impl PipelineConfig {
    /// The template spec bound to this run: the explicit override if set,
    /// otherwise selected once from the model identity.
    #[must_use]
    pub fn template_spec(&self) -> TemplateSpec {
        self.template.unwrap_or_else(|| TemplateSpec::for_model(&self.model_id))
    }

    fn model_card_metadata(&self) -> ModelCardMetadata {
        ModelCardMetadata {
            finetuned_from: self.model_id.clone(),
            dataset: self.dataset_tags.clone(),
            dataset_tags: self.dataset_tags.clone(),
            tags: vec!["prefkit".to_string()],
        }
    }
}

/// A split after formatting: flattened rows, content id, original name.
#[derive(Debug, Clone)]
pub struct PreparedSplit {
    pub name: String,
    pub rows: Vec<FormattedExample>,
    pub id: SplitId,
}

impl PreparedSplit {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Format every record of a split, apply the split's row cap (deterministic
/// leading prefix, not a sample), and log the first formatted row.
pub fn prepare_split(
    split: &Split,
    tokenizer: &dyn ChatTokenizer,
    config: &PipelineConfig,
    cap: Option<usize>,
) -> TrainingResult<PreparedSplit> {
    let options = FormatOptions {
        task: config.task,
        spec: config.template_spec(),
        insert_system: config.insert_system,
        workers: config.workers,
    };

    let mut rows = format_split(split, tokenizer, &options)?;

    if let Some(cap) = cap {
        if rows.len() > cap {
            rows.truncate(cap);
            info!(split = %split.name, cap, "split limited to leading prefix");
        }
    }

    if let Some(first) = rows.first() {
        log_sample(&split.name, first);
    }

    let id = compute_split_id(&rows)?;
    Ok(PreparedSplit { name: split.name.clone(), rows, id })
}

fn log_sample(split: &str, row: &FormattedExample) {
    match row {
        FormattedExample::Text { text } => {
            info!(split, "sample text: {}...", preview(text));
        }
        FormattedExample::Pair { text_chosen, text_rejected } => {
            info!(split, "sample chosen: {}...", preview(text_chosen));
            info!(split, "sample rejected: {}...", preview(text_rejected));
        }
        FormattedExample::Triple { text_prompt, text_chosen, text_rejected } => {
            info!(split, "sample prompt: {}...", preview(text_prompt));
            info!(split, "sample chosen: {}...", preview(text_chosen));
            info!(split, "sample rejected: {}...", preview(text_rejected));
        }
    }
}

/// First 200 characters, respecting char boundaries.
fn preview(text: &str) -> &str {
    match text.char_indices().nth(200) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Drive the external train -> save -> evaluate -> publish sequence.
///
/// Two fault-isolation scopes: the outer one catches any trainer failure,
/// attempts one best-effort save of the partially trained model, and
/// re-raises the original error; the inner (partial save) scope only logs
/// its own failure and never propagates it, so the true cause stays visible.
pub async fn run_training(
    trainer: &dyn Trainer,
    config: &PipelineConfig,
    train: &PreparedSplit,
    eval: &PreparedSplit,
) -> TrainingResult<RunManifest> {
    let resume_from = match &config.resume_from {
        Some(path) => Some(path.clone()),
        None => find_last_checkpoint(&config.output_dir)?,
    };
    if let Some(checkpoint) = &resume_from {
        info!("checkpoint detected, resuming training at {}", checkpoint.display());
    }

    match train_sequence(trainer, config, resume_from.as_deref(), train, eval).await {
        Ok(metrics) => {
            let manifest = RunManifest {
                run_id: RunId::new(),
                created_at: Utc::now(),
                model_id: config.model_id.clone(),
                task: config.task,
                template: config.template_spec(),
                train_split_id: train.id.clone(),
                eval_split_id: Some(eval.id.clone()),
                train_rows: train.len() as u64,
                eval_rows: eval.len() as u64,
                metrics,
            };
            std::fs::create_dir_all(&config.output_dir)?;
            write_json(&config.output_dir.join("run_manifest.json"), &manifest)?;
            write_json(&config.output_dir.join("metrics.json"), &manifest.metrics)?;
            Ok(manifest)
        }
        Err(err) => {
            error!("training failed: {err}");
            attempt_partial_save(trainer, config).await;
            Err(err)
        }
    }
}

async fn train_sequence(
    trainer: &dyn Trainer,
    config: &PipelineConfig,
    resume_from: Option<&Path>,
    train: &PreparedSplit,
    eval: &PreparedSplit,
) -> TrainingResult<TrainMetrics> {
    let mut metrics = trainer.train(resume_from).await?;
    metrics.train_samples = Some(train.len() as u64);
    trainer.save_state().await?;
    info!("*** Training complete ***");

    info!("*** Save model ***");
    trainer.save_model(&config.output_dir).await?;
    info!("model saved to {}", config.output_dir.display());

    if trainer.is_main_process() {
        trainer.create_model_card(&config.model_card_metadata()).await?;
    }

    info!("*** Evaluate ***");
    let eval_metrics = trainer.evaluate().await?;
    metrics.eval_loss = eval_metrics.eval_loss;
    metrics.eval_samples = Some(eval.len() as u64);

    if config.push_to_hub {
        info!("pushing to hub...");
        trainer.push(&config.model_card_metadata()).await?;
    }

    Ok(metrics)
}

/// Best-effort save of whatever the trainer has, to an alternate location so
/// a later successful run never collides with it. Failure here is logged
/// and swallowed; the caller re-raises the original training error.
async fn attempt_partial_save(trainer: &dyn Trainer, config: &PipelineConfig) {
    if !trainer.is_main_process() {
        return;
    }
    info!("attempting to save partial model...");
    let partial = partial_output_dir(&config.output_dir);
    if let Err(save_err) = trainer.save_model(&partial).await {
        error!("failed to save partial model: {save_err}");
    }
}

fn partial_output_dir(output_dir: &Path) -> PathBuf {
    let mut dir = output_dir.as_os_str().to_os_string();
    dir.push("_partial");
    PathBuf::from(dir)
}
