//! Prefkit Training
//!
//! Orchestration around the formatting core:
//! - Dataset splits with JSONL I/O and an order-preserving parallel
//!   formatting map (`Split`, `format_split`)
//! - The external trainer contract (`Trainer`)
//! - Checkpoint discovery (`find_last_checkpoint`)
//! - Run manifests (`RunManifest`)
//! - The end-to-end prepare/train/evaluate pipeline with partial-failure
//!   recovery (`prepare_split`, `run_training`)

pub mod checkpoint;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod split;
pub mod trainer;

pub use checkpoint::find_last_checkpoint;
pub use error::{TrainingError, TrainingResult};
pub use manifest::{write_json, RunId, RunManifest};
pub use pipeline::{prepare_split, run_training, PipelineConfig, PreparedSplit};
pub use split::{
    compute_split_id, format_split, read_jsonl_split, rename_preference_columns,
    write_jsonl_rows, FormatOptions, PreferenceRow, Split, SplitId,
};
pub use trainer::{ModelCardMetadata, TrainMetrics, Trainer};
