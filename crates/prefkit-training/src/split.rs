use crate::error::{TrainingError, TrainingResult};
use prefkit_data::{
    format_example, ChatTokenizer, FormattedExample, RawRecord, Task, TemplateSpec,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Stable identifier for a formatted split (content hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SplitId(pub String);

/// One named, ordered dataset split of raw records.
#[derive(Debug, Clone)]
pub struct Split {
    pub name: String,
    pub records: Vec<RawRecord>,
}

impl Split {
    #[must_use]
    pub fn new(name: impl Into<String>, records: Vec<RawRecord>) -> Self {
        Self { name: name.into(), records }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A formatted preference row in the column names the trainer consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceRow {
    pub prompt: String,
    pub chosen: String,
    pub rejected: String,
}

/// Options for the parallel formatting map.
#[derive(Debug, Clone)]
pub struct FormatOptions {
    pub task: Task,
    pub spec: TemplateSpec,
    pub insert_system: bool,
    /// Worker threads for the map. Zero means one thread per core.
    pub workers: usize,
}

/// Apply the task formatter to every record of a split on a bounded worker
/// pool. Records are transformed independently; the output preserves input
/// order. The first formatting error aborts the whole split.
pub fn format_split(
    split: &Split,
    tokenizer: &dyn ChatTokenizer,
    options: &FormatOptions,
) -> TrainingResult<Vec<FormattedExample>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.workers)
        .build()
        .map_err(|e| TrainingError::Data(format!("failed to build worker pool: {e}")))?;

    let formatted = pool.install(|| {
        split
            .records
            .par_iter()
            .map(|record| {
                format_example(record, options.task, tokenizer, options.spec, options.insert_system)
            })
            .collect::<Result<Vec<_>, _>>()
    })?;

    Ok(formatted)
}

/// Rename preference columns to what the trainer needs:
/// `text_prompt -> prompt`, `text_chosen -> chosen`, `text_rejected -> rejected`.
pub fn rename_preference_columns(
    rows: Vec<FormattedExample>,
) -> TrainingResult<Vec<PreferenceRow>> {
    rows.into_iter()
        .map(|row| match row {
            FormattedExample::Triple { text_prompt, text_chosen, text_rejected } => {
                Ok(PreferenceRow {
                    prompt: text_prompt,
                    chosen: text_chosen,
                    rejected: text_rejected,
                })
            }
            other => Err(TrainingError::Data(format!(
                "cannot rename non-preference row for trainer consumption: {other:?}"
            ))),
        })
        .collect()
}

/// Read a JSONL split (one raw record per line). Blank lines are skipped;
/// a malformed line is an error naming its line number.
pub fn read_jsonl_split(path: &Path, name: impl Into<String>) -> TrainingResult<Split> {
    let contents = std::fs::read_to_string(path)?;
    let mut records = Vec::new();

    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: RawRecord = serde_json::from_str(line).map_err(|e| {
            TrainingError::Data(format!("failed to parse jsonl line {}: {}", idx + 1, e))
        })?;
        records.push(record);
    }

    Ok(Split::new(name, records))
}

/// Write rows as JSONL, one object per line.
pub fn write_jsonl_rows<T: Serialize>(path: &Path, rows: &[T]) -> TrainingResult<()> {
    let mut out = String::new();
    for row in rows {
        out.push_str(&serde_json::to_string(row)?);
        out.push('\n');
    }
    std::fs::write(path, out)?;
    Ok(())
}

/// Content hash over the serialized rows, stable across runs.
pub fn compute_split_id<T: Serialize>(rows: &[T]) -> TrainingResult<SplitId> {
    let mut hasher = Sha256::new();
    for row in rows {
        hasher.update(serde_json::to_vec(row)?);
        hasher.update(b"\n");
    }
    Ok(SplitId(hex::encode(hasher.finalize())))
}
