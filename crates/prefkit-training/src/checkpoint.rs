use crate::error::TrainingResult;
use std::path::{Path, PathBuf};

/// Find the most recent checkpoint directory under `output_dir`.
///
/// Checkpoints are directories named `checkpoint-<step>`; the one with the
/// highest step wins. A missing output directory is not an error, it just
/// means there is nothing to resume from.
pub fn find_last_checkpoint(output_dir: &Path) -> TrainingResult<Option<PathBuf>> {
    let dir = match std::fs::read_dir(output_dir) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut last: Option<(u64, PathBuf)> = None;
    for entry in dir {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(step) = name.strip_prefix("checkpoint-").and_then(|s| s.parse::<u64>().ok())
        else {
            continue;
        };
        if last.as_ref().map_or(true, |(best, _)| step > *best) {
            last = Some((step, path));
        }
    }

    Ok(last.map(|(_, path)| path))
}
