use prefkit_data::FormatError;
use thiserror::Error;

pub type TrainingResult<T> = std::result::Result<T, TrainingError>;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("dataset error: {0}")]
    Data(String),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("trainer error: {0}")]
    Trainer(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
