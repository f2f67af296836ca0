use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FraudError {
    #[error("model not defined: assign a model to the lifecycle before training")]
    UndefinedModel,

    #[error("can't find {path} in cwd={cwd}")]
    FileNotFound { path: PathBuf, cwd: PathBuf },

    #[error("no transactions for entity {entity} on day {day}")]
    EmptyAggregate { entity: String, day: String },

    #[error("scorer is missing a required loaded component: {0}")]
    MissingComponent(&'static str),

    #[error("{0} has not been fitted")]
    NotFitted(&'static str),

    #[error("column '{0}' not found in CSV header")]
    MissingColumn(String),

    #[error("row {row}: column '{column}' has non-numeric value '{value}'")]
    InvalidValue { row: usize, column: String, value: String },

    #[error("invalid vector dimension: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("training diverged in epoch {epoch}: loss is {loss}")]
    Diverged { epoch: usize, loss: f64 },

    #[error("dataset is empty: {0}")]
    EmptyDataset(String),

    #[error("config error: {0}")]
    InvalidConfig(String),

    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("plot error: {0}")]
    Plot(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("checkpoint serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl FraudError {
    /// Builds a `FileNotFound` naming the path and the current working directory.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        FraudError::FileNotFound {
            path: path.into(),
            cwd: std::env::current_dir().unwrap_or_default(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FraudError>;
