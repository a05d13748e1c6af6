use crate::config::DatasetKey;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unknown dataset key '{0}' (expected nameplate, mto_future or flows)")]
    UnknownDatasetKey(String),

    #[error("failed to retrieve {key}: {reason}")]
    Retrieval { key: DatasetKey, reason: String },

    #[error("rejected {key} payload: {reason}")]
    InvalidPayload { key: DatasetKey, reason: String },

    #[error("{key} is missing required columns: {}", .missing.join(", "))]
    SchemaMismatch {
        key: DatasetKey,
        missing: Vec<&'static str>,
    },

    #[error("dropped {count} {key} rows with an unparseable gas day (first: '{first}')")]
    DateParseFailure {
        key: DatasetKey,
        count: usize,
        first: String,
    },

    #[error("{count} non-numeric {key} quantities (first: '{first}')")]
    QuantityParseFailure {
        key: DatasetKey,
        count: usize,
        first: String,
    },

    #[error("failed to parse {key}: {reason}")]
    Parse { key: DatasetKey, reason: String },

    #[error("no usable {0} data")]
    NoUsableData(&'static str),

    #[error("scenario consumption {0} TJ/day is outside 0..=100")]
    InvalidScenario(f64),

    #[error("cache I/O on {}: {source}", .path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build table: {0}")]
    Table(#[from] polars::prelude::PolarsError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub(crate) fn cache(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Cache {
            path: path.into(),
            source,
        }
    }
}
