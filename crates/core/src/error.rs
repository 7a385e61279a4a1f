use thiserror::Error;

pub type CaptureResult<T> = Result<T, CaptureError>;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Autocapture unavailable: missing required platform APIs ({0})")]
    CapabilityMissing(String),

    #[error("Block URL regex evaluation failed for pattern {pattern:?}: {source}")]
    BlockRegexEvaluation {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Scroll metric unavailable: {0}")]
    ScrollMetricUnavailable(String),

    #[error("Dispatch failed for event {event}")]
    DispatchFailure { event: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
