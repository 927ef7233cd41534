use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failure taxonomy for the scoring pipeline.
///
/// Every variant except `Persistence` and `InvalidInput` is caught inside the
/// per-item pipeline and degraded to a forced no-match result; see
/// [`crate::pipeline::BatchScorer`].
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("download failed: {0}")]
    Download(String),

    #[error("noise conditioning failed: {0}")]
    Conditioning(String),

    #[error("audio decode failed: {0}")]
    Decode(String),

    #[error("feature extraction failed: {0}")]
    FeatureExtraction(String),

    #[error("transcription failed: {0}")]
    Transcription(String),

    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
