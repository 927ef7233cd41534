//! Pronunciation-scoring pipeline for literacy assessments: compares a
//! learner's recorded attempt against a reference clip and decides whether
//! the pronunciation is an acceptable match.
//!
//! The flow per item: fetch both clips, noise-condition the candidate, gate
//! on speech presence via a transcription service, extract averaged spectral
//! features (MFCC, pitch-class energy, zero-crossing rate) from both files,
//! and combine per-family Euclidean distances into one weighted similarity
//! score. [`pipeline::BatchScorer`] runs this per assessment item and
//! persists a single append-only record per attempt.

pub mod audio;
pub mod config;
pub mod error;
pub mod features;
pub mod fetch;
pub mod gate;
pub mod pipeline;
pub mod record;
pub mod scoring;
pub mod scratch;
pub mod transcribe;

pub use config::{RejectionStrategy, ScoringConfig, SilenceThresholds, WeightProfile};
pub use error::{PipelineError, Result};
pub use pipeline::{BatchOutcome, BatchRequest, BatchScorer, ComparisonOutcome};
