use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::features::DEFAULT_FRAME_SIZE;

const WEIGHT_TOLERANCE: f32 = 1e-6;

/// Named convex weight combinations observed across deployment revisions.
/// Which one is authoritative is a product decision, so the profile is
/// selected by configuration rather than hard-coded.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightProfile {
    /// 0.4 mfcc / 0.3 chroma / 0.3 zcr
    Balanced,
    /// 0.6 mfcc / 0.1 chroma / 0.3 zcr
    TimbreHeavy,
    /// 0.5 mfcc / 0.1 chroma / 0.4 zcr
    CrossingHeavy,
    Custom {
        mfcc: f32,
        chroma: f32,
        zcr: f32,
    },
}

impl WeightProfile {
    /// (mfcc, chroma, zcr) weights; always sum to 1.0 for the named profiles.
    pub fn weights(&self) -> (f32, f32, f32) {
        match self {
            WeightProfile::Balanced => (0.4, 0.3, 0.3),
            WeightProfile::TimbreHeavy => (0.6, 0.1, 0.3),
            WeightProfile::CrossingHeavy => (0.5, 0.1, 0.4),
            WeightProfile::Custom { mfcc, chroma, zcr } => (*mfcc, *chroma, *zcr),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let (mfcc, chroma, zcr) = self.weights();
        if mfcc < 0.0 || chroma < 0.0 || zcr < 0.0 {
            return Err(PipelineError::InvalidInput(
                "feature weights must be non-negative".into(),
            ));
        }
        let sum = mfcc + chroma + zcr;
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(PipelineError::InvalidInput(format!(
                "feature weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

impl Default for WeightProfile {
    fn default() -> Self {
        WeightProfile::Balanced
    }
}

/// How the speech gate treats a non-empty transcript. The minimum-length
/// check always applies first.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RejectionStrategy {
    /// Accept anything that passes the minimum-length check.
    LengthOnly,
    /// Reject bracketed non-speech annotations such as "[music]".
    #[default]
    JunkPattern,
    /// Reject transcripts outside a fixed lexicon of expected syllables/words.
    AllowList { entries: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SilenceThresholds {
    pub zcr: f32,
    pub energy: f32,
}

impl Default for SilenceThresholds {
    fn default() -> Self {
        Self {
            zcr: 10.0,
            energy: 0.03,
        }
    }
}

/// Deployment-time tuning for the whole scoring pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: WeightProfile,
    pub rejection: RejectionStrategy,
    pub similarity_threshold: f32,
    pub penalty_score: f32,
    pub min_transcript_chars: usize,
    pub silence: SilenceThresholds,
    pub language_code: String,
    pub frame_size: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: WeightProfile::default(),
            rejection: RejectionStrategy::default(),
            similarity_threshold: 20.0,
            penalty_score: 100.0,
            min_transcript_chars: 2,
            silence: SilenceThresholds::default(),
            language_code: "fil".to_string(),
            frame_size: DEFAULT_FRAME_SIZE,
        }
    }
}

impl ScoringConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: ScoringConfig = serde_json::from_str(raw)
            .map_err(|err| PipelineError::InvalidInput(format!("bad config JSON: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            PipelineError::InvalidInput(format!(
                "failed to read config file {}: {err}",
                path.display()
            ))
        })?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        if self.similarity_threshold < 0.0 {
            return Err(PipelineError::InvalidInput(
                "similarity_threshold must be non-negative".into(),
            ));
        }
        if self.penalty_score <= self.similarity_threshold {
            return Err(PipelineError::InvalidInput(
                "penalty_score must exceed similarity_threshold".into(),
            ));
        }
        if self.frame_size == 0 {
            return Err(PipelineError::InvalidInput(
                "frame_size must be positive".into(),
            ));
        }
        if self.language_code.is_empty() {
            return Err(PipelineError::InvalidInput(
                "language_code must not be empty".into(),
            ));
        }
        if let RejectionStrategy::AllowList { entries } = &self.rejection {
            if entries.is_empty() {
                return Err(PipelineError::InvalidInput(
                    "allow-list rejection requires at least one entry".into(),
                ));
            }
        }
        Ok(())
    }
}
