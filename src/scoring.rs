use crate::config::{SilenceThresholds, WeightProfile};
use crate::error::{PipelineError, Result};
use crate::features::FeatureVector;

/// Per-family Euclidean distances between two feature vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureDistances {
    pub mfcc: f32,
    pub chroma: f32,
    pub zcr: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Match,
    NoMatch,
}

/// Compare two equal-shape feature vectors. Dimension mismatch is a hard
/// failure: distances over truncated vectors would be silently wrong.
pub fn compare_features(a: &FeatureVector, b: &FeatureVector) -> Result<FeatureDistances> {
    Ok(FeatureDistances {
        mfcc: euclidean(&a.mfcc, &b.mfcc, "mfcc")?,
        chroma: euclidean(&a.chroma, &b.chroma, "chroma")?,
        zcr: euclidean(&a.zcr, &b.zcr, "zcr")?,
    })
}

/// Convex combination of the three distances. Lower = more similar; pure.
pub fn weighted_similarity(distances: &FeatureDistances, profile: &WeightProfile) -> f32 {
    let (w_mfcc, w_chroma, w_zcr) = profile.weights();
    w_mfcc * distances.mfcc + w_chroma * distances.chroma + w_zcr * distances.zcr
}

pub fn verdict(similarity: f32, threshold: f32) -> Verdict {
    if similarity <= threshold {
        Verdict::Match
    } else {
        Verdict::NoMatch
    }
}

/// Low-energy near-constant signals can land deceptively close to any
/// reference, so they are screened out before comparison.
pub fn is_silent_or_low_voice(features: &FeatureVector, thresholds: &SilenceThresholds) -> bool {
    features.mean_zcr() < thresholds.zcr && features.energy < thresholds.energy
}

fn euclidean(a: &[f32], b: &[f32], family: &str) -> Result<f32> {
    if a.len() != b.len() {
        return Err(PipelineError::FeatureExtraction(format!(
            "{family} dimension mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    let sum: f32 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
    Ok(sum.sqrt())
}
