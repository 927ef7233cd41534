mod spectral;

use ndarray::{Array2, Axis};
use tracing::debug;

use crate::audio::{resample, AudioData};
use crate::error::{PipelineError, Result};
use spectral::SpectralAnalyzer;

pub use spectral::{CHROMA_BINS, MFCC_COUNT};

/// All spectral analysis happens at this rate so two clips of different
/// origin produce comparable feature vectors.
pub const ANALYSIS_SAMPLE_RATE: u32 = 16_000;

pub const DEFAULT_FRAME_SIZE: usize = 512;

/// Averaged per-frame acoustic description of one clip.
///
/// Dimensions are fixed by the frame configuration (13 cepstral coefficients,
/// 12 pitch classes, 1 zero-crossing rate); [`crate::scoring::compare_features`]
/// fails closed if two vectors disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub mfcc: Vec<f32>,
    pub chroma: Vec<f32>,
    pub zcr: Vec<f32>,
    pub energy: f32,
}

impl FeatureVector {
    pub fn mean_zcr(&self) -> f32 {
        if self.zcr.is_empty() {
            return 0.0;
        }
        self.zcr.iter().sum::<f32>() / self.zcr.len() as f32
    }
}

/// Splits samples into fixed-size non-overlapping frames, zero-padding the
/// final partial frame. The frame count is always `ceil(len / frame_size)`.
pub fn chunk_frames(samples: &[f32], frame_size: usize) -> Vec<Vec<f32>> {
    samples
        .chunks(frame_size)
        .map(|chunk| {
            let mut frame = chunk.to_vec();
            frame.resize(frame_size, 0.0);
            frame
        })
        .collect()
}

/// Computes averaged MFCC / chroma / ZCR features from decoded audio.
pub struct FeatureExtractor {
    frame_size: usize,
    analyzer: SpectralAnalyzer,
}

impl FeatureExtractor {
    pub fn new(frame_size: usize) -> Self {
        Self {
            frame_size,
            analyzer: SpectralAnalyzer::new(frame_size, ANALYSIS_SAMPLE_RATE),
        }
    }

    pub fn extract(&self, audio: &AudioData) -> Result<FeatureVector> {
        if audio.samples.is_empty() {
            return Err(PipelineError::FeatureExtraction(
                "cannot extract features from empty audio".into(),
            ));
        }

        let samples =
            resample::linear_resample(&audio.samples, audio.sample_rate, ANALYSIS_SAMPLE_RATE)
                .map_err(|err| PipelineError::FeatureExtraction(err.to_string()))?;
        let frames = chunk_frames(&samples, self.frame_size);
        let frame_count = frames.len();

        let mut mfcc_flat = Vec::with_capacity(frame_count * MFCC_COUNT);
        let mut chroma_flat = Vec::with_capacity(frame_count * CHROMA_BINS);
        let mut zcr_sum = 0.0_f32;
        let mut energy_sum = 0.0_f32;

        for frame in &frames {
            let magnitudes = self.analyzer.magnitudes(frame);
            mfcc_flat.extend(self.analyzer.mfcc(&magnitudes));
            chroma_flat.extend(self.analyzer.chroma(&magnitudes));
            zcr_sum += zero_crossings(frame);
            energy_sum += frame.iter().map(|s| s * s).sum::<f32>();
        }

        let mfcc = mean_rows(mfcc_flat, frame_count, MFCC_COUNT)?;
        let chroma = mean_rows(chroma_flat, frame_count, CHROMA_BINS)?;
        let vector = FeatureVector {
            mfcc,
            chroma,
            zcr: vec![zcr_sum / frame_count as f32],
            energy: energy_sum / frame_count as f32,
        };
        debug!(
            frames = frame_count,
            mean_zcr = vector.mean_zcr(),
            energy = vector.energy,
            "features extracted"
        );
        Ok(vector)
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_SIZE)
    }
}

fn mean_rows(flat: Vec<f32>, rows: usize, cols: usize) -> Result<Vec<f32>> {
    let matrix = Array2::from_shape_vec((rows, cols), flat)
        .map_err(|err| PipelineError::FeatureExtraction(format!("bad feature shape: {err}")))?;
    let mean = matrix.mean_axis(Axis(0)).ok_or_else(|| {
        PipelineError::FeatureExtraction("no frames available for averaging".into())
    })?;
    Ok(mean.to_vec())
}

/// Number of sign changes in one frame.
fn zero_crossings(frame: &[f32]) -> f32 {
    frame
        .windows(2)
        .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
        .count() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunking_pads_final_frame() {
        let frames = chunk_frames(&[1.0; 1100], 512);
        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|frame| frame.len() == 512));
        assert_eq!(frames[2][75], 1.0);
        assert_eq!(frames[2][76], 0.0);
    }

    #[test]
    fn chunking_exact_multiple_has_no_padding() {
        let frames = chunk_frames(&[0.5; 1024], 512);
        assert_eq!(frames.len(), 2);
        assert!(frames[1].iter().all(|&s| s == 0.5));
    }

    #[test]
    fn zero_crossings_counts_sign_changes() {
        assert_eq!(zero_crossings(&[1.0, -1.0, 1.0, -1.0]), 3.0);
        assert_eq!(zero_crossings(&[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn empty_audio_is_rejected() {
        let audio = AudioData {
            samples: Vec::new(),
            sample_rate: 16_000,
        };
        let result = FeatureExtractor::default().extract(&audio);
        assert!(matches!(
            result,
            Err(PipelineError::FeatureExtraction(_))
        ));
    }

    #[test]
    fn feature_vector_has_fixed_dimensions() {
        let audio = AudioData {
            samples: (0..4000)
                .map(|i| (std::f32::consts::TAU * 220.0 * i as f32 / 16_000.0).sin())
                .collect(),
            sample_rate: 16_000,
        };
        let features = FeatureExtractor::default().extract(&audio).unwrap();
        assert_eq!(features.mfcc.len(), MFCC_COUNT);
        assert_eq!(features.chroma.len(), CHROMA_BINS);
        assert_eq!(features.zcr.len(), 1);
        assert!(features.energy > 0.0);
    }

    #[test]
    fn digital_silence_has_zero_zcr_and_energy() {
        let audio = AudioData {
            samples: vec![0.0; 8000],
            sample_rate: 16_000,
        };
        let features = FeatureExtractor::default().extract(&audio).unwrap();
        assert_eq!(features.mean_zcr(), 0.0);
        assert_eq!(features.energy, 0.0);
    }
}
