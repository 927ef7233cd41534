use tracing::{info, warn};

use crate::audio::decoder::decode_audio;
use crate::audio::denoise::NoiseSuppressor;
use crate::config::ScoringConfig;
use crate::error::{PipelineError, Result};
use crate::features::{FeatureExtractor, FeatureVector};
use crate::fetch::AudioFetcher;
use crate::gate::SpeechGate;
use crate::record::{AssessmentItemResult, ComparisonRecord, Remarks, ResultStore};
use crate::scoring::{
    compare_features, is_silent_or_low_voice, verdict, weighted_similarity, FeatureDistances,
    Verdict,
};
use crate::scratch::Scratch;
use crate::transcribe::Transcriber;

/// One multi-item assessment attempt: per-item reference and candidate URLs,
/// in item order.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct BatchRequest {
    pub attempt_id: String,
    pub activity_code: String,
    pub learner_id: String,
    pub section: String,
    pub assessment_type: String,
    pub reference_urls: Vec<String>,
    pub candidate_urls: Vec<String>,
    /// Overrides the configured similarity threshold when present.
    #[serde(default)]
    pub similarity_threshold: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub score: u32,
    pub results: Vec<AssessmentItemResult>,
}

/// Result of comparing one candidate clip against one reference clip.
#[derive(Debug, Clone)]
pub struct ComparisonOutcome {
    pub distances: Option<FeatureDistances>,
    pub similarity: f32,
    pub transcript: Option<String>,
    pub verdict: Verdict,
}

/// Runs the full scoring pipeline over every item of an assessment and
/// persists one [`ComparisonRecord`].
///
/// Items run strictly sequentially, in input order. Any per-item failure
/// (download, conditioning, transcription, decode, extraction) degrades to a
/// forced no-match entry; only a persistence failure aborts the batch.
pub struct BatchScorer {
    config: ScoringConfig,
    extractor: FeatureExtractor,
    gate: SpeechGate,
    fetcher: Box<dyn AudioFetcher>,
    suppressor: Box<dyn NoiseSuppressor>,
    transcriber: Box<dyn Transcriber>,
    store: Box<dyn ResultStore>,
}

impl BatchScorer {
    pub fn new(
        config: ScoringConfig,
        fetcher: Box<dyn AudioFetcher>,
        suppressor: Box<dyn NoiseSuppressor>,
        transcriber: Box<dyn Transcriber>,
        store: Box<dyn ResultStore>,
    ) -> Result<Self> {
        config.validate()?;
        let extractor = FeatureExtractor::new(config.frame_size);
        let gate = SpeechGate::new(&config);
        Ok(Self {
            config,
            extractor,
            gate,
            fetcher,
            suppressor,
            transcriber,
            store,
        })
    }

    pub fn run(&self, request: &BatchRequest) -> Result<BatchOutcome> {
        if request.reference_urls.len() != request.candidate_urls.len() {
            return Err(PipelineError::InvalidInput(format!(
                "item count mismatch: {} reference vs {} candidate URLs",
                request.reference_urls.len(),
                request.candidate_urls.len()
            )));
        }
        if request.reference_urls.is_empty() {
            return Err(PipelineError::InvalidInput(
                "assessment contains no items".into(),
            ));
        }
        let threshold = request
            .similarity_threshold
            .unwrap_or(self.config.similarity_threshold);
        info!(
            attempt = %request.attempt_id,
            activity = %request.activity_code,
            items = request.reference_urls.len(),
            threshold,
            "starting batch comparison"
        );

        let mut results = Vec::with_capacity(request.reference_urls.len());
        let mut score = 0_u32;
        for (index, (reference_url, candidate_url)) in request
            .reference_urls
            .iter()
            .zip(request.candidate_urls.iter())
            .enumerate()
        {
            let item_code = format!("Itemcode{}", index + 1);
            let outcome = match self.compare_pair(reference_url, candidate_url, threshold) {
                Ok(outcome) => outcome,
                Err(err) => {
                    // Infrastructure failure must never inflate the score.
                    warn!(item = %item_code, error = %err, "item pipeline failed; forcing no-match");
                    self.forced_outcome(None)
                }
            };
            let remarks = match outcome.verdict {
                Verdict::Match => {
                    score += 1;
                    Remarks::Correct
                }
                Verdict::NoMatch => Remarks::Incorrect,
            };
            info!(
                item = %item_code,
                similarity = outcome.similarity,
                ?remarks,
                "item scored"
            );
            results.push(AssessmentItemResult {
                item_code,
                mfcc_distance: outcome.distances.map(|d| d.mfcc),
                chroma_distance: outcome.distances.map(|d| d.chroma),
                zcr_distance: outcome.distances.map(|d| d.zcr),
                weighted_similarity: outcome.similarity,
                transcript: outcome.transcript,
                remarks,
            });
        }

        let record = ComparisonRecord {
            attempt_id: request.attempt_id.clone(),
            activity_code: request.activity_code.clone(),
            learner_id: request.learner_id.clone(),
            section: request.section.clone(),
            assessment_type: request.assessment_type.clone(),
            results: results.clone(),
        };
        self.store.insert(&record)?;

        info!(
            attempt = %request.attempt_id,
            score,
            total = results.len(),
            "batch comparison complete"
        );
        Ok(BatchOutcome { score, results })
    }

    /// Full per-item pipeline: fetch both clips, condition the candidate,
    /// gate on speech presence, extract features, compare, score.
    fn compare_pair(
        &self,
        reference_url: &str,
        candidate_url: &str,
        threshold: f32,
    ) -> Result<ComparisonOutcome> {
        // Scratch files are owned by this invocation and removed on every
        // exit path when `scratch` drops.
        let scratch = Scratch::new()?;
        let reference_path = scratch.path("reference");
        let candidate_path = scratch.path("candidate");
        let conditioned_path = scratch.path("conditioned.wav");

        self.fetcher.fetch(reference_url, &reference_path)?;
        self.fetcher.fetch(candidate_url, &candidate_path)?;

        self.suppressor.suppress(&candidate_path, &conditioned_path)?;

        let transcript = self
            .transcriber
            .transcribe(&conditioned_path, &self.config.language_code)?;
        if !self.gate.evaluate(&transcript).accepted() {
            return Ok(self.forced_outcome(Some(transcript)));
        }

        let reference_audio = decode_audio(&reference_path)?;
        let candidate_audio = decode_audio(&conditioned_path)?;
        let reference_features = self.extractor.extract(&reference_audio)?;
        let candidate_features = self.extractor.extract(&candidate_audio)?;

        if is_silent_or_low_voice(&candidate_features, &self.config.silence) {
            info!("silent or low-voice candidate; forcing no-match");
            return Ok(self.forced_outcome(Some(transcript)));
        }

        self.score_pair(
            &reference_features,
            &candidate_features,
            transcript,
            threshold,
        )
    }

    fn score_pair(
        &self,
        reference: &FeatureVector,
        candidate: &FeatureVector,
        transcript: String,
        threshold: f32,
    ) -> Result<ComparisonOutcome> {
        let distances = compare_features(reference, candidate)?;
        let similarity = weighted_similarity(&distances, &self.config.weights);
        Ok(ComparisonOutcome {
            distances: Some(distances),
            similarity,
            transcript: Some(transcript),
            verdict: verdict(similarity, threshold),
        })
    }

    /// Fixed penalty outcome used for gate rejections, silence detection, and
    /// infrastructure failures; acoustic distances stay unset.
    fn forced_outcome(&self, transcript: Option<String>) -> ComparisonOutcome {
        ComparisonOutcome {
            distances: None,
            similarity: self.config.penalty_score,
            transcript,
            verdict: Verdict::NoMatch,
        }
    }
}
