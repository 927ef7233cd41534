use std::path::Path;
use std::sync::{Arc, Mutex};

use bigkas::audio::denoise::NoiseSuppressor;
use bigkas::fetch::AudioFetcher;
use bigkas::pipeline::{BatchRequest, BatchScorer};
use bigkas::record::{ComparisonRecord, Remarks, ResultStore};
use bigkas::transcribe::Transcriber;
use bigkas::{PipelineError, ScoringConfig};

const SAMPLE_RATE: u32 = 16_000;

/// Serves deterministic WAV fixtures keyed by URL substring; URLs containing
/// "fail" simulate a network error.
struct FakeFetcher;

impl AudioFetcher for FakeFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), PipelineError> {
        if url.contains("fail") {
            return Err(PipelineError::Download(format!("{url} unreachable")));
        }
        let samples = if url.contains("silence") {
            vec![0.0_f32; SAMPLE_RATE as usize]
        } else {
            tone_samples(440.0, 1.0)
        };
        write_wav(dest, &samples);
        Ok(())
    }
}

/// Conditioning that just copies the file, keeping comparisons bit-exact.
struct PassthroughSuppressor;

impl NoiseSuppressor for PassthroughSuppressor {
    fn suppress(&self, input: &Path, output: &Path) -> Result<(), PipelineError> {
        std::fs::copy(input, output)
            .map_err(|err| PipelineError::Conditioning(err.to_string()))?;
        Ok(())
    }
}

struct FakeTranscriber {
    transcript: String,
}

impl Transcriber for FakeTranscriber {
    fn transcribe(&self, _audio: &Path, _language_code: &str) -> Result<String, PipelineError> {
        Ok(self.transcript.clone())
    }
}

#[derive(Default)]
struct MemoryStore {
    records: Mutex<Vec<ComparisonRecord>>,
    fail: bool,
}

impl ResultStore for MemoryStore {
    fn insert(&self, record: &ComparisonRecord) -> Result<(), PipelineError> {
        if self.fail {
            return Err(PipelineError::Persistence("store offline".into()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Keeps a handle on the store after the scorer takes ownership of its box.
struct SharedStore(Arc<MemoryStore>);

impl ResultStore for SharedStore {
    fn insert(&self, record: &ComparisonRecord) -> Result<(), PipelineError> {
        self.0.insert(record)
    }
}

fn tone_samples(freq: f32, seconds: f32) -> Vec<f32> {
    (0..(SAMPLE_RATE as f32 * seconds) as usize)
        .map(|i| (std::f32::consts::TAU * freq * i as f32 / SAMPLE_RATE as f32).sin() * 0.5)
        .collect()
}

fn write_wav(path: &Path, samples: &[f32]) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &sample in samples {
        writer.write_sample((sample * 32767.0) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

fn request(reference_urls: Vec<&str>, candidate_urls: Vec<&str>) -> BatchRequest {
    BatchRequest {
        attempt_id: "attempt-1".into(),
        activity_code: "ACT-3".into(),
        learner_id: "123456789012".into(),
        section: "Sampaguita".into(),
        assessment_type: "Pagbasa".into(),
        reference_urls: reference_urls.into_iter().map(String::from).collect(),
        candidate_urls: candidate_urls.into_iter().map(String::from).collect(),
        similarity_threshold: None,
    }
}

fn scorer_with(transcript: &str, store: MemoryStore) -> BatchScorer {
    BatchScorer::new(
        ScoringConfig::default(),
        Box::new(FakeFetcher),
        Box::new(PassthroughSuppressor),
        Box::new(FakeTranscriber {
            transcript: transcript.into(),
        }),
        Box::new(store),
    )
    .unwrap()
}

#[test]
fn identical_audio_scores_zero_similarity_and_correct() {
    let scorer = scorer_with("bata", MemoryStore::default());
    let outcome = scorer
        .run(&request(vec!["https://cdn/tone.wav"], vec!["https://cdn/tone.wav"]))
        .unwrap();

    assert_eq!(outcome.score, 1);
    let result = &outcome.results[0];
    assert_eq!(result.remarks, Remarks::Correct);
    assert!(result.weighted_similarity.abs() < 1e-3);
    assert_eq!(result.mfcc_distance, Some(0.0));
    assert_eq!(result.chroma_distance, Some(0.0));
    assert_eq!(result.zcr_distance, Some(0.0));
    assert_eq!(result.transcript.as_deref(), Some("bata"));
}

#[test]
fn digital_silence_candidate_forces_penalty_without_distances() {
    let scorer = scorer_with("bata", MemoryStore::default());
    let outcome = scorer
        .run(&request(
            vec!["https://cdn/tone.wav"],
            vec!["https://cdn/silence.wav"],
        ))
        .unwrap();

    assert_eq!(outcome.score, 0);
    let result = &outcome.results[0];
    assert_eq!(result.remarks, Remarks::Incorrect);
    assert_eq!(result.weighted_similarity, 100.0);
    assert_eq!(result.mfcc_distance, None);
    assert_eq!(result.chroma_distance, None);
    assert_eq!(result.zcr_distance, None);
}

#[test]
fn empty_transcript_is_rejected_before_comparison() {
    // Identical clips would score 0 if the gate let them through; the
    // penalty proves the rejection happened first.
    let scorer = scorer_with("", MemoryStore::default());
    let outcome = scorer
        .run(&request(vec!["https://cdn/tone.wav"], vec!["https://cdn/tone.wav"]))
        .unwrap();

    let result = &outcome.results[0];
    assert_eq!(result.remarks, Remarks::Incorrect);
    assert_eq!(result.weighted_similarity, 100.0);
    assert_eq!(result.mfcc_distance, None);
}

#[test]
fn batch_of_ten_keeps_input_order_and_counts_matches() {
    let mut references = Vec::new();
    let mut candidates = Vec::new();
    for i in 0..10 {
        references.push("https://cdn/tone.wav");
        // Items 0-5 match the reference; 6-9 are silent and forced incorrect.
        candidates.push(if i < 6 {
            "https://cdn/tone.wav"
        } else {
            "https://cdn/silence.wav"
        });
    }
    let scorer = scorer_with("bata", MemoryStore::default());
    let outcome = scorer.run(&request(references, candidates)).unwrap();

    assert_eq!(outcome.score, 6);
    assert_eq!(outcome.results.len(), 10);
    for (index, result) in outcome.results.iter().enumerate() {
        assert_eq!(result.item_code, format!("Itemcode{}", index + 1));
        let expected = if index < 6 {
            Remarks::Correct
        } else {
            Remarks::Incorrect
        };
        assert_eq!(result.remarks, expected);
    }
}

#[test]
fn failed_download_degrades_one_item_and_batch_persists() {
    let store = Arc::new(MemoryStore::default());
    let scorer = BatchScorer::new(
        ScoringConfig::default(),
        Box::new(FakeFetcher),
        Box::new(PassthroughSuppressor),
        Box::new(FakeTranscriber {
            transcript: "bata".into(),
        }),
        Box::new(SharedStore(store.clone())),
    )
    .unwrap();
    let outcome = scorer
        .run(&request(
            vec!["https://cdn/fail-ref.wav", "https://cdn/tone.wav"],
            vec!["https://cdn/tone.wav", "https://cdn/tone.wav"],
        ))
        .unwrap();

    assert_eq!(outcome.score, 1);
    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.results[0].remarks, Remarks::Incorrect);
    assert_eq!(outcome.results[0].mfcc_distance, None);
    assert_eq!(outcome.results[0].weighted_similarity, 100.0);
    assert_eq!(outcome.results[1].remarks, Remarks::Correct);

    // The failed item still lands in the single persisted record.
    let records = store.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].attempt_id, "attempt-1");
    assert_eq!(records[0].results.len(), 2);
    assert_eq!(records[0].results[0].remarks, Remarks::Incorrect);
}

#[test]
fn mismatched_item_lists_are_an_input_error() {
    let scorer = scorer_with("bata", MemoryStore::default());
    let result = scorer.run(&request(
        vec!["https://cdn/tone.wav", "https://cdn/tone.wav"],
        vec!["https://cdn/tone.wav"],
    ));
    assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
}

#[test]
fn persistence_failure_aborts_the_batch() {
    let store = MemoryStore {
        fail: true,
        ..MemoryStore::default()
    };
    let scorer = scorer_with("bata", store);
    let result = scorer.run(&request(vec!["https://cdn/tone.wav"], vec!["https://cdn/tone.wav"]));
    assert!(matches!(result, Err(PipelineError::Persistence(_))));
}

#[test]
fn threshold_override_flips_verdict() {
    let scorer = scorer_with("bata", MemoryStore::default());
    let mut req = request(vec!["https://cdn/tone.wav"], vec!["https://cdn/tone.wav"]);

    // Identical clips match at a zero threshold...
    req.similarity_threshold = Some(0.0);
    let outcome = scorer.run(&req).unwrap();
    assert_eq!(outcome.results[0].remarks, Remarks::Correct);

    // ...but not at an override stricter than their zero distance.
    req.similarity_threshold = Some(-1.0);
    let outcome = scorer.run(&req).unwrap();
    assert_eq!(outcome.results[0].remarks, Remarks::Incorrect);
    assert_eq!(outcome.score, 0);
}
