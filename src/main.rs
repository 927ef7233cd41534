use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bigkas::audio::denoise::SpectralGate;
use bigkas::fetch::HttpFetcher;
use bigkas::pipeline::{BatchRequest, BatchScorer};
use bigkas::record::{JsonlStore, Remarks};
use bigkas::transcribe::AssemblyAiTranscriber;
use bigkas::ScoringConfig;

/// Bigkas - pronunciation scoring for literacy assessments
///
/// Scores a learner's recorded attempts against reference pronunciations and
/// appends one comparison record per attempt to a local result store.
#[derive(Parser, Debug)]
#[command(name = "bigkas")]
#[command(version = "0.1.0")]
#[command(about = "Pronunciation scoring pipeline", long_about = None)]
struct Args {
    /// Path to a JSON batch manifest (attempt identifiers plus ordered
    /// reference and candidate audio URLs)
    #[arg(value_name = "MANIFEST")]
    manifest: PathBuf,

    /// Inline JSON scoring configuration
    #[arg(long, value_name = "JSON", conflicts_with = "config_file")]
    config_json: Option<String>,

    /// Path to a JSON scoring configuration file
    #[arg(long, value_name = "PATH", conflicts_with = "config_json")]
    config_file: Option<PathBuf>,

    /// Result store file (JSON lines, appended)
    #[arg(long, value_name = "PATH", default_value = "results.jsonl")]
    out: PathBuf,

    /// Similarity threshold override (lower score = closer match)
    #[arg(long, value_name = "SCORE")]
    threshold: Option<f32>,
}

impl Args {
    fn validate(&self) -> Result<()> {
        if !self.manifest.exists() {
            bail!("Manifest file does not exist: {:?}", self.manifest);
        }
        if !self.manifest.is_file() {
            bail!("Manifest path is not a file: {:?}", self.manifest);
        }
        if let Some(threshold) = self.threshold {
            if threshold < 0.0 {
                bail!("Threshold must be non-negative, got: {}", threshold);
            }
        }
        if let Some(config) = &self.config_file {
            if !config.is_file() {
                bail!("Config path is not a file: {:?}", config);
            }
        }
        Ok(())
    }

    fn scoring_config(&self) -> Result<ScoringConfig> {
        load_config_from_sources(self.config_file.as_deref(), self.config_json.as_deref())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    args.validate()
        .context("Failed to validate command-line arguments")?;

    let config = args
        .scoring_config()
        .context("Failed to load scoring configuration")?;
    let mut request = load_manifest(&args.manifest)?;
    if args.threshold.is_some() {
        request.similarity_threshold = args.threshold;
    }

    println!("Bigkas v0.1.0 - Pronunciation Scoring Pipeline");
    println!("Manifest: {:?}", args.manifest);
    println!("Attempt:  {} ({})", request.attempt_id, request.activity_code);
    println!("Items:    {}", request.reference_urls.len());

    let transcriber =
        AssemblyAiTranscriber::from_env().context("Failed to configure transcription service")?;
    let scorer = BatchScorer::new(
        config,
        Box::new(HttpFetcher::new()),
        Box::new(SpectralGate::default()),
        Box::new(transcriber),
        Box::new(JsonlStore::new(args.out.clone())),
    )
    .context("Failed to construct scoring pipeline")?;

    let outcome = scorer.run(&request).context("Batch scoring failed")?;

    println!();
    for result in &outcome.results {
        let marker = match result.remarks {
            Remarks::Correct => "✓",
            Remarks::Incorrect => "✗",
        };
        println!(
            "  {} {} similarity={:.3}",
            marker, result.item_code, result.weighted_similarity
        );
    }
    println!(
        "\nScore: {}/{} (record appended to {:?})",
        outcome.score,
        outcome.results.len(),
        args.out
    );

    Ok(())
}

fn load_config_from_sources(path: Option<&Path>, json: Option<&str>) -> Result<ScoringConfig> {
    if let Some(p) = path {
        return ScoringConfig::from_file(p)
            .with_context(|| format!("Failed to load config file {p:?}"));
    }
    if let Some(raw) = json {
        return ScoringConfig::from_json(raw).context("Failed to parse inline config JSON");
    }
    Ok(ScoringConfig::default())
}

fn load_manifest(path: &Path) -> Result<BatchRequest> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("Failed to read manifest {path:?}"))?;
    let request: BatchRequest =
        serde_json::from_str(&raw).context("Failed to parse manifest JSON")?;
    Ok(request)
}
