use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

const API_BASE: &str = "https://api.assemblyai.com/v2";
const POLL_INTERVAL: Duration = Duration::from_secs(1);
const MAX_POLLS: usize = 120;

/// Speech-to-text capability. One synchronous call per clip; implementations
/// wrap whatever service or fake the deployment needs.
pub trait Transcriber {
    fn transcribe(&self, audio: &Path, language_code: &str) -> Result<String>;
}

/// AssemblyAI client: upload the audio bytes, create a transcript job
/// constrained to the target language, poll until it settles.
pub struct AssemblyAiTranscriber {
    api_key: String,
    agent: ureq::Agent,
}

#[derive(Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Deserialize)]
struct TranscriptJob {
    id: String,
}

#[derive(Deserialize)]
struct TranscriptStatus {
    status: String,
    text: Option<String>,
    error: Option<String>,
}

impl AssemblyAiTranscriber {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(30))
                .build(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ASSEMBLYAI_API_KEY").map_err(|_| {
            PipelineError::InvalidInput("ASSEMBLYAI_API_KEY is not set".into())
        })?;
        Ok(Self::new(api_key))
    }

    fn upload(&self, audio: &Path) -> Result<String> {
        let bytes = std::fs::read(audio).map_err(|err| {
            PipelineError::Transcription(format!(
                "failed to read audio file {}: {err}",
                audio.display()
            ))
        })?;
        let response: UploadResponse = self
            .agent
            .post(&format!("{API_BASE}/upload"))
            .set("authorization", &self.api_key)
            .send_bytes(&bytes)
            .map_err(|err| PipelineError::Transcription(format!("upload failed: {err}")))?
            .into_json()
            .map_err(|err| {
                PipelineError::Transcription(format!("malformed upload response: {err}"))
            })?;
        debug!(bytes = bytes.len(), "audio uploaded for transcription");
        Ok(response.upload_url)
    }

    fn create_job(&self, upload_url: &str, language_code: &str) -> Result<String> {
        let job: TranscriptJob = self
            .agent
            .post(&format!("{API_BASE}/transcript"))
            .set("authorization", &self.api_key)
            .send_json(json!({
                "audio_url": upload_url,
                "language_code": language_code,
            }))
            .map_err(|err| {
                PipelineError::Transcription(format!("transcript request failed: {err}"))
            })?
            .into_json()
            .map_err(|err| {
                PipelineError::Transcription(format!("malformed transcript response: {err}"))
            })?;
        Ok(job.id)
    }

    fn poll(&self, job_id: &str) -> Result<String> {
        for _ in 0..MAX_POLLS {
            let status: TranscriptStatus = self
                .agent
                .get(&format!("{API_BASE}/transcript/{job_id}"))
                .set("authorization", &self.api_key)
                .call()
                .map_err(|err| PipelineError::Transcription(format!("poll failed: {err}")))?
                .into_json()
                .map_err(|err| {
                    PipelineError::Transcription(format!("malformed status response: {err}"))
                })?;
            match status.status.as_str() {
                "completed" => return Ok(status.text.unwrap_or_default()),
                "error" => {
                    return Err(PipelineError::Transcription(
                        status.error.unwrap_or_else(|| "unspecified service error".into()),
                    ))
                }
                other => debug!(status = other, "transcript job still pending"),
            }
            std::thread::sleep(POLL_INTERVAL);
        }
        Err(PipelineError::Transcription(format!(
            "transcript job {job_id} did not settle within {MAX_POLLS} polls"
        )))
    }
}

impl Transcriber for AssemblyAiTranscriber {
    fn transcribe(&self, audio: &Path, language_code: &str) -> Result<String> {
        let upload_url = self.upload(audio)?;
        let job_id = self.create_job(&upload_url, language_code)?;
        let text = self.poll(&job_id)?;
        info!(job_id, chars = text.len(), "transcription complete");
        Ok(text)
    }
}
