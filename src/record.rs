use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Remarks {
    Correct,
    Incorrect,
}

/// One scored item of an assessment. Immutable after the orchestrator builds
/// it; distances are absent when the item was rejected or failed before
/// comparison.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentItemResult {
    pub item_code: String,
    pub mfcc_distance: Option<f32>,
    pub chroma_distance: Option<f32>,
    pub zcr_distance: Option<f32>,
    pub weighted_similarity: f32,
    pub transcript: Option<String>,
    pub remarks: Remarks,
}

/// Persisted aggregate for one learner's attempt at one activity.
/// Append-only history: written once, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonRecord {
    pub attempt_id: String,
    pub activity_code: String,
    pub learner_id: String,
    pub section: String,
    pub assessment_type: String,
    pub results: Vec<AssessmentItemResult>,
}

/// Single-insert persistence seam. The core never updates or deletes.
pub trait ResultStore {
    fn insert(&self, record: &ComparisonRecord) -> Result<()>;
}

/// Appends one JSON document per record to a local file.
pub struct JsonlStore {
    path: PathBuf,
}

impl JsonlStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ResultStore for JsonlStore {
    fn insert(&self, record: &ComparisonRecord) -> Result<()> {
        let line = serde_json::to_string(record)
            .map_err(|err| PipelineError::Persistence(format!("serialization failed: {err}")))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| {
                PipelineError::Persistence(format!(
                    "failed to open {}: {err}",
                    self.path.display()
                ))
            })?;
        writeln!(file, "{line}")
            .map_err(|err| PipelineError::Persistence(format!("write failed: {err}")))?;
        info!(
            attempt = %record.attempt_id,
            items = record.results.len(),
            store = %self.path.display(),
            "comparison record persisted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_json_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.jsonl");
        let store = JsonlStore::new(path.clone());
        let record = ComparisonRecord {
            attempt_id: "attempt-1".into(),
            activity_code: "ACT-7".into(),
            learner_id: "123456789012".into(),
            section: "Sampaguita".into(),
            assessment_type: "Pagbasa".into(),
            results: vec![AssessmentItemResult {
                item_code: "Itemcode1".into(),
                mfcc_distance: Some(3.2),
                chroma_distance: Some(0.4),
                zcr_distance: Some(1.1),
                weighted_similarity: 1.73,
                transcript: Some("ba".into()),
                remarks: Remarks::Correct,
            }],
        };

        store.insert(&record).unwrap();
        store.insert(&record).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["attempt_id"], "attempt-1");
        assert_eq!(parsed["results"][0]["remarks"], "Correct");
    }
}
