use regex::Regex;
use tracing::info;

use crate::config::{RejectionStrategy, ScoringConfig};

/// Why the speech gate turned a transcript away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Accepted,
    TooShort,
    JunkAnnotation,
    OutsideLexicon,
}

impl GateDecision {
    pub fn accepted(&self) -> bool {
        matches!(self, GateDecision::Accepted)
    }
}

/// Lexical pre-filter over speech-to-text output. Rejecting here is cheap
/// compared to feature extraction, and catches recordings of ambient sound
/// that still transcribe to something.
pub struct SpeechGate {
    min_chars: usize,
    strategy: RejectionStrategy,
    junk_pattern: Regex,
}

impl SpeechGate {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            min_chars: config.min_transcript_chars,
            strategy: config.rejection.clone(),
            // Bracketed non-speech annotations, e.g. "[music]", "(noise)".
            junk_pattern: Regex::new(r"^[\[(][^\])]*[\])]$").expect("static pattern compiles"),
        }
    }

    pub fn evaluate(&self, transcript: &str) -> GateDecision {
        let trimmed = transcript.trim();
        if trimmed.chars().count() < self.min_chars {
            info!(len = trimmed.len(), "transcript below minimum length");
            return GateDecision::TooShort;
        }

        let decision = match &self.strategy {
            RejectionStrategy::LengthOnly => GateDecision::Accepted,
            RejectionStrategy::JunkPattern => {
                if self.junk_pattern.is_match(trimmed) {
                    GateDecision::JunkAnnotation
                } else {
                    GateDecision::Accepted
                }
            }
            RejectionStrategy::AllowList { entries } => {
                if in_lexicon(trimmed, entries) {
                    GateDecision::Accepted
                } else {
                    GateDecision::OutsideLexicon
                }
            }
        };
        if !decision.accepted() {
            info!(transcript = trimmed, ?decision, "speech gate rejected transcript");
        }
        decision
    }
}

/// Every token of the transcript must be a lexicon member. Comparison is
/// case-insensitive and ignores surrounding punctuation the transcription
/// service tends to add.
fn in_lexicon(transcript: &str, entries: &[String]) -> bool {
    let mut tokens = transcript
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|token| !token.is_empty())
        .peekable();
    if tokens.peek().is_none() {
        return false;
    }
    tokens.all(|token| entries.iter().any(|entry| entry.to_lowercase() == token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;

    fn gate_with(strategy: RejectionStrategy) -> SpeechGate {
        let config = ScoringConfig {
            rejection: strategy,
            ..ScoringConfig::default()
        };
        SpeechGate::new(&config)
    }

    #[test]
    fn empty_transcript_is_rejected() {
        let gate = gate_with(RejectionStrategy::LengthOnly);
        assert_eq!(gate.evaluate(""), GateDecision::TooShort);
        assert_eq!(gate.evaluate("   "), GateDecision::TooShort);
        assert_eq!(gate.evaluate("a"), GateDecision::TooShort);
    }

    #[test]
    fn junk_annotations_are_rejected() {
        let gate = gate_with(RejectionStrategy::JunkPattern);
        assert_eq!(gate.evaluate("[music]"), GateDecision::JunkAnnotation);
        assert_eq!(gate.evaluate("[background noise]"), GateDecision::JunkAnnotation);
        assert_eq!(gate.evaluate("(laughter)"), GateDecision::JunkAnnotation);
        assert!(gate.evaluate("bata").accepted());
    }

    #[test]
    fn allow_list_accepts_only_lexicon_members() {
        let gate = gate_with(RejectionStrategy::AllowList {
            entries: vec!["ba".into(), "be".into(), "bi".into()],
        });
        assert!(gate.evaluate("ba").accepted());
        assert!(gate.evaluate("Ba,").accepted());
        assert!(gate.evaluate("ba be").accepted());
        assert_eq!(gate.evaluate("bo"), GateDecision::OutsideLexicon);
        assert_eq!(gate.evaluate("ba bo"), GateDecision::OutsideLexicon);
    }
}
