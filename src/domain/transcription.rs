use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed confidence assigned to speech-provider results; the provider
/// does not report one.
pub const SPEECH_CONFIDENCE: f64 = 0.9;

/// Fixed confidence assigned to generative-fallback results.
pub const GENERATIVE_CONFIDENCE: f64 = 0.85;

/// Compressed-audio bitrate assumption used to estimate duration from
/// byte length when the provider reports none.
pub const ESTIMATED_BYTES_PER_SECOND: u64 = 2000;

/// Language tag assumed when the provider does not report one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Providers tried by the orchestrator, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// The speech-specific transcription API (primary).
    Speech,
    /// The generative-text API repurposed for transcription (fallback).
    Generative,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Speech => write!(f, "speech"),
            ProviderKind::Generative => write!(f, "generative"),
        }
    }
}

/// A timed slice of the transcript, provider-supplied or synthesized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub index: usize,
    pub text: String,
    /// Start offset in seconds.
    pub start: f64,
    /// End offset in seconds.
    pub end: f64,
    pub confidence: f64,
}

/// Normalized transcription result, independent of which provider
/// produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// Transcript text. Always present; empty only when the provider
    /// returned an HTTP-success response with no content.
    pub text: String,
    /// Confidence estimate in 0..1.
    pub confidence: f64,
    /// Language tag (ISO 639-1).
    pub language: String,
    /// Duration estimate in seconds.
    pub duration_secs: f64,
    /// Ordered, non-overlapping segments covering [0, duration].
    pub segments: Vec<Segment>,
    /// Which provider produced the result.
    pub provider: ProviderKind,
}

/// Transient record of one failed provider attempt. Used only for
/// fallback decisions and composite error composition; never persisted.
#[derive(Debug, Clone)]
pub struct ProviderAttempt {
    pub provider: ProviderKind,
    pub error: String,
}

/// Estimate audio duration from its byte length.
pub fn estimate_duration_secs(byte_len: u64) -> f64 {
    byte_len as f64 / ESTIMATED_BYTES_PER_SECOND as f64
}

/// Split text into sentences on terminal punctuation, keeping the
/// punctuation with its sentence. Trailing text without terminal
/// punctuation forms a final sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    sentences
}

/// Synthesize segments for a transcript the provider returned without
/// a segment breakdown: one segment per sentence, with the duration
/// distributed evenly. Zero sentences yields zero segments.
pub fn synthesize_segments(text: &str, duration_secs: f64, confidence: f64) -> Vec<Segment> {
    let sentences = split_sentences(text);
    let count = sentences.len();
    if count == 0 {
        return Vec::new();
    }
    let width = duration_secs / count as f64;
    sentences
        .into_iter()
        .enumerate()
        .map(|(index, text)| Segment {
            index,
            text,
            start: width * index as f64,
            // Pin the final boundary to the full duration so the
            // segments exactly cover [0, duration].
            end: if index + 1 == count {
                duration_secs
            } else {
                width * (index + 1) as f64
            },
            confidence,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_estimate_from_byte_length() {
        assert!((estimate_duration_secs(200_000) - 100.0).abs() < f64::EPSILON);
        assert_eq!(estimate_duration_secs(0), 0.0);
    }

    #[test]
    fn test_split_sentences_keeps_punctuation() {
        let sentences = split_sentences("First. Second! Third?");
        assert_eq!(sentences, vec!["First.", "Second!", "Third?"]);
    }

    #[test]
    fn test_split_sentences_trailing_fragment() {
        let sentences = split_sentences("Complete sentence. trailing words");
        assert_eq!(sentences, vec!["Complete sentence.", "trailing words"]);
    }

    #[test]
    fn test_split_sentences_empty() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("   ").is_empty());
    }

    #[test]
    fn test_synthesized_segments_cover_duration() {
        let segments = synthesize_segments("One. Two. Three. Four.", 10.0, 0.9);
        assert_eq!(segments.len(), 4);

        let width = 10.0 / 4.0;
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(segments[3].end, 10.0);
        for segment in &segments {
            assert!((segment.end - segment.start - width).abs() < 1e-9);
            assert_eq!(segment.confidence, 0.9);
        }
        for pair in segments.windows(2) {
            assert!((pair[0].end - pair[1].start).abs() < 1e-9);
        }
    }

    #[test]
    fn test_synthesize_zero_sentences_yields_zero_segments() {
        assert!(synthesize_segments("", 42.0, 0.9).is_empty());
    }

    #[test]
    fn test_synthesize_single_sentence() {
        let segments = synthesize_segments("Just one sentence.", 7.5, 0.85);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(segments[0].end, 7.5);
        assert_eq!(segments[0].index, 0);
    }
}
