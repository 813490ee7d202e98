use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Maximum number of tags attached to a compiled note.
pub const MAX_TAGS: usize = 5;

/// Output of the note compiler, before persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteDraft {
    /// Structured markdown note content.
    pub content: String,
    /// Extracted procedure or diagnosis, when one was found.
    pub procedure_type: Option<String>,
    /// Extracted tags, at most [`MAX_TAGS`].
    pub tags: Vec<String>,
    /// The raw transcript the note was compiled from.
    pub transcript: String,
}

/// A persisted clinical note, scoped to its owning user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalNote {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub procedure_type: Option<String>,
    pub tags: Vec<String>,
    pub transcript: String,
    pub created_at: DateTime<Utc>,
}

/// One extraction strategy; strategies are tried in order and the
/// first to produce a value wins.
pub type ProcedureExtractor = fn(&str) -> Option<String>;

/// Ordered extraction strategies for the procedure type.
pub const PROCEDURE_EXTRACTORS: &[ProcedureExtractor] =
    &[extract_procedure_by_label, extract_procedure_by_vocabulary];

/// Explicit labels scanned first, in priority order.
static LABEL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?im)^\s*#*\s*\**\s*procedure\s*\**\s*:\s*\**\s*(.+?)\s*$",
        r"(?im)^\s*#*\s*\**\s*diagnosis\s*\**\s*:\s*\**\s*(.+?)\s*$",
        r"(?im)^\s*#*\s*\**\s*assessment\s*\**\s*:\s*\**\s*(.+?)\s*$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("label pattern is valid"))
    .collect()
});

static TAGS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*#*\s*\**\s*tags\s*\**\s*:\s*\**\s*(.+?)\s*$")
        .expect("tags pattern is valid")
});

/// Known procedure names scanned case-insensitively when no explicit
/// label is present.
pub const PROCEDURE_VOCABULARY: &[&str] = &[
    "Colonoscopy",
    "Endoscopy",
    "Gastroscopy",
    "Bronchoscopy",
    "Appendectomy",
    "Cholecystectomy",
    "Tonsillectomy",
    "Hernia repair",
    "Cataract surgery",
    "Arthroscopy",
    "Angioplasty",
    "Biopsy",
    "Suture removal",
    "Wound debridement",
    "Joint injection",
    "Skin excision",
];

/// Extract the procedure type from generated note content by running
/// the ordered strategies; first match wins.
pub fn extract_procedure_type(content: &str) -> Option<String> {
    PROCEDURE_EXTRACTORS
        .iter()
        .find_map(|extractor| extractor(content))
}

fn extract_procedure_by_label(content: &str) -> Option<String> {
    for pattern in LABEL_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(content) {
            if let Some(value) = captures.get(1) {
                let cleaned = clean_field(value.as_str());
                if !cleaned.is_empty() {
                    return Some(cleaned);
                }
            }
        }
    }
    None
}

fn extract_procedure_by_vocabulary(content: &str) -> Option<String> {
    let lowered = content.to_lowercase();
    PROCEDURE_VOCABULARY
        .iter()
        .find(|term| lowered.contains(&term.to_lowercase()))
        .map(|term| (*term).to_string())
}

/// Extract tags: an explicit `Tags:` line wins, falling back to
/// vocabulary terms present in the content. Capped at [`MAX_TAGS`].
pub fn extract_tags(content: &str) -> Vec<String> {
    if let Some(captures) = TAGS_PATTERN.captures(content) {
        if let Some(line) = captures.get(1) {
            let tags: Vec<String> = line
                .as_str()
                .split(',')
                .map(clean_field)
                .filter(|t| !t.is_empty())
                .take(MAX_TAGS)
                .collect();
            if !tags.is_empty() {
                return tags;
            }
        }
    }

    let lowered = content.to_lowercase();
    PROCEDURE_VOCABULARY
        .iter()
        .filter(|term| lowered.contains(&term.to_lowercase()))
        .map(|term| term.to_lowercase())
        .take(MAX_TAGS)
        .collect()
}

/// Strip markdown emphasis, hash tags, and trailing punctuation from
/// an extracted field. Runs to a fixed point so mixed decoration like
/// `**Hernia repair**.` comes out clean.
fn clean_field(raw: &str) -> String {
    let mut value = raw;
    loop {
        let stripped = value
            .trim_matches(|c: char| c == '*' || c == '#' || c == '`' || c.is_whitespace())
            .trim_end_matches('.');
        if stripped == value {
            break;
        }
        value = stripped;
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_diagnosis_label() {
        let content = "## Note\nDiagnosis: Acute appendicitis.\nPlan: surgery";
        assert_eq!(
            extract_procedure_type(content),
            Some("Acute appendicitis".to_string())
        );
    }

    #[test]
    fn test_procedure_label_beats_diagnosis_label() {
        let content = "Diagnosis: Gastritis\nProcedure: Endoscopy";
        assert_eq!(extract_procedure_type(content), Some("Endoscopy".to_string()));
    }

    #[test]
    fn test_assessment_label_as_last_resort_label() {
        let content = "**Assessment:** Chronic sinusitis.";
        assert_eq!(
            extract_procedure_type(content),
            Some("Chronic sinusitis".to_string())
        );
    }

    #[test]
    fn test_vocabulary_fallback() {
        let content = "Patient underwent routine colonoscopy without complications.";
        assert_eq!(extract_procedure_type(content), Some("Colonoscopy".to_string()));
    }

    #[test]
    fn test_no_match_returns_none() {
        assert_eq!(extract_procedure_type("Patient feels well."), None);
    }

    #[test]
    fn test_tags_from_explicit_line() {
        let content = "Tags: cardiology, follow-up, hypertension";
        assert_eq!(
            extract_tags(content),
            vec!["cardiology", "follow-up", "hypertension"]
        );
    }

    #[test]
    fn test_tags_capped_at_five() {
        let content = "Tags: a, b, c, d, e, f, g";
        assert_eq!(extract_tags(content).len(), MAX_TAGS);
    }

    #[test]
    fn test_tags_vocabulary_fallback() {
        let content = "Follow-up after appendectomy; biopsy results pending.";
        let tags = extract_tags(content);
        assert!(tags.contains(&"appendectomy".to_string()));
        assert!(tags.contains(&"biopsy".to_string()));
    }

    #[test]
    fn test_markdown_decoration_stripped() {
        let content = "**Procedure**: **Hernia repair**.";
        assert_eq!(
            extract_procedure_type(content),
            Some("Hernia repair".to_string())
        );
    }
}
