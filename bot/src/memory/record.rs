//! The memory document and the lenient annotation parser.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Synthetic mood/pattern metadata attached to one interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub mood: String,
    pub intensity: u8,
    pub patterns: Vec<String>,
}

impl Default for Annotation {
    fn default() -> Self {
        Self {
            mood: "neutral".to_string(),
            intensity: 0,
            patterns: Vec::new(),
        }
    }
}

/// One interaction persisted to the document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub kind: String,
    pub content: String,
    pub user_id: i64,
    pub channel_id: i64,
    pub created_at: DateTime<Utc>,
    pub annotation: Annotation,
    /// Fraction of well-formed annotation fields, in [0, 1]. Derived, never
    /// random.
    pub confidence: f64,
}

impl MemoryRecord {
    pub fn interaction(
        user_id: i64,
        channel_id: i64,
        content: String,
        annotation: Annotation,
        confidence: f64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: "interaction".to_string(),
            content,
            user_id,
            channel_id,
            created_at: Utc::now(),
            annotation,
            confidence,
        }
    }
}

/// Loose mirror of the annotation JSON the model is asked for. Every field
/// optional so one bad field doesn't discard the rest.
#[derive(Debug, Deserialize)]
struct RawAnnotation {
    mood: Option<String>,
    intensity: Option<f64>,
    patterns: Option<Vec<String>>,
}

/// Parse a model-produced annotation. Tolerates code fences and surrounding
/// prose; returns the annotation plus a confidence equal to the fraction of
/// fields that were present and well formed. Unparseable input yields the
/// neutral default at confidence 0.
pub fn parse_annotation(raw: &str) -> (Annotation, f64) {
    let Some(body) = extract_json_object(raw) else {
        return (Annotation::default(), 0.0);
    };

    let Ok(parsed) = serde_json::from_str::<RawAnnotation>(body) else {
        return (Annotation::default(), 0.0);
    };

    let mut well_formed = 0u32;
    let mut annotation = Annotation::default();

    if let Some(mood) = parsed
        .mood
        .map(|m| m.trim().to_lowercase())
        .filter(|m| !m.is_empty())
    {
        annotation.mood = mood;
        well_formed += 1;
    }

    if let Some(intensity) = parsed.intensity.filter(|i| (0.0..=10.0).contains(i)) {
        annotation.intensity = intensity.round() as u8;
        well_formed += 1;
    }

    if let Some(patterns) = parsed.patterns {
        annotation.patterns = patterns
            .into_iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .take(5)
            .collect();
        well_formed += 1;
    }

    (annotation, f64::from(well_formed) / 3.0)
}

/// Slice out the outermost `{ ... }` block, skipping code fences and prose.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_annotation_parses_with_full_confidence() {
        let raw = r#"{"mood": "uneasy", "intensity": 7, "patterns": ["backrooms", "search"]}"#;
        let (annotation, confidence) = parse_annotation(raw);
        assert_eq!(annotation.mood, "uneasy");
        assert_eq!(annotation.intensity, 7);
        assert_eq!(annotation.patterns, vec!["backrooms", "search"]);
        assert_eq!(confidence, 1.0);
    }

    #[test]
    fn code_fenced_annotation_still_parses() {
        let raw = "```json\n{\"mood\": \"Calm\", \"intensity\": 2, \"patterns\": []}\n```";
        let (annotation, confidence) = parse_annotation(raw);
        assert_eq!(annotation.mood, "calm");
        assert_eq!(confidence, 1.0);
    }

    #[test]
    fn partial_annotation_scales_confidence_down() {
        let raw = r#"{"mood": "tense", "intensity": 99}"#;
        let (annotation, confidence) = parse_annotation(raw);
        assert_eq!(annotation.mood, "tense");
        // out-of-range intensity is discarded, patterns absent
        assert_eq!(annotation.intensity, 0);
        assert!((confidence - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn garbage_yields_neutral_default_at_zero_confidence() {
        let (annotation, confidence) = parse_annotation("the model rambled instead");
        assert_eq!(annotation, Annotation::default());
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn confidence_is_always_within_bounds() {
        for raw in [
            "{}",
            r#"{"mood": "x"}"#,
            r#"{"mood": "x", "intensity": 5}"#,
            r#"{"mood": "x", "intensity": 5, "patterns": ["a"]}"#,
            "nonsense",
        ] {
            let (_, confidence) = parse_annotation(raw);
            assert!((0.0..=1.0).contains(&confidence), "raw: {raw}");
        }
    }

    #[test]
    fn pattern_list_is_capped_and_normalized() {
        let raw = r#"{"patterns": [" A ", "b", "", "c", "d", "e", "f"]}"#;
        let (annotation, _) = parse_annotation(raw);
        assert_eq!(annotation.patterns.len(), 5);
        assert_eq!(annotation.patterns[0], "a");
    }
}
