//! Review score extraction
//!
//! Pulls an overall 0-10 score out of free-form review text. A JSON object
//! with `overall_score` wins; otherwise the first matching phrase.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Score assumed when the text carries none
pub const FALLBACK_SCORE: u32 = 5;

static JSON_OBJECT: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"\{[^{}]*"overall_score"\s*:\s*\d+[^{}]*\}"#).ok());

static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)overall[_\s]*score[:\s]*(\d+)",
        r"(?i)score[:\s]*(\d+)[/\s]*10",
        r"(?i)rating[:\s]*(\d+)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Where a score came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreSource {
    /// `overall_score` field of an embedded JSON object
    Json,
    /// A textual phrase such as "Score: 7/10"
    Pattern,
    /// Nothing recognizable; [`FALLBACK_SCORE`]
    Fallback,
    /// Blank review
    Empty,
}

/// Extracted review score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    /// 0 to 10
    pub value: u32,
    /// Origin
    pub source: ScoreSource,
}

#[derive(Deserialize)]
struct ScoreObject {
    overall_score: u32,
}

/// Extract an overall score from review text
#[must_use]
pub fn extract_overall_score(text: &str) -> Score {
    if text.trim().is_empty() {
        return Score {
            value: 0,
            source: ScoreSource::Empty,
        };
    }

    let from_json = JSON_OBJECT
        .as_ref()
        .and_then(|re| re.find(text))
        .and_then(|m| serde_json::from_str::<ScoreObject>(m.as_str()).ok());
    if let Some(object) = from_json {
        return Score {
            value: object.overall_score.min(10),
            source: ScoreSource::Json,
        };
    }

    for pattern in PATTERNS.iter() {
        let value = pattern
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok());
        if let Some(value) = value {
            return Score {
                value: value.min(10),
                source: ScoreSource::Pattern,
            };
        }
    }

    tracing::debug!("no score in review text, using fallback");
    Score {
        value: FALLBACK_SCORE,
        source: ScoreSource::Fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_object_wins() {
        let text = "Score: 3/10\n{\"overall_score\": 8, \"notes\": \"tidy\"}";
        assert_eq!(
            extract_overall_score(text),
            Score {
                value: 8,
                source: ScoreSource::Json
            }
        );
    }

    #[test]
    fn phrases() {
        assert_eq!(extract_overall_score("Overall score: 7").value, 7);
        assert_eq!(extract_overall_score("I'd give it a score of... score 6/10").value, 6);
        assert_eq!(extract_overall_score("Rating: 9 stars").value, 9);
        assert_eq!(
            extract_overall_score("OVERALL_SCORE 4").source,
            ScoreSource::Pattern
        );
    }

    #[test]
    fn broken_json_falls_through_to_phrase() {
        let text = "{\"overall_score\": 99999999999} overall score: 6";
        assert_eq!(extract_overall_score(text).value, 6);
    }

    #[test]
    fn out_of_range_is_clamped() {
        assert_eq!(extract_overall_score("rating: 42").value, 10);
    }

    #[test]
    fn fallback_and_empty() {
        assert_eq!(
            extract_overall_score("Looks fine to me."),
            Score {
                value: FALLBACK_SCORE,
                source: ScoreSource::Fallback
            }
        );
        assert_eq!(extract_overall_score("  \n").source, ScoreSource::Empty);
        assert_eq!(extract_overall_score("").value, 0);
    }
}
