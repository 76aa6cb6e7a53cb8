//! Evidence and verdict types exchanged between the retrieval agents.

use serde::{Deserialize, Serialize};

/// A passage returned by the vector index, after defaulting.
///
/// `id` is unique within one retrieval result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceChunk {
    #[serde(rename = "chunk_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub score: f32,
    pub text: String,
}

/// A raw index entry as the backend reported it.
///
/// Every field is optional so a malformed backend entry can still be
/// represented; the retriever decides what to default and what to drop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexHit {
    #[serde(default, rename = "chunk_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub score: Option<f32>,
    #[serde(default)]
    pub text: Option<String>,
}

impl IndexHit {
    /// A well-formed hit, mostly for adapters and tests.
    pub fn new(id: impl Into<String>, score: f32, text: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            score: Some(score),
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

/// Outcome of judging a drafted answer against its evidence.
///
/// `extra_queries` is non-empty only when `needs_more_evidence` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationVerdict {
    pub needs_more_evidence: bool,
    #[serde(default)]
    pub extra_queries: Vec<String>,
    #[serde(default)]
    pub reason: String,
}

impl EvaluationVerdict {
    /// The verdict used whenever the evaluator's output cannot be trusted.
    pub fn safe_default() -> Self {
        Self {
            needs_more_evidence: false,
            extra_queries: Vec::new(),
            reason: "not parseable".to_string(),
        }
    }

    /// Whether this verdict triggers a refinement round.
    pub fn wants_refinement(&self) -> bool {
        self.needs_more_evidence && !self.extra_queries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_hit_tolerates_missing_fields() {
        let hit: IndexHit = serde_json::from_str(r#"{"chunk_id":"c1"}"#).unwrap();
        assert_eq!(hit.id.as_deref(), Some("c1"));
        assert!(hit.score.is_none());
        assert!(hit.text.is_none());
    }

    #[test]
    fn test_safe_default_never_refines() {
        let v = EvaluationVerdict::safe_default();
        assert!(!v.needs_more_evidence);
        assert!(v.extra_queries.is_empty());
        assert!(!v.wants_refinement());
    }

    #[test]
    fn test_wants_refinement_requires_queries() {
        let v = EvaluationVerdict {
            needs_more_evidence: true,
            extra_queries: vec![],
            reason: "thin".to_string(),
        };
        assert!(!v.wants_refinement());
    }

    #[test]
    fn test_evidence_chunk_serializes_chunk_id() {
        let chunk = EvidenceChunk {
            id: "c1".to_string(),
            section: None,
            source: Some("liquids.md".to_string()),
            score: 0.9,
            text: "Liquids up to 100ml".to_string(),
        };
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["chunk_id"], "c1");
        assert!(json.get("section").is_none());
    }
}
