//! Sufficiency evaluation of a drafted answer.
//!
//! The generator judges whether the draft is grounded in the evidence it was
//! given and, only if not, proposes a few follow-up retrieval queries. An
//! unusable verdict is treated as "good enough" so a confused judge can
//! never trigger extra work.

use serde_json::Value;

use groundwise_types::error::SchemaError;
use groundwise_types::evidence::EvaluationVerdict;
use groundwise_types::llm::GenerationError;

use super::lenient::{
    Decoded, Synonyms, canonicalize, coerce_bool, coerce_string, coerce_string_list, extract_json,
    normalize_queries,
};
use super::planner::preview;
use crate::llm::generator::Generator;

/// Default cap on follow-up queries.
pub const DEFAULT_MAX_EXTRA: usize = 4;

const EVALUATOR_SYSTEM_PROMPT: &str = r#"You are a strict reviewer of answers written from retrieved policy excerpts.

Decide whether the ANSWER fully addresses the QUESTION using only the evidence it cites. If something important is missing or unsupported, set "needs_more_evidence" to true and propose up to 4 short search queries that would find the missing evidence. If the answer is adequate, set it to false and leave "extra_queries" empty.

Return ONLY a JSON object of this exact shape, with no prose and no code fences:
{"needs_more_evidence": false, "extra_queries": [], "reason": "one sentence"}"#;

const VERDICT_SYNONYMS: Synonyms = &[
    (
        "needs_more_evidence",
        &[
            "needs_more",
            "need_more_evidence",
            "needs_more_info",
            "needs_more_information",
            "needs_retrieval",
            "more_evidence_needed",
            "insufficient",
        ],
    ),
    (
        "extra_queries",
        &[
            "queries",
            "follow_up_queries",
            "followup_queries",
            "additional_queries",
            "subqueries",
        ],
    ),
    ("reason", &["rationale", "explanation", "why"]),
];

/// Keys whose value means the opposite of `needs_more_evidence`.
const INVERTED_KEYS: &[&str] = &["sufficient", "is_sufficient", "adequate", "is_adequate"];

/// Judges drafted answers and proposes follow-up queries.
#[derive(Clone)]
pub struct SufficiencyEvaluator {
    generator: Generator,
    max_extra: usize,
}

impl SufficiencyEvaluator {
    pub fn new(generator: Generator) -> Self {
        Self {
            generator,
            max_extra: DEFAULT_MAX_EXTRA,
        }
    }

    pub fn with_max_extra(mut self, max_extra: usize) -> Self {
        self.max_extra = max_extra;
        self
    }

    /// Judge `answer`. Never fails on malformed output.
    #[tracing::instrument(
        name = "evaluate",
        skip(self, question, user_context, answer, chunk_ids),
        fields(
            answer_chars = answer.len(),
            evidence = chunk_ids.len(),
            max_extra = self.max_extra,
        )
    )]
    pub async fn evaluate(
        &self,
        question: &str,
        user_context: &str,
        answer: &str,
        chunk_ids: &[String],
    ) -> Result<EvaluationVerdict, GenerationError> {
        let prompt = build_evaluator_prompt(question, user_context, answer, chunk_ids);
        let raw = self.generator.generate(EVALUATOR_SYSTEM_PROMPT, &prompt).await?;

        let decoded = decode_verdict(&raw, self.max_extra);
        if let Some(reason) = decoded.fallback_reason() {
            tracing::warn!(
                error = %reason,
                content_preview = %preview(&raw),
                "Evaluator output unusable; assuming answer is sufficient"
            );
        }
        let verdict = decoded.into_value();
        tracing::debug!(
            needs_more_evidence = verdict.needs_more_evidence,
            extra_queries = verdict.extra_queries.len(),
            "verdict ready"
        );
        Ok(verdict)
    }
}

/// Decode evaluator output, falling back to [`EvaluationVerdict::safe_default`].
pub fn decode_verdict(raw: &str, max_extra: usize) -> Decoded<EvaluationVerdict> {
    Decoded::or_fallback(parse_verdict(raw, max_extra), EvaluationVerdict::safe_default)
}

fn parse_verdict(raw: &str, max_extra: usize) -> Result<EvaluationVerdict, SchemaError> {
    let object = match extract_json(raw)? {
        Value::Object(object) => canonicalize(object, VERDICT_SYNONYMS),
        _ => {
            return Err(SchemaError::WrongType {
                field: "verdict",
                expected: "object",
            });
        }
    };

    let needs_more_evidence = match object.get("needs_more_evidence") {
        Some(value) => coerce_bool(value).ok_or(SchemaError::WrongType {
            field: "needs_more_evidence",
            expected: "boolean",
        })?,
        None => {
            let inverted = INVERTED_KEYS
                .iter()
                .find_map(|k| object.get(*k))
                .ok_or(SchemaError::MissingField("needs_more_evidence"))?;
            !coerce_bool(inverted).ok_or(SchemaError::WrongType {
                field: "needs_more_evidence",
                expected: "boolean",
            })?
        }
    };

    let extra_queries = if needs_more_evidence {
        let proposed = match object.get("extra_queries") {
            Some(value) => coerce_string_list(value).ok_or(SchemaError::WrongType {
                field: "extra_queries",
                expected: "list of strings",
            })?,
            None => Vec::new(),
        };
        let mut queries = normalize_queries(proposed);
        queries.truncate(max_extra);
        queries
    } else {
        Vec::new()
    };

    let reason = object
        .get("reason")
        .and_then(coerce_string)
        .map(|r| r.trim().to_string())
        .unwrap_or_default();

    Ok(EvaluationVerdict {
        needs_more_evidence,
        extra_queries,
        reason,
    })
}

fn build_evaluator_prompt(
    question: &str,
    user_context: &str,
    answer: &str,
    chunk_ids: &[String],
) -> String {
    let context = user_context.trim();
    let context = if context.is_empty() { "(none)" } else { context };
    let ids = if chunk_ids.is_empty() {
        "(none)".to_string()
    } else {
        chunk_ids.join(", ")
    };
    format!(
        "USER_CONTEXT:\n{context}\n\nQUESTION:\n{}\n\nEVIDENCE_IDS:\n{ids}\n\nANSWER:\n{}\n",
        question.trim(),
        answer.trim()
    )
}
