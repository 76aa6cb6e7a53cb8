//! Query planning: one question in, a bounded list of retrieval queries out.
//!
//! The generator is asked for `{"subqueries": [...]}`. Whatever comes back
//! is normalized, and the original question always leads the list. When the
//! output cannot be used a deterministic keyword expansion takes its place.

use serde::Serialize;
use serde_json::Value;

use groundwise_types::error::SchemaError;
use groundwise_types::llm::GenerationError;

use super::lenient::{
    Decoded, Synonyms, canonicalize, coerce_string_list, extract_json, normalize_queries,
};
use crate::llm::generator::Generator;

/// Default cap on subqueries per question.
pub const DEFAULT_MAX_SUBQUERIES: usize = 5;

const PLANNER_SYSTEM_PROMPT: &str = r#"You are a retrieval query planner for a policy question-answering assistant.

Rewrite the user's QUESTION into 3 to 6 short search queries that together cover everything needed to answer it. Use USER_CONTEXT to make queries specific (places, conditions, items), but do not invent facts.

Return ONLY a JSON object of this exact shape, with no prose and no code fences:
{"subqueries": ["query one", "query two", "query three"]}"#;

const SUBQUERY_SYNONYMS: Synonyms = &[(
    "subqueries",
    &[
        "queries",
        "sub_queries",
        "search_queries",
        "retrieval_queries",
        "subquery_list",
    ],
)];

/// Suffixes used when the generator's plan is unusable.
const FALLBACK_SUFFIXES: &[&str] = &["policy", "restrictions", "exceptions requirements"];

/// Longest slice of user context folded into a fallback query.
const CONTEXT_HINT_CHARS: usize = 80;

/// Non-empty, normalized, deduplicated retrieval queries, at most the
/// configured maximum long.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SubqueryList(Vec<String>);

impl SubqueryList {
    /// Normalize `question` followed by `candidates` and cap at `max`.
    ///
    /// Returns `None` when nothing non-empty survives.
    pub fn build<I, S>(question: &str, candidates: I, max: usize) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut queries = normalize_queries(
            std::iter::once(question.to_string())
                .chain(candidates.into_iter().map(|c| c.as_ref().to_string())),
        );
        queries.truncate(max.max(1));
        (!queries.is_empty()).then_some(Self(queries))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

/// Decomposes a question into retrieval queries.
#[derive(Clone)]
pub struct QueryPlanner {
    generator: Generator,
    max_subqueries: usize,
}

impl QueryPlanner {
    pub fn new(generator: Generator) -> Self {
        Self {
            generator,
            max_subqueries: DEFAULT_MAX_SUBQUERIES,
        }
    }

    pub fn with_max_subqueries(mut self, max: usize) -> Self {
        self.max_subqueries = max.max(1);
        self
    }

    /// Plan retrieval queries for `question`.
    ///
    /// Never fails on malformed output; only a backend failure is returned.
    #[tracing::instrument(
        name = "plan",
        skip(self, question, user_context),
        fields(
            question_chars = question.len(),
            has_context = !user_context.trim().is_empty(),
            max_subqueries = self.max_subqueries,
        )
    )]
    pub async fn plan(
        &self,
        question: &str,
        user_context: &str,
    ) -> Result<SubqueryList, GenerationError> {
        let prompt = build_planner_prompt(question, user_context);
        let raw = self.generator.generate(PLANNER_SYSTEM_PROMPT, &prompt).await?;

        let decoded = decode_plan(&raw, question, user_context, self.max_subqueries);
        if let Some(reason) = decoded.fallback_reason() {
            tracing::warn!(
                error = %reason,
                content_preview = %preview(&raw),
                "Planner output unusable; using fallback expansion"
            );
        }
        let plan = decoded.into_value();
        tracing::debug!(subqueries = plan.len(), "plan ready");
        Ok(plan)
    }
}

/// Decode planner output, falling back to [`fallback_plan`].
pub fn decode_plan(
    raw: &str,
    question: &str,
    user_context: &str,
    max: usize,
) -> Decoded<SubqueryList> {
    let parsed = parse_subqueries(raw).and_then(|candidates| {
        if normalize_queries(&candidates).is_empty() {
            return Err(SchemaError::WrongType {
                field: "subqueries",
                expected: "non-empty list of strings",
            });
        }
        SubqueryList::build(question, candidates, max).ok_or(SchemaError::MissingField("subqueries"))
    });
    Decoded::or_fallback(parsed, || fallback_plan(question, user_context, max))
}

fn parse_subqueries(raw: &str) -> Result<Vec<String>, SchemaError> {
    let wrong_type = SchemaError::WrongType {
        field: "subqueries",
        expected: "list of strings",
    };
    match extract_json(raw)? {
        Value::Array(items) => coerce_string_list(&Value::Array(items)).ok_or(wrong_type),
        Value::Object(object) => {
            let object = canonicalize(object, SUBQUERY_SYNONYMS);
            let field = object
                .get("subqueries")
                .ok_or(SchemaError::MissingField("subqueries"))?;
            coerce_string_list(field).ok_or(wrong_type)
        }
        _ => Err(wrong_type),
    }
}

/// Deterministic expansion used whenever the generator's plan is unusable.
///
/// The question comes first, then the question qualified by a short hint
/// from the user context (when there is one), then keyword variants.
pub fn fallback_plan(question: &str, user_context: &str, max: usize) -> SubqueryList {
    let q = question.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut candidates = Vec::new();
    if let Some(hint) = context_hint(user_context) {
        candidates.push(format!("{q} ({hint})"));
    }
    candidates.extend(FALLBACK_SUFFIXES.iter().map(|suffix| format!("{q} {suffix}")));

    SubqueryList::build(&q, &candidates, max)
        .unwrap_or_else(|| SubqueryList(vec![FALLBACK_SUFFIXES[0].to_string()]))
}

fn context_hint(user_context: &str) -> Option<String> {
    let first_line = user_context.lines().map(str::trim).find(|l| !l.is_empty())?;
    Some(first_line.chars().take(CONTEXT_HINT_CHARS).collect())
}

fn build_planner_prompt(question: &str, user_context: &str) -> String {
    let context = user_context.trim();
    let context = if context.is_empty() { "(none)" } else { context };
    format!("USER_CONTEXT:\n{context}\n\nQUESTION:\n{}\n", question.trim())
}

pub(crate) fn preview(raw: &str) -> String {
    raw.chars().take(200).collect()
}
