//! Answer drafting from retrieved evidence.

use groundwise_types::evidence::EvidenceChunk;
use groundwise_types::llm::GenerationError;
use groundwise_types::session::Turn;

use crate::llm::generator::Generator;

/// Answer given when retrieval found nothing to ground a draft on.
pub const NO_EVIDENCE_ANSWER: &str = "I couldn't find anything in the policy documents that covers this question, so I can't give a grounded answer. Try rephrasing it or adding details such as where you are flying from and to.";

const DRAFT_SYSTEM_PROMPT: &str = r#"You are a careful travel-policy assistant.

Answer the QUESTION using ONLY the excerpts in CONTEXT. Do not invent rules, limits, or exceptions. If the CONTEXT does not settle the question, say what is missing.

Cite every claim with the id of the excerpt it came from in square brackets, for example [c1] or [c1, c3]. Use USER_CONTEXT and the recent conversation to tailor the answer to the traveller."#;

const CHUNK_SEPARATOR: &str = "\n\n---\n\n";

/// Everything a draft is written from.
pub struct DraftInput<'a> {
    pub question: &'a str,
    pub user_context: &'a str,
    pub recent_turns: &'a [Turn],
    /// Queries that produced `evidence`, shown to the model for orientation.
    pub queries: &'a [String],
    /// Label for `queries` in the prompt (`SUBQUERIES`, `EXTRA_QUERIES`).
    pub queries_label: &'a str,
    pub evidence: &'a [EvidenceChunk],
}

/// Writes answers with a [`Generator`].
#[derive(Clone)]
pub struct AnswerDrafter {
    generator: Generator,
}

impl AnswerDrafter {
    pub fn new(generator: Generator) -> Self {
        Self { generator }
    }

    #[tracing::instrument(
        name = "draft",
        skip(self, input),
        fields(evidence = input.evidence.len(), queries_label = input.queries_label)
    )]
    pub async fn draft(&self, input: &DraftInput<'_>) -> Result<String, GenerationError> {
        let prompt = build_draft_prompt(input);
        let answer = self.generator.generate(DRAFT_SYSTEM_PROMPT, &prompt).await?;
        Ok(answer.trim().to_string())
    }
}

/// `[id]\ntext` blocks joined by a horizontal rule.
pub fn build_context_block(evidence: &[EvidenceChunk]) -> String {
    evidence
        .iter()
        .map(|chunk| {
            let mut header = format!("[{}]", chunk.id);
            if let Some(section) = chunk.section.as_deref().filter(|s| !s.is_empty()) {
                header.push_str(&format!(" {section}"));
            }
            format!("{header}\n{}", chunk.text.trim())
        })
        .collect::<Vec<_>>()
        .join(CHUNK_SEPARATOR)
}

fn build_draft_prompt(input: &DraftInput<'_>) -> String {
    let mut prompt = String::new();

    let context = input.user_context.trim();
    prompt.push_str("USER_CONTEXT:\n");
    prompt.push_str(if context.is_empty() { "(none)" } else { context });
    prompt.push_str("\n\n");

    if !input.recent_turns.is_empty() {
        prompt.push_str("RECENT_CONVERSATION:\n");
        for turn in input.recent_turns {
            prompt.push_str(&format!("{}: {}\n", turn.role, turn.text.trim()));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!("{}:\n", input.queries_label));
    for query in input.queries {
        prompt.push_str(&format!("- {query}\n"));
    }
    prompt.push('\n');

    prompt.push_str("CONTEXT:\n");
    prompt.push_str(&build_context_block(input.evidence));
    prompt.push_str("\n\nQUESTION:\n");
    prompt.push_str(input.question.trim());
    prompt.push('\n');
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use groundwise_types::session::Role;

    fn chunk(id: &str, section: Option<&str>, text: &str) -> EvidenceChunk {
        EvidenceChunk {
            id: id.to_string(),
            section: section.map(str::to_string),
            source: None,
            score: 0.5,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_context_block_format() {
        let block = build_context_block(&[
            chunk("c1", Some("Liquids"), "Max 100ml.\n"),
            chunk("c2", None, "Medical liquids exempt."),
        ]);
        assert_eq!(
            block,
            "[c1] Liquids\nMax 100ml.\n\n---\n\n[c2]\nMedical liquids exempt."
        );
    }

    #[test]
    fn test_draft_prompt_sections_in_order() {
        let turns = vec![Turn {
            role: Role::User,
            text: "I'm flying from Sydney".to_string(),
            timestamp: Utc::now(),
            citations: vec![],
        }];
        let evidence = vec![chunk("c1", None, "Max 100ml.")];
        let queries = vec!["saline".to_string()];
        let prompt = build_draft_prompt(&DraftInput {
            question: "Can I carry 150ml saline?",
            user_context: "departure_place: Sydney",
            recent_turns: &turns,
            queries: &queries,
            queries_label: "SUBQUERIES",
            evidence: &evidence,
        });

        let order = [
            "USER_CONTEXT:\ndeparture_place: Sydney",
            "RECENT_CONVERSATION:\nuser: I'm flying from Sydney",
            "SUBQUERIES:\n- saline",
            "CONTEXT:\n[c1]\nMax 100ml.",
            "QUESTION:\nCan I carry 150ml saline?",
        ];
        let positions: Vec<usize> = order.iter().map(|s| prompt.find(s).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_draft_prompt_without_history_or_context() {
        let prompt = build_draft_prompt(&DraftInput {
            question: "q",
            user_context: "  ",
            recent_turns: &[],
            queries: &[],
            queries_label: "EXTRA_QUERIES",
            evidence: &[],
        });
        assert!(prompt.starts_with("USER_CONTEXT:\n(none)"));
        assert!(!prompt.contains("RECENT_CONVERSATION"));
        assert!(prompt.contains("EXTRA_QUERIES:"));
    }
}
