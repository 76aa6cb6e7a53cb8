//! Turn orchestration for Groundwise.
//!
//! `Orchestrator` runs one user turn through a bounded state machine:
//!
//! ```text
//! Plan -> Retrieve -> Draft -> Evaluate -> Done
//!                                  \-> RetrieveExtra -> DraftExtra -> Done
//! ```
//!
//! `DraftExtra` can only move to `Done`, so at most one refinement round runs
//! per turn. The exchange is persisted once, at `Done`; a failed turn leaves
//! the session's turn log untouched.

use std::sync::Arc;

use serde::Serialize;

use groundwise_types::config::AgentLimits;
use groundwise_types::error::{PersistenceError, RetrievalError};
use groundwise_types::evidence::{EvaluationVerdict, EvidenceChunk};
use groundwise_types::llm::GenerationError;
use groundwise_types::session::Turn;

use super::citations::extract_citations;
use super::classifier::{HeuristicTurnClassifier, TurnClassifier, TurnKind};
use super::drafting::{AnswerDrafter, DraftInput, NO_EVIDENCE_ANSWER};
use super::evaluator::SufficiencyEvaluator;
use super::planner::{QueryPlanner, SubqueryList};
use crate::llm::generator::Generator;
use crate::memory::facts::{FactExtractor, RuleBasedFactExtractor};
use crate::memory::session::SessionMemory;
use crate::retrieval::retriever::{EvidenceRetriever, merge_evidence};

/// Reply stored for turns that only add context.
pub const CONTEXT_ACK: &str =
    "Noted. I'll take that into account when answering your questions.";

/// Pipeline stages, in the order a turn visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Plan,
    Retrieve,
    Draft,
    Evaluate,
    RetrieveExtra,
    DraftExtra,
    Done,
}

/// What one turn produced, for display and debugging.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub session_id: String,
    pub kind: TurnKind,
    pub answer: String,
    /// Evidence ids the final answer cites, in first-cited order.
    pub citations: Vec<String>,
    pub subqueries: Vec<String>,
    pub extra_queries: Vec<String>,
    /// Ids of the evidence the final draft was written from, best first.
    pub evidence_ids: Vec<String>,
    pub verdict: Option<EvaluationVerdict>,
    pub refined: bool,
    pub stages: Vec<Stage>,
}

/// Errors that end a turn.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("question is empty")]
    EmptyQuestion,

    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("could not persist session: {0}")]
    Persistence(#[from] PersistenceError),
}

impl TurnError {
    pub fn remediation(&self) -> Option<String> {
        match self {
            TurnError::Generation(e) => e.remediation(),
            TurnError::Retrieval(e) => e.remediation().map(str::to_string),
            _ => None,
        }
    }
}

enum State {
    Plan,
    Retrieve {
        plan: SubqueryList,
    },
    Draft {
        plan: SubqueryList,
        evidence: Vec<EvidenceChunk>,
    },
    Evaluate {
        plan: SubqueryList,
        evidence: Vec<EvidenceChunk>,
        answer: String,
    },
    RetrieveExtra {
        plan: SubqueryList,
        evidence: Vec<EvidenceChunk>,
        verdict: EvaluationVerdict,
    },
    DraftExtra {
        plan: SubqueryList,
        evidence: Vec<EvidenceChunk>,
        verdict: EvaluationVerdict,
    },
    Done(Completed),
}

impl State {
    fn stage(&self) -> Stage {
        match self {
            State::Plan => Stage::Plan,
            State::Retrieve { .. } => Stage::Retrieve,
            State::Draft { .. } => Stage::Draft,
            State::Evaluate { .. } => Stage::Evaluate,
            State::RetrieveExtra { .. } => Stage::RetrieveExtra,
            State::DraftExtra { .. } => Stage::DraftExtra,
            State::Done(_) => Stage::Done,
        }
    }
}

struct Completed {
    answer: String,
    subqueries: Vec<String>,
    evidence: Vec<EvidenceChunk>,
    verdict: Option<EvaluationVerdict>,
    refined: bool,
}

/// Inputs that stay fixed for the whole turn.
struct TurnContext<'a> {
    question: &'a str,
    user_context: String,
    recent_turns: Vec<Turn>,
}

/// Runs user turns through plan, retrieve, draft, evaluate and refine.
///
/// Holds no per-session state: the session travels in the `SessionMemory`
/// passed to [`Orchestrator::answer`].
#[derive(Clone)]
pub struct Orchestrator {
    planner: QueryPlanner,
    retriever: EvidenceRetriever,
    drafter: AnswerDrafter,
    evaluator: SufficiencyEvaluator,
    classifier: Arc<dyn TurnClassifier>,
    fact_extractor: Arc<dyn FactExtractor>,
    history_turns: usize,
}

impl Orchestrator {
    pub fn new(generator: Generator, retriever: EvidenceRetriever, limits: &AgentLimits) -> Self {
        Self {
            planner: QueryPlanner::new(generator.clone()).with_max_subqueries(limits.max_subqueries),
            drafter: AnswerDrafter::new(generator.clone()),
            evaluator: SufficiencyEvaluator::new(generator).with_max_extra(limits.max_extra),
            retriever,
            classifier: Arc::new(HeuristicTurnClassifier),
            fact_extractor: Arc::new(RuleBasedFactExtractor),
            history_turns: limits.history_turns,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn TurnClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_fact_extractor(mut self, extractor: Arc<dyn FactExtractor>) -> Self {
        self.fact_extractor = extractor;
        self
    }

    /// Handle one user turn against `memory`.
    ///
    /// Facts found in the text are stored first. Context-only turns are then
    /// acknowledged without retrieval; questions run the full pipeline.
    #[tracing::instrument(
        name = "answer",
        skip(self, memory, text),
        fields(session_id = %memory.id(), question_chars = text.len())
    )]
    pub async fn answer(
        &self,
        memory: &mut SessionMemory,
        text: &str,
    ) -> Result<TurnOutcome, TurnError> {
        let question = text.trim();
        if question.is_empty() {
            return Err(TurnError::EmptyQuestion);
        }

        let facts = self.fact_extractor.extract(question);
        if !facts.is_empty() {
            tracing::debug!(facts = facts.len(), "facts extracted");
            memory.set_facts(facts).await?;
        }

        if self.classifier.classify(question) == TurnKind::ContextOnly {
            memory.append_context(question).await?;
            memory.record_exchange(question, CONTEXT_ACK, Vec::new()).await?;
            tracing::info!("context-only turn stored");
            return Ok(TurnOutcome {
                session_id: memory.id().to_string(),
                kind: TurnKind::ContextOnly,
                answer: CONTEXT_ACK.to_string(),
                citations: Vec::new(),
                subqueries: Vec::new(),
                extra_queries: Vec::new(),
                evidence_ids: Vec::new(),
                verdict: None,
                refined: false,
                stages: vec![Stage::Done],
            });
        }

        let ctx = TurnContext {
            question,
            user_context: memory.user_context(),
            recent_turns: memory.get_recent_turns(self.history_turns).to_vec(),
        };

        let mut stages = Vec::new();
        let completed = self.run(&ctx, &mut stages).await?;

        let evidence_ids: Vec<String> = completed.evidence.iter().map(|c| c.id.clone()).collect();
        let citations: Vec<String> = extract_citations(&completed.answer)
            .into_iter()
            .filter(|id| evidence_ids.contains(id))
            .collect();

        memory
            .record_exchange(question, completed.answer.as_str(), citations.clone())
            .await?;

        tracing::info!(
            refined = completed.refined,
            evidence = evidence_ids.len(),
            citations = citations.len(),
            "turn complete"
        );

        Ok(TurnOutcome {
            session_id: memory.id().to_string(),
            kind: TurnKind::Question,
            answer: completed.answer,
            citations,
            subqueries: completed.subqueries,
            extra_queries: completed
                .verdict
                .as_ref()
                .filter(|_| completed.refined)
                .map(|v| v.extra_queries.clone())
                .unwrap_or_default(),
            evidence_ids,
            verdict: completed.verdict,
            refined: completed.refined,
            stages,
        })
    }

    async fn run(
        &self,
        ctx: &TurnContext<'_>,
        stages: &mut Vec<Stage>,
    ) -> Result<Completed, TurnError> {
        let mut state = State::Plan;
        loop {
            stages.push(state.stage());
            tracing::debug!(stage = ?state.stage(), "entering stage");

            state = match state {
                State::Plan => {
                    let plan = self.planner.plan(ctx.question, &ctx.user_context).await?;
                    State::Retrieve { plan }
                }
                State::Retrieve { plan } => {
                    let evidence = self.retriever.retrieve(plan.as_slice()).await?;
                    if evidence.is_empty() {
                        tracing::info!("no evidence retrieved; declining to answer");
                        State::Done(Completed {
                            answer: NO_EVIDENCE_ANSWER.to_string(),
                            subqueries: plan.into_inner(),
                            evidence,
                            verdict: None,
                            refined: false,
                        })
                    } else {
                        State::Draft { plan, evidence }
                    }
                }
                State::Draft { plan, evidence } => {
                    let answer = self
                        .drafter
                        .draft(&DraftInput {
                            question: ctx.question,
                            user_context: &ctx.user_context,
                            recent_turns: &ctx.recent_turns,
                            queries: plan.as_slice(),
                            queries_label: "SUBQUERIES",
                            evidence: &evidence,
                        })
                        .await?;
                    State::Evaluate {
                        plan,
                        evidence,
                        answer,
                    }
                }
                State::Evaluate {
                    plan,
                    evidence,
                    answer,
                } => {
                    let ids: Vec<String> = evidence.iter().map(|c| c.id.clone()).collect();
                    let verdict = self
                        .evaluator
                        .evaluate(ctx.question, &ctx.user_context, &answer, &ids)
                        .await?;
                    if verdict.wants_refinement() {
                        State::RetrieveExtra {
                            plan,
                            evidence,
                            verdict,
                        }
                    } else {
                        State::Done(Completed {
                            answer,
                            subqueries: plan.into_inner(),
                            evidence,
                            verdict: Some(verdict),
                            refined: false,
                        })
                    }
                }
                State::RetrieveExtra {
                    plan,
                    evidence,
                    verdict,
                } => {
                    let extra = self.retriever.retrieve(&verdict.extra_queries).await?;
                    State::DraftExtra {
                        plan,
                        evidence: merge_evidence(&evidence, &extra),
                        verdict,
                    }
                }
                State::DraftExtra {
                    plan,
                    evidence,
                    verdict,
                } => {
                    let answer = self
                        .drafter
                        .draft(&DraftInput {
                            question: ctx.question,
                            user_context: &ctx.user_context,
                            recent_turns: &ctx.recent_turns,
                            queries: &verdict.extra_queries,
                            queries_label: "EXTRA_QUERIES",
                            evidence: &evidence,
                        })
                        .await?;
                    State::Done(Completed {
                        answer,
                        subqueries: plan.into_inner(),
                        evidence,
                        verdict: Some(verdict),
                        refined: true,
                    })
                }
                State::Done(completed) => return Ok(completed),
            };
        }
    }
}
