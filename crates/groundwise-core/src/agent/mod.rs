//! The agents that run one user turn.
//!
//! - `QueryPlanner`: question -> bounded subquery list
//! - `AnswerDrafter`: evidence -> cited answer
//! - `SufficiencyEvaluator`: answer -> verdict and follow-up queries
//! - `Orchestrator`: the bounded plan/retrieve/draft/evaluate/refine loop
//! - `lenient`: recovery of structured output from free text

pub mod citations;
pub mod classifier;
pub mod drafting;
pub mod evaluator;
pub mod lenient;
pub mod orchestrator;
pub mod planner;
