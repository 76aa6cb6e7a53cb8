//! One-shot question answering: `groundwise ask`.

use anyhow::Result;
use console::style;

use groundwise_core::agent::classifier::TurnKind;
use groundwise_core::agent::orchestrator::{Stage, TurnOutcome};

use super::ui;
use crate::state::{AppState, parse_session_id, turn_error};

/// Run one turn against `session` and print the result.
///
/// # Examples
///
/// ```bash
/// groundwise ask "Can I carry 150ml saline on board?"
/// groundwise ask "I'm flying from Sydney" --session trip
/// groundwise ask "What about insulin?" --session trip --debug --json
/// ```
pub async fn ask(
    state: &AppState,
    question: &str,
    session: &str,
    debug: bool,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let orchestrator = state.build_orchestrator().await?;
    let mut memory = state.open_session(parse_session_id(session)?).await?;

    let spinner = ui::spinner("searching evidence...", json || quiet);
    let result = orchestrator.answer(&mut memory, question).await;
    spinner.finish_and_clear();

    let outcome = result.map_err(turn_error)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    print_outcome(&outcome, debug);
    Ok(())
}

/// Print an answer with its sources, plus the pipeline trace when `debug`.
pub fn print_outcome(outcome: &TurnOutcome, debug: bool) {
    println!();
    println!("  {}", outcome.answer.trim());
    println!();

    if !outcome.citations.is_empty() {
        let sources: Vec<String> = outcome
            .citations
            .iter()
            .map(|id| format!("[{id}]"))
            .collect();
        println!(
            "  {} {}",
            style("Sources:").bold(),
            style(sources.join(" ")).cyan()
        );
        println!();
    }

    if debug {
        print_debug(outcome);
    }
}

fn print_debug(outcome: &TurnOutcome) {
    let header = |label: &str| println!("  {}", style(label).bold().underlined());

    header("Pipeline");
    let kind = match outcome.kind {
        TurnKind::Question => "question",
        TurnKind::ContextOnly => "context only",
    };
    println!("  {}  {}", style("Turn:").dim(), kind);
    println!("  {}  {}", style("Stages:").dim(), format_stages(&outcome.stages));
    println!();

    if outcome.kind == TurnKind::ContextOnly {
        return;
    }

    header("Subqueries");
    for (i, query) in outcome.subqueries.iter().enumerate() {
        println!("  {}. {}", i + 1, query);
    }
    println!();

    header("Evidence");
    if outcome.evidence_ids.is_empty() {
        println!("  {}", style("(none retrieved)").dim());
    } else {
        for id in &outcome.evidence_ids {
            let cited = outcome.citations.contains(id);
            println!("  {} {}", ui::check_mark(cited), id);
        }
    }
    println!();

    if let Some(verdict) = &outcome.verdict {
        header("Evaluator");
        println!(
            "  {}  {}",
            style("Needs more evidence:").dim(),
            verdict.needs_more_evidence
        );
        println!("  {}  {}", style("Reason:").dim(), verdict.reason);
        if outcome.refined {
            println!(
                "  {}  {}",
                style("Extra queries:").dim(),
                outcome.extra_queries.join("; ")
            );
        }
        println!();
    }
}

/// Stages joined with arrows, e.g. `plan -> retrieve -> draft`.
pub fn format_stages(stages: &[Stage]) -> String {
    stages
        .iter()
        .map(|stage| match stage {
            Stage::Plan => "plan",
            Stage::Retrieve => "retrieve",
            Stage::Draft => "draft",
            Stage::Evaluate => "evaluate",
            Stage::RetrieveExtra => "retrieve_extra",
            Stage::DraftExtra => "draft_extra",
            Stage::Done => "done",
        })
        .collect::<Vec<_>>()
        .join(" -> ")
}
