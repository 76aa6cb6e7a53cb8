//! Turn classification: is this a question, or context about the user?
//!
//! Context-only turns ("I'm flying from Sydney") are stored as facts and
//! acknowledged without retrieval.

use serde::{Deserialize, Serialize};

/// What a user turn asks of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    Question,
    ContextOnly,
}

/// Decides whether a user turn needs an answer.
pub trait TurnClassifier: Send + Sync {
    fn classify(&self, text: &str) -> TurnKind;
}

/// First words that make a sentence a question or a request.
const QUESTION_OPENERS: &[&str] = &[
    "what", "when", "where", "which", "who", "whom", "whose", "why", "how", "can", "could",
    "may", "might", "should", "would", "will", "is", "are", "am", "do", "does", "did", "was",
    "were", "has", "have", "had", "tell", "explain", "list", "describe", "show", "give",
    "help", "please", "compare", "find", "check",
];

/// Phrases that turn a first-person sentence into a question.
const QUESTION_PHRASES: &[&str] = &[
    "can i", "could i", "may i", "am i allowed", "is it allowed", "allowed to", "want to know",
    "wondering", "need to know", "not sure", "is there", "are there", "do i need",
];

/// First-person openers of a statement about the user.
const CONTEXT_OPENERS: &[&str] = &[
    "i'm", "i am", "im", "i have", "i've", "ive", "i'll", "i will", "i was", "we're",
    "we are", "we have", "we've", "we'll", "my", "our", "i", "we", "also", "fyi", "note",
];

/// Words that open a question at the start of any clause.
const WH_WORDS: &[&str] = &[
    "what", "when", "where", "which", "who", "whom", "whose", "why", "how",
];

/// Auxiliaries that start a yes/no question when followed by a subject.
const AUXILIARIES: &[&str] = &[
    "is", "are", "am", "was", "were", "can", "could", "may", "might", "should", "would",
    "will", "do", "does", "did", "has", "have",
];

/// Subjects that follow an auxiliary in an inverted (question) clause.
const SUBJECTS: &[&str] = &[
    "i", "we", "you", "it", "that", "this", "they", "there", "he", "she", "my", "our",
];

/// Subjects whose inversion reads as a question anywhere in a run-on sentence.
const DEICTIC_SUBJECTS: &[&str] = &["it", "that", "this", "there"];

/// Words after `how` that ask for an amount.
const DEGREE_WORDS: &[&str] = &[
    "much", "many", "long", "heavy", "big", "far", "early", "late", "old",
];

/// Conjunctions that start a new clause.
const CLAUSE_JOINERS: &[&str] = &["and", "but", "so", "then"];

/// Word- and punctuation-based classifier.
///
/// A turn is a question when it contains `?`, opens with an interrogative
/// or request word, has a clause that opens with an interrogative or an
/// inverted auxiliary ("is that", "can i"), or contains a question phrase.
/// Otherwise it is context when it opens in the first person, and a
/// question in every other case.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicTurnClassifier;

impl TurnClassifier for HeuristicTurnClassifier {
    fn classify(&self, text: &str) -> TurnKind {
        let lowered = text.trim().to_lowercase().replace('’', "'");
        if lowered.contains('?') {
            return TurnKind::Question;
        }

        let words: Vec<&str> = lowered
            .split(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | '!' | ':' | ';'))
            .filter(|w| !w.is_empty())
            .collect();
        let Some(first) = words.first() else {
            return TurnKind::Question;
        };

        if QUESTION_OPENERS.contains(first) {
            return TurnKind::Question;
        }
        if clauses(&lowered).iter().any(|clause| opens_question(clause))
            || has_inverted_question(&words)
        {
            return TurnKind::Question;
        }
        let joined = words.join(" ");
        if QUESTION_PHRASES
            .iter()
            .any(|p| joined == *p || joined.starts_with(&format!("{p} ")) || joined.contains(&format!(" {p} ")))
        {
            return TurnKind::Question;
        }

        let opener_two = words.iter().take(2).copied().collect::<Vec<_>>().join(" ");
        if CONTEXT_OPENERS.contains(first) || CONTEXT_OPENERS.contains(&opener_two.as_str()) {
            return TurnKind::ContextOnly;
        }
        TurnKind::Question
    }
}

/// Split lowered text into clauses at punctuation and joining conjunctions.
fn clauses(lowered: &str) -> Vec<Vec<&str>> {
    let mut out = Vec::new();
    for part in lowered.split([',', '.', ';', '!', ':']) {
        let mut clause = Vec::new();
        for word in part.split_whitespace() {
            if CLAUSE_JOINERS.contains(&word) {
                if !clause.is_empty() {
                    out.push(std::mem::take(&mut clause));
                }
            } else {
                clause.push(word);
            }
        }
        if !clause.is_empty() {
            out.push(clause);
        }
    }
    out
}

/// Whether a clause starts like a question: `what are ...`, `is it ...`.
fn opens_question(clause: &[&str]) -> bool {
    match clause {
        [first, ..] if WH_WORDS.contains(first) => true,
        [aux, subject, ..] => AUXILIARIES.contains(aux) && SUBJECTS.contains(subject),
        _ => false,
    }
}

/// Question inversions that survive missing punctuation, e.g.
/// "my bag weighs 25kg is that ok" or "i wonder how much it costs".
fn has_inverted_question(words: &[&str]) -> bool {
    words.windows(2).any(|pair| {
        (AUXILIARIES.contains(&pair[0]) && DEICTIC_SUBJECTS.contains(&pair[1]))
            || (pair[0] == "how" && DEGREE_WORDS.contains(&pair[1]))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> TurnKind {
        HeuristicTurnClassifier.classify(text)
    }

    #[test]
    fn test_questions() {
        for text in [
            "Can I carry 150ml saline?",
            "what is the cabin bag limit",
            "Tell me about sports equipment",
            "I want to know whether I can bring my bike",
            "I'm not sure if insulin is allowed",
            "baggage allowance for infants",
            "I need to bring insulin, what are the rules",
            "My bag weighs 25kg is that ok",
            "I want to bring my bike. how much does it cost",
            "I'm travelling with a pram and can I check it at the gate",
            "I wonder how much the excess baggage fee is",
        ] {
            assert_eq!(classify(text), TurnKind::Question, "{text}");
        }
    }

    #[test]
    fn test_context_statements() {
        for text in [
            "I'm flying from Sydney to Los Angeles.",
            "I’m 30 weeks pregnant",
            "My daughter is 3",
            "We are travelling with a surfboard",
            "I have a CPAP machine",
            "I'm flying to London, then Paris",
            "My son is 4 and my wife is pregnant",
            "We are travelling with our dog and will be checking it in",
        ] {
            assert_eq!(classify(text), TurnKind::ContextOnly, "{text}");
        }
    }

    #[test]
    fn test_clause_split_at_punctuation_and_conjunctions() {
        let parts = clauses("i need insulin, what are the rules and is it ok");
        assert_eq!(
            parts,
            vec![
                vec!["i", "need", "insulin"],
                vec!["what", "are", "the", "rules"],
                vec!["is", "it", "ok"],
            ]
        );
    }

    #[test]
    fn test_empty_is_question() {
        assert_eq!(classify("   "), TurnKind::Question);
    }
}
