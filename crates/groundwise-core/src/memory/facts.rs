//! Fact extraction from user text.
//!
//! `RuleBasedFactExtractor` is a small regex table tuned for travel-policy
//! questions: where the user departs from and flies to, and which topics
//! (medical, sports equipment, pregnancy) the conversation touches.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Pulls stable facts out of one user message.
///
/// Returned keys are written with last-write-wins semantics, so an
/// extractor only needs to report what this message says.
pub trait FactExtractor: Send + Sync {
    fn extract(&self, text: &str) -> BTreeMap<String, Value>;
}

macro_rules! fact_pattern {
    ($name:ident, $regex_str:expr) => {
        static $name: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new($regex_str).ok());
    };
}

// Place captures stop at the first time or preposition word, so
// "flying to Perth tomorrow with my CPAP" yields "Perth".
fact_pattern!(
    RE_FLYING_FROM,
    r"(?i)\bflying\s+from\s+([A-Za-z]+(?:\s+[A-Za-z]+)*?)(?:\s+(?:and|to|next|tomorrow|today|tonight|this|with|on|in|for|at|via)\b|,|\.|!|\?|$)"
);
fact_pattern!(
    RE_FLYING_TO,
    r"(?i)\bflying\s+(?:from\s+[A-Za-z ]+?\s+)?to\s+([A-Za-z]+(?:\s+[A-Za-z]+)*?)(?:\s+(?:and|next|tomorrow|today|tonight|this|with|on|in|for|at|via)\b|,|\.|!|\?|$)"
);
fact_pattern!(RE_AUSTRALIA, r"(?i)\baustralia\b");
fact_pattern!(
    RE_USA,
    r"(?i)\bto\s+(?:the\s+)?usa?\b|\bunited\s+states\b|\bamerica\b"
);
fact_pattern!(RE_PREGNANT, r"(?i)\bpregnan(?:t|cy)\b");
fact_pattern!(
    RE_SPORTS,
    r"(?i)\b(?:bike|bicycle|surf(?:board)?|golf|skis?|snowboard|diving|scuba|racket)\b"
);
fact_pattern!(
    RE_MEDICAL,
    r"(?i)\b(?:medication|medicine|medical|cpap|oxygen|dialysis|insulin|saline)\b"
);

fn matches(re: &LazyLock<Option<Regex>>, text: &str) -> bool {
    re.as_ref().is_some_and(|r| r.is_match(text))
}

fn capture(re: &LazyLock<Option<Regex>>, text: &str) -> Option<String> {
    let caps = re.as_ref()?.captures(text)?;
    let place = caps.get(1)?.as_str().trim();
    (!place.is_empty()).then(|| place.to_string())
}

/// Default [`FactExtractor`]: fast, deterministic, no generator calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedFactExtractor;

impl FactExtractor for RuleBasedFactExtractor {
    fn extract(&self, text: &str) -> BTreeMap<String, Value> {
        let text = text.trim();
        let mut facts = BTreeMap::new();

        if let Some(place) = capture(&RE_FLYING_FROM, text) {
            facts.insert("departure_place".to_string(), Value::String(place));
        }
        if let Some(place) = capture(&RE_FLYING_TO, text) {
            facts.insert("destination_place".to_string(), Value::String(place));
        }
        if matches(&RE_AUSTRALIA, text) {
            facts.insert("departure_country".to_string(), Value::from("Australia"));
        }
        if matches(&RE_USA, text) {
            facts.insert("destination_country".to_string(), Value::from("USA"));
        }
        if matches(&RE_PREGNANT, text) {
            facts.insert("traveller_pregnant".to_string(), Value::Bool(true));
        }
        if matches(&RE_SPORTS, text) {
            facts.insert("topic_sports_equipment".to_string(), Value::Bool(true));
        }
        if matches(&RE_MEDICAL, text) {
            facts.insert("topic_medical".to_string(), Value::Bool(true));
        }

        facts
    }
}
