//! Lenient decoding of structured generator output.
//!
//! Small local models wrap JSON in prose, fence it in markdown, rename keys,
//! and quote booleans. This module recovers what it can and reports what it
//! could not, so each agent can pick its own fallback.
//!
//! Decoding order: strict parse of the trimmed text, then the contents of a
//! code fence, then the first balanced `{...}` (or `[...]`) substring.

use serde_json::{Map, Value};

use groundwise_types::error::SchemaError;

/// Result of decoding: either the parsed value or a fallback plus the reason.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    Ok(T),
    Fallback { value: T, reason: SchemaError },
}

impl<T> Decoded<T> {
    /// Decode with `parse`, substituting `fallback()` on any schema error.
    pub fn or_fallback(
        parsed: Result<T, SchemaError>,
        fallback: impl FnOnce() -> T,
    ) -> Self {
        match parsed {
            Ok(value) => Decoded::Ok(value),
            Err(reason) => Decoded::Fallback {
                value: fallback(),
                reason,
            },
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Decoded::Ok(value) | Decoded::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Decoded::Ok(value) | Decoded::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Decoded::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<&SchemaError> {
        match self {
            Decoded::Ok(_) => None,
            Decoded::Fallback { reason, .. } => Some(reason),
        }
    }
}

/// Extract a JSON value from free-form generator output.
pub fn extract_json(raw: &str) -> Result<Value, SchemaError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SchemaError::Empty);
    }

    let strict_error = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => e.to_string(),
    };

    if let Some(fenced) = fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(fenced.trim()) {
            return Ok(value);
        }
    }

    let mut last_error = None;
    for (open, close) in [('{', '}'), ('[', ']')] {
        for candidate in balanced_spans(trimmed, open, close) {
            match serde_json::from_str::<Value>(candidate) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    last_error.get_or_insert_with(|| e.to_string());
                }
            }
        }
    }

    match last_error {
        Some(e) => Err(SchemaError::InvalidJson(e)),
        None if trimmed.starts_with('{') || trimmed.starts_with('[') => {
            Err(SchemaError::InvalidJson(strict_error))
        }
        None => Err(SchemaError::NoObject),
    }
}

/// Body of the first markdown code fence, with any language tag removed.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after[body_start..];
    let end = body.find("```").unwrap_or(body.len());
    Some(&body[..end])
}

/// Every balanced `open..close` span, outermost first, in text order.
///
/// Brackets inside JSON strings (and escaped quotes) are ignored.
fn balanced_spans(text: &str, open: char, close: char) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut search_from = 0;

    while let Some(rel) = text[search_from..].find(open) {
        let start = search_from + rel;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        let mut end = None;

        for (i, c) in text[start..].char_indices() {
            if in_string {
                match c {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match c {
                '"' => in_string = true,
                c if c == open => depth += 1,
                c if c == close => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(start + i + c.len_utf8());
                        break;
                    }
                }
                _ => {}
            }
        }

        match end {
            Some(end) => {
                spans.push(&text[start..end]);
                search_from = end;
            }
            // Unterminated; a later opener cannot close either.
            None => break,
        }
    }

    spans
}

/// Lower-case a key and fold `-` and spaces into `_`.
pub fn normalize_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// A canonical field name and the aliases generators use for it.
pub type Synonyms = &'static [(&'static str, &'static [&'static str])];

/// Rename aliased keys to their canonical names.
///
/// Keys are normalized first. An exact canonical key beats any alias; among
/// aliases the first one encountered wins. Unknown keys pass through.
pub fn canonicalize(object: Map<String, Value>, synonyms: Synonyms) -> Map<String, Value> {
    let mut exact = Map::new();
    let mut aliased: Vec<(String, Value)> = Vec::new();

    for (key, value) in object {
        let key = normalize_key(&key);
        match synonyms.iter().find(|(canonical, aliases)| {
            *canonical == key || aliases.contains(&key.as_str())
        }) {
            Some((canonical, _)) if *canonical == key => {
                exact.entry(key).or_insert(value);
            }
            Some((canonical, _)) => aliased.push((canonical.to_string(), value)),
            None => {
                exact.entry(key).or_insert(value);
            }
        }
    }

    for (key, value) in aliased {
        exact.entry(key).or_insert(value);
    }
    exact
}

/// Booleans, non-zero numbers, and `true/yes/y/1` style strings.
pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// A string, or a number rendered as one.
pub fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A list of strings, a single string, or `null` (empty).
///
/// List items that are objects contribute their `query` or `text` field.
/// Items that cannot be read as text are skipped.
pub fn coerce_string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Null => Some(Vec::new()),
        Value::String(s) => Some(vec![s.clone()]),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(obj) => ["query", "text", "q"]
                        .iter()
                        .find_map(|k| obj.get(*k).and_then(coerce_string)),
                    other => coerce_string(other),
                })
                .collect(),
        ),
        _ => None,
    }
}

/// Trim, collapse internal whitespace, drop empties, and dedupe
/// case-insensitively keeping the first spelling.
pub fn normalize_queries<I, S>(queries: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    queries
        .into_iter()
        .map(|q| q.as_ref().split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|q| !q.is_empty())
        .filter(|q| seen.insert(q.to_lowercase()))
        .collect()
}
