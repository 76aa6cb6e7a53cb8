//! Citation extraction from answer text.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static RE_BRACKETED: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]\n]{1,200})\]").ok());

/// Chunk ids cited in `answer`, in first-occurrence order, without duplicates.
///
/// Recognises `[c1]`, `[c1, c2]` and `[c1; c2]`. Tokens that do not look
/// like identifiers (spaces, quotes, markdown links) are ignored.
pub fn extract_citations(answer: &str) -> Vec<String> {
    let Some(re) = RE_BRACKETED.as_ref() else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    re.captures_iter(answer)
        .filter_map(|caps| caps.get(1))
        .flat_map(|m| m.as_str().split([',', ';']))
        .map(str::trim)
        .filter(|token| is_identifier(token))
        .filter(|token| seen.insert(token.to_string()))
        .map(str::to_string)
        .collect()
}

fn is_identifier(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':' | '#' | '/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_and_grouped_citations() {
        let ids = extract_citations("Liquids are limited [c1]. Medical exemptions apply [c2, c3; c1].");
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
    }

    #[test]
    fn test_ignores_non_identifier_brackets() {
        let ids = extract_citations("See [the policy page](http://x) and [ ] and [c4]");
        assert_eq!(ids, vec!["c4"]);
    }

    #[test]
    fn test_path_like_ids() {
        let ids = extract_citations("Allowed [baggage.md#12] [docs/medical.md:3]");
        assert_eq!(ids, vec!["baggage.md#12", "docs/medical.md:3"]);
    }

    #[test]
    fn test_no_citations() {
        assert!(extract_citations("No evidence was found.").is_empty());
    }
}
