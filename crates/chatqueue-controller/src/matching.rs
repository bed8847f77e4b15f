//! Fuzzy matching of displayed model labels against the catalog.
//!
//! The header button and menu items render decorated labels (separator
//! dots, tier badges, duplicate display copies across sections), never
//! clean identifiers. Matching is therefore scored: exact signature
//! first, then shared tokens, then shared embedded digits, with a
//! penalty for digit mismatches so "GPT-4" never resolves to "GPT-4.1".
//! Best-effort by contract - callers treat `None` as "leave the current
//! model alone".

use chatqueue_protocols::ModelDefinition;

/// Tokens that decorate labels without identifying a model.
const BADGE_TOKENS: &[&str] = &["new", "beta", "pro", "plus", "preview", "legacy"];

/// Score below which no candidate is considered a match.
const MATCH_THRESHOLD: i32 = 30;

/// Resolve a displayed label to a catalog id, if any entry scores high
/// enough. Ties keep the earliest catalog entry.
pub fn match_model_label(label: &str, catalog: &[ModelDefinition]) -> Option<String> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }

    let mut best: Option<(&ModelDefinition, i32)> = None;
    for def in catalog {
        let score = score_candidate(label, def);
        if score >= MATCH_THRESHOLD && best.map(|(_, s)| score > s).unwrap_or(true) {
            best = Some((def, score));
        }
    }
    best.map(|(def, _)| def.id.clone())
}

fn score_candidate(label: &str, def: &ModelDefinition) -> i32 {
    let label_sig = signature(label);
    if !label_sig.is_empty()
        && (label_sig == signature(&def.label) || label_sig == signature(&def.id))
    {
        return 1000;
    }

    let label_tokens = tokens(label);
    let mut def_tokens = tokens(&def.label);
    for token in tokens(&def.id) {
        if !def_tokens.contains(&token) {
            def_tokens.push(token);
        }
    }

    let mut score = 0;
    for token in &label_tokens {
        if def_tokens.contains(token) {
            score += 10;
        }
    }

    let label_digits = digits(label);
    let def_digits = digits(&def.label);
    match (label_digits.is_empty(), def_digits.is_empty()) {
        (true, true) => {}
        (false, false) if label_digits == def_digits => score += 25,
        // One side digitless: weak evidence either way.
        (true, false) | (false, true) => score -= 5,
        // Conflicting digits ("4" vs "4.1"): strong evidence against.
        (false, false) => score -= 25,
    }

    score
}

/// Lowercase alphanumeric signature, separators and badges removed.
fn signature(s: &str) -> String {
    s.to_ascii_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty() && !BADGE_TOKENS.contains(t))
        .collect()
}

fn tokens(s: &str) -> Vec<String> {
    s.to_ascii_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty() && !BADGE_TOKENS.contains(t))
        .map(str::to_string)
        .collect()
}

/// All digits of a string in order, so "GPT-4.1" and "gpt-4-1" agree on
/// "41" while "GPT-4o" yields "4".
fn digits(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;

    #[test]
    fn test_exact_label() {
        let catalog = default_catalog();
        assert_eq!(
            match_model_label("GPT-5.1 Thinking", &catalog).as_deref(),
            Some("gpt-5-1-thinking")
        );
    }

    #[test]
    fn test_exact_id() {
        let catalog = default_catalog();
        assert_eq!(
            match_model_label("gpt-4o", &catalog).as_deref(),
            Some("gpt-4o")
        );
    }

    #[test]
    fn test_decorated_label() {
        let catalog = default_catalog();
        assert_eq!(
            match_model_label("ChatGPT · 5.1", &catalog).as_deref(),
            Some("gpt-5-1")
        );
    }

    #[test]
    fn test_tier_badges_ignored() {
        let catalog = default_catalog();
        assert_eq!(
            match_model_label("GPT-5.1 Thinking Pro", &catalog).as_deref(),
            Some("gpt-5-1-thinking")
        );
    }

    #[test]
    fn test_digit_mismatch_not_selected() {
        let catalog = default_catalog();
        // "GPT-4" matches neither 4.1 nor 4o strongly enough to risk the
        // wrong version.
        assert_eq!(match_model_label("GPT-4.1", &catalog).as_deref(), Some("gpt-4-1"));
        assert_ne!(match_model_label("GPT-4o", &catalog).as_deref(), Some("gpt-4-1"));
    }

    #[test]
    fn test_five_vs_five_one() {
        let catalog = default_catalog();
        assert_eq!(
            match_model_label("GPT-5 Thinking", &catalog).as_deref(),
            Some("gpt-5-thinking")
        );
        assert_eq!(
            match_model_label("GPT-5.1 Thinking", &catalog).as_deref(),
            Some("gpt-5-1-thinking")
        );
    }

    #[test]
    fn test_unrelated_label() {
        let catalog = default_catalog();
        assert_eq!(match_model_label("Auto", &catalog), None);
        assert_eq!(match_model_label("", &catalog), None);
        assert_eq!(match_model_label("   ", &catalog), None);
    }
}
