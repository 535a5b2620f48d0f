//! `{{TOKEN}}` placeholder detection
//!
//! Placeholders are upper-case snake-case tokens wrapped in double braces.
//! They are never altered by formatting operations and the rewrite
//! guardrails require them to survive an AI rewrite.

use regex_lite::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{([A-Z0-9_]+)\}\}").expect("placeholder pattern is a valid regex")
    })
}

/// Extract the full `{{TOKEN}}` strings in order of appearance
pub fn extract_placeholders(text: &str) -> Vec<String> {
    placeholder_pattern()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Extract the bare token names (without braces) in order of appearance
pub fn extract_tokens(text: &str) -> Vec<String> {
    placeholder_pattern()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Count occurrences of each token name
pub fn count_tokens(text: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for token in extract_tokens(text) {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

/// Placeholders of `original` that no longer appear in `candidate`
pub fn missing_placeholders(original: &str, candidate: &str) -> Vec<String> {
    let kept: BTreeSet<String> = extract_placeholders(candidate).into_iter().collect();
    let mut reported = BTreeSet::new();
    extract_placeholders(original)
        .into_iter()
        .filter(|p| !kept.contains(p) && reported.insert(p.clone()))
        .collect()
}

/// Substitute known tokens. Tokens without a non-blank value are left in
/// place and reported, sorted and unique.
pub fn replace_placeholders(
    text: &str,
    values: &BTreeMap<String, String>,
) -> (String, Vec<String>) {
    let mut unresolved = BTreeSet::new();
    let replaced = placeholder_pattern().replace_all(text, |caps: &regex_lite::Captures<'_>| {
        let token = &caps[1];
        match values.get(token) {
            Some(value) if !value.trim().is_empty() => value.clone(),
            _ => {
                unresolved.insert(token.to_string());
                caps[0].to_string()
            }
        }
    });
    (replaced.into_owned(), unresolved.into_iter().collect())
}
