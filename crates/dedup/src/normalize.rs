//! Comparison keys for duplicate matching.
//!
//! Deliberately lighter than payee standardization: numbers, titles and word
//! order survive, since they distinguish entities ("Store 12" vs "Store 14").

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const ENTITY_SUFFIXES: &[&str] = &[
    "llc",
    "inc",
    "incorporated",
    "corp",
    "corporation",
    "co",
    "company",
    "ltd",
    "limited",
    "llp",
    "lp",
    "pllc",
    "pc",
    "plc",
    "gmbh",
];

/// Lowercase, fold diacritics, drop punctuation, strip trailing entity suffixes.
///
/// At least one token is always kept, so "Inc" alone stays "inc".
pub fn matching_key(name: &str) -> String {
    let folded: String = name
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(|c| !matches!(c, '\'' | '\u{2019}' | '.'))
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let mut tokens: Vec<&str> = folded.split_whitespace().collect();
    while tokens.len() > 1 && tokens.last().is_some_and(|t| ENTITY_SUFFIXES.contains(t)) {
        tokens.pop();
    }
    tokens.join(" ")
}

/// Candidate block keys: first-token prefix and first-token Soundex.
pub fn block_keys(key: &str) -> Vec<String> {
    let Some(first) = key.split_whitespace().next() else {
        return Vec::new();
    };
    let prefix: String = first.chars().take(3).collect();
    let mut keys = vec![format!("p:{prefix}")];
    let code = crate::similarity::soundex(first);
    if !code.is_empty() {
        keys.push(format!("s:{code}"));
    }
    keys
}
