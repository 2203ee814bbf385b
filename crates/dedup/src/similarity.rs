//! Composite similarity between two matching keys.

use std::collections::BTreeSet;

use serde::Serialize;
use strsim::{jaro_winkler, normalized_levenshtein};

const EDIT_WEIGHT: f64 = 0.4;
const TOKEN_WEIGHT: f64 = 0.3;
const PHONETIC_WEIGHT: f64 = 0.3;

/// Component scores, each 0.0-1.0, plus the blended 0-100 score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimilarityBreakdown {
    pub jaro_winkler: f64,
    pub token_sort: f64,
    pub phonetic: f64,
    pub score: f64,
}

/// Blend edit-distance, order-insensitive token and phonetic similarity into 0-100.
///
/// Identical non-empty keys score exactly 100. An empty key scores 0 against anything.
pub fn composite_similarity(a: &str, b: &str) -> SimilarityBreakdown {
    if a.is_empty() || b.is_empty() {
        return SimilarityBreakdown {
            jaro_winkler: 0.0,
            token_sort: 0.0,
            phonetic: 0.0,
            score: 0.0,
        };
    }
    if a == b {
        return SimilarityBreakdown {
            jaro_winkler: 1.0,
            token_sort: 1.0,
            phonetic: 1.0,
            score: 100.0,
        };
    }

    let jw = jaro_winkler(a, b);
    let token_sort = token_sort_ratio(a, b);
    let phonetic = phonetic_overlap(a, b);
    let score = 100.0 * (EDIT_WEIGHT * jw + TOKEN_WEIGHT * token_sort + PHONETIC_WEIGHT * phonetic);

    SimilarityBreakdown {
        jaro_winkler: jw,
        token_sort,
        phonetic,
        score: score.clamp(0.0, 100.0),
    }
}

/// Normalized Levenshtein over alphabetically sorted tokens.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    normalized_levenshtein(&sorted_tokens(a), &sorted_tokens(b))
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Jaccard overlap of per-token Soundex codes.
pub fn phonetic_overlap(a: &str, b: &str) -> f64 {
    let codes = |s: &str| -> BTreeSet<String> {
        s.split_whitespace()
            .map(soundex)
            .filter(|c| !c.is_empty())
            .collect()
    };
    let (ca, cb) = (codes(a), codes(b));
    let union = ca.union(&cb).count();
    if union == 0 {
        return 0.0;
    }
    ca.intersection(&cb).count() as f64 / union as f64
}

/// American Soundex. Non-ASCII letters and digits are ignored; a word with no
/// letters has an empty code.
pub fn soundex(word: &str) -> String {
    let mut letters = word
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase());

    let Some(first) = letters.next() else {
        return String::new();
    };

    let mut code = String::with_capacity(4);
    code.push(first.to_ascii_uppercase());
    let mut last = soundex_digit(first);

    for c in letters {
        if code.len() == 4 {
            break;
        }
        match c {
            // h and w do not separate letters with the same code.
            'h' | 'w' => {}
            'a' | 'e' | 'i' | 'o' | 'u' | 'y' => last = None,
            _ => {
                let digit = soundex_digit(c);
                if let Some(d) = digit.filter(|_| digit != last) {
                    code.push(d);
                }
                last = digit;
            }
        }
    }

    while code.len() < 4 {
        code.push('0');
    }
    code
}

fn soundex_digit(c: char) -> Option<char> {
    match c {
        'b' | 'f' | 'p' | 'v' => Some('1'),
        'c' | 'g' | 'j' | 'k' | 'q' | 's' | 'x' | 'z' => Some('2'),
        'd' | 't' => Some('3'),
        'l' => Some('4'),
        'm' | 'n' => Some('5'),
        'r' => Some('6'),
        _ => None,
    }
}
