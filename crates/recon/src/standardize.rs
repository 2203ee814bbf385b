//! Payee name standardizer.
//!
//! `standardize` is pure and deterministic. Each cleaning step is applied in a
//! fixed order and logged only when it changed the string. The normalized
//! form is the dedup key for classification collapse.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalized value for null, non-string, or empty-after-cleaning input.
pub const UNKNOWN_PAYEE: &str = "UNKNOWN";

/// Affix-stripping rounds. Removing one affix can expose another
/// ("Acme Inc Jr" -> "Acme Inc" -> "Acme").
const MAX_AFFIX_ROUNDS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStep {
    WhitespaceNormalized,
    EmailExtracted,
    EmailRemoved,
    PhoneRemoved,
    PunctuationRemoved,
    ApostrophesHyphensNormalized,
    NumbersRemoved,
    BusinessSuffixRemoved,
    AddressRemoved,
    TitleRemoved,
    GenerationalSuffixRemoved,
    ArticleRemoved,
    DiacriticsNormalized,
    AbbreviationsExpanded,
    WhitespaceCollapsed,
    TitleCased,
    FallbackUnknown,
}

impl CleaningStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WhitespaceNormalized => "whitespace_normalized",
            Self::EmailExtracted => "email_extracted",
            Self::EmailRemoved => "email_removed",
            Self::PhoneRemoved => "phone_removed",
            Self::PunctuationRemoved => "punctuation_removed",
            Self::ApostrophesHyphensNormalized => "apostrophes_hyphens_normalized",
            Self::NumbersRemoved => "numbers_removed",
            Self::BusinessSuffixRemoved => "business_suffix_removed",
            Self::AddressRemoved => "address_removed",
            Self::TitleRemoved => "title_removed",
            Self::GenerationalSuffixRemoved => "generational_suffix_removed",
            Self::ArticleRemoved => "article_removed",
            Self::DiacriticsNormalized => "diacritics_normalized",
            Self::AbbreviationsExpanded => "abbreviations_expanded",
            Self::WhitespaceCollapsed => "whitespace_collapsed",
            Self::TitleCased => "title_cased",
            Self::FallbackUnknown => "fallback_unknown",
        }
    }
}

impl std::fmt::Display for CleaningStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardizationResult {
    pub original: String,
    pub normalized: String,
    pub cleaning_steps: Vec<CleaningStep>,
}

impl StandardizationResult {
    /// True when standardization produced something other than the input.
    pub fn changed(&self) -> bool {
        self.normalized != self.original
    }

    pub fn is_fallback(&self) -> bool {
        self.cleaning_steps.contains(&CleaningStep::FallbackUnknown)
    }
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([a-z0-9._%+-]+)@([a-z0-9-]+)((?:\.[a-z0-9-]+)*\.[a-z]{2,})\b")
        .expect("email regex")
});

static WEB_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:https?://)?(?:www\.)?[a-z0-9-]+\.(?:com|net|org|io|biz|info|us|co)\b\S*")
        .expect("web address regex")
});

static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?1[\s.-]?)?\(?\b\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}\b").expect("phone regex")
});

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b\d+(?:st|nd|rd|th)?\b").expect("number regex"));

static BUSINESS_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s+(?:&\s+)?(?:LLC|L L C|INC|INCORPORATED|CORP|CORPORATION|CO|COMPANY|LTD|LIMITED|LLP|LP|PLLC|PC|PLC|GMBH)$",
    )
    .expect("business suffix regex")
});

static ADDRESS_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:STREET|AVENUE|AVE|ROAD|BOULEVARD|BLVD|HIGHWAY|HWY|SUITE|STE|APT|APARTMENT|UNIT|FLOOR|BLDG|PO BOX|P O BOX|NORTH|SOUTH|EAST|WEST|NE|NW|SE|SW)\b",
    )
    .expect("address regex")
});

static TITLE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:MR|MRS|MS|MISS|MX|DR|PROF|PROFESSOR|REV|REVEREND|HON|SIR|DAME|CAPT|SGT|FR)\s+")
        .expect("title regex")
});

static GENERATIONAL_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(?:JR|SR|II|III|IV|JUNIOR|SENIOR)$").expect("generational regex")
});

static LEADING_ARTICLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:THE|A|AN)\s+").expect("article regex"));

/// Mailbox names that say nothing about who the payee is.
const GENERIC_MAILBOXES: &[&str] = &[
    "info", "billing", "admin", "sales", "support", "contact", "accounts", "ap", "ar",
    "office", "hello", "mail", "noreply", "no-reply", "payments", "invoices",
];

const ABBREVIATIONS: &[(&str, &str)] = &[
    ("CORP", "CORPORATION"),
    ("CO", "COMPANY"),
    ("INTL", "INTERNATIONAL"),
    ("MGMT", "MANAGEMENT"),
    ("SVC", "SERVICE"),
    ("SVCS", "SERVICES"),
    ("ASSOC", "ASSOCIATES"),
    ("ASSN", "ASSOCIATION"),
    ("BROS", "BROTHERS"),
    ("MFG", "MANUFACTURING"),
    ("DEPT", "DEPARTMENT"),
    ("NATL", "NATIONAL"),
    ("UNIV", "UNIVERSITY"),
    ("HOSP", "HOSPITAL"),
    ("CTR", "CENTER"),
    ("TECH", "TECHNOLOGY"),
    ("ENGR", "ENGINEERING"),
    ("SYS", "SYSTEMS"),
    ("GOVT", "GOVERNMENT"),
    ("INS", "INSURANCE"),
];

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Standardize a raw payee value. `None` stands for null / non-string input.
pub fn standardize(raw: Option<&str>) -> StandardizationResult {
    let Some(raw) = raw else {
        return StandardizationResult {
            original: String::new(),
            normalized: UNKNOWN_PAYEE.to_string(),
            cleaning_steps: vec![CleaningStep::FallbackUnknown],
        };
    };

    let mut cleaner = Cleaner {
        value: raw.to_string(),
        steps: Vec::new(),
    };

    cleaner.apply(CleaningStep::WhitespaceNormalized, collapse);
    cleaner.handle_email();
    cleaner.apply(CleaningStep::PhoneRemoved, |s| PHONE.replace_all(s, " ").into_owned());
    cleaner.apply(CleaningStep::PunctuationRemoved, strip_punctuation);
    cleaner.apply(CleaningStep::ApostrophesHyphensNormalized, |s| {
        s.chars()
            .filter(|c| !matches!(c, '\'' | '\u{2019}'))
            .map(|c| if c == '-' { ' ' } else { c })
            .collect()
    });
    cleaner.apply(CleaningStep::NumbersRemoved, |s| NUMBER.replace_all(s, " ").into_owned());

    for _ in 0..MAX_AFFIX_ROUNDS {
        let before = cleaner.value.clone();
        cleaner.apply(CleaningStep::BusinessSuffixRemoved, |s| strip_repeated(s, &BUSINESS_SUFFIX));
        cleaner.apply(CleaningStep::AddressRemoved, |s| {
            non_empty_or(ADDRESS_TOKEN.replace_all(s, " ").into_owned(), s)
        });
        cleaner.apply(CleaningStep::TitleRemoved, |s| strip_repeated(s, &TITLE_PREFIX));
        cleaner.apply(CleaningStep::GenerationalSuffixRemoved, |s| {
            strip_repeated(s, &GENERATIONAL_SUFFIX)
        });
        cleaner.apply(CleaningStep::ArticleRemoved, |s| {
            non_empty_or(LEADING_ARTICLE.replace(s, "").into_owned(), s)
        });
        if cleaner.value == before {
            break;
        }
    }

    cleaner.apply(CleaningStep::DiacriticsNormalized, fold_diacritics);
    cleaner.apply(CleaningStep::AbbreviationsExpanded, expand_abbreviations);
    cleaner.apply(CleaningStep::WhitespaceCollapsed, collapse);

    if cleaner.value.is_empty() {
        cleaner.steps.push(CleaningStep::FallbackUnknown);
        return cleaner.finish(raw, UNKNOWN_PAYEE.to_string());
    }
    if cleaner.value.eq_ignore_ascii_case(UNKNOWN_PAYEE) {
        // A literal "unknown" payee shares the fallback key.
        return cleaner.finish(raw, UNKNOWN_PAYEE.to_string());
    }

    cleaner.apply(CleaningStep::TitleCased, title_case);
    let normalized = cleaner.value.clone();
    cleaner.finish(raw, normalized)
}

struct Cleaner {
    value: String,
    steps: Vec<CleaningStep>,
}

impl Cleaner {
    /// Run one step; whitespace is re-collapsed so the next step sees a tidy string.
    fn apply(&mut self, step: CleaningStep, f: impl FnOnce(&str) -> String) {
        let next = collapse(&f(&self.value));
        if next != self.value {
            self.value = next;
            if !self.steps.contains(&step) {
                self.steps.push(step);
            }
        }
    }

    fn handle_email(&mut self) {
        if self.value.contains('@') {
            let Some(caps) = EMAIL.captures(&self.value) else {
                return;
            };
            let whole = caps.get(0).map(|m| m.as_str().len()).unwrap_or(0);
            if whole == self.value.len() {
                let local = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                let domain = caps.get(2).map(|m| m.as_str()).unwrap_or("");
                let identity = email_identity(local, domain);
                self.apply(CleaningStep::EmailExtracted, |_| identity);
            } else {
                self.apply(CleaningStep::EmailRemoved, |s| EMAIL.replace_all(s, " ").into_owned());
            }
        } else {
            self.apply(CleaningStep::EmailRemoved, |s| {
                non_empty_or(WEB_ADDRESS.replace_all(s, " ").into_owned(), s)
            });
        }
    }

    fn finish(self, raw: &str, normalized: String) -> StandardizationResult {
        StandardizationResult {
            original: raw.to_string(),
            normalized,
            cleaning_steps: self.steps,
        }
    }
}

// ---------------------------------------------------------------------------
// Step helpers
// ---------------------------------------------------------------------------

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep `candidate` unless the step would wipe the name out entirely.
fn non_empty_or(candidate: String, fallback: &str) -> String {
    if candidate.trim().is_empty() {
        fallback.to_string()
    } else {
        candidate
    }
}

fn strip_repeated(s: &str, re: &Regex) -> String {
    let mut current = s.trim().to_string();
    loop {
        let next = re.replace(&current, "").trim().to_string();
        if next == current || next.is_empty() {
            return current;
        }
        current = next;
    }
}

fn email_identity(local: &str, domain: &str) -> String {
    let local_lower = local.to_lowercase();
    let source = if GENERIC_MAILBOXES.contains(&local_lower.as_str()) {
        domain
    } else {
        local
    };
    source
        .chars()
        .map(|c| if matches!(c, '.' | '_' | '+' | '-' | '%') { ' ' } else { c })
        .collect()
}

fn strip_punctuation(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '.')
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() || matches!(c, '\'' | '\u{2019}' | '-' | '&') {
                c
            } else {
                ' '
            }
        })
        .collect()
}

fn fold_diacritics(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.nfd().filter(|c| !is_combining_mark(*c)) {
        match c {
            'ß' => out.push_str("ss"),
            'æ' => out.push_str("ae"),
            'Æ' => out.push_str("AE"),
            'œ' => out.push_str("oe"),
            'Œ' => out.push_str("OE"),
            'ø' => out.push('o'),
            'Ø' => out.push('O'),
            'ł' => out.push('l'),
            'Ł' => out.push('L'),
            'đ' => out.push('d'),
            'Đ' => out.push('D'),
            _ => out.push(c),
        }
    }
    out
}

fn expand_abbreviations(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let upper = word.to_uppercase();
            ABBREVIATIONS
                .iter()
                .find(|(abbr, _)| *abbr == upper)
                .map(|(_, full)| (*full).to_string())
                .unwrap_or_else(|| word.to_string())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
