//! Query keyword expansion for targeted extraction.
//!
//! Turns a free-form question into a lower-cased keyword set: words of three
//! or more alphanumerics minus stop words, 2-/3-word phrases, bare integers,
//! suffix-stripped variants and domain synonyms. Pure and deterministic.

use std::collections::{BTreeSet, HashMap};

use clausewise_core::Query;
use once_cell::sync::Lazy;
use regex::Regex;

/// Words too common in questions to say anything about the contract.
pub const STOP_WORDS: &[&str] = &[
    "please", "that", "about", "would", "could", "there", "which", "what", "the",
    "and", "for", "are", "was", "were", "this", "these", "those", "with", "from",
    "into", "have", "has", "had", "does", "did", "can", "will", "how", "why",
    "when", "where", "who", "whom", "you", "your", "our", "their", "they", "its",
    "any", "all", "not", "but", "also", "should", "tell", "explain",
];

/// Minimum non-space characters for a multi-word phrase to count.
const MIN_PHRASE_LETTERS: usize = 6;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9]{3,}").unwrap());
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+\b").unwrap());

/// Base keyword → domain synonyms.
static SYNONYMS: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let entries: &[(&str, &[&str])] = &[
        ("payment", &["compensation", "fee", "payout", "remuneration"]),
        ("compensation", &["payment", "fee", "payout"]),
        ("fee", &["fees", "payment"]),
        ("royalty", &["royalties"]),
        ("salary", &["wage", "pay"]),
        ("intellectual", &["ip", "copyright"]),
        ("property", &["ownership"]),
        ("license", &["licence", "licensing"]),
        ("rights", &["usage", "use", "right"]),
        ("termination", &["terminate", "terminating", "cancellation", "cancel", "ending"]),
        ("notice", &["notification", "advance notice"]),
        ("liability", &["responsibility", "indemnity", "indemnification"]),
        ("indemnification", &["indemnity", "hold harmless"]),
        ("warranty", &["guarantee"]),
        ("confidentiality", &["nda", "non-disclosure", "secrecy"]),
        ("nda", &["confidentiality", "non-disclosure"]),
        ("deliverable", &["deliverables", "deliveries", "work product"]),
        ("scope", &["services", "obligations", "responsibilities"]),
        ("duration", &["term", "length", "period"]),
        ("dispute", &["arbitration", "jurisdiction", "litigation"]),
        ("governing", &["jurisdiction", "law"]),
    ];
    entries.iter().copied().collect()
});

/// Build a [`Query`] from optional question text. Absent or empty text yields
/// an empty query, which disables targeted extraction downstream.
pub fn expand(raw_text: Option<&str>) -> Query {
    let Some(text) = raw_text.filter(|t| !t.trim().is_empty()) else {
        return Query::empty();
    };

    let tokens: Vec<String> = TOKEN_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect();

    let numeric_terms: BTreeSet<String> = NUMBER_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect();

    let mut keywords: BTreeSet<String> = tokens.iter().cloned().collect();

    for n in 2..=3 {
        for window in tokens.windows(n) {
            let phrase = window.join(" ");
            if phrase.chars().filter(|c| *c != ' ').count() >= MIN_PHRASE_LETTERS {
                keywords.insert(phrase);
            }
        }
    }

    keywords.extend(numeric_terms.iter().cloned());

    // Variants and synonyms apply to every base keyword, phrases included.
    let base: Vec<String> = keywords.iter().cloned().collect();
    for keyword in &base {
        let mut forms = vec![keyword.clone()];
        forms.extend(variants(keyword));
        for form in forms {
            if let Some(synonyms) = SYNONYMS.get(form.as_str()) {
                keywords.extend(synonyms.iter().map(|s| s.to_string()));
            }
            keywords.insert(form);
        }
    }

    Query {
        raw_text: Some(text.to_string()),
        keywords,
        numeric_terms,
    }
}

/// Suffix-stripped forms of a keyword or phrase.
pub fn variants(word: &str) -> Vec<String> {
    let rules: &[(&str, usize)] = &[("ing", 4), ("ed", 3), ("s", 3)];
    rules
        .iter()
        .filter_map(|&(suffix, min_stem)| {
            let stem = word.strip_suffix(suffix)?;
            (stem.len() > min_stem).then(|| stem.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_termination_question() {
        let query = expand(Some("What is the termination notice period?"));
        for expected in [
            "termination",
            "notice",
            "period",
            "terminate",
            "cancellation",
            "notification",
            "termination notice",
            "notice period",
        ] {
            assert!(query.keywords.contains(expected), "missing {}", expected);
        }
        for excluded in ["what", "the", "is"] {
            assert!(!query.keywords.contains(excluded), "unexpected {}", excluded);
        }
    }

    #[test]
    fn test_empty_inputs() {
        assert!(expand(None).is_empty());
        assert!(expand(Some("")).is_empty());
        assert!(expand(Some("   ")).is_empty());
        // Only stop words and short tokens.
        assert!(expand(Some("is it? what about that")).is_empty());
    }

    #[test]
    fn test_numbers_become_keywords() {
        let query = expand(Some("Is 30 days notice enough?"));
        assert!(query.numeric_terms.contains("30"));
        assert!(query.keywords.contains("30"));
        assert!(query.keywords.contains("days"));
        assert!(!query.keywords.contains("day"));
    }

    #[test]
    fn test_phrases_skip_stop_words() {
        let query = expand(Some("Explain the late fee policy"));
        assert!(query.keywords.contains("late fee"));
        assert!(query.keywords.contains("late fee policy"));
        assert!(!query.keywords.iter().any(|k| k.contains("the ")));
    }

    #[test]
    fn test_variants() {
        assert_eq!(variants("licensing"), vec!["licens".to_string()]);
        assert_eq!(variants("paying"), Vec::<String>::new());
        assert_eq!(variants("terminated"), vec!["terminat".to_string()]);
        assert_eq!(variants("payments"), vec!["payment".to_string()]);
        assert_eq!(variants("fees"), Vec::<String>::new());
    }

    #[test]
    fn test_phrases_get_variants() {
        let query = expand(Some("Are the notice periods reasonable?"));
        assert!(query.keywords.contains("notice periods"));
        assert!(query.keywords.contains("notice period"));
        assert!(query.keywords.contains("period"));
    }

    #[test]
    fn test_synonyms_follow_variants() {
        let query = expand(Some("How are payments handled?"));
        assert!(query.keywords.contains("payment"));
        assert!(query.keywords.contains("compensation"));
        assert!(query.keywords.contains("handl"));
    }

    #[test]
    fn test_expansion_is_deterministic() {
        let first = expand(Some("Who owns the intellectual property and licensing rights?"));
        let second = expand(Some("Who owns the intellectual property and licensing rights?"));
        assert_eq!(first, second);

        let again = expand(Some(&first.keywords_text()));
        let again_twice = expand(Some(&first.keywords_text()));
        assert_eq!(again.keywords, again_twice.keywords);
    }
}
