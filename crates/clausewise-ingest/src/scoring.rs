//! Lexical scoring of sentences and paragraphs.
//!
//! Two independent modes:
//! - domain-term mode scores sentences against a fixed table of contract
//!   term groups (each group contributes its weight at most once);
//! - query-keyword mode scores paragraphs against an expanded [`Query`]
//!   (+2 per contained phrase, +1 per whole-word keyword).
//!
//! Both keep `position_index` so selections can be put back in document order.

use clausewise_core::{Query, ScoredUnit};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

/// Sentences shorter than this are ignored in domain-term mode.
pub const MIN_SENTENCE_CHARS: usize = 20;
/// Paragraphs shorter than this are ignored in query-keyword mode.
pub const MIN_PARAGRAPH_CHARS: usize = 40;

/// (pattern, weight) rows for domain-term mode, one per term group:
/// payment, IP, termination, liability, confidentiality, scope, duration, dispute.
pub const DOMAIN_TERM_PATTERNS: &[(&str, u32)] = &[
    (r"\b(payment|compensation|fee|royalty|advance|salary|wage)\b", 1),
    (r"\b(intellectual property|copyright|ownership|license|rights|ip)\b", 1),
    (r"\b(termination|cancellation|breach|default)\b", 1),
    (r"\b(liability|indemnification|warranty|guarantee)\b", 1),
    (r"\b(confidentiality|non-disclosure|nda|privacy)\b", 1),
    (r"\b(deliverable|scope|work|services|obligation)\b", 1),
    (r"\b(duration|term|period|expiration|renewal)\b", 1),
    (r"\b(dispute|arbitration|jurisdiction|governing law)\b", 1),
];

/// A compiled term group.
pub struct TermGroup {
    pub pattern: Regex,
    pub weight: u32,
}

pub static DOMAIN_TERMS: Lazy<Vec<TermGroup>> = Lazy::new(|| {
    DOMAIN_TERM_PATTERNS
        .iter()
        .map(|&(pattern, weight)| TermGroup {
            pattern: Regex::new(&format!("(?i){}", pattern)).unwrap(),
            weight,
        })
        .collect()
});

static PARAGRAPH_BREAK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t\r]*\n").unwrap());

/// Split text into sentences at `.`, `!` or `?` followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if (b == b'.' || b == b'!' || b == b'?')
            && i + 1 < bytes.len()
            && bytes[i + 1].is_ascii_whitespace()
        {
            let s = text[start..=i].trim();
            if !s.is_empty() {
                sentences.push(s);
            }
            start = i + 1;
        }
    }
    let s = text[start..].trim();
    if !s.is_empty() {
        sentences.push(s);
    }
    sentences
}

/// Split text into paragraphs on blank lines. Paragraphs are trimmed but
/// empty ones are kept so indices match the raw split.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    PARAGRAPH_BREAK_RE.split(text).map(str::trim).collect()
}

/// Domain-term score of one sentence.
pub fn score_sentence(sentence: &str) -> u32 {
    DOMAIN_TERMS
        .iter()
        .filter(|group| group.pattern.is_match(sentence))
        .map(|group| group.weight)
        .sum()
}

/// Score every sentence long enough to matter; zero-score sentences are dropped.
/// Returned units are in document order.
pub fn score_sentences(sentences: &[&str]) -> Vec<ScoredUnit> {
    sentences
        .iter()
        .enumerate()
        .filter(|(_, s)| s.chars().count() >= MIN_SENTENCE_CHARS)
        .filter_map(|(i, s)| {
            let score = score_sentence(s);
            (score > 0).then(|| ScoredUnit {
                unit_text: s.to_string(),
                position_index: i,
                score,
            })
        })
        .collect()
}

/// Compiled form of a query's keywords.
pub struct KeywordMatcher {
    phrases: Vec<String>,
    words: Vec<Regex>,
}

impl KeywordMatcher {
    pub fn new(query: &Query) -> Self {
        let mut phrases = Vec::new();
        let mut words = Vec::new();
        for keyword in &query.keywords {
            if keyword.contains(' ') {
                phrases.push(keyword.clone());
                continue;
            }
            match Regex::new(&format!(r"\b{}\b", regex::escape(keyword))) {
                Ok(re) => words.push(re),
                Err(e) => warn!("Skipping keyword '{}': {}", keyword, e),
            }
        }
        Self { phrases, words }
    }

    /// +2 per phrase contained, +1 per whole-word keyword, case-insensitive.
    pub fn score(&self, text: &str) -> u32 {
        let lower = text.to_lowercase();
        let phrase_hits = self.phrases.iter().filter(|p| lower.contains(p.as_str())).count();
        let word_hits = self.words.iter().filter(|re| re.is_match(&lower)).count();
        (phrase_hits * 2 + word_hits) as u32
    }
}

/// Score paragraphs against a query; short and zero-score paragraphs are dropped.
/// Returned units are in document order.
pub fn score_paragraphs(paragraphs: &[&str], query: &Query) -> Vec<ScoredUnit> {
    if query.is_empty() {
        return Vec::new();
    }
    let matcher = KeywordMatcher::new(query);
    paragraphs
        .iter()
        .enumerate()
        .filter(|(_, p)| p.chars().count() >= MIN_PARAGRAPH_CHARS)
        .filter_map(|(i, p)| {
            let score = matcher.score(p);
            (score > 0).then(|| ScoredUnit {
                unit_text: p.to_string(),
                position_index: i,
                score,
            })
        })
        .collect()
}

/// Order by score descending, earlier position first on ties.
pub fn rank(units: &mut [ScoredUnit]) {
    units.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(a.position_index.cmp(&b.position_index))
    });
}

/// Put units back in original document order.
pub fn restore_order(units: &mut [ScoredUnit]) {
    units.sort_by_key(|u| u.position_index);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::expand;

    #[test]
    fn test_domain_scoring_selects_relevant_sentences() {
        let text = "Payment shall be $500. The weather was nice. Termination requires 30 days notice.";
        let sentences = split_sentences(text);
        assert_eq!(sentences.len(), 3);

        let units = score_sentences(&sentences);
        let positions: Vec<usize> = units.iter().map(|u| u.position_index).collect();
        assert_eq!(positions, vec![0, 2]);
        assert!(units.iter().all(|u| u.score >= 1));
    }

    #[test]
    fn test_each_group_counts_once() {
        // Three payment words, one group.
        assert_eq!(score_sentence("The fee, royalty and salary are separate."), 1);
        // Payment + termination + dispute.
        assert_eq!(
            score_sentence("Any payment dispute after termination goes to arbitration."),
            3
        );
        assert_eq!(score_sentence("Nothing relevant here at all today."), 0);
    }

    #[test]
    fn test_short_sentences_skipped() {
        let units = score_sentences(&["Fee due.", "The fee is due within ten days of invoice."]);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].position_index, 1);
    }

    #[test]
    fn test_split_sentences_keeps_decimals() {
        let sentences = split_sentences("The rate is 2.5 percent! Is it fair? Yes.");
        assert_eq!(sentences, vec!["The rate is 2.5 percent!", "Is it fair?", "Yes."]);
    }

    #[test]
    fn test_paragraph_scoring() {
        let text = "1. Payment. The Client pays the fee within 30 days of invoice.\n\n\
                    2. Weather. The parties enjoy sunshine and long walks together.\n\n\
                    3. Termination notice. Either party may terminate with notice in writing.";
        let paragraphs = split_paragraphs(text);
        assert_eq!(paragraphs.len(), 3);

        let query = expand(Some("What is the termination notice period?"));
        let units = score_paragraphs(&paragraphs, &query);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].position_index, 2);
        // "termination notice" phrase (+2) plus termination, notice, terminate words.
        assert!(units[0].score >= 5);
    }

    #[test]
    fn test_word_boundary_matching() {
        let query = expand(Some("fee"));
        let matcher = KeywordMatcher::new(&query);
        assert_eq!(matcher.score("The coffee machine is broken again."), 0);
        assert!(matcher.score("The FEE is waived.") >= 1);
    }

    #[test]
    fn test_empty_query_scores_nothing() {
        let units = score_paragraphs(&["A long enough paragraph about payment terms and fees."], &Query::empty());
        assert!(units.is_empty());
    }

    #[test]
    fn test_rank_then_restore() {
        let mut units = vec![
            ScoredUnit { unit_text: "a".into(), position_index: 0, score: 1 },
            ScoredUnit { unit_text: "b".into(), position_index: 1, score: 3 },
            ScoredUnit { unit_text: "c".into(), position_index: 2, score: 3 },
            ScoredUnit { unit_text: "d".into(), position_index: 3, score: 2 },
        ];
        rank(&mut units);
        let ranked: Vec<usize> = units.iter().map(|u| u.position_index).collect();
        assert_eq!(ranked, vec![1, 2, 3, 0]);

        units.truncate(3);
        restore_order(&mut units);
        let ordered: Vec<usize> = units.iter().map(|u| u.position_index).collect();
        assert_eq!(ordered, vec![1, 2, 3]);
    }
}
