//! Budgeted excerpt construction.
//!
//! A contract longer than the character budget is reduced to a beginning
//! slice, the highest-scoring domain sentences, and an ending slice. A
//! question can additionally pull whole paragraphs to the front. Every excerpt
//! returned here renders to at most its budget in chars, labels included.

use std::collections::BTreeMap;

use clausewise_core::{Document, Excerpt, ExcerptConfig, ExcerptSection, Query, SECTION_SEPARATOR};
use tracing::debug;

use crate::scoring::{rank, restore_order, score_paragraphs, score_sentences, split_paragraphs, split_sentences};
use crate::slicing::{char_len, cut_after_last_period, head, skip_through_first_period, tail};

pub const BEGINNING_LABEL: &str = "[BEGINNING OF CONTRACT]";
pub const KEY_SECTIONS_LABEL: &str = "[KEY SECTIONS - Payment, IP, Termination, etc.]";
pub const ENDING_LABEL: &str = "[END OF CONTRACT]";
pub const TARGETED_LABEL: &str = "[TARGETED EXTRACT BASED ON QUESTION]";
pub const ADDITIONAL_CONTEXT_LABEL: &str = "[ADDITIONAL CONTEXT]";

/// Share of the budget given to each of the beginning and ending slices.
const EDGE_SHARE: f64 = 0.3;
/// The beginning backs off to a period only past this share of its slice.
const BEGINNING_CUT_RATIO: f64 = 0.7;
/// The ending skips a leading fragment only when its first period is before this share.
const ENDING_SKIP_RATIO: f64 = 0.3;
/// Hard truncation backs off to a period only past this share of the budget.
const HARD_CUT_RATIO: f64 = 0.9;

fn relevant_label(position_index: usize) -> String {
    format!("[RELEVANT SECTION {}]", position_index + 1)
}

/// Builds bounded excerpts from full contract text.
#[derive(Debug, Clone)]
pub struct ExcerptBuilder {
    config: ExcerptConfig,
}

impl ExcerptBuilder {
    pub fn new(config: ExcerptConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExcerptConfig {
        &self.config
    }

    /// Beginning / key sections / ending excerpt within the configured budget.
    pub fn build(&self, text: &str) -> Excerpt {
        self.build_within(text, self.config.char_budget)
    }

    /// Same as [`ExcerptBuilder::build`] with an explicit budget.
    pub fn build_within(&self, text: &str, budget: usize) -> Excerpt {
        if char_len(text) <= budget {
            return Excerpt {
                sections: vec![ExcerptSection::plain(text)],
                char_budget: budget,
                was_truncated: false,
            };
        }

        let edge = (budget as f64 * EDGE_SHARE) as usize;
        let beginning = cut_after_last_period(head(text, edge), edge as f64 * BEGINNING_CUT_RATIO);
        let ending = skip_through_first_period(tail(text, edge), edge as f64 * ENDING_SKIP_RATIO)
            .trim_start();

        let beginning = ExcerptSection::labeled(BEGINNING_LABEL, beginning);
        let ending = ExcerptSection::labeled(ENDING_LABEL, ending);

        // The ending never gets less room than the configured reserve.
        let ending_room = (SECTION_SEPARATOR.len() + ending.rendered_len()).max(self.config.ending_reserve);
        let key_header = SECTION_SEPARATOR.len() + KEY_SECTIONS_LABEL.chars().count() + 1;
        let key_room = budget.saturating_sub(beginning.rendered_len() + ending_room + key_header);

        let key_text = self.key_sections(text, key_room);
        let mut sections = vec![beginning];
        if !key_text.is_empty() {
            sections.push(ExcerptSection::labeled(KEY_SECTIONS_LABEL, key_text));
        }
        sections.push(ending);

        let sections = fit_sections(sections, budget);
        let excerpt = Excerpt {
            sections,
            char_budget: budget,
            was_truncated: true,
        };
        debug!(
            "Excerpt built: {} -> {} chars (budget {}, key room {})",
            char_len(text),
            excerpt.char_len(),
            budget,
            key_room
        );
        excerpt
    }

    /// Top domain sentences with one sentence of context on each side, in
    /// document order, joined by spaces. Never longer than `max_chars`.
    fn key_sections(&self, text: &str, max_chars: usize) -> String {
        if max_chars == 0 {
            return String::new();
        }

        let sentences = split_sentences(text);
        let mut scored = score_sentences(&sentences);
        rank(&mut scored);

        let mut picked: BTreeMap<usize, &str> = BTreeMap::new();
        let mut used = 0;
        for unit in scored.iter().take(self.config.max_key_sentences) {
            let first = unit.position_index.saturating_sub(1);
            let last = (unit.position_index + 1).min(sentences.len() - 1);
            // Sentence 0 is already part of the beginning slice.
            let window: Vec<usize> = (first..=last)
                .filter(|&j| j != 0 && !picked.contains_key(&j))
                .collect();
            // Each sentence is charged a joining space; the final join needs one fewer.
            let cost: usize = window.iter().map(|&j| char_len(sentences[j]) + 1).sum();
            if window.is_empty() || used + cost > max_chars + 1 {
                continue;
            }
            used += cost;
            for j in window {
                picked.insert(j, sentences[j]);
            }
            if used >= max_chars {
                break;
            }
        }

        picked.into_values().collect::<Vec<_>>().join(" ")
    }

    /// Paragraphs matching the query, best first until `max_chars` is used,
    /// then put back in document order. `None` when nothing matches.
    pub fn targeted(&self, text: &str, query: &Query, max_chars: usize) -> Option<Excerpt> {
        if query.is_empty() {
            return None;
        }

        let paragraphs = split_paragraphs(text);
        let mut scored = score_paragraphs(&paragraphs, query);
        if scored.is_empty() {
            return None;
        }
        rank(&mut scored);

        let mut selected = Vec::new();
        let mut used = 0;
        for unit in scored {
            let section = ExcerptSection::labeled(relevant_label(unit.position_index), unit.unit_text.as_str());
            let separator = if selected.is_empty() { 0 } else { SECTION_SEPARATOR.len() };
            let cost = separator + section.rendered_len();
            if used + cost > max_chars {
                continue;
            }
            used += cost;
            selected.push(unit);
            if used >= max_chars {
                break;
            }
        }
        if selected.is_empty() {
            return None;
        }

        restore_order(&mut selected);
        let sections = selected
            .into_iter()
            .map(|unit| ExcerptSection::labeled(relevant_label(unit.position_index), unit.unit_text))
            .collect();
        Some(Excerpt {
            sections,
            char_budget: max_chars,
            was_truncated: true,
        })
    }

    /// The excerpt sent with a request: the targeted extract first when the
    /// question matches anything, topped up with the general excerpt while
    /// it fills less than the configured share of the budget.
    pub fn compose(&self, document: &Document, query: &Query) -> Excerpt {
        let budget = self.config.char_budget;
        let base = self.build(document.text());

        let targeted_header = TARGETED_LABEL.chars().count() + 1;
        let Some(targeted) = self.targeted(document.text(), query, budget.saturating_sub(targeted_header)) else {
            debug!("No targeted extract for query ({} keywords)", query.keywords.len());
            return base;
        };

        let primary = ExcerptSection::labeled(TARGETED_LABEL, targeted.text());
        let used = primary.rendered_len();
        let mut sections = vec![primary];

        if (used as f64) < budget as f64 * self.config.targeted_fill_ratio {
            let header = SECTION_SEPARATOR.len() + ADDITIONAL_CONTEXT_LABEL.chars().count() + 1;
            let room = budget.saturating_sub(used + header);
            let base_text = base.text();
            let supplement = head(&base_text, room);
            if !supplement.trim().is_empty() {
                sections.push(ExcerptSection::labeled(ADDITIONAL_CONTEXT_LABEL, supplement));
            }
        }

        debug!(
            "Targeted extract: {} sections, {} chars before supplement",
            targeted.sections.len(),
            used
        );
        Excerpt {
            sections,
            char_budget: budget,
            was_truncated: base.was_truncated || targeted.was_truncated,
        }
    }

    /// Flat leading slice used after the service rejects a request as too large.
    pub fn fallback(&self, document: &Document) -> Excerpt {
        let slice = head(document.text(), self.config.fallback_chars);
        let slice = cut_after_last_period(slice, self.config.fallback_min_cut as f64);
        Excerpt {
            sections: vec![ExcerptSection::plain(slice)],
            char_budget: self.config.fallback_chars,
            was_truncated: true,
        }
    }
}

/// Re-fit an excerpt into a smaller allotment. Unchanged when it already fits.
pub fn shrink(excerpt: &Excerpt, max_chars: usize) -> Excerpt {
    if excerpt.char_len() <= max_chars {
        return excerpt.clone();
    }
    Excerpt {
        sections: fit_sections(excerpt.sections.clone(), max_chars),
        char_budget: max_chars,
        was_truncated: true,
    }
}

/// Keep whole sections while they fit; cut the first one that does not
/// (backing off to a period past 90% of the budget) and drop the rest.
fn fit_sections(sections: Vec<ExcerptSection>, budget: usize) -> Vec<ExcerptSection> {
    let mut out: Vec<ExcerptSection> = Vec::with_capacity(sections.len());
    let mut used = 0;

    for section in sections {
        let separator = if out.is_empty() { 0 } else { SECTION_SEPARATOR.len() };
        let need = separator + section.rendered_len();
        if used + need <= budget {
            used += need;
            out.push(section);
            continue;
        }

        let text_start = used + separator + section.header_len();
        let room = budget.saturating_sub(text_start);
        if room > 0 {
            let threshold = budget as f64 * HARD_CUT_RATIO - text_start as f64;
            let cut = cut_after_last_period(head(&section.text, room), threshold);
            out.push(ExcerptSection {
                label: section.label,
                text: cut.to_string(),
            });
        }
        break;
    }

    out
}
