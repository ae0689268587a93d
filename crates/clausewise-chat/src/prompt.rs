//! The contract-analysis prompt.
//!
//! Rendering is deterministic: the same excerpt, truncation flag and question
//! always produce the same text, so the token estimate taken before dispatch
//! is the one the service sees.

use clausewise_core::{Excerpt, Prompt};

/// Short system message sent alongside every rendered prompt.
pub const SYSTEM_MESSAGE: &str = "You are a contract analysis assistant for creative industry agreements. \
Describe contract terms factually without judging them, explain legal language in plain terms, \
and defer to legal professionals for specific advice.";

pub const ROLE_PREAMBLE: &str = "You are a contract analysis assistant for creative professionals. \
You help them understand their agreements by pointing out the important terms, restating legal \
language in plain English, and noting the areas that usually deserve a closer look.

FORMATTING:
- Write the main response as plain text with no Markdown (no **, #, __ or backticks)
- If you include reasoning, wrap it in <reasoning>...</reasoning> tags
- Simple dashes are fine for lists; shape the structure around the contract and the question
- Keep the language clear and neutral

PRINCIPLES:
- Report what the contract says without calling it good or bad
- Explain technical terms in accessible language
- Mention what is missing as well as what is present
- Recommend professional legal review for specific advice
- Focus on the sections that matter for the user's question";

pub const WORKED_EXAMPLES: &str = "Example 1 (photography):
Question: \"Can you review this? 'The Client shall pay Photographer $2,000 upon completion...'\"
Approach:
- Notes the flat fee and its timing, and that overtime and expenses are not covered.
- Points out that the client takes full ownership with unlimited usage and no portfolio or credit rights.
- Suggests discussing the rights transfer with legal counsel.

Example 2 (writing):
Question: \"I deliver 10 articles a month at $100 each. It is work-for-hire with unlimited revisions.\"
Approach:
- Contrasts the ongoing workload with the flat rate and notes there is no payment schedule or kill fee.
- Explains what work-for-hire means for copyright and bylines.
- Flags unlimited revisions as undefined and worth clarifying with counsel.

Example 3 (design):
Question: \"The designer keeps copyright but grants an exclusive marketing license for 2 years, then non-exclusive.\"
Approach:
- Walks through the license, the exclusivity window and the switch to non-exclusive use.
- Notes that \"marketing materials\" should be defined.
- Recommends reviewing those points with counsel.";

pub const GUIDELINES: &str = "Guidelines:
- Keep a steady, professional tone and follow the user's question.
- Cover the clauses that matter most rather than every possible section.
- When something important is absent, say it is not addressed in this excerpt instead of guessing.
- Recommend legal counsel in natural, varied wording.
- Avoid legal advice, moral judgments and alarmist language.";

pub const TRUNCATION_NOTE: &str = "NOTE: Because of length limits, this text contains the beginning of the \
contract, sections with key terms (payment, IP rights, termination and similar) and the ending. Some \
middle sections may be missing. A complete review of every clause should be done with legal counsel.";

pub const CONTRACT_HEADING: &str = "CONTRACT TEXT:";
pub const QUESTION_HEADING: &str = "USER'S ADDITIONAL QUESTIONS/CONTEXT:";

pub const CLOSING_INSTRUCTION: &str = "Analyze the contract conversationally while covering the issues \
that matter most to a creative professional. Use neutral language, let the content decide the structure, \
and close with a natural reminder to consult legal counsel. Use plain text only. If you include \
reasoning, wrap it in <reasoning>...</reasoning> tags.";

/// Render the full instruction text around `excerpt`.
pub fn render(excerpt: &Excerpt, question: Option<&str>) -> Prompt {
    Prompt::new(render_text(&excerpt.text(), excerpt.was_truncated, question))
}

/// Characters the template adds around an excerpt of any length.
pub fn overhead_chars(was_truncated: bool, question: Option<&str>) -> usize {
    render_text("", was_truncated, question).chars().count()
}

fn render_text(contract: &str, was_truncated: bool, question: Option<&str>) -> String {
    let mut out = String::with_capacity(contract.len() + 4096);
    out.push_str(ROLE_PREAMBLE);
    out.push_str("\n\n");
    out.push_str(WORKED_EXAMPLES);
    out.push_str("\n\n");
    out.push_str(GUIDELINES);
    out.push_str("\n\nNow analyze the following contract:");
    if was_truncated {
        out.push_str("\n\n");
        out.push_str(TRUNCATION_NOTE);
    }
    out.push_str("\n\n");
    out.push_str(CONTRACT_HEADING);
    out.push('\n');
    out.push_str(contract);
    out.push('\n');

    if let Some(question) = question.map(str::trim).filter(|q| !q.is_empty()) {
        out.push_str("\n\n");
        out.push_str(QUESTION_HEADING);
        out.push('\n');
        out.push_str(question);
        out.push('\n');
    }

    out.push_str("\n\n");
    out.push_str(CLOSING_INSTRUCTION);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clausewise_core::ExcerptSection;

    fn excerpt(text: &str, was_truncated: bool) -> Excerpt {
        Excerpt {
            sections: vec![ExcerptSection::plain(text)],
            char_budget: 8000,
            was_truncated,
        }
    }

    #[test]
    fn test_render_is_deterministic() {
        let e = excerpt("The Client shall pay $500.", false);
        assert_eq!(render(&e, Some("Is this fair?")), render(&e, Some("Is this fair?")));
    }

    #[test]
    fn test_truncation_note_follows_flag() {
        let plain = render(&excerpt("Text.", false), None);
        let cut = render(&excerpt("Text.", true), None);
        assert!(!plain.rendered_text.contains(TRUNCATION_NOTE));
        assert!(cut.rendered_text.contains(TRUNCATION_NOTE));
    }

    #[test]
    fn test_question_section_optional() {
        let without = render(&excerpt("Text.", false), None);
        assert!(!without.rendered_text.contains(QUESTION_HEADING));
        let blank = render(&excerpt("Text.", false), Some("   "));
        assert_eq!(blank, without);

        let with = render(&excerpt("Text.", false), Some("Who owns the photos?"));
        let contract_at = with.rendered_text.find(CONTRACT_HEADING).unwrap();
        let question_at = with.rendered_text.find(QUESTION_HEADING).unwrap();
        assert!(contract_at < question_at);
        assert!(with.rendered_text.contains("Who owns the photos?"));
    }

    #[test]
    fn test_overhead_matches_render() {
        let text = "é".repeat(321);
        let prompt = render(&excerpt(&text, true), Some("question"));
        assert_eq!(
            prompt.rendered_text.chars().count(),
            overhead_chars(true, Some("question")) + 321
        );
    }
}
