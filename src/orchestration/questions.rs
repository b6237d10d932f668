//! Heuristic detection of questions in agent output.
//!
//! Both functions are pure. The orchestrator uses them to decide whether a
//! turn should be handed to the questioner; callers may use them directly.

use once_cell::sync::Lazy;
use regex::Regex;

/// Sentence openers that mark a question even without a `?`.
static QUESTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^(should|could|would|can|may|might|shall|will|must)\s+(i|we|you)\b",
        r"(?i)^(what|which|who|where|when|why|how)\s+",
        r"(?i)^(do|does|did|is|are|was|were|has|have|had)\s+",
        r"(?i)^(please\s+)?(tell|explain|clarify|specify|confirm)\b",
        r"(?i)^(any\s+)?(thoughts|suggestions|recommendations|preferences)\s+on\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid question regex"))
    .collect()
});

/// Split `text` into trimmed, non-empty sentences.
///
/// A sentence ends at `.` or `!` followed by whitespace (the mark is
/// dropped) and at `?` followed by whitespace (the mark is kept), so
/// consecutive questions stay separate.
fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
        if !at_boundary {
            continue;
        }
        let end = match ch {
            '.' | '!' => index,
            '?' => index + ch.len_utf8(),
            _ => continue,
        };
        out.push(text[start..end].trim());
        start = index + ch.len_utf8();
    }
    out.push(text[start..].trim());

    out.into_iter().filter(|s| !s.is_empty()).collect()
}

fn is_question(sentence: &str) -> bool {
    sentence.contains('?') || QUESTION_PATTERNS.iter().any(|re| re.is_match(sentence))
}

/// The question-like sentences of `text`, in order.
///
/// # Example
///
/// ```
/// use crewkit::orchestration::detect_questions;
///
/// let found = detect_questions("Should I add error handling? What about logging?");
/// assert_eq!(found, vec!["Should I add error handling?", "What about logging?"]);
/// ```
pub fn detect_questions(text: &str) -> Vec<String> {
    sentences(text)
        .into_iter()
        .filter(|s| is_question(s))
        .map(str::to_string)
        .collect()
}

/// Whether `text` contains at least one question.
pub fn has_questions(text: &str) -> bool {
    sentences(text).into_iter().any(is_question)
}
