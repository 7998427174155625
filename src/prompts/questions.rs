//! Parsing of generated question lists

use regex::Regex;
use std::sync::LazyLock;

// Numbered ("1." / "2)") or bulleted ("-" / "*") list items
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+[.)]|[-*])\s+(.+)$").unwrap());

/// Split a model answer into the questions it lists
///
/// Lines are trimmed; only numbered or bulleted items are kept and their
/// leading marker is removed. Any number of questions may come back,
/// including none.
///
/// # Examples
///
/// ```
/// use sidekick::prompts::parse_questions;
///
/// let questions = parse_questions("1. What is X?\n2) Why Y?\n- Extra\nNot a question");
/// assert_eq!(questions, vec!["What is X?", "Why Y?", "Extra"]);
/// ```
pub fn parse_questions(response: &str) -> Vec<String> {
    response
        .lines()
        .map(str::trim)
        .filter_map(|line| LIST_ITEM.captures(line))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .filter(|question| !question.is_empty())
        .collect()
}
