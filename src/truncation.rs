//! Token estimation and the content budget policy
//!
//! Page text is cached untouched; the budget is applied only when a prompt
//! is assembled. Two budget units exist and are never mixed: a token budget
//! (sidebar variant with `maxTokens`) and a character budget (variants with
//! `maxLength`). Tokens convert to characters at a fixed ratio of four.

use serde::{Deserialize, Serialize};

/// Characters assumed per model token
pub const CHARS_PER_TOKEN: usize = 4;

/// Literal inserted between sampled windows of oversized content
pub const TRUNCATION_SEPARATOR: &str = "\n\n[...content truncated...]\n\n";

/// Estimate the token count of `text` as `ceil(chars / 4)`
///
/// # Examples
///
/// ```
/// use sidekick::truncation::estimate_tokens;
///
/// assert_eq!(estimate_tokens(""), 0);
/// assert_eq!(estimate_tokens("abcde"), 2);
/// ```
pub fn estimate_tokens(text: &str) -> usize {
    let chars = text.chars().count();
    (chars + CHARS_PER_TOKEN - 1) / CHARS_PER_TOKEN
}

/// Budget applied to page content before it is placed in a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "unit", content = "limit")]
pub enum ContentBudget {
    /// Token budget; oversized content is sampled from start, middle and end
    Tokens(usize),
    /// Character budget; oversized content is cut after `limit` characters
    Characters(usize),
}

impl ContentBudget {
    /// The numeric limit regardless of unit
    pub fn limit(&self) -> usize {
        match self {
            ContentBudget::Tokens(limit) | ContentBudget::Characters(limit) => *limit,
        }
    }
}

/// Content ready to be placed in a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedContent {
    /// Text to send
    pub text: String,
    /// Estimated input tokens reported in the status line
    pub input_tokens: usize,
    /// Token estimate of the untouched content
    pub original_tokens: usize,
    /// Whether the budget altered the content
    pub truncated: bool,
}

/// Apply `budget` to `content`
///
/// Content within budget is returned unchanged. Over a token budget the
/// result is three windows joined by [`TRUNCATION_SEPARATOR`]; over a
/// character budget the result is the first `limit` characters.
pub fn fit_to_budget(content: &str, budget: ContentBudget) -> PreparedContent {
    let original_tokens = estimate_tokens(content);

    match budget {
        ContentBudget::Tokens(max_tokens) => {
            if original_tokens <= max_tokens {
                PreparedContent {
                    text: content.to_string(),
                    input_tokens: original_tokens,
                    original_tokens,
                    truncated: false,
                }
            } else {
                tracing::debug!(
                    "Sampling content: {} tokens over budget of {}",
                    original_tokens,
                    max_tokens
                );
                PreparedContent {
                    text: sample_windows(content, max_tokens),
                    input_tokens: max_tokens,
                    original_tokens,
                    truncated: true,
                }
            }
        }
        ContentBudget::Characters(max_chars) => {
            let text = char_prefix(content, max_chars);
            let truncated = text.len() < content.len();
            PreparedContent {
                input_tokens: estimate_tokens(text),
                text: text.to_string(),
                original_tokens,
                truncated,
            }
        }
    }
}

/// Sample 60% of the budget from the start, 20% centered on the midpoint
/// and 20% from the end.
///
/// Windows are clamped so they never overlap and stay in source order.
pub fn sample_windows(content: &str, max_tokens: usize) -> String {
    let len = content.chars().count();

    let first_len = (max_tokens * 6 / 10) * CHARS_PER_TOKEN;
    let middle_tokens = max_tokens * 2 / 10;
    let middle_len = middle_tokens * CHARS_PER_TOKEN;
    let last_len = (max_tokens * 2 / 10) * CHARS_PER_TOKEN;

    let first_end = first_len.min(len);

    let centered_start = (len / 2).saturating_sub(middle_tokens * CHARS_PER_TOKEN / 2);
    let middle_start = centered_start.max(first_end);
    let middle_end = (middle_start + middle_len).min(len);

    let last_start = len.saturating_sub(last_len).max(middle_end);

    let first = char_range(content, 0, first_end);
    let middle = char_range(content, middle_start, middle_end);
    let last = char_range(content, last_start, len);

    format!(
        "{}{}{}{}{}",
        first, TRUNCATION_SEPARATOR, middle, TRUNCATION_SEPARATOR, last
    )
}

/// First `max_chars` characters of `text`
pub fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Characters `[start, end)` of `text`, clamped to its length
fn char_range(text: &str, start: usize, end: usize) -> &str {
    if start >= end {
        return "";
    }
    let mut indices = text.char_indices().map(|(i, _)| i).chain(Some(text.len()));
    let begin = indices.by_ref().nth(start).unwrap_or(text.len());
    let finish = indices.nth(end - start - 1).unwrap_or(text.len());
    &text[begin..finish]
}
