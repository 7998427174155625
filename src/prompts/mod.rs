//! Prompt templates and response parsing
//!
//! Every prompt starts with the configured system prompt and embeds the
//! page title, URL and the budgeted content. The question-parsing helper
//! turns a numbered or bulleted model answer into individual questions.

pub mod questions;

pub use questions::parse_questions;

/// Title used when the page has none
pub const UNTITLED_PAGE: &str = "Untitled Page";

/// URL used when the page has none
pub const NO_URL: &str = "No URL available";

/// Page fields embedded in a prompt
#[derive(Debug, Clone, Copy)]
pub struct PagePrompt<'a> {
    pub title: &'a str,
    pub url: &'a str,
    pub content: &'a str,
}

impl<'a> PagePrompt<'a> {
    /// Create prompt fields, substituting placeholders for empty title/URL
    pub fn new(title: &'a str, url: &'a str, content: &'a str) -> Self {
        Self {
            title: if title.is_empty() { UNTITLED_PAGE } else { title },
            url: if url.is_empty() { NO_URL } else { url },
            content,
        }
    }
}

/// Prompt asking for a concise summary of the page
///
/// # Examples
///
/// ```
/// use sidekick::prompts::{summarize_prompt, PagePrompt};
///
/// let prompt = summarize_prompt("Be brief.", &PagePrompt::new("", "", "text"));
/// assert!(prompt.starts_with("Be brief."));
/// assert!(prompt.contains("Title: Untitled Page"));
/// assert!(prompt.ends_with("Summary:"));
/// ```
pub fn summarize_prompt(system_prompt: &str, page: &PagePrompt<'_>) -> String {
    format!(
        "{system_prompt}\n\nPlease summarize the following webpage content concisely:\n\nTitle: {title}\nURL: {url}\n\nContent:\n{content}\n\nSummary:",
        system_prompt = system_prompt,
        title = page.title,
        url = page.url,
        content = page.content,
    )
}

/// Prompt asking for exactly three questions as a numbered list
pub fn questions_prompt(system_prompt: &str, page: &PagePrompt<'_>) -> String {
    format!(
        "{system_prompt}\n\nBased on the following webpage content, generate exactly 3 interesting questions that could be asked about this content. Format your response as a numbered list with just the questions, no additional text.\n\nTitle: {title}\nURL: {url}\n\nContent:\n{content}\n\nQuestions:",
        system_prompt = system_prompt,
        title = page.title,
        url = page.url,
        content = page.content,
    )
}

/// Prompt answering a user question about the page
pub fn chat_prompt(system_prompt: &str, page: &PagePrompt<'_>, question: &str) -> String {
    format!(
        "{system_prompt}\n\nYou are answering questions about the following webpage:\n\nTitle: {title}\nURL: {url}\n\nContent:\n{content}\n\nUser question: {question}\n\nPlease provide a helpful and accurate response based on the webpage content.",
        system_prompt = system_prompt,
        title = page.title,
        url = page.url,
        content = page.content,
        question = question,
    )
}

/// Prompt used by the popup quick summary; it carries no system prompt
pub fn quick_summary_prompt(content: &str) -> String {
    format!(
        "Please summarize the following webpage content concisely:\n\n{}\n\nSummary:",
        content
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_prompt_placeholders() {
        let page = PagePrompt::new("", "", "body");
        assert_eq!(page.title, UNTITLED_PAGE);
        assert_eq!(page.url, NO_URL);

        let page = PagePrompt::new("Docs", "https://docs.test", "body");
        assert_eq!(page.title, "Docs");
        assert_eq!(page.url, "https://docs.test");
    }

    #[test]
    fn test_summarize_prompt_layout() {
        let page = PagePrompt::new("Docs", "https://docs.test", "Some content");
        let prompt = summarize_prompt("SYSTEM", &page);
        assert_eq!(
            prompt,
            "SYSTEM\n\nPlease summarize the following webpage content concisely:\n\nTitle: Docs\nURL: https://docs.test\n\nContent:\nSome content\n\nSummary:"
        );
    }

    #[test]
    fn test_questions_prompt_requests_numbered_list() {
        let page = PagePrompt::new("Docs", "https://docs.test", "Some content");
        let prompt = questions_prompt("SYSTEM", &page);
        assert!(prompt.contains("generate exactly 3 interesting questions"));
        assert!(prompt.contains("numbered list"));
        assert!(prompt.ends_with("Questions:"));
    }

    #[test]
    fn test_chat_prompt_embeds_question() {
        let page = PagePrompt::new("Docs", "https://docs.test", "Some content");
        let prompt = chat_prompt("SYSTEM", &page, "What is covered?");
        assert!(prompt.contains("User question: What is covered?"));
        assert!(prompt.contains("Content:\nSome content"));
    }

    #[test]
    fn test_quick_summary_prompt_has_no_persona() {
        let prompt = quick_summary_prompt("page text");
        assert!(prompt.starts_with("Please summarize"));
        assert!(prompt.contains("page text"));
    }
}
