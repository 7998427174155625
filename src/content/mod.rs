//! Page content extraction
//!
//! Turns a page document into the plain text sent to the model. Two named
//! modes are kept apart on purpose: `Prioritized` looks for main regions and
//! substantial paragraphs before falling back to the whole body, while
//! `FullBody` always returns the whole body text.

pub mod html;
pub mod script;

pub use html::HtmlDocument;
pub use script::ContentScript;

use crate::truncation::char_prefix;
use serde::{Deserialize, Serialize};

/// Maximum characters the content script forwards for summarization
pub const CONTENT_SCRIPT_MAX_CHARS: usize = 8000;

/// Paragraphs at or below this many characters are ignored by `Prioritized`
pub const MIN_PARAGRAPH_CHARS: usize = 20;

/// Read-only view of a rendered page
///
/// Each text accessor returns what the page's `innerText` would give for
/// the corresponding elements, in document order.
pub trait PageDocument {
    /// Document title
    fn title(&self) -> String;

    /// Document URL
    fn url(&self) -> String;

    /// Text of the whole body
    fn body_text(&self) -> String;

    /// Text of every `article`, `main` and `[role="main"]` element
    fn main_region_texts(&self) -> Vec<String>;

    /// Text of every `<p>` element
    fn paragraph_texts(&self) -> Vec<String>;
}

/// Content extraction strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMode {
    /// Main regions, then long paragraphs, then the whole body
    Prioritized,
    /// The whole body, unfiltered
    FullBody,
}

impl std::str::FromStr for ExtractionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "prioritized" => Ok(ExtractionMode::Prioritized),
            "full-body" | "full" | "body" => Ok(ExtractionMode::FullBody),
            other => Err(crate::error::SidekickError::Config(format!(
                "Invalid extraction mode: {}. Must be one of: prioritized, full-body",
                other
            ))
            .into()),
        }
    }
}

/// Extract the page text using `mode`
///
/// # Examples
///
/// ```
/// use sidekick::content::{extract_content, ExtractionMode, HtmlDocument};
///
/// let doc = HtmlDocument::parse(
///     "https://example.com",
///     "<body><nav>Menu</nav><main>The story</main></body>",
/// );
/// assert_eq!(extract_content(&doc, ExtractionMode::Prioritized), "The story\n");
/// assert!(extract_content(&doc, ExtractionMode::FullBody).contains("Menu"));
/// ```
pub fn extract_content(doc: &dyn PageDocument, mode: ExtractionMode) -> String {
    match mode {
        ExtractionMode::FullBody => doc.body_text(),
        ExtractionMode::Prioritized => {
            let regions = join_lines(doc.main_region_texts());
            if !regions.trim().is_empty() {
                return regions;
            }

            let paragraphs = join_lines(
                doc.paragraph_texts()
                    .into_iter()
                    .filter(|p| p.trim().chars().count() > MIN_PARAGRAPH_CHARS),
            );
            if !paragraphs.trim().is_empty() {
                return paragraphs;
            }

            doc.body_text()
        }
    }
}

/// Extraction used by the content script before forwarding text
///
/// Applies `mode` and cuts the result to [`CONTENT_SCRIPT_MAX_CHARS`].
pub fn extract_for_summary(doc: &dyn PageDocument, mode: ExtractionMode) -> String {
    let content = extract_content(doc, mode);
    char_prefix(&content, CONTENT_SCRIPT_MAX_CHARS).to_string()
}

fn join_lines(parts: impl IntoIterator<Item = String>) -> String {
    parts.into_iter().fold(String::new(), |mut acc, part| {
        acc.push_str(&part);
        acc.push('\n');
        acc
    })
}
