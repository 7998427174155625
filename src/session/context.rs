//! Page context and per-tab snapshots

use super::chat::ChatMessage;
use crate::protocol::{PageContentResponse, TabId};
use crate::truncation::estimate_tokens;
use std::collections::HashMap;

/// URL shown when an error payload carries a title but no URL
pub const UNKNOWN_URL: &str = "Unknown URL";

/// Content shown when an error payload carries a title but no content
pub const NO_CONTENT: &str = "No content available";

/// What the UI knows about the page the user is looking at
///
/// Overwritten on every refresh and never persisted. `content` holds the
/// untouched page text; budgets are applied only when a prompt is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContext {
    pub title: String,
    pub url: String,
    pub content: Option<String>,
    pub token_estimate: usize,
}

impl PageContext {
    /// Context from a successful `getPageContent` reply
    pub fn from_page(response: PageContentResponse) -> Self {
        let token_estimate = response.content.as_deref().map(estimate_tokens).unwrap_or(0);
        Self {
            title: response.title.unwrap_or_default(),
            url: response.url.unwrap_or_default(),
            content: response.content,
            token_estimate,
        }
    }

    /// Context from an error reply that still names a page
    ///
    /// Returns `None` when the reply carries no title.
    pub fn from_partial(response: PageContentResponse) -> Option<Self> {
        let title = response.title?;
        let content = response.content.unwrap_or_else(|| NO_CONTENT.to_string());
        Some(Self {
            title,
            url: response.url.unwrap_or_else(|| UNKNOWN_URL.to_string()),
            token_estimate: estimate_tokens(&content),
            content: Some(content),
        })
    }

    /// Whether non-empty page text is cached
    pub fn has_content(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.is_empty())
    }
}

/// Saved UI state for one tab
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabContext {
    pub chat: Vec<ChatMessage>,
    pub summary: Option<String>,
    pub questions: Vec<String>,
    pub page: PageContext,
}

/// Saved UI state keyed by tab; at most one entry per tab
#[derive(Debug, Clone, Default)]
pub struct TabContextMap {
    entries: HashMap<TabId, TabContext>,
}

impl TabContextMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `context` for `tab_id`, replacing any earlier entry
    pub fn save(&mut self, tab_id: TabId, context: TabContext) {
        self.entries.insert(tab_id, context);
    }

    /// Saved context for `tab_id`
    pub fn load(&self, tab_id: TabId) -> Option<&TabContext> {
        self.entries.get(&tab_id)
    }

    /// Forget `tab_id`
    pub fn remove(&mut self, tab_id: TabId) -> Option<TabContext> {
        self.entries.remove(&tab_id)
    }

    pub fn contains(&self, tab_id: TabId) -> bool {
        self.entries.contains_key(&tab_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
