//! Content script behavior
//!
//! The content script lives inside a visited page. It answers the two
//! messages addressed to pages and produces the message it would send back
//! to the extension runtime.

use super::{extract_for_summary, ExtractionMode, PageDocument};
use crate::protocol::{BrowserTarget, RelayMessage};

/// Page-side message handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentScript {
    mode: ExtractionMode,
}

impl ContentScript {
    /// Create a content script extracting with `mode`
    pub fn new(mode: ExtractionMode) -> Self {
        Self { mode }
    }

    /// Content script as shipped for `target`
    pub fn for_target(target: BrowserTarget) -> Self {
        Self::new(target.content_script_extraction())
    }

    /// Extraction mode in use
    pub fn mode(&self) -> ExtractionMode {
        self.mode
    }

    /// Message announcing the page, sent once on load
    pub fn announce(&self, doc: &dyn PageDocument) -> RelayMessage {
        RelayMessage::PageChanged {
            tab_id: None,
            url: doc.url(),
            title: doc.title(),
        }
    }

    /// Handle `message` for the page `doc`
    ///
    /// Returns the reply to post to the runtime, or `None` when the message
    /// is not addressed to content scripts.
    pub fn handle(&self, message: &RelayMessage, doc: &dyn PageDocument) -> Option<RelayMessage> {
        tracing::debug!("Content script received message: {}", message.action());
        match message {
            RelayMessage::CheckForSidebar => Some(self.announce(doc)),
            RelayMessage::GetSummary => Some(RelayMessage::SummarizeText {
                text: extract_for_summary(doc, self.mode),
            }),
            _ => None,
        }
    }
}
