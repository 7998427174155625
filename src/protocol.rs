//! Inter-context message protocol
//!
//! Messages exchanged between the background relay, content scripts and the
//! UI surface. The JSON shape (an `action` tag plus camelCase fields) is the
//! same one the extension scripts put on the wire.

use crate::content::ExtractionMode;
use crate::error::{Result, SidekickError};
use crate::truncation::ContentBudget;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Browser tab identifier
pub type TabId = u32;

/// Browser window identifier
pub type WindowId = u32;

/// A message routed between execution contexts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RelayMessage {
    /// Background -> content script: announce the page to the sidebar
    CheckForSidebar,

    /// The visible page changed
    #[serde(rename_all = "camelCase")]
    PageChanged {
        /// Tab that changed; absent when sent by a content script
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tab_id: Option<TabId>,
        /// Page URL
        url: String,
        /// Page title
        title: String,
    },

    /// UI surface -> background: read the active tab's content
    GetPageContent,

    /// A tab was closed
    #[serde(rename_all = "camelCase")]
    TabClosed {
        /// Closed tab
        tab_id: TabId,
    },

    /// Content script -> background: text extracted for summarization
    SummarizeText {
        /// Extracted page text
        text: String,
    },

    /// Popup -> content script: extract and forward the main content
    GetSummary,
}

impl RelayMessage {
    /// Action name used as the routing key
    pub fn action(&self) -> &'static str {
        match self {
            RelayMessage::CheckForSidebar => "checkForSidebar",
            RelayMessage::PageChanged { .. } => "pageChanged",
            RelayMessage::GetPageContent => "getPageContent",
            RelayMessage::TabClosed { .. } => "tabClosed",
            RelayMessage::SummarizeText { .. } => "summarizeText",
            RelayMessage::GetSummary => "getSummary",
        }
    }
}

/// Reply to a `getPageContent` request
///
/// A successful reply carries `title`, `url` and `content`. A failed reply
/// carries `error`, and for browser-internal pages it also carries a
/// synthesized title, url and explanation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContentResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageContentResponse {
    /// Successful reply built from a page snapshot
    pub fn page(snapshot: PageSnapshot) -> Self {
        Self {
            title: Some(snapshot.title),
            url: Some(snapshot.url),
            content: Some(snapshot.content),
            error: None,
        }
    }

    /// Failed reply with only an error message
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Synthesized reply for pages extensions may not script
    pub fn internal_page(title: &str) -> Self {
        let title = if title.is_empty() {
            "Browser Page"
        } else {
            title
        };
        Self {
            title: Some(title.to_string()),
            url: Some("Browser Internal Page".to_string()),
            content: Some(
                "This is a browser internal page that cannot be accessed by extensions for security reasons."
                    .to_string(),
            ),
            error: Some("Cannot access browser internal pages".to_string()),
        }
    }

    /// Whether the reply reports a failure
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Title, URL and text read out of a tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub title: String,
    pub url: String,
    pub content: String,
}

/// Tab metadata as reported by the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub id: TabId,
    pub window_id: WindowId,
    pub url: String,
    pub title: String,
    pub active: bool,
}

/// URL prefixes of pages extensions cannot script
const INTERNAL_URL_PREFIXES: &[&str] = &[
    "chrome-extension://",
    "chrome://",
    "edge://",
    "brave://",
    "moz-extension://",
    "about:",
];

/// Whether `url` belongs to the browser itself rather than a web page
pub fn is_browser_internal_url(url: &str) -> bool {
    INTERNAL_URL_PREFIXES
        .iter()
        .any(|prefix| url.starts_with(prefix))
}

/// How the UI surface is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Browser-managed sidebar panel
    Sidebar,
    /// Dedicated narrow popup window with its own tab
    PopupWindow,
}

/// Supported browser targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BrowserTarget {
    /// Firefox sidebar add-on
    Firefox,
    /// Chrome add-on presenting a side-panel popup window
    ChromeSidePanel,
    /// Generic Chrome add-on
    Chrome,
}

impl BrowserTarget {
    /// All targets, in display order
    pub const ALL: [BrowserTarget; 3] = [
        BrowserTarget::Firefox,
        BrowserTarget::ChromeSidePanel,
        BrowserTarget::Chrome,
    ];

    /// How the UI surface is shown for this target
    pub fn surface_kind(&self) -> SurfaceKind {
        match self {
            BrowserTarget::ChromeSidePanel => SurfaceKind::PopupWindow,
            BrowserTarget::Firefox | BrowserTarget::Chrome => SurfaceKind::Sidebar,
        }
    }

    /// Extraction mode the content script uses on this target
    pub fn content_script_extraction(&self) -> ExtractionMode {
        match self {
            BrowserTarget::Chrome => ExtractionMode::FullBody,
            BrowserTarget::Firefox | BrowserTarget::ChromeSidePanel => ExtractionMode::Prioritized,
        }
    }

    /// Whether the relay injects a content script into tabs that lack one
    pub fn injects_content_script(&self) -> bool {
        matches!(self, BrowserTarget::Firefox)
    }

    /// Budget unit and default limit used by this target's settings
    pub fn default_budget(&self) -> ContentBudget {
        match self {
            BrowserTarget::ChromeSidePanel => ContentBudget::Tokens(8000),
            BrowserTarget::Firefox | BrowserTarget::Chrome => ContentBudget::Characters(6000),
        }
    }

    /// Name used in config files and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserTarget::Firefox => "firefox",
            BrowserTarget::ChromeSidePanel => "chrome-side-panel",
            BrowserTarget::Chrome => "chrome",
        }
    }
}

impl fmt::Display for BrowserTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrowserTarget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "firefox" => Ok(BrowserTarget::Firefox),
            "chrome-side-panel" | "chrome-sidepanel" | "sidepanel" => {
                Ok(BrowserTarget::ChromeSidePanel)
            }
            "chrome" => Ok(BrowserTarget::Chrome),
            other => Err(SidekickError::Config(format!(
                "Invalid browser target: {}. Must be one of: firefox, chrome-side-panel, chrome",
                other
            ))
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_changed_wire_shape() {
        let message = RelayMessage::PageChanged {
            tab_id: Some(7),
            url: "https://example.com".to_string(),
            title: "Example".to_string(),
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({"action": "pageChanged", "tabId": 7, "url": "https://example.com", "title": "Example"})
        );
    }

    #[test]
    fn test_page_changed_without_tab_id_parses() {
        let message: RelayMessage = serde_json::from_value(
            json!({"action": "pageChanged", "url": "https://a.test", "title": "A"}),
        )
        .unwrap();
        assert_eq!(
            message,
            RelayMessage::PageChanged {
                tab_id: None,
                url: "https://a.test".to_string(),
                title: "A".to_string()
            }
        );
    }

    #[test]
    fn test_unit_actions_wire_shape() {
        assert_eq!(
            serde_json::to_value(RelayMessage::GetPageContent).unwrap(),
            json!({"action": "getPageContent"})
        );
        assert_eq!(
            serde_json::to_value(RelayMessage::CheckForSidebar).unwrap(),
            json!({"action": "checkForSidebar"})
        );
        assert_eq!(
            serde_json::to_value(RelayMessage::TabClosed { tab_id: 3 }).unwrap(),
            json!({"action": "tabClosed", "tabId": 3})
        );
    }

    #[test]
    fn test_action_names_match_serde_tags() {
        let messages = vec![
            RelayMessage::CheckForSidebar,
            RelayMessage::GetPageContent,
            RelayMessage::GetSummary,
            RelayMessage::TabClosed { tab_id: 1 },
            RelayMessage::SummarizeText {
                text: "x".to_string(),
            },
        ];
        for message in messages {
            let value = serde_json::to_value(&message).unwrap();
            assert_eq!(value["action"], message.action());
        }
    }

    #[test]
    fn test_error_response_omits_missing_fields() {
        let value = serde_json::to_value(PageContentResponse::error("No active tab found")).unwrap();
        assert_eq!(value, json!({"error": "No active tab found"}));
    }

    #[test]
    fn test_internal_page_response() {
        let response = PageContentResponse::internal_page("");
        assert!(response.is_error());
        assert_eq!(response.title.as_deref(), Some("Browser Page"));
        assert_eq!(response.url.as_deref(), Some("Browser Internal Page"));
    }

    #[test]
    fn test_internal_urls() {
        assert!(is_browser_internal_url("chrome://settings"));
        assert!(is_browser_internal_url("chrome-extension://abc/sidebar.html"));
        assert!(is_browser_internal_url("edge://flags"));
        assert!(is_browser_internal_url("brave://rewards"));
        assert!(is_browser_internal_url("about:blank"));
        assert!(!is_browser_internal_url("https://chrome.google.com"));
    }

    #[test]
    fn test_target_parsing_and_traits() {
        assert_eq!(
            "firefox".parse::<BrowserTarget>().unwrap(),
            BrowserTarget::Firefox
        );
        assert_eq!(
            "Chrome-Side-Panel".parse::<BrowserTarget>().unwrap(),
            BrowserTarget::ChromeSidePanel
        );
        assert!("safari".parse::<BrowserTarget>().is_err());

        assert_eq!(
            BrowserTarget::ChromeSidePanel.surface_kind(),
            SurfaceKind::PopupWindow
        );
        assert_eq!(
            BrowserTarget::Chrome.content_script_extraction(),
            ExtractionMode::FullBody
        );
        assert_eq!(
            BrowserTarget::ChromeSidePanel.default_budget(),
            ContentBudget::Tokens(8000)
        );
        assert!(BrowserTarget::Firefox.injects_content_script());
        for target in BrowserTarget::ALL {
            assert_eq!(target.as_str().parse::<BrowserTarget>().unwrap(), target);
        }
    }
}
