//! Background relay
//!
//! The relay observes browser-level events the UI surface cannot see (tab
//! activation, navigation, tab removal, toolbar clicks) and turns them into
//! messages for the UI surface. It also answers `getPageContent` requests.
//!
//! Every host call is best-effort: failures are logged and swallowed so one
//! broken tab never stops the relay.

pub mod router;

pub use router::{MessageHandler, MessageRouter};

use crate::error::{Result, SidekickError};
use crate::protocol::{
    is_browser_internal_url, BrowserTarget, PageContentResponse, PageSnapshot, RelayMessage,
    TabId, TabInfo, WindowId,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Browser capabilities the relay needs
///
/// One implementation exists per browser flavor; the relay logic above it
/// is shared.
#[async_trait]
pub trait BrowserHost: Send + Sync {
    /// Flavor of browser add-on being hosted
    fn target(&self) -> BrowserTarget;

    /// Toolbar action: toggle the sidebar, or open/focus the popup window
    async fn toggle_ui_surface(&self) -> Result<()>;

    /// Whether the UI surface currently exists
    async fn ui_surface_open(&self) -> Result<bool>;

    /// Deliver `message` to the UI surface
    async fn notify_ui(&self, message: &RelayMessage) -> Result<()>;

    /// Deliver `message` to the content script of `tab_id`
    async fn notify_tab(&self, tab_id: TabId, message: &RelayMessage) -> Result<()>;

    /// Inject the content script into `tab_id`
    async fn inject_content_script(&self, tab_id: TabId) -> Result<()>;

    /// Look up one tab
    async fn get_tab(&self, tab_id: TabId) -> Result<TabInfo>;

    /// Active tab of the current window, never the UI surface's own tab
    ///
    /// Falls back to any window's active tab when the current window has
    /// none.
    async fn query_active_tab(&self) -> Result<Option<TabInfo>>;

    /// Run a read-only full-body extraction in `tab_id`
    async fn read_page(&self, tab_id: TabId) -> Result<PageSnapshot>;

    /// A window was closed
    async fn window_closed(&self, _window_id: WindowId) -> Result<()> {
        Ok(())
    }
}

/// Browser events observed by the relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserEvent {
    /// The toolbar button was clicked
    ToolbarClicked,
    /// A tab became the active tab of its window
    TabActivated { tab_id: TabId },
    /// A navigation finished; frame 0 is the main frame
    NavigationCompleted { tab_id: TabId, frame_id: u32 },
    /// A tab was closed
    TabRemoved { tab_id: TabId },
    /// A window was closed
    WindowRemoved { window_id: WindowId },
}

/// Source of page content for the UI surface
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Ask for the active tab's content
    async fn request_page_content(&self) -> Result<PageContentResponse>;
}

/// Answers `getPageContent` from the active tab
struct PageContentHandler {
    host: Arc<dyn BrowserHost>,
}

#[async_trait]
impl MessageHandler for PageContentHandler {
    async fn handle(&self, _message: RelayMessage) -> Result<Option<Value>> {
        let response = active_page_content(self.host.as_ref()).await;
        Ok(Some(serde_json::to_value(response)?))
    }
}

/// Forwards `summarizeText` from a content script to the UI surface
struct SummarizeTextHandler {
    host: Arc<dyn BrowserHost>,
}

#[async_trait]
impl MessageHandler for SummarizeTextHandler {
    async fn handle(&self, message: RelayMessage) -> Result<Option<Value>> {
        if let Err(e) = self.host.notify_ui(&message).await {
            tracing::warn!("Error forwarding text to the UI surface: {}", e);
        }
        Ok(None)
    }
}

async fn active_page_content(host: &dyn BrowserHost) -> PageContentResponse {
    let tab = match host.query_active_tab().await {
        Ok(Some(tab)) => tab,
        Ok(None) => {
            tracing::warn!("No active tab found");
            return PageContentResponse::error("No active tab found");
        }
        Err(e) => {
            tracing::error!("Error querying tabs: {}", e);
            return PageContentResponse::error(host_message(&e));
        }
    };

    if is_browser_internal_url(&tab.url) {
        tracing::info!("Refusing to read browser internal page {}", tab.url);
        return PageContentResponse::internal_page(&tab.title);
    }

    match host.read_page(tab.id).await {
        Ok(snapshot) => {
            tracing::debug!(
                "Read {} characters from tab {}",
                snapshot.content.chars().count(),
                tab.id
            );
            PageContentResponse::page(snapshot)
        }
        Err(e) => {
            tracing::error!("Error executing script: {}", e);
            PageContentResponse::error(host_message(&e))
        }
    }
}

/// Message a host rejection carries, without the error-kind prefix
fn host_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<SidekickError>() {
        Some(SidekickError::Browser(message)) | Some(SidekickError::Extraction(message)) => {
            message.clone()
        }
        _ => err.to_string(),
    }
}

/// The background relay for one browser
pub struct BackgroundRelay {
    host: Arc<dyn BrowserHost>,
    router: MessageRouter,
}

impl BackgroundRelay {
    /// Create a relay for `host` with the standard handler table
    pub fn new(host: Arc<dyn BrowserHost>) -> Self {
        let mut router = MessageRouter::new();
        router.register(
            "getPageContent",
            Arc::new(PageContentHandler { host: host.clone() }),
        );
        router.register(
            "summarizeText",
            Arc::new(SummarizeTextHandler { host: host.clone() }),
        );
        tracing::info!("Background relay started for {}", host.target());
        Self { host, router }
    }

    /// Hosted browser
    pub fn host(&self) -> &Arc<dyn BrowserHost> {
        &self.host
    }

    /// Handler table
    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    /// React to a browser event; never fails
    pub async fn handle_event(&self, event: BrowserEvent) {
        tracing::debug!("Browser event: {:?}", event);
        match event {
            BrowserEvent::ToolbarClicked => {
                if let Err(e) = self.host.toggle_ui_surface().await {
                    tracing::warn!("Error toggling the UI surface: {}", e);
                }
            }
            BrowserEvent::TabActivated { tab_id } => self.notify_page_change(tab_id).await,
            BrowserEvent::NavigationCompleted { tab_id, frame_id } => {
                if frame_id == 0 {
                    self.notify_page_change(tab_id).await;
                }
            }
            BrowserEvent::TabRemoved { tab_id } => {
                if let Err(e) = self.host.notify_ui(&RelayMessage::TabClosed { tab_id }).await {
                    tracing::debug!("UI surface not listening for tab closure: {}", e);
                }
            }
            BrowserEvent::WindowRemoved { window_id } => {
                if let Err(e) = self.host.window_closed(window_id).await {
                    tracing::warn!("Error handling closed window {}: {}", window_id, e);
                }
            }
        }
    }

    /// Handle a runtime message addressed to the background
    ///
    /// Returns the reply for the sender, if any. Handler failures are
    /// logged and produce no reply.
    pub async fn handle_message(&self, message: RelayMessage) -> Option<Value> {
        let action = message.action();
        match self.router.dispatch(message).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Handler for {} failed: {}", action, e);
                None
            }
        }
    }

    async fn notify_page_change(&self, tab_id: TabId) {
        match self.host.ui_surface_open().await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("UI surface closed; not announcing tab {}", tab_id);
                return;
            }
            Err(e) => {
                tracing::warn!("Error checking the UI surface: {}", e);
                return;
            }
        }

        let tab = match self.host.get_tab(tab_id).await {
            Ok(tab) => tab,
            Err(e) => {
                tracing::warn!("Error getting tab info: {}", e);
                return;
            }
        };

        let changed = RelayMessage::PageChanged {
            tab_id: Some(tab.id),
            url: tab.url.clone(),
            title: tab.title.clone(),
        };
        if let Err(e) = self.host.notify_ui(&changed).await {
            tracing::warn!("Error sending message to the UI surface: {}", e);
        }

        if let Err(e) = self
            .host
            .notify_tab(tab_id, &RelayMessage::CheckForSidebar)
            .await
        {
            tracing::debug!("Content script not ready in tab {}: {}", tab_id, e);
            if self.host.target().injects_content_script() {
                if let Err(e) = self.host.inject_content_script(tab_id).await {
                    tracing::warn!("Failed to inject content script: {}", e);
                }
            }
        }
    }
}

#[async_trait]
impl PageSource for BackgroundRelay {
    async fn request_page_content(&self) -> Result<PageContentResponse> {
        let reply = self
            .handle_message(RelayMessage::GetPageContent)
            .await
            .ok_or_else(|| SidekickError::Browser("No response from background".to_string()))?;
        Ok(serde_json::from_value(reply)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Host that records calls and fails where told to
    struct RecordingHost {
        open: bool,
        active: Option<TabInfo>,
        fail_notify_tab: bool,
        fail_read: bool,
        calls: Mutex<Vec<String>>,
    }

    impl RecordingHost {
        fn new() -> Self {
            Self {
                open: true,
                active: Some(tab(1, "https://example.com")),
                fail_notify_tab: false,
                fail_read: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn tab(id: TabId, url: &str) -> TabInfo {
        TabInfo {
            id,
            window_id: 1,
            url: url.to_string(),
            title: "Example".to_string(),
            active: true,
        }
    }

    #[async_trait]
    impl BrowserHost for RecordingHost {
        fn target(&self) -> BrowserTarget {
            BrowserTarget::Firefox
        }

        async fn toggle_ui_surface(&self) -> Result<()> {
            self.record("toggle");
            Ok(())
        }

        async fn ui_surface_open(&self) -> Result<bool> {
            Ok(self.open)
        }

        async fn notify_ui(&self, message: &RelayMessage) -> Result<()> {
            self.record(format!("ui:{}", message.action()));
            Ok(())
        }

        async fn notify_tab(&self, tab_id: TabId, message: &RelayMessage) -> Result<()> {
            if self.fail_notify_tab {
                return Err(SidekickError::Browser("Receiving end does not exist".into()).into());
            }
            self.record(format!("tab{}:{}", tab_id, message.action()));
            Ok(())
        }

        async fn inject_content_script(&self, tab_id: TabId) -> Result<()> {
            self.record(format!("inject:{}", tab_id));
            Ok(())
        }

        async fn get_tab(&self, tab_id: TabId) -> Result<TabInfo> {
            Ok(tab(tab_id, "https://example.com"))
        }

        async fn query_active_tab(&self) -> Result<Option<TabInfo>> {
            Ok(self.active.clone())
        }

        async fn read_page(&self, _tab_id: TabId) -> Result<PageSnapshot> {
            if self.fail_read {
                return Err(SidekickError::Browser("Frame was removed".into()).into());
            }
            Ok(PageSnapshot {
                title: "Example".to_string(),
                url: "https://example.com".to_string(),
                content: "Body".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_tab_activation_notifies_ui_and_tab() {
        let host = Arc::new(RecordingHost::new());
        let relay = BackgroundRelay::new(host.clone());
        relay
            .handle_event(BrowserEvent::TabActivated { tab_id: 5 })
            .await;
        assert_eq!(host.calls(), vec!["ui:pageChanged", "tab5:checkForSidebar"]);
    }

    #[tokio::test]
    async fn test_unreachable_content_script_is_injected() {
        let mut host = RecordingHost::new();
        host.fail_notify_tab = true;
        let host = Arc::new(host);
        let relay = BackgroundRelay::new(host.clone());
        relay
            .handle_event(BrowserEvent::NavigationCompleted {
                tab_id: 2,
                frame_id: 0,
            })
            .await;
        assert_eq!(host.calls(), vec!["ui:pageChanged", "inject:2"]);
    }

    #[tokio::test]
    async fn test_subframe_navigation_and_closed_surface_are_ignored() {
        let host = Arc::new(RecordingHost::new());
        let relay = BackgroundRelay::new(host.clone());
        relay
            .handle_event(BrowserEvent::NavigationCompleted {
                tab_id: 2,
                frame_id: 3,
            })
            .await;
        assert!(host.calls().is_empty());

        let mut closed = RecordingHost::new();
        closed.open = false;
        let closed = Arc::new(closed);
        let relay = BackgroundRelay::new(closed.clone());
        relay
            .handle_event(BrowserEvent::TabActivated { tab_id: 2 })
            .await;
        assert!(closed.calls().is_empty());
    }

    #[tokio::test]
    async fn test_tab_removed_sends_tab_closed() {
        let host = Arc::new(RecordingHost::new());
        let relay = BackgroundRelay::new(host.clone());
        relay.handle_event(BrowserEvent::TabRemoved { tab_id: 9 }).await;
        assert_eq!(host.calls(), vec!["ui:tabClosed"]);
    }

    #[tokio::test]
    async fn test_page_content_variants() {
        let relay = BackgroundRelay::new(Arc::new(RecordingHost::new()));
        let response = relay.request_page_content().await.unwrap();
        assert!(!response.is_error());
        assert_eq!(response.content.as_deref(), Some("Body"));

        let mut host = RecordingHost::new();
        host.active = None;
        let relay = BackgroundRelay::new(Arc::new(host));
        let response = relay.request_page_content().await.unwrap();
        assert_eq!(response.error.as_deref(), Some("No active tab found"));

        let mut host = RecordingHost::new();
        host.active = Some(tab(3, "chrome://extensions"));
        let relay = BackgroundRelay::new(Arc::new(host));
        let response = relay.request_page_content().await.unwrap();
        assert_eq!(
            response.error.as_deref(),
            Some("Cannot access browser internal pages")
        );
        assert_eq!(response.url.as_deref(), Some("Browser Internal Page"));

        let mut host = RecordingHost::new();
        host.fail_read = true;
        let relay = BackgroundRelay::new(Arc::new(host));
        let response = relay.request_page_content().await.unwrap();
        assert_eq!(response.error.as_deref(), Some("Frame was removed"));
    }

    #[tokio::test]
    async fn test_summarize_text_is_forwarded() {
        let host = Arc::new(RecordingHost::new());
        let relay = BackgroundRelay::new(host.clone());
        let reply = relay
            .handle_message(RelayMessage::SummarizeText {
                text: "words".to_string(),
            })
            .await;
        assert!(reply.is_none());
        assert_eq!(host.calls(), vec!["ui:summarizeText"]);
        assert_eq!(
            relay.router().actions(),
            vec!["getPageContent", "summarizeText"]
        );
    }
}
