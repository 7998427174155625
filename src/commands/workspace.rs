//! Wiring of browser, relay and sidebar session for one CLI run

use super::page::LoadedPage;
use crate::error::Result;
use crate::host::HeadlessBrowser;
use crate::protocol::{BrowserTarget, RelayMessage, TabId};
use crate::proxy::CompletionClient;
use crate::relay::{BackgroundRelay, BrowserEvent};
use crate::session::SidebarSession;
use crate::settings::Settings;
use crate::storage::SettingsStore;
use std::sync::Arc;

/// A headless browser showing one page, with the UI surface open
pub struct Workspace {
    browser: Arc<HeadlessBrowser>,
    relay: Arc<BackgroundRelay>,
    session: SidebarSession,
    tab: TabId,
}

impl Workspace {
    /// Open `page` in a new browser, open the UI surface and announce the tab
    ///
    /// # Arguments
    ///
    /// * `target` - Browser flavor to host
    /// * `page` - Page loaded into the first tab
    /// * `client` - Dispatcher for model requests
    /// * `store` - Persisted settings
    /// * `defaults` - Settings used where the store has none
    pub async fn open(
        target: BrowserTarget,
        page: &LoadedPage,
        client: Arc<dyn CompletionClient>,
        store: Arc<dyn SettingsStore>,
        defaults: Settings,
    ) -> Result<Self> {
        let browser = Arc::new(HeadlessBrowser::new(target));
        let relay = Arc::new(BackgroundRelay::new(browser.clone()));
        let session = SidebarSession::new(relay.clone(), client, store, defaults);

        let tab = browser.open_tab(&page.url, &page.html)?;
        relay.handle_event(BrowserEvent::ToolbarClicked).await;

        let mut workspace = Self {
            browser,
            relay,
            session,
            tab,
        };
        workspace
            .relay
            .handle_event(BrowserEvent::TabActivated { tab_id: tab })
            .await;
        if workspace.pump().await? == 0 {
            // Nothing reached the UI surface, so load the page directly
            workspace.session.start().await;
        }
        Ok(workspace)
    }

    /// Deliver queued UI messages to the session
    ///
    /// Returns how many messages were handled.
    pub async fn pump(&mut self) -> Result<usize> {
        let messages = coalesce_page_changes(self.browser.take_ui_messages()?);
        let count = messages.len();
        for message in messages {
            self.session.handle_message(message).await;
        }
        Ok(count)
    }

    /// Feed a browser event to the relay and deliver what it produces
    pub async fn dispatch(&mut self, event: BrowserEvent) -> Result<usize> {
        self.relay.handle_event(event).await;
        self.pump().await
    }

    pub fn session(&self) -> &SidebarSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SidebarSession {
        &mut self.session
    }

    pub fn browser(&self) -> &Arc<HeadlessBrowser> {
        &self.browser
    }

    pub fn relay(&self) -> &Arc<BackgroundRelay> {
        &self.relay
    }

    /// Tab holding the loaded page
    pub fn tab(&self) -> TabId {
        self.tab
    }
}

/// Drop `pageChanged` messages repeating the previous announcement's URL
///
/// The relay and the content script both announce the same navigation.
pub fn coalesce_page_changes(messages: Vec<RelayMessage>) -> Vec<RelayMessage> {
    let mut last_url: Option<String> = None;
    messages
        .into_iter()
        .filter(|message| match message {
            RelayMessage::PageChanged { url, .. } => {
                if last_url.as_deref() == Some(url.as_str()) {
                    false
                } else {
                    last_url = Some(url.clone());
                    true
                }
            }
            _ => true,
        })
        .collect()
}
