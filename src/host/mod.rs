//! In-process browser host
//!
//! `HeadlessBrowser` models just enough of a browser for the relay and the
//! UI session to run outside one: windows, tabs holding parsed HTML pages,
//! content-script readiness, and the UI surface for each target flavor.
//! Messages addressed to the UI surface are queued in an inbox the driver
//! drains and feeds to the session.

use crate::content::{extract_content, ContentScript, ExtractionMode, HtmlDocument, PageDocument};
use crate::error::{Result, SidekickError};
use crate::protocol::{
    is_browser_internal_url, BrowserTarget, PageSnapshot, RelayMessage, SurfaceKind, TabId,
    TabInfo, WindowId,
};
use crate::relay::BrowserHost;
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Page loaded into the popup window's own tab
pub const UI_PAGE_URL: &str = "chrome-extension://sidekick/sidebar/sidebar.html";

/// Title of the popup window's own tab
pub const UI_PAGE_TITLE: &str = "Sidekick";

const NO_RECEIVER: &str = "Could not establish connection. Receiving end does not exist.";

/// Window created with the browser
const MAIN_WINDOW: WindowId = 1;

#[derive(Debug)]
struct HeadlessTab {
    info: TabInfo,
    document: HtmlDocument,
    script_ready: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PopupWindow {
    window_id: WindowId,
    tab_id: TabId,
}

#[derive(Debug)]
struct BrowserState {
    tabs: BTreeMap<TabId, HeadlessTab>,
    windows: Vec<WindowId>,
    next_id: u32,
    focused_window: WindowId,
    last_browser_window: WindowId,
    sidebar_open: bool,
    popup: Option<PopupWindow>,
    ui_listening: bool,
    ui_inbox: VecDeque<RelayMessage>,
}

impl BrowserState {
    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn tab(&self, tab_id: TabId) -> Result<&HeadlessTab> {
        self.tabs
            .get(&tab_id)
            .ok_or_else(|| SidekickError::Browser(format!("Invalid tab ID: {}", tab_id)).into())
    }

    fn tab_mut(&mut self, tab_id: TabId) -> Result<&mut HeadlessTab> {
        self.tabs
            .get_mut(&tab_id)
            .ok_or_else(|| SidekickError::Browser(format!("Invalid tab ID: {}", tab_id)).into())
    }

    fn focus(&mut self, window_id: WindowId) {
        self.focused_window = window_id;
        if self.popup.map(|p| p.window_id) != Some(window_id) {
            self.last_browser_window = window_id;
        }
    }

    fn activate(&mut self, tab_id: TabId) -> Result<()> {
        let window_id = self.tab(tab_id)?.info.window_id;
        for tab in self.tabs.values_mut() {
            if tab.info.window_id == window_id {
                tab.info.active = tab.info.id == tab_id;
            }
        }
        self.focus(window_id);
        Ok(())
    }

    fn ui_open(&self, kind: SurfaceKind) -> bool {
        match kind {
            SurfaceKind::Sidebar => self.sidebar_open,
            SurfaceKind::PopupWindow => self.popup.is_some(),
        }
    }

    /// Queue `message` for the UI surface if it exists and is listening
    fn deliver_to_ui(&mut self, kind: SurfaceKind, message: RelayMessage) -> Result<()> {
        let popup_alive = self
            .popup
            .map(|p| self.tabs.contains_key(&p.tab_id))
            .unwrap_or(false);
        let reachable = match kind {
            SurfaceKind::Sidebar => self.sidebar_open,
            SurfaceKind::PopupWindow => popup_alive,
        };
        if !reachable || !self.ui_listening {
            return Err(SidekickError::Browser(NO_RECEIVER.to_string()).into());
        }
        self.ui_inbox.push_back(message);
        Ok(())
    }
}

/// A browser that exists only in memory
pub struct HeadlessBrowser {
    target: BrowserTarget,
    script: ContentScript,
    state: Mutex<BrowserState>,
}

impl HeadlessBrowser {
    /// Start a browser for `target` with one empty window
    pub fn new(target: BrowserTarget) -> Self {
        Self {
            target,
            script: ContentScript::for_target(target),
            state: Mutex::new(BrowserState {
                tabs: BTreeMap::new(),
                windows: vec![MAIN_WINDOW],
                next_id: MAIN_WINDOW + 1,
                focused_window: MAIN_WINDOW,
                last_browser_window: MAIN_WINDOW,
                sidebar_open: false,
                popup: None,
                ui_listening: true,
                ui_inbox: VecDeque::new(),
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, BrowserState>> {
        self.state
            .lock()
            .map_err(|_| SidekickError::Browser("Browser state lock poisoned".to_string()).into())
    }

    /// Open a new normal window and focus it
    pub fn open_window(&self) -> Result<WindowId> {
        let mut state = self.lock()?;
        let window_id = state.allocate_id();
        state.windows.push(window_id);
        state.focus(window_id);
        Ok(window_id)
    }

    /// Open `html` served from `url` in a new active tab of the main window
    pub fn open_tab(&self, url: &str, html: &str) -> Result<TabId> {
        self.open_tab_in(MAIN_WINDOW, url, html)
    }

    /// Open `html` served from `url` in a new active tab of `window_id`
    pub fn open_tab_in(&self, window_id: WindowId, url: &str, html: &str) -> Result<TabId> {
        let document = HtmlDocument::parse(url, html);
        let mut state = self.lock()?;
        if !state.windows.contains(&window_id) {
            return Err(SidekickError::Browser(format!("Invalid window ID: {}", window_id)).into());
        }
        let tab_id = state.allocate_id();
        let title = tab_title(&document, url);
        state.tabs.insert(
            tab_id,
            HeadlessTab {
                info: TabInfo {
                    id: tab_id,
                    window_id,
                    url: url.to_string(),
                    title,
                    active: false,
                },
                document,
                script_ready: !is_browser_internal_url(url),
            },
        );
        state.activate(tab_id)?;
        tracing::debug!("Opened tab {} at {}", tab_id, url);
        Ok(tab_id)
    }

    /// Load `html` from `url` into an existing tab
    pub fn navigate(&self, tab_id: TabId, url: &str, html: &str) -> Result<()> {
        let document = HtmlDocument::parse(url, html);
        let mut state = self.lock()?;
        let tab = state.tab_mut(tab_id)?;
        tab.info.url = url.to_string();
        tab.info.title = tab_title(&document, url);
        tab.document = document;
        tab.script_ready = !is_browser_internal_url(url);
        Ok(())
    }

    /// Make `tab_id` the active tab of its window and focus that window
    pub fn activate_tab(&self, tab_id: TabId) -> Result<()> {
        self.lock()?.activate(tab_id)
    }

    /// Close one tab
    pub fn close_tab(&self, tab_id: TabId) -> Result<()> {
        let mut state = self.lock()?;
        state
            .tabs
            .remove(&tab_id)
            .ok_or_else(|| SidekickError::Browser(format!("Invalid tab ID: {}", tab_id)))?;
        Ok(())
    }

    /// Close a window and every tab in it
    ///
    /// The popup pointer is left alone; the relay forgets it when it sees
    /// the window removal.
    pub fn close_window(&self, window_id: WindowId) -> Result<Vec<TabId>> {
        let mut state = self.lock()?;
        let position = state
            .windows
            .iter()
            .position(|w| *w == window_id)
            .ok_or_else(|| SidekickError::Browser(format!("Invalid window ID: {}", window_id)))?;
        state.windows.remove(position);

        let closed: Vec<TabId> = state
            .tabs
            .values()
            .filter(|tab| tab.info.window_id == window_id)
            .map(|tab| tab.info.id)
            .collect();
        for tab_id in &closed {
            state.tabs.remove(tab_id);
        }
        if state.focused_window == window_id {
            let fallback = state.last_browser_window;
            state.focused_window = if state.windows.contains(&fallback) {
                fallback
            } else {
                state.windows.first().copied().unwrap_or(MAIN_WINDOW)
            };
        }
        Ok(closed)
    }

    /// Mark whether the content script in `tab_id` answers messages
    pub fn set_script_ready(&self, tab_id: TabId, ready: bool) -> Result<()> {
        self.lock()?.tab_mut(tab_id)?.script_ready = ready;
        Ok(())
    }

    /// Mark whether the UI surface has a message listener installed
    pub fn set_ui_listening(&self, listening: bool) -> Result<()> {
        self.lock()?.ui_listening = listening;
        Ok(())
    }

    /// Drain the messages delivered to the UI surface
    pub fn take_ui_messages(&self) -> Result<Vec<RelayMessage>> {
        Ok(self.lock()?.ui_inbox.drain(..).collect())
    }

    /// Tab metadata, if the tab exists
    pub fn tab(&self, tab_id: TabId) -> Result<Option<TabInfo>> {
        Ok(self.lock()?.tabs.get(&tab_id).map(|tab| tab.info.clone()))
    }

    /// Window holding the popup UI surface, if one exists
    pub fn popup_window(&self) -> Result<Option<WindowId>> {
        Ok(self.lock()?.popup.map(|p| p.window_id))
    }

    /// Currently focused window
    pub fn focused_window(&self) -> Result<WindowId> {
        Ok(self.lock()?.focused_window)
    }

    /// Whether the content script in `tab_id` answers messages
    pub fn script_ready(&self, tab_id: TabId) -> Result<bool> {
        Ok(self.lock()?.tab(tab_id)?.script_ready)
    }

    /// Run the popup's `getSummary` request against the active tab
    ///
    /// The content script's `summarizeText` reply is returned to the caller.
    pub fn request_summary_text(&self) -> Result<String> {
        let state = self.lock()?;
        let tab = active_tab(&state)
            .ok_or_else(|| SidekickError::Browser("No active tab found".to_string()))?;
        let tab = state.tab(tab.id)?;
        if !tab.script_ready {
            return Err(SidekickError::Browser(NO_RECEIVER.to_string()).into());
        }
        match self.script.handle(&RelayMessage::GetSummary, &tab.document) {
            Some(RelayMessage::SummarizeText { text }) => Ok(text),
            _ => Err(SidekickError::Extraction("Content script sent no text".to_string()).into()),
        }
    }
}

fn tab_title(document: &HtmlDocument, url: &str) -> String {
    let title = document.title();
    if title.is_empty() {
        url.to_string()
    } else {
        title
    }
}

/// Active tab of the last focused normal window, else of any window
fn active_tab(state: &BrowserState) -> Option<TabInfo> {
    let ui_tab = state.popup.map(|p| p.tab_id);
    let candidates = || {
        state
            .tabs
            .values()
            .filter(move |tab| tab.info.active && Some(tab.info.id) != ui_tab)
    };
    candidates()
        .find(|tab| tab.info.window_id == state.last_browser_window)
        .or_else(|| candidates().next())
        .map(|tab| tab.info.clone())
}

#[async_trait]
impl BrowserHost for HeadlessBrowser {
    fn target(&self) -> BrowserTarget {
        self.target
    }

    async fn toggle_ui_surface(&self) -> Result<()> {
        let mut state = self.lock()?;
        let existing = state.popup;
        match self.target.surface_kind() {
            SurfaceKind::Sidebar => {
                state.sidebar_open = !state.sidebar_open;
                tracing::info!(
                    "Sidebar {}",
                    if state.sidebar_open { "opened" } else { "closed" }
                );
            }
            SurfaceKind::PopupWindow => match existing {
                Some(popup) if state.windows.contains(&popup.window_id) => {
                    state.focus(popup.window_id);
                    tracing::debug!("Focused popup window {}", popup.window_id);
                }
                _ => {
                    let window_id = state.allocate_id();
                    let tab_id = state.allocate_id();
                    state.windows.push(window_id);
                    state.tabs.insert(
                        tab_id,
                        HeadlessTab {
                            info: TabInfo {
                                id: tab_id,
                                window_id,
                                url: UI_PAGE_URL.to_string(),
                                title: UI_PAGE_TITLE.to_string(),
                                active: true,
                            },
                            document: HtmlDocument::from_text(UI_PAGE_URL, UI_PAGE_TITLE, ""),
                            script_ready: false,
                        },
                    );
                    state.popup = Some(PopupWindow { window_id, tab_id });
                    state.focus(window_id);
                    tracing::info!("Created popup window {}", window_id);
                }
            },
        }
        Ok(())
    }

    async fn ui_surface_open(&self) -> Result<bool> {
        Ok(self.lock()?.ui_open(self.target.surface_kind()))
    }

    async fn notify_ui(&self, message: &RelayMessage) -> Result<()> {
        let kind = self.target.surface_kind();
        self.lock()?.deliver_to_ui(kind, message.clone())
    }

    async fn notify_tab(&self, tab_id: TabId, message: &RelayMessage) -> Result<()> {
        let kind = self.target.surface_kind();
        let mut state = self.lock()?;
        let tab = state.tab(tab_id)?;
        if !tab.script_ready {
            return Err(SidekickError::Browser(NO_RECEIVER.to_string()).into());
        }
        let reply = self.script.handle(message, &tab.document);
        if let Some(reply) = reply {
            if let Err(e) = state.deliver_to_ui(kind, reply) {
                tracing::debug!("Content script reply not delivered: {}", e);
            }
        }
        Ok(())
    }

    async fn inject_content_script(&self, tab_id: TabId) -> Result<()> {
        let kind = self.target.surface_kind();
        let mut state = self.lock()?;
        let tab = state.tab_mut(tab_id)?;
        if is_browser_internal_url(&tab.info.url) {
            return Err(SidekickError::Browser(format!(
                "Missing host permission for the tab: {}",
                tab.info.url
            ))
            .into());
        }
        tab.script_ready = true;
        let announcement = self.script.announce(&tab.document);
        tracing::debug!("Injected content script into tab {}", tab_id);
        if let Err(e) = state.deliver_to_ui(kind, announcement) {
            tracing::debug!("Error sending initial pageChanged message: {}", e);
        }
        Ok(())
    }

    async fn get_tab(&self, tab_id: TabId) -> Result<TabInfo> {
        Ok(self.lock()?.tab(tab_id)?.info.clone())
    }

    async fn query_active_tab(&self) -> Result<Option<TabInfo>> {
        Ok(active_tab(&*self.lock()?))
    }

    async fn read_page(&self, tab_id: TabId) -> Result<PageSnapshot> {
        let state = self.lock()?;
        let tab = state.tab(tab_id)?;
        if is_browser_internal_url(&tab.info.url) {
            return Err(SidekickError::Browser(format!(
                "Cannot access contents of url \"{}\"",
                tab.info.url
            ))
            .into());
        }
        Ok(PageSnapshot {
            title: tab.document.title(),
            url: tab.info.url.clone(),
            content: extract_content(&tab.document, ExtractionMode::FullBody),
        })
    }

    async fn window_closed(&self, window_id: WindowId) -> Result<()> {
        let mut state = self.lock()?;
        if state.popup.map(|p| p.window_id) == Some(window_id) {
            tracing::info!("Popup window {} closed", window_id);
            state.popup = None;
        }
        Ok(())
    }
}
