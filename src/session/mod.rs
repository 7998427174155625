//! UI surface session
//!
//! `SidebarSession` holds everything the sidebar (or side-panel window)
//! keeps between user actions: the cached page context, the chat
//! transcript, suggested questions, the status line and per-tab snapshots.
//! It is driven by sequential callbacks through `&mut self`.
//!
//! Every action follows the same error rules: failures are terminal for
//! the triggering action only, the triggering control is re-enabled
//! afterwards, and nothing is retried.

pub mod chat;
pub mod context;
pub mod popup;

pub use chat::{ChatMessage, ChatRole};
pub use context::{PageContext, TabContext, TabContextMap};
pub use popup::quick_summary;

use crate::error::{Result, SidekickError};
use crate::prompts::{
    chat_prompt, parse_questions, questions_prompt, summarize_prompt, PagePrompt, UNTITLED_PAGE,
};
use crate::protocol::{RelayMessage, TabId};
use crate::proxy::CompletionClient;
use crate::relay::PageSource;
use crate::settings::Settings;
use crate::storage::SettingsStore;
use crate::truncation::{estimate_tokens, fit_to_budget, ContentBudget, PreparedContent};
use std::collections::HashSet;
use std::sync::Arc;

/// Assistant message shown after a conversation reset
pub const WELCOME_MESSAGE: &str = "Welcome to Sidekick! Click \"Summarize This Page\" to get started, or ask me a question about the current page.";

/// Characters of page text sent with a chat question under a character budget
pub const CHAT_SNIPPET_CHARS: usize = 3000;

pub const STATUS_READY: &str = "Ready";
pub const STATUS_SETTINGS_SAVED: &str = "Settings saved!";
const STATUS_TIMED_OUT: &str = "Error: Request timed out";

const LOAD_FAILED: &str = "Failed to load page content. Please try again.";
const CHAT_LOAD_FAILED: &str = "Failed to load page content";
const EMPTY_CONTENT: &str = "Page content is empty or unavailable";

/// Controls disabled while their action runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Summarize,
    Questions,
    Chat,
}

/// State of one open UI surface
pub struct SidebarSession {
    source: Arc<dyn PageSource>,
    client: Arc<dyn CompletionClient>,
    store: Arc<dyn SettingsStore>,
    defaults: Settings,
    page: PageContext,
    chat: Vec<ChatMessage>,
    summary: Option<String>,
    questions: Vec<String>,
    chat_input: String,
    status: String,
    busy: HashSet<Control>,
    settings_panel_open: bool,
    tab_contexts: TabContextMap,
}

impl SidebarSession {
    /// Create a session
    ///
    /// # Arguments
    ///
    /// * `source` - Where page content is requested from
    /// * `client` - Dispatcher used for every model request
    /// * `store` - Persisted settings
    /// * `defaults` - Values used for settings missing from `store`; the
    ///   budget unit always comes from here
    pub fn new(
        source: Arc<dyn PageSource>,
        client: Arc<dyn CompletionClient>,
        store: Arc<dyn SettingsStore>,
        defaults: Settings,
    ) -> Self {
        Self {
            source,
            client,
            store,
            defaults,
            page: PageContext::default(),
            chat: Vec::new(),
            summary: None,
            questions: Vec::new(),
            chat_input: String::new(),
            status: STATUS_READY.to_string(),
            busy: HashSet::new(),
            settings_panel_open: false,
            tab_contexts: TabContextMap::new(),
        }
    }

    pub fn page(&self) -> &PageContext {
        &self.page
    }

    pub fn chat(&self) -> &[ChatMessage] {
        &self.chat
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn chat_input(&self) -> &str {
        &self.chat_input
    }

    pub fn set_chat_input(&mut self, text: impl Into<String>) {
        self.chat_input = text.into();
    }

    pub fn settings_panel_open(&self) -> bool {
        self.settings_panel_open
    }

    pub fn tab_contexts(&self) -> &TabContextMap {
        &self.tab_contexts
    }

    /// Whether `control` accepts input
    pub fn is_enabled(&self, control: Control) -> bool {
        !self.busy.contains(&control)
    }

    /// Current settings, with defaults filled in
    pub fn settings(&self) -> Result<Settings> {
        Settings::load(self.store.as_ref(), &self.defaults)
    }

    /// Open the UI: load the page and greet the user
    pub async fn start(&mut self) {
        tracing::info!("Sidebar session started");
        self.reset_conversation().await;
    }

    /// Request the active page from the relay and cache it
    ///
    /// Returns whether usable page data was cached. An error reply that
    /// still names a page caches that partial data and counts as success.
    pub async fn refresh_page_context(&mut self) -> bool {
        tracing::debug!("Updating page content cache");
        let response = match self.source.request_page_content().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Runtime error: {}", e);
                self.status = format!("Error: {}", e);
                return false;
            }
        };

        if !response.is_error() {
            self.page = PageContext::from_page(response);
            tracing::debug!(
                "Page content updated: title={}, url={}, tokens={}",
                self.page.title,
                self.page.url,
                self.page.token_estimate
            );
            self.status = format!("Ready | Input: {} tokens", self.page.token_estimate);
            return true;
        }

        let message = response.error.clone().unwrap_or_default();
        tracing::warn!("Error getting page content: {}", message);
        self.status = format!("Error loading page content: {}", message);
        match PageContext::from_partial(response) {
            Some(page) => {
                self.page = page;
                true
            }
            None => false,
        }
    }

    /// Handle a message addressed to the UI surface
    pub async fn handle_message(&mut self, message: RelayMessage) {
        tracing::debug!("Sidebar received message: {}", message.action());
        match message {
            RelayMessage::PageChanged { url, .. } => {
                tracing::info!("Page changed: {}", url);
                self.reset_conversation().await;
                if !self.page.has_content() {
                    return;
                }
                self.status = STATUS_READY.to_string();
                match self.settings() {
                    Ok(settings) if settings.auto_summarize => {
                        if let Err(e) = self.summarize().await {
                            tracing::warn!("Auto-summarize failed: {}", e);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!("Could not read settings: {}", e),
                }
            }
            RelayMessage::TabClosed { tab_id } => {
                if self.tab_contexts.remove(tab_id).is_some() {
                    tracing::debug!("Dropped saved context for tab {}", tab_id);
                }
            }
            RelayMessage::SummarizeText { text } => {
                self.page.token_estimate = estimate_tokens(&text);
                self.page.content = Some(text);
                if let Err(e) = self.summarize().await {
                    tracing::warn!("Summarizing forwarded text failed: {}", e);
                }
            }
            other => tracing::debug!("Ignoring {} in the UI surface", other.action()),
        }
    }

    /// Summarize the current page
    ///
    /// The summary replaces the "Generating summary..." placeholder in the
    /// transcript and is returned.
    pub async fn summarize(&mut self) -> Result<String> {
        self.busy.insert(Control::Summarize);
        let result = self.run_summarize().await;
        self.busy.remove(&Control::Summarize);
        self.finish("summarize", &result);
        result
    }

    async fn run_summarize(&mut self) -> Result<String> {
        self.status = format!("Processing | Input: {} tokens", self.page.token_estimate);
        let content = self.ensure_content(LOAD_FAILED).await?;
        let settings = self.settings()?;
        self.status = format!("Sending to Ollama | Input: {} tokens", self.page.token_estimate);

        self.chat.push(ChatMessage::user(format!(
            "Please summarize this page: {}",
            self.display_title()
        )));
        let pending = self.push_assistant("Generating summary...");

        let prepared = self.prepare(&content, settings.budget);
        let prompt = summarize_prompt(
            &settings.system_prompt,
            &PagePrompt::new(&self.page.title, &self.page.url, &prepared.text),
        );

        let client = Arc::clone(&self.client);
        match client.complete(&prompt, &settings).await {
            Ok(answer) => {
                self.chat[pending].text = answer.clone();
                self.summary = Some(answer.clone());
                self.status = ready_status(prepared.input_tokens, &answer);
                Ok(answer)
            }
            Err(e) => {
                self.chat[pending].text = failure_text("Failed to generate summary", &e);
                Err(e)
            }
        }
    }

    /// Ask the model for three questions about the page
    pub async fn generate_questions(&mut self) -> Result<Vec<String>> {
        self.busy.insert(Control::Questions);
        let result = self.run_questions().await;
        self.busy.remove(&Control::Questions);
        self.finish("generate questions", &result);
        result
    }

    async fn run_questions(&mut self) -> Result<Vec<String>> {
        self.status = format!("Processing | Input: {} tokens", self.page.token_estimate);
        self.questions.clear();
        let content = self.ensure_content(LOAD_FAILED).await?;
        let settings = self.settings()?;

        self.chat.push(ChatMessage::user(
            "What are some interesting questions about this page?",
        ));
        let pending = self.push_assistant("Generating questions...");

        let prepared = self.prepare(&content, settings.budget);
        let prompt = questions_prompt(
            &settings.system_prompt,
            &PagePrompt::new(&self.page.title, &self.page.url, &prepared.text),
        );

        let client = Arc::clone(&self.client);
        match client.complete(&prompt, &settings).await {
            Ok(answer) => {
                self.questions = parse_questions(&answer);
                tracing::debug!("Parsed {} questions", self.questions.len());
                self.chat[pending].text = answer.clone();
                self.status = ready_status(prepared.input_tokens, &answer);
                Ok(self.questions.clone())
            }
            Err(e) => {
                self.chat[pending].text = failure_text("Failed to generate questions", &e);
                Err(e)
            }
        }
    }

    /// Send a free-form question about the page
    ///
    /// Blank input is ignored and yields `Ok(None)`.
    pub async fn send_chat(&mut self, text: &str) -> Result<Option<String>> {
        let question = text.trim().to_string();
        if question.is_empty() {
            return Ok(None);
        }
        self.chat_input.clear();

        self.busy.insert(Control::Chat);
        let result = self.run_chat(&question).await;
        self.busy.remove(&Control::Chat);
        self.finish("chat", &result);
        result.map(Some)
    }

    /// Send whatever is in the chat input
    pub async fn send_chat_input(&mut self) -> Result<Option<String>> {
        let text = std::mem::take(&mut self.chat_input);
        self.send_chat(&text).await
    }

    /// Enter in the chat input: sends unless Shift is held
    pub async fn press_enter(&mut self, shift: bool) -> Result<Option<String>> {
        if shift {
            self.chat_input.push('\n');
            return Ok(None);
        }
        self.send_chat_input().await
    }

    /// Ask one of the suggested questions through the chat flow
    pub async fn ask_question(&mut self, index: usize) -> Result<Option<String>> {
        let Some(question) = self.questions.get(index).cloned() else {
            tracing::debug!("No suggested question at index {}", index);
            return Ok(None);
        };
        self.chat_input = question;
        self.send_chat_input().await
    }

    async fn run_chat(&mut self, question: &str) -> Result<String> {
        self.chat.push(ChatMessage::user(question));
        let pending = self.push_assistant("Thinking...");

        let content = match self.ensure_content(CHAT_LOAD_FAILED).await {
            Ok(content) => content,
            Err(e) => {
                self.chat[pending].text = failure_text("Error", &e);
                return Err(e);
            }
        };
        let settings = match self.settings() {
            Ok(settings) => settings,
            Err(e) => {
                self.chat[pending].text = failure_text("Error", &e);
                return Err(e);
            }
        };

        let prepared = match settings.budget {
            ContentBudget::Tokens(_) => self.prepare(&content, settings.budget),
            ContentBudget::Characters(_) => {
                self.prepare(&content, ContentBudget::Characters(CHAT_SNIPPET_CHARS))
            }
        };
        let prompt = chat_prompt(
            &settings.system_prompt,
            &PagePrompt::new(&self.page.title, &self.page.url, &prepared.text),
            question,
        );

        let client = Arc::clone(&self.client);
        match client.complete(&prompt, &settings).await {
            Ok(answer) => {
                self.chat[pending].text = answer.clone();
                self.status = ready_status(prepared.input_tokens, &answer);
                Ok(answer)
            }
            Err(e) => {
                self.chat[pending].text = failure_text("Error", &e);
                Err(e)
            }
        }
    }

    /// Clear the conversation, reload the page and greet the user
    pub async fn reset_conversation(&mut self) {
        self.chat.clear();
        self.chat_input.clear();
        self.questions.clear();
        self.summary = None;
        self.page = PageContext::default();

        self.refresh_page_context().await;
        self.chat.push(ChatMessage::assistant(WELCOME_MESSAGE));
    }

    /// Validate and persist `settings`
    pub fn save_settings(&mut self, settings: &Settings) -> Result<()> {
        if settings.budget_key() != self.defaults.budget_key() {
            return Err(SidekickError::Config(format!(
                "This session stores its budget under {}",
                self.defaults.budget_key()
            ))
            .into());
        }
        settings.validate()?;
        settings.save(self.store.as_ref())?;
        self.status = STATUS_SETTINGS_SAVED.to_string();
        Ok(())
    }

    /// Show or hide the settings panel; returns the new visibility
    pub fn toggle_settings_panel(&mut self) -> bool {
        self.settings_panel_open = !self.settings_panel_open;
        self.settings_panel_open
    }

    /// Snapshot the transcript, summary, questions and page for `tab_id`
    pub fn save_tab_context(&mut self, tab_id: TabId) {
        self.tab_contexts.save(
            tab_id,
            TabContext {
                chat: self.chat.clone(),
                summary: self.summary.clone(),
                questions: self.questions.clone(),
                page: self.page.clone(),
            },
        );
    }

    /// Restore the snapshot saved for `tab_id`; returns whether one existed
    pub fn load_tab_context(&mut self, tab_id: TabId) -> bool {
        let Some(saved) = self.tab_contexts.load(tab_id).cloned() else {
            return false;
        };
        self.chat = saved.chat;
        self.summary = saved.summary;
        self.questions = saved.questions;
        self.page = saved.page;
        self.status = if self.page.token_estimate > 0 {
            format!("Ready | Input: {} tokens", self.page.token_estimate)
        } else {
            STATUS_READY.to_string()
        };
        true
    }

    /// Page text to send, refreshing the cache when nothing is cached
    async fn ensure_content(&mut self, load_failure: &str) -> Result<String> {
        if !self.page.has_content() {
            let loaded = self.refresh_page_context().await;
            if !loaded {
                return Err(SidekickError::MissingContent(load_failure.to_string()).into());
            }
        }
        match self.page.content.as_deref() {
            Some(content) if !content.is_empty() => Ok(content.to_string()),
            _ => Err(SidekickError::MissingContent(EMPTY_CONTENT.to_string()).into()),
        }
    }

    /// Apply `budget` and report the input size on the status line
    fn prepare(&mut self, content: &str, budget: ContentBudget) -> PreparedContent {
        let prepared = fit_to_budget(content, budget);
        self.status = if prepared.truncated {
            format!(
                "Processing | Input: {} tokens (truncated from {})",
                prepared.input_tokens, prepared.original_tokens
            )
        } else {
            format!("Processing | Input: {} tokens", prepared.input_tokens)
        };
        prepared
    }

    fn push_assistant(&mut self, text: &str) -> usize {
        self.chat.push(ChatMessage::assistant(text));
        self.chat.len() - 1
    }

    fn display_title(&self) -> &str {
        if self.page.title.is_empty() {
            UNTITLED_PAGE
        } else {
            &self.page.title
        }
    }

    fn finish<T>(&mut self, action: &str, result: &Result<T>) {
        if let Err(e) = result {
            tracing::error!("Error in {}: {}", action, e);
            self.status = error_status(e);
        }
    }
}

fn is_timeout(err: &anyhow::Error) -> bool {
    err.downcast_ref::<SidekickError>()
        .is_some_and(SidekickError::is_timeout)
}

fn error_status(err: &anyhow::Error) -> String {
    if is_timeout(err) {
        STATUS_TIMED_OUT.to_string()
    } else {
        format!("Error: {}", err)
    }
}

/// Transcript text replacing a placeholder after a failure
fn failure_text(prefix: &str, err: &anyhow::Error) -> String {
    if is_timeout(err) {
        err.to_string()
    } else {
        format!("{}: {}", prefix, err)
    }
}

fn ready_status(input_tokens: usize, answer: &str) -> String {
    format!(
        "Ready | Input: {} tokens | Output: {} tokens",
        input_tokens,
        estimate_tokens(answer)
    )
}
