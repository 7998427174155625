//! Message handler table keyed by action name

use crate::error::Result;
use crate::protocol::RelayMessage;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Handles one kind of inter-context message
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle `message`, optionally producing a reply for the sender
    async fn handle(&self, message: RelayMessage) -> Result<Option<Value>>;
}

/// Routes messages to the handler registered for their action
#[derive(Default)]
pub struct MessageRouter {
    handlers: HashMap<&'static str, Arc<dyn MessageHandler>>,
}

impl MessageRouter {
    /// Create an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `action`, replacing any previous handler
    pub fn register(&mut self, action: &'static str, handler: Arc<dyn MessageHandler>) {
        if self.handlers.insert(action, handler).is_some() {
            tracing::debug!("Replaced handler for action {}", action);
        }
    }

    /// Whether a handler exists for `action`
    pub fn handles(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    /// Registered action names, sorted
    pub fn actions(&self) -> Vec<&'static str> {
        let mut actions: Vec<&'static str> = self.handlers.keys().copied().collect();
        actions.sort_unstable();
        actions
    }

    /// Route `message`
    ///
    /// Messages without a handler are ignored and produce no reply.
    ///
    /// # Examples
    ///
    /// ```
    /// use sidekick::relay::MessageRouter;
    /// use sidekick::RelayMessage;
    ///
    /// # tokio_test::block_on(async {
    /// let router = MessageRouter::new();
    /// let reply = router.dispatch(RelayMessage::GetSummary).await.unwrap();
    /// assert!(reply.is_none());
    /// # });
    /// ```
    pub async fn dispatch(&self, message: RelayMessage) -> Result<Option<Value>> {
        let action = message.action();
        match self.handlers.get(action) {
            Some(handler) => {
                tracing::debug!("Background received message: {}", action);
                handler.handle(message).await
            }
            None => {
                tracing::debug!("No handler for action {}", action);
                Ok(None)
            }
        }
    }
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRouter")
            .field("actions", &self.actions())
            .finish()
    }
}
