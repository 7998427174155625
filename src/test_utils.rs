//! Test utilities for Sidekick
//!
//! Shared test doubles for the page source and the completion client, plus
//! fixture and assertion helpers.

use crate::error::Result;
use crate::protocol::PageContentResponse;
use crate::proxy::CompletionClient;
use crate::relay::PageSource;
use crate::settings::Settings;
use async_trait::async_trait;
use std::sync::Mutex;

/// Page source that always returns the same response
pub struct FixedPage(pub PageContentResponse);

#[async_trait]
impl PageSource for FixedPage {
    async fn request_page_content(&self) -> Result<PageContentResponse> {
        Ok(self.0.clone())
    }
}

/// Client answering from a script and recording prompts
///
/// Once the script runs out every request answers `"default answer"`.
pub struct ScriptedClient {
    answers: Mutex<Vec<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(answers: Vec<Result<String>>) -> Self {
        Self {
            answers: Mutex::new(answers),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Client that answers `text` once
    pub fn answering(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    /// Every prompt received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, prompt: &str, _settings: &Settings) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut answers = self.answers.lock().unwrap();
        if answers.is_empty() {
            return Ok("default answer".to_string());
        }
        answers.remove(0)
    }
}

/// A successful page content response
pub fn page_response(title: &str, url: &str, content: &str) -> PageContentResponse {
    PageContentResponse {
        title: Some(title.to_string()),
        url: Some(url.to_string()),
        content: Some(content.to_string()),
        error: None,
    }
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: Result<T>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SidekickError;
    use crate::truncation::ContentBudget;

    #[tokio::test]
    async fn test_scripted_client_falls_back_to_default() {
        let client = ScriptedClient::answering("first");
        let settings = Settings::with_budget(ContentBudget::Tokens(8000));
        assert_eq!(client.complete("a", &settings).await.unwrap(), "first");
        assert_eq!(client.complete("b", &settings).await.unwrap(), "default answer");
        assert_eq!(client.prompts(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_assert_error_contains_success() {
        let result: Result<()> = Err(SidekickError::Config("test error message".to_string()).into());
        assert_error_contains(result, "test error");
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_ok() {
        assert_error_contains(Ok(()), "error");
    }
}
