//! One-shot summary used by the toolbar popup
//!
//! Unlike the sidebar flows, the popup sends no system prompt, always cuts
//! the page to a fixed number of characters and only uses the endpoint and
//! model settings.

use crate::error::{Result, SidekickError};
use crate::prompts::quick_summary_prompt;
use crate::proxy::CompletionClient;
use crate::relay::PageSource;
use crate::settings::Settings;
use crate::truncation::char_prefix;

/// Characters of page text the popup sends
pub const QUICK_SUMMARY_CHARS: usize = 6000;

/// Summarize the active page the way the popup does
///
/// # Errors
///
/// Returns `SidekickError::MissingContent` when the page cannot be read or
/// has no text, otherwise whatever the dispatcher reports.
pub async fn quick_summary(
    source: &dyn PageSource,
    client: &dyn CompletionClient,
    settings: &Settings,
) -> Result<String> {
    let response = source.request_page_content().await?;
    if let Some(error) = response.error {
        return Err(SidekickError::MissingContent(error).into());
    }
    let content = response
        .content
        .filter(|c| !c.is_empty())
        .ok_or_else(|| SidekickError::MissingContent("Page content is empty".to_string()))?;

    let prompt = quick_summary_prompt(char_prefix(&content, QUICK_SUMMARY_CHARS));
    tracing::debug!("Quick summary of {}", response.url.as_deref().unwrap_or("page"));
    client.complete(&prompt, settings).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PageContentResponse;
    use crate::test_utils::{page_response, FixedPage, ScriptedClient};
    use crate::truncation::ContentBudget;

    #[tokio::test]
    async fn test_quick_summary_slices_content() {
        let source = FixedPage(page_response(
            "Long",
            "https://long.test",
            &"#".repeat(QUICK_SUMMARY_CHARS + 500),
        ));
        let client = ScriptedClient::answering("quick");
        let settings = Settings::with_budget(ContentBudget::Characters(100));

        let answer = quick_summary(&source, &client, &settings).await.unwrap();
        assert_eq!(answer, "quick");
        let prompt = client.prompts().remove(0);
        assert_eq!(prompt.matches('#').count(), QUICK_SUMMARY_CHARS);
        assert!(!prompt.contains(settings.system_prompt.as_str()));
    }

    #[tokio::test]
    async fn test_quick_summary_reports_page_errors() {
        let source = FixedPage(PageContentResponse::error("No active tab found"));
        let client = ScriptedClient::new(vec![]);
        let settings = Settings::with_budget(ContentBudget::Characters(6000));
        let err = quick_summary(&source, &client, &settings).await.unwrap_err();
        assert_eq!(err.to_string(), "No active tab found");
        assert!(client.prompts().is_empty());
    }
}
