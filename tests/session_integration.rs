//! Integration tests for the sidebar session against a mock proxy
//!
//! Covers the full path: headless browser, background relay, session,
//! prompt building and the HTTP dispatcher.

mod common;

use common::*;
use serde_json::json;
use sidekick::relay::BrowserEvent;
use sidekick::session::{ChatRole, Control, WELCOME_MESSAGE};
use sidekick::BrowserTarget;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_open_loads_page_and_greets() {
    let server = mock_proxy(json!({"response": "unused"})).await;
    let workspace = open_workspace(BrowserTarget::Firefox, &article(), proxy_client(&server)).await;

    let session = workspace.session();
    assert_eq!(session.page().title, "River Survey");
    assert_eq!(session.page().url, ARTICLE_URL);
    let content = session.page().content.clone().unwrap();
    assert!(content.contains("forty-two otters"));
    assert!(!content.contains("tracking"));
    assert_eq!(session.status(), "Ready");
    assert_eq!(session.chat().len(), 1);
    assert_eq!(session.chat()[0].text, WELCOME_MESSAGE);
}

#[tokio::test]
async fn test_summarize_posts_endpoint_model_and_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "endpoint": "http://localhost:11434",
            "model": "llama3"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "Otters are thriving on the northern bank."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut workspace =
        open_workspace(BrowserTarget::Firefox, &article(), proxy_client(&server)).await;
    let session = workspace.session_mut();
    let summary = session.summarize().await.unwrap();

    assert_eq!(summary, "Otters are thriving on the northern bank.");
    assert_eq!(session.summary(), Some(summary.as_str()));
    assert!(session.status().starts_with("Ready | Input: "));
    assert!(session.status().ends_with("| Output: 11 tokens"));
    assert!(session.is_enabled(Control::Summarize));

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let prompt = body["prompt"].as_str().unwrap();
    assert!(prompt.contains("Title: River Survey"));
    assert!(prompt.contains(ARTICLE_URL));
    assert!(prompt.contains("forty-two otters"));
}

#[tokio::test]
async fn test_model_error_is_shown_verbatim() {
    let server = mock_proxy(json!({
        "error": "model 'llama3' not found, try pulling it first",
        "details": {"status": 404}
    }))
    .await;
    let mut workspace =
        open_workspace(BrowserTarget::Firefox, &article(), proxy_client(&server)).await;
    let session = workspace.session_mut();

    let err = session.summarize().await.unwrap_err();
    assert_eq!(err.to_string(), "model 'llama3' not found, try pulling it first");
    assert_eq!(
        session.status(),
        "Error: model 'llama3' not found, try pulling it first"
    );
    let last = session.chat().last().unwrap();
    assert_eq!(last.role, ChatRole::Assistant);
    assert_eq!(
        last.text,
        "Failed to generate summary: model 'llama3' not found, try pulling it first"
    );
    assert!(session.is_enabled(Control::Summarize));
    assert!(session.summary().is_none());
}

#[tokio::test]
async fn test_http_error_status() {
    let server = mock_proxy_with(ResponseTemplate::new(500)).await;
    let mut workspace =
        open_workspace(BrowserTarget::Firefox, &article(), proxy_client(&server)).await;
    let session = workspace.session_mut();

    assert!(session.generate_questions().await.is_err());
    assert_eq!(session.status(), "Error: HTTP error! status: 500");
    assert_eq!(
        session.chat().last().unwrap().text,
        "Failed to generate questions: HTTP error! status: 500"
    );
    assert!(session.is_enabled(Control::Questions));
}

#[tokio::test]
async fn test_timeout_releases_chat_control() {
    let server = mock_proxy_with(
        ResponseTemplate::new(200)
            .set_body_json(json!({"response": "too late"}))
            .set_delay(Duration::from_secs(2)),
    )
    .await;
    let client = impatient_proxy_client(&server, Duration::from_millis(100));
    let mut workspace = open_workspace(BrowserTarget::Firefox, &article(), client).await;
    let session = workspace.session_mut();

    let err = session.send_chat("How many otters?").await.unwrap_err();
    assert!(err.to_string().starts_with("Request timed out after"));
    assert_eq!(session.status(), "Error: Request timed out");
    assert!(session
        .chat()
        .last()
        .unwrap()
        .text
        .starts_with("Request timed out after"));
    assert!(session.is_enabled(Control::Chat));
}

#[tokio::test]
async fn test_questions_then_ask_by_number() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "1. Where were the otters counted?\n2. Who walked the river?\n3. When was the survey?"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"response": "Volunteers did."})),
        )
        .mount(&server)
        .await;

    let mut workspace =
        open_workspace(BrowserTarget::Firefox, &article(), proxy_client(&server)).await;
    let session = workspace.session_mut();

    let questions = session.generate_questions().await.unwrap();
    assert_eq!(
        questions,
        vec![
            "Where were the otters counted?".to_string(),
            "Who walked the river?".to_string(),
            "When was the survey?".to_string(),
        ]
    );

    let answer = session.ask_question(1).await.unwrap();
    assert_eq!(answer.as_deref(), Some("Volunteers did."));
    let asked = &session.chat()[session.chat().len() - 2];
    assert_eq!(asked.role, ChatRole::User);
    assert_eq!(asked.text, "Who walked the river?");
}

#[tokio::test]
async fn test_tab_close_drops_saved_context() {
    let server = mock_proxy(json!({"response": "Summary"})).await;
    let mut workspace =
        open_workspace(BrowserTarget::Firefox, &article(), proxy_client(&server)).await;
    let tab = workspace.tab();

    workspace.session_mut().summarize().await.unwrap();
    workspace.session_mut().save_tab_context(tab);
    assert!(workspace.session().tab_contexts().contains(tab));

    workspace.browser().close_tab(tab).unwrap();
    let delivered = workspace
        .dispatch(BrowserEvent::TabRemoved { tab_id: tab })
        .await
        .unwrap();
    assert_eq!(delivered, 1);
    assert!(!workspace.session().tab_contexts().contains(tab));
}

#[tokio::test]
async fn test_navigation_resets_conversation() {
    let server = mock_proxy(json!({"response": "Summary"})).await;
    let mut workspace =
        open_workspace(BrowserTarget::Firefox, &article(), proxy_client(&server)).await;
    let tab = workspace.tab();
    workspace.session_mut().summarize().await.unwrap();
    assert_eq!(workspace.session().chat().len(), 3);

    workspace
        .browser()
        .navigate(
            tab,
            "https://news.test/next",
            "<title>Next Story</title><p>A different page entirely.</p>",
        )
        .unwrap();
    workspace
        .dispatch(BrowserEvent::NavigationCompleted {
            tab_id: tab,
            frame_id: 0,
        })
        .await
        .unwrap();

    let session = workspace.session();
    assert_eq!(session.page().title, "Next Story");
    assert!(session.summary().is_none());
    assert_eq!(session.chat().len(), 1);
    assert_eq!(session.chat()[0].text, WELCOME_MESSAGE);
}
