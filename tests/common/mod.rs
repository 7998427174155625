use serde_json::Value;
use sidekick::commands::{LoadedPage, Workspace};
use sidekick::config::Config;
use sidekick::proxy::{CompletionClient, ProxyClient};
use sidekick::storage::MemoryStore;
use sidekick::BrowserTarget;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[allow(dead_code)]
pub const ARTICLE_URL: &str = "https://news.test/story";

#[allow(dead_code)]
pub const ARTICLE_HTML: &str = r#"<html>
<head><title>River Survey</title><style>p { color: red; }</style></head>
<body>
<nav>Home | About</nav>
<article>
<p>The river survey counted forty-two otters along the northern bank this spring.</p>
<p>Volunteers walked the full length of the river twice over the weekend.</p>
</article>
<script>console.log("tracking");</script>
</body>
</html>"#;

#[allow(dead_code)]
pub fn article() -> LoadedPage {
    LoadedPage {
        url: ARTICLE_URL.to_string(),
        html: ARTICLE_HTML.to_string(),
    }
}

/// Mock proxy answering every POST with `body`
#[allow(dead_code)]
pub async fn mock_proxy(body: Value) -> MockServer {
    mock_proxy_with(ResponseTemplate::new(200).set_body_json(body)).await
}

#[allow(dead_code)]
pub async fn mock_proxy_with(template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

#[allow(dead_code)]
pub fn proxy_client(server: &MockServer) -> Arc<dyn CompletionClient> {
    Arc::new(ProxyClient::with_url(server.uri()).expect("failed to build proxy client"))
}

#[allow(dead_code)]
pub fn impatient_proxy_client(server: &MockServer, timeout: Duration) -> Arc<dyn CompletionClient> {
    Arc::new(
        ProxyClient::with_url(server.uri())
            .expect("failed to build proxy client")
            .with_timeout(timeout),
    )
}

/// Open `page` for `target` with an in-memory settings store
#[allow(dead_code)]
pub async fn open_workspace(
    target: BrowserTarget,
    page: &LoadedPage,
    client: Arc<dyn CompletionClient>,
) -> Workspace {
    let config = Config {
        target,
        ..Config::default()
    };
    Workspace::open(
        target,
        page,
        client,
        Arc::new(MemoryStore::new()),
        config.default_settings(),
    )
    .await
    .expect("failed to open workspace")
}
