//! Page loading for the CLI
//!
//! A page argument is either an http(s) URL, fetched with `reqwest`, or a
//! path to an HTML file on disk.

use crate::error::{Result, SidekickError};
use std::path::Path;
use std::time::Duration;
use url::Url;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// An HTML page and the URL it was served from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPage {
    pub url: String,
    pub html: String,
}

/// Load `page` from the web or the filesystem
///
/// # Errors
///
/// Returns `SidekickError::HttpStatus` for a non-success response, and
/// `SidekickError::Io` when the file cannot be read.
pub async fn load_page(page: &str) -> Result<LoadedPage> {
    match Url::parse(page) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => fetch(url).await,
        _ => read_file(Path::new(page)),
    }
}

async fn fetch(url: Url) -> Result<LoadedPage> {
    tracing::info!("Fetching {}", url);
    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(concat!("sidekick/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let response = client.get(url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SidekickError::HttpStatus(status.as_u16()).into());
    }
    // Redirects may change the final address
    let final_url = response.url().to_string();
    let html = response.text().await?;
    Ok(LoadedPage {
        url: final_url,
        html,
    })
}

fn read_file(path: &Path) -> Result<LoadedPage> {
    let absolute = path.canonicalize()?;
    let url = Url::from_file_path(&absolute)
        .map_err(|_| SidekickError::Config(format!("Not a usable file path: {}", path.display())))?;
    let html = std::fs::read_to_string(&absolute)?;
    tracing::debug!("Read {} bytes from {}", html.len(), absolute.display());
    Ok(LoadedPage {
        url: url.to_string(),
        html,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_load_file_page() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "<title>Local</title><p>Hello</p>").unwrap();
        let page = load_page(file.path().to_str().unwrap()).await.unwrap();
        assert!(page.url.starts_with("file://"));
        assert!(page.html.contains("Local"));
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        assert!(load_page("/definitely/not/here.html").await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<title>Remote</title>"))
            .mount(&server)
            .await;

        let page = load_page(&format!("{}/article", server.uri())).await.unwrap();
        assert!(page.url.ends_with("/article"));
        assert_eq!(page.html, "<title>Remote</title>");
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = load_page(&format!("{}/gone", server.uri())).await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP error! status: 404");
    }
}
