//! Blocking HTTP client for chapter pages. One session (cookie jar, connection pool) per run.

use crate::scraper::error::{ChapterError, ScraperError};
use crate::scraper::PageFetcher;
use reqwest::Url;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://centralnovel.com";
pub const DEFAULT_PATH_TEMPLATE: &str = "supreme-magus-capitulo-{n}";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (chapterscrape/0.1)";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
const MAX_REDIRECTS: usize = 10;
const PLACEHOLDER: &str = "{n}";

/// Build `{base}/{template with n}/`. Trailing slashes on `base` are dropped.
pub fn chapter_url(base_url: &str, path_template: &str, chapter: u32) -> String {
    format!(
        "{}/{}/",
        base_url.trim_end_matches('/'),
        path_template
            .trim_matches('/')
            .replace(PLACEHOLDER, &chapter.to_string())
    )
}

/// Blocking client that fetches one chapter page per call. No retries.
#[derive(Debug)]
pub struct ChapterClient {
    inner: reqwest::blocking::Client,
    base_url: String,
    path_template: String,
}

impl ChapterClient {
    /// Build a client with the default site, User-Agent, and timeout.
    pub fn new() -> Result<Self, ScraperError> {
        Self::builder().build()
    }

    pub fn builder() -> ChapterClientBuilder {
        ChapterClientBuilder::default()
    }

    pub fn url_for(&self, chapter: u32) -> String {
        chapter_url(&self.base_url, &self.path_template, chapter)
    }
}

impl PageFetcher for ChapterClient {
    /// GET the chapter page. 4xx/5xx, timeouts, and connection failures are transport errors.
    fn fetch(&mut self, chapter: u32) -> Result<Vec<u8>, ChapterError> {
        let url = self.url_for(chapter);
        let response = self
            .inner
            .get(&url)
            .send()
            .map_err(|e| ChapterError::Network {
                chapter,
                url: url.clone(),
                source: e,
            })?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(ChapterError::HttpStatus {
                chapter,
                status: status.as_u16(),
                url,
            });
        }
        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| ChapterError::BodyRead {
                chapter,
                url,
                source: e,
            })
    }
}

/// Builder for ChapterClient with optional site, User-Agent, and timeout.
#[derive(Debug)]
pub struct ChapterClientBuilder {
    base_url: String,
    path_template: String,
    user_agent: Option<String>,
    timeout_secs: u64,
}

impl Default for ChapterClientBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            path_template: DEFAULT_PATH_TEMPLATE.to_string(),
            user_agent: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ChapterClientBuilder {
    /// Site root, e.g. `https://centralnovel.com`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Path segment with a `{n}` placeholder for the chapter number.
    pub fn path_template(mut self, template: impl Into<String>) -> Self {
        self.path_template = template.into();
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set request timeout in seconds. Default 10.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Validate the site settings and build the underlying blocking client.
    pub fn build(self) -> Result<ChapterClient, ScraperError> {
        let parsed = Url::parse(&self.base_url).map_err(|e| ScraperError::InvalidUrl {
            input: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScraperError::InvalidUrl {
                input: self.base_url.clone(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        if !self.path_template.contains(PLACEHOLDER) {
            return Err(ScraperError::InvalidTemplate {
                template: self.path_template,
            });
        }
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let inner = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(ScraperError::Client)?;
        Ok(ChapterClient {
            inner,
            base_url: self.base_url,
            path_template: self.path_template,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::error::FailureKind;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve one connection with `response`; the thread returns the raw request head.
    fn serve_once(response: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (base, handle)
    }

    #[test]
    fn chapter_url_substitutes_number() {
        assert_eq!(
            chapter_url(DEFAULT_BASE_URL, DEFAULT_PATH_TEMPLATE, 487),
            "https://centralnovel.com/supreme-magus-capitulo-487/"
        );
    }

    #[test]
    fn chapter_url_trims_slashes() {
        assert_eq!(
            chapter_url("https://example.com/", "/novel/ch-{n}/", 3),
            "https://example.com/novel/ch-3/"
        );
    }

    #[test]
    fn build_rejects_invalid_base_url() {
        let result = ChapterClient::builder().base_url("not a url").build();
        assert!(matches!(result, Err(ScraperError::InvalidUrl { .. })));
        let result = ChapterClient::builder()
            .base_url("ftp://example.com")
            .build();
        assert!(matches!(result, Err(ScraperError::InvalidUrl { .. })));
    }

    #[test]
    fn build_rejects_template_without_placeholder() {
        let result = ChapterClient::builder().path_template("chapter").build();
        assert!(matches!(result, Err(ScraperError::InvalidTemplate { .. })));
    }

    #[test]
    fn url_for_uses_configured_site() -> Result<(), ScraperError> {
        let client = ChapterClient::builder()
            .base_url("http://127.0.0.1:9")
            .path_template("story-{n}")
            .build()?;
        assert_eq!(client.url_for(12), "http://127.0.0.1:9/story-12/");
        Ok(())
    }

    #[test]
    fn unreachable_host_is_transport_error() -> Result<(), ScraperError> {
        // Port 9 (discard) is closed on test machines; the connection is refused.
        let mut client = ChapterClient::builder()
            .base_url("http://127.0.0.1:9")
            .timeout_secs(2)
            .build()?;
        match client.fetch(1) {
            Err(e) => {
                assert_eq!(e.kind(), FailureKind::Transport);
                assert_eq!(e.chapter(), 1);
            }
            Ok(_) => panic!("expected a transport error"),
        }
        Ok(())
    }

    #[test]
    fn error_status_is_transport_error_and_user_agent_is_sent() -> Result<(), ScraperError> {
        let (base, server) = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        let mut client = ChapterClient::builder()
            .base_url(base)
            .path_template("story-{n}")
            .user_agent("chapterscrape-test/1.0")
            .timeout_secs(5)
            .build()?;
        match client.fetch(42) {
            Err(e @ ChapterError::HttpStatus { .. }) => {
                assert_eq!(e.kind(), FailureKind::Transport);
                assert_eq!(e.chapter(), 42);
                if let ChapterError::HttpStatus { status, url, .. } = e {
                    assert_eq!(status, 404);
                    assert!(url.ends_with("/story-42/"));
                }
            }
            other => panic!("expected HTTP status error, got {:?}", other),
        }

        let request = server.join().unwrap();
        assert!(request.starts_with("GET /story-42/ HTTP/1.1"));
        assert!(request
            .to_ascii_lowercase()
            .contains("user-agent: chapterscrape-test/1.0"));
        Ok(())
    }
}
