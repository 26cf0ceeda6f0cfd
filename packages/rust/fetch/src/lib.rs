//! Page transport for ekitime.
//!
//! [`PageSource`] is the seam between extraction and the network: the
//! pipeline only ever asks for "the text at this URL". [`HttpFetcher`] is the
//! reqwest-backed implementation. One attempt per page, no retries.

pub mod charset;

use std::future::Future;
use std::time::Duration;

use ekitime_shared::{EkitimeError, FetchConfig, Result};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};
use url::Url;

/// Something that can return the text of a page.
pub trait PageSource: Send + Sync {
    /// Fetch `url` and return its decoded body.
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<String>> + Send;
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// HTTP page source built on a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher with the timeout, redirect limit and user agent from `config`.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EkitimeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

impl PageSource for HttpFetcher {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<String> {
        ensure_http(url)?;
        debug!("fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| EkitimeError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EkitimeError::Network(format!("{url}: HTTP {status}")));
        }

        let declared = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(charset::header_charset)
            .map(str::to_owned);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| EkitimeError::Network(format!("{url}: body read failed: {e}")))?;
        let body = charset::decode_body(&bytes, declared.as_deref());

        debug!(bytes = body.len(), "page fetched");
        Ok(body)
    }
}

/// Only `http` and `https` URLs are fetched.
pub fn ensure_http(url: &Url) -> Result<()> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(EkitimeError::validation(format!(
            "unsupported URL scheme '{other}' in {url}"
        ))),
    }
}
