use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header;
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use crate::core::config::EngineConfig;
use crate::core::error::{Error, ErrorKind, Result};

/// Blocking HTML fetcher.
///
/// Follows at most the configured number of redirects and times out after
/// the configured interval. A body comes back only for `200 OK` responses
/// whose content type starts with `text/html`; everything else, including
/// any transport error, collapses to `None` so the crawler can drop the
/// page and move on.
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .redirect(Policy::limited(config.redirects))
            .tcp_nodelay(true)
            .build()
            .map_err(|err| Error::new(ErrorKind::Internal, format!("http client: {}", err)))?;
        Ok(PageFetcher { client })
    }

    pub fn fetch(&self, url: &Url) -> Option<String> {
        let response = match self.client.get(url.clone()).send() {
            Ok(response) => response,
            Err(err) => {
                debug!("fetch failed for {}: {}", url, err);
                return None;
            }
        };

        if response.status() != StatusCode::OK {
            debug!("skipping {}: status {}", url, response.status());
            return None;
        }

        let is_html = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_ascii_lowercase().starts_with("text/html"))
            .unwrap_or(false);
        if !is_html {
            return None;
        }

        response.text().ok()
    }
}
