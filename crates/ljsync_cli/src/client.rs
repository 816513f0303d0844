//! Blocking HTTP client backing the sync transport.

use ljsync_engine::{HttpClient, HttpRequest};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// [`HttpClient`] over a blocking reqwest client.
pub struct ReqwestClient {
    inner: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Builds a client with the export-appropriate timeout.
    pub fn new() -> Result<Self, reqwest::Error> {
        let inner = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("ljsync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { inner })
    }
}

impl HttpClient for ReqwestClient {
    fn execute(&self, request: &HttpRequest) -> Result<Vec<u8>, String> {
        let mut builder = match &request.body {
            Some(body) => self.inner.post(&request.url).body(body.clone()),
            None => self.inner.get(&request.url),
        };
        if let Some(content_type) = request.content_type {
            builder = builder.header("Content-Type", content_type);
        }
        if let Some(cookie) = &request.cookie {
            builder = builder.header("Cookie", cookie.clone());
        }

        let response = builder.send().map_err(|err| err.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("server returned {status}"));
        }
        response
            .bytes()
            .map(|bytes| bytes.to_vec())
            .map_err(|err| err.to_string())
    }
}
