pub mod error;

pub use error::Error;

use crate::config::Config;

use log::{debug, warn};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::CONTENT_TYPE;
use std::thread;
use std::time::Duration;

/// Body and content type of a successful GET.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Something that can GET a URL. The route pattern crawl only depends on
/// this, so it can run against canned responses.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> Result<Fetched, Error>;
}

/// Bounded retry with exponential backoff: attempt `n` that fails waits
/// `backoff_factor * 2^(n-1)` before the next one.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_factor: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            backoff_factor: Duration::from_millis(300),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_factor * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Blocking HTTP client shared by the whole run.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn new(config: &Config) -> Result<HttpClient, Error> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Client)?;
        Ok(HttpClient {
            client,
            retry: RetryPolicy {
                max_attempts: config.max_retries.max(1),
                ..RetryPolicy::default()
            },
        })
    }

    /// Sends the request built by `build`, retrying connection failures,
    /// timeouts and 5xx answers. The last response is returned whatever its
    /// status.
    pub fn send<F>(&self, url: &str, build: F) -> Result<Response, Error>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut attempt = 1;
        loop {
            let last_attempt = attempt >= self.retry.max_attempts;
            match build(&self.client).send() {
                Ok(resp) if resp.status().is_server_error() && !last_attempt => {
                    warn!("GET {} returned {} (attempt {})", url, resp.status(), attempt);
                }
                Ok(resp) => return Ok(resp),
                Err(e) if is_transient(&e) && !last_attempt => {
                    warn!("GET {} failed (attempt {}): {}", url, attempt, e);
                }
                Err(e) => {
                    return Err(Error::Http {
                        url: url.to_owned(),
                        source: e,
                    })
                }
            }
            let wait = self.retry.backoff(attempt);
            debug!("Retrying {} in {}ms", url, wait.as_millis());
            thread::sleep(wait);
            attempt += 1;
        }
    }

    /// GET with retries, failing on a non-success status.
    pub fn get(&self, url: &str) -> Result<Response, Error> {
        let resp = self.send(url, |client| client.get(url))?;
        if !resp.status().is_success() {
            return Err(Error::Status {
                url: url.to_owned(),
                status: resp.status(),
            });
        }
        Ok(resp)
    }
}

impl Fetcher for HttpClient {
    fn fetch(&self, url: &str) -> Result<Fetched, Error> {
        let resp = self.get(url)?;
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        let bytes = resp.bytes().map_err(|e| Error::Http {
            url: url.to_owned(),
            source: e,
        })?;
        Ok(Fetched {
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}

fn is_transient(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout() || e.is_request() || e.is_body()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(300));
        assert_eq!(policy.backoff(2), Duration::from_millis(600));
        assert_eq!(policy.backoff(4), Duration::from_millis(2400));
    }

    #[test]
    fn test_client_honours_retry_setting() {
        let config = Config {
            max_retries: 0,
            ..Config::default()
        };
        let client = HttpClient::new(&config).unwrap();
        assert_eq!(client.retry.max_attempts, 1);
    }
}
