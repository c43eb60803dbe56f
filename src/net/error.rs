use reqwest::StatusCode;
use thiserror::Error;

/// An error that can occur when fetching a remote resource.
#[derive(Error, Debug)]
pub enum Error {
    /// The server answered with a non-success status after all retries
    #[error("GET {url} returned {status}")]
    Status { url: String, status: StatusCode },
    /// The request could not be completed
    #[error("GET {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The HTTP client could not be built
    #[error("impossible to build http client")]
    Client(#[source] reqwest::Error),
}
