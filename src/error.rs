use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Error(String),
    #[error("Cannot write file")]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    GtfsError(#[from] crate::gtfs::error::Error),
    #[error(transparent)]
    NetError(#[from] crate::net::Error),
    #[error(transparent)]
    RouteLookupError(#[from] crate::patterns::RouteLookupError),
    /// A route map URL answered with something other than a KMZ
    #[error("{url} is {content_type}")]
    UnexpectedContentType { url: String, content_type: String },
    #[error(transparent)]
    ZipError(#[from] zip::result::ZipError),
}
