use thiserror::Error;

/// An error that can occur when decoding a KMZ route map.
#[derive(Error, Debug)]
pub enum Error {
    /// The bytes are not a zip archive, or the archive has no `doc.kml`
    #[error("invalid kmz archive: {0}")]
    ArchiveFormat(String),
    /// `doc.kml` is not well formed XML
    #[error("impossible to parse doc.kml")]
    Xml(#[from] roxmltree::Error),
    /// The Document/Folder/Placemark nesting is not the expected one
    #[error("unexpected kml structure: {0}")]
    Structure(String),
    /// The placemark style has no LineStyle
    #[error("placemark '{0}' has no LineStyle")]
    MissingLineStyle(String),
    /// A coordinate tuple could not be read as numbers
    #[error("invalid coordinate '{0}'")]
    InvalidCoordinate(String),
}
