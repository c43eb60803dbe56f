use thiserror::Error;

/// An error that can occur when processing GTFS data.
#[derive(Error, Debug)]
pub enum Error {
    /// A mandatory file is not present in the GTFS directory
    #[error("Could not find file {0}")]
    MissingFile(String),
    /// A row does not have as many fields as the header
    #[error("malformed row in '{file_name}' at line {line}: expected {expected} fields, found {found}")]
    MalformedRow {
        file_name: String,
        line: u64,
        expected: u64,
        found: u64,
    },
    /// A column the caller asked for is not in the header
    #[error("missing column '{0}'")]
    MissingField(String),
    /// A field could not be converted to the expected type
    #[error("could not parse field '{field}' with value '{value}'")]
    FieldParse { field: String, value: String },
    /// A shape id showed up again after its group of points was closed
    #[error("shape {0} is not contiguous in shapes file, points must be grouped by shape_id")]
    UngroupedShape(String),
    /// Generic Input/Output error while reading a file
    #[error("impossible to read file")]
    IO(#[from] std::io::Error),
    /// Impossible to read a file
    #[error("impossible to read '{file_name}'")]
    NamedFileIO {
        /// The file name that could not be read
        file_name: String,
        /// The inital error that caused the unability to read the file
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Impossible to read or write a CSV file
    #[error("impossible to handle csv file '{file_name}'")]
    CSVError {
        /// File name that could not be parsed as CSV
        file_name: String,
        /// The initial error by the csv library
        #[source]
        source: csv::Error,
        /// The line that could not be parsed by the csv library
        line_in_error: Option<LineError>,
    },
}

/// Specific line from a CSV file that could not be read
#[derive(Debug)]
pub struct LineError {
    /// Headers of the CSV file
    pub headers: Vec<String>,
    /// Values of the line that could not be parsed
    pub values: Vec<String>,
}
