use crate::gtfs::error::Error as GtfsError;
use crate::sink::FileSink;

use serde::Serialize;
use std::fs::File;

pub const ROUTE_HEADSIGN_INFO: &str = "route_headsign_info.csv";

const HEADER: [&str; 4] = ["route_number", "pattern_number", "direction", "destination"];

/// One line of `route_headsign_info.csv`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadsignRow {
    pub route_number: String,
    pub pattern_number: String,
    pub direction: String,
    pub destination: String,
}

/// Append-only writer for `route_headsign_info.csv`. Every row is flushed as
/// soon as it is written so a crawl that dies half way keeps what it found.
pub struct HeadsignWriter {
    writer: csv::Writer<File>,
}

impl HeadsignWriter {
    /// Truncates the file and writes the header row.
    pub fn create(sink: &FileSink) -> Result<HeadsignWriter, GtfsError> {
        let file = sink.create(ROUTE_HEADSIGN_INFO)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::CRLF)
            .from_writer(file);
        writer.write_record(HEADER).map_err(csv_error)?;
        writer.flush()?;
        Ok(HeadsignWriter { writer })
    }

    pub fn append(&mut self, row: &HeadsignRow) -> Result<(), GtfsError> {
        self.writer.serialize(row).map_err(csv_error)?;
        self.writer.flush()?;
        Ok(())
    }
}

fn csv_error(e: csv::Error) -> GtfsError {
    GtfsError::CSVError {
        file_name: ROUTE_HEADSIGN_INFO.to_owned(),
        source: e,
        line_in_error: None,
    }
}
