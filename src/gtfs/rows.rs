use crate::gtfs::error::{Error, LineError};

use csv::StringRecord;
use log::debug;
use serde::de::DeserializeOwned;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

const UTF8_BOM: [u8; 3] = [0xef, 0xbb, 0xbf];

/// A CSV file with a header row, read lazily one record at a time.
///
/// Every call to [`RowSource::rows`] re-opens the file, so the same source
/// can be walked several times in one run.
#[derive(Debug, Clone)]
pub struct RowSource {
    path: PathBuf,
    file_name: String,
}

impl RowSource {
    pub fn new<P>(path: P) -> RowSource
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref().to_path_buf();
        let file_name = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}", path.display()));
        RowSource { path, file_name }
    }

    /// Source for `file_name` inside the GTFS directory `dir`
    pub fn in_dir<P>(dir: P, file_name: &str) -> RowSource
    where
        P: AsRef<Path>,
    {
        RowSource {
            path: dir.as_ref().join(file_name),
            file_name: file_name.to_owned(),
        }
    }

    /// Opens the file and returns an iterator over its trimmed records.
    pub fn rows(&self) -> Result<Rows, Error> {
        if !self.path.exists() {
            return Err(Error::MissingFile(self.file_name.clone()));
        }
        debug!("Reading {}", self.path.display());
        let file = File::open(&self.path).map_err(|e| Error::NamedFileIO {
            file_name: self.file_name.clone(),
            source: Box::new(e),
        })?;

        let mut buffered = BufReader::new(file);
        let starts_with_bom = buffered
            .fill_buf()
            .map_err(|e| Error::NamedFileIO {
                file_name: self.file_name.clone(),
                source: Box::new(e),
            })?
            .starts_with(&UTF8_BOM);
        if starts_with_bom {
            buffered.consume(UTF8_BOM.len());
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(false)
            .trim(csv::Trim::All)
            .from_reader(buffered);
        let headers = reader
            .headers()
            .map_err(|e| Error::CSVError {
                file_name: self.file_name.clone(),
                source: e,
                line_in_error: None,
            })?
            .clone();

        Ok(Rows {
            reader,
            headers: Arc::new(headers),
            file_name: self.file_name.clone(),
        })
    }

    /// Deserializes every row into `O`, matching struct fields to header names.
    pub fn records<O>(&self) -> Result<impl Iterator<Item = Result<O, Error>>, Error>
    where
        O: DeserializeOwned,
    {
        let file_name = self.file_name.clone();
        Ok(self.rows()?.map(move |row| {
            let row = row?;
            row.record
                .deserialize(Some(row.headers.as_ref()))
                .map_err(|e| Error::CSVError {
                    file_name: file_name.clone(),
                    source: e,
                    line_in_error: Some(LineError {
                        headers: row.headers.iter().map(String::from).collect(),
                        values: row.record.iter().map(String::from).collect(),
                    }),
                })
        }))
    }
}

/// Lazy iterator over the records of a [`RowSource`].
pub struct Rows {
    reader: csv::Reader<BufReader<File>>,
    headers: Arc<StringRecord>,
    file_name: String,
}

impl Iterator for Rows {
    type Item = Result<Row, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut record = StringRecord::new();
        match self.reader.read_record(&mut record) {
            Ok(true) => Some(Ok(Row {
                headers: Arc::clone(&self.headers),
                record,
            })),
            Ok(false) => None,
            Err(e) => Some(Err(row_error(&self.file_name, e))),
        }
    }
}

fn row_error(file_name: &str, e: csv::Error) -> Error {
    if let csv::ErrorKind::UnequalLengths {
        pos,
        expected_len,
        len,
    } = e.kind()
    {
        return Error::MalformedRow {
            file_name: file_name.to_owned(),
            line: pos.as_ref().map(|p| p.line()).unwrap_or_default(),
            expected: *expected_len,
            found: *len,
        };
    }
    Error::CSVError {
        file_name: file_name.to_owned(),
        source: e,
        line_in_error: None,
    }
}

/// One record of a CSV file, with fields addressable by header name.
#[derive(Debug, Clone)]
pub struct Row {
    headers: Arc<StringRecord>,
    record: StringRecord,
}

impl Row {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .position(|h| h == name)
            .and_then(|i| self.record.get(i))
    }

    pub fn field(&self, name: &str) -> Result<&str, Error> {
        self.get(name)
            .ok_or_else(|| Error::MissingField(name.to_owned()))
    }

    pub fn parse<T>(&self, name: &str) -> Result<T, Error>
    where
        T: FromStr,
    {
        parse_field(name, self.field(name)?)
    }
}

pub(crate) fn parse_field<T>(field: &str, value: &str) -> Result<T, Error>
where
    T: FromStr,
{
    value.parse::<T>().map_err(|_| Error::FieldParse {
        field: field.to_owned(),
        value: value.to_owned(),
    })
}
