use crate::error::Error;
use crate::geojson;

use log::debug;
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Output tree rooted at the datasets directory. All paths handed to the
/// sink are relative to that root.
#[derive(Debug, Clone)]
pub struct FileSink {
    root: PathBuf,
}

impl FileSink {
    pub fn new<P>(root: P) -> FileSink
    where
        P: AsRef<Path>,
    {
        FileSink {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path<P: AsRef<Path>>(&self, relative: P) -> PathBuf {
        self.root.join(relative)
    }

    /// Creates the directory and its parents. An existing directory is fine.
    pub fn ensure_dir<P: AsRef<Path>>(&self, relative: P) -> io::Result<PathBuf> {
        let dir = self.path(relative);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Deletes a whole subtree before it gets rewritten.
    pub fn clear<P: AsRef<Path>>(&self, relative: P) -> io::Result<()> {
        let dir = self.path(relative);
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                debug!("Removed {}", dir.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn write_text<P: AsRef<Path>>(&self, relative: P, contents: &str) -> io::Result<PathBuf> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Writes `value` with sorted keys and stable indentation.
    pub fn write_json<P: AsRef<Path>>(&self, relative: P, value: &Value) -> Result<PathBuf, Error> {
        let contents = geojson::to_stable_string(value)?;
        Ok(self.write_text(relative, &contents)?)
    }

    /// Truncates the file and opens it for writing.
    pub fn create<P: AsRef<Path>>(&self, relative: P) -> io::Result<File> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
    }
}
