use crate::error::Error;
use crate::gtfs::error::Error as GtfsError;
use crate::net::Fetcher;

use log::info;
use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use zip::{result::ZipError, ZipArchive};

/// Files of the static feed the datasets are built from
pub const GTFS_FILES: [&str; 3] = ["routes.txt", "shapes.txt", "stops.txt"];

/// Downloads the GTFS zip and extracts [`GTFS_FILES`] into `gtfs_dir`.
pub fn fetch_dataset<F>(fetcher: &F, url: &str, gtfs_dir: &Path) -> Result<Vec<PathBuf>, Error>
where
    F: Fetcher,
{
    info!("Downloading GTFS from {}", url);
    let fetched = fetcher.fetch(url)?;
    info!("Downloaded {} bytes", fetched.bytes.len());
    extract_gtfs_files(&fetched.bytes, gtfs_dir)
}

/// Extracts [`GTFS_FILES`] from a GTFS zip, renamed from `.txt` to `.csv`.
/// Existing files are replaced.
pub fn extract_gtfs_files(bytes: &[u8], gtfs_dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    fs::create_dir_all(gtfs_dir)?;

    let mut extracted = Vec::new();
    for name in GTFS_FILES {
        let mut entry = archive.by_name(name).map_err(|e| match e {
            ZipError::FileNotFound => Error::GtfsError(GtfsError::MissingFile(name.to_owned())),
            e => Error::ZipError(e),
        })?;
        let dest = gtfs_dir.join(name.replace(".txt", ".csv"));
        let mut out = File::create(&dest)?;
        io::copy(&mut entry, &mut out)?;
        info!("Extracted {} to {}", name, dest.display());
        extracted.push(dest);
    }
    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmz::tests::kmz;
    use crate::net::{self, Fetched};
    use crate::test_util::scratch_dir;

    struct Canned(Vec<u8>);

    impl Fetcher for Canned {
        fn fetch(&self, _url: &str) -> Result<Fetched, net::Error> {
            Ok(Fetched {
                content_type: "application/zip".to_string(),
                bytes: self.0.clone(),
            })
        }
    }

    #[test]
    fn test_extract_renames_to_csv() {
        let dir = scratch_dir("dataset-extract");
        std::fs::write(dir.join("stops.csv"), "old").unwrap();
        let zip = kmz(&[
            ("agency.txt", "agency_id\n1\n"),
            ("routes.txt", "route_id,route_short_name\n1,099\n"),
            ("shapes.txt", "shape_id\n"),
            ("stops.txt", "stop_id\n1\n"),
        ]);

        let files = fetch_dataset(&Canned(zip), "http://gtfs.example/latest", &dir).unwrap();

        assert_eq!(files.len(), 3);
        assert_eq!(std::fs::read_to_string(dir.join("stops.csv")).unwrap(), "stop_id\n1\n");
        assert!(dir.join("routes.csv").exists());
        assert!(!dir.join("agency.csv").exists());
    }

    #[test]
    fn test_missing_gtfs_file() {
        let dir = scratch_dir("dataset-missing");
        let zip = kmz(&[("routes.txt", "route_id\n")]);

        assert!(matches!(
            extract_gtfs_files(&zip, &dir),
            Err(Error::GtfsError(GtfsError::MissingFile(name))) if name == "shapes.txt"
        ));
    }
}
