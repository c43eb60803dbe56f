pub mod config;
pub mod dataset;
pub mod error;
pub mod geojson;
pub mod gtfs;
pub mod kmz;
pub mod net;
pub mod patterns;
pub mod sink;
pub mod snapshot;

#[cfg(test)]
pub(crate) mod test_util {
    use std::path::PathBuf;

    /// Empty directory for one test, recreated on every run.
    pub fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(concat!(env!("CARGO_PKG_NAME"), "-tests"))
            .join(format!("{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
