pub mod error;
pub mod rows;
pub mod shapes;
pub mod stops;
pub mod structs;

use std::path::Path;

use rows::RowSource;

pub const ROUTES_FILE: &str = "routes.csv";
pub const SHAPES_FILE: &str = "shapes.csv";
pub const STOPS_FILE: &str = "stops.csv";

/// The extracted GTFS files the datasets are built from.
#[derive(Debug, Clone)]
pub struct GtfsDir {
    pub routes: RowSource,
    pub shapes: RowSource,
    pub stops: RowSource,
}

impl GtfsDir {
    pub fn new<P>(path: P) -> GtfsDir
    where
        P: AsRef<Path>,
    {
        let p = path.as_ref();
        GtfsDir {
            routes: RowSource::in_dir(p, ROUTES_FILE),
            shapes: RowSource::in_dir(p, SHAPES_FILE),
            stops: RowSource::in_dir(p, STOPS_FILE),
        }
    }
}
