use crate::gtfs::error::Error;
use crate::gtfs::rows::{parse_field, Row};

use serde::{Deserialize, Serialize};

/// Shape points that define the path of a route.
/// https://gtfs.org/documentation/schedule/reference/#shapestxt
#[derive(Debug, Clone, PartialEq)]
pub struct ShapePoint {
    pub shape_id: String,
    pub sequence: i64,
    pub lon: f64,
    pub lat: f64,
}

impl ShapePoint {
    pub fn from_row(row: &Row) -> Result<ShapePoint, Error> {
        Ok(ShapePoint {
            shape_id: row.field("shape_id")?.to_owned(),
            sequence: row.parse("shape_pt_sequence")?,
            lon: row.parse("shape_pt_lon")?,
            lat: row.parse("shape_pt_lat")?,
        })
    }
}

/// A physical stop, station, or area.
/// https://gtfs.org/documentation/schedule/reference/#stopstxt
///
/// Fields are kept as the trimmed text from `stops.csv`, in the column order
/// of the exported `stops.csv`. Columns missing from the source deserialize
/// to `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stop {
    pub stop_id: String,
    #[serde(default)]
    pub stop_code: String,
    #[serde(default)]
    pub stop_name: String,
    #[serde(default)]
    pub stop_desc: String,
    pub stop_lat: String,
    pub stop_lon: String,
    #[serde(default)]
    pub zone_id: Option<String>,
    #[serde(default)]
    pub stop_url: Option<String>,
    #[serde(default)]
    pub location_type: Option<String>,
    #[serde(default)]
    pub parent_station: Option<String>,
    #[serde(default)]
    pub wheelchair_boarding: Option<String>,
    #[serde(default)]
    pub stop_timezone: Option<String>,
}

impl Stop {
    /// Numeric value of `stop_id`, used as the sort key of the stop exports
    pub fn numeric_id(&self) -> Result<i64, Error> {
        parse_field("stop_id", &self.stop_id)
    }

    pub fn lon_lat(&self) -> Result<(f64, f64), Error> {
        Ok((
            parse_field("stop_lon", &self.stop_lon)?,
            parse_field("stop_lat", &self.stop_lat)?,
        ))
    }

    pub fn zone(&self) -> Option<&str> {
        non_empty(&self.zone_id)
    }

    pub fn wheelchair(&self) -> Option<&str> {
        non_empty(&self.wheelchair_boarding)
    }
}

/// A transportation route. Only the short name is needed to look up
/// patterns from the route information service.
/// https://gtfs.org/documentation/schedule/reference/#routestxt
#[derive(Debug, Deserialize)]
pub struct Route {
    pub route_id: String,
    pub route_short_name: String,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
