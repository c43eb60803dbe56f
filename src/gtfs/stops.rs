use crate::error::Error;
use crate::geojson;
use crate::gtfs::{error::Error as GtfsError, rows::RowSource, structs::Stop};
use crate::sink::FileSink;

use log::info;

pub const STOPS_GEOJSON: &str = "stops.geojson";
pub const STOPS_CSV: &str = "stops.csv";

/// Columns of `stops.csv`, in [`Stop`] field order
const STOPS_CSV_HEADER: [&str; 12] = [
    "stop_id",
    "stop_code",
    "stop_name",
    "stop_desc",
    "stop_lat",
    "stop_lon",
    "zone_id",
    "stop_url",
    "location_type",
    "parent_station",
    "wheelchair_boarding",
    "stop_timezone",
];

/// Reads every stop and sorts them by numeric `stop_id`.
pub fn read_sorted_stops(source: &RowSource) -> Result<Vec<Stop>, GtfsError> {
    let mut keyed = source
        .records::<Stop>()?
        .map(|stop| {
            let stop = stop?;
            Ok((stop.numeric_id()?, stop))
        })
        .collect::<Result<Vec<_>, GtfsError>>()?;
    keyed.sort_by_key(|(id, _)| *id);
    Ok(keyed.into_iter().map(|(_, stop)| stop).collect())
}

/// Writes `stops.geojson` and a normalized `stops.csv`, both ordered by
/// numeric stop id. Returns the number of stops.
pub fn write_stops(source: &RowSource, sink: &FileSink) -> Result<usize, Error> {
    sink.ensure_dir("")?;

    let stops = read_sorted_stops(source)?;
    info!("{} stops", stops.len());

    let features = stops
        .iter()
        .map(geojson::stop_feature)
        .collect::<Result<Vec<_>, _>>()?;
    sink.write_json(STOPS_GEOJSON, &geojson::convert_to_geojson(features))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::CRLF)
        .from_writer(sink.create(STOPS_CSV)?);
    writer.write_record(STOPS_CSV_HEADER).map_err(csv_error)?;
    for stop in &stops {
        writer.serialize(stop).map_err(csv_error)?;
    }
    writer.flush()?;

    Ok(stops.len())
}

fn csv_error(e: csv::Error) -> GtfsError {
    GtfsError::CSVError {
        file_name: STOPS_CSV.to_owned(),
        source: e,
        line_in_error: None,
    }
}
