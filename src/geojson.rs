use crate::gtfs::{error::Error, shapes::Shape, structs::Stop};
use crate::kmz::DecodedTrack;
use crate::patterns::{Pattern, Route};

use geo_types::{LineString, MultiLineString};
use serde::Serialize;
use serde_json::{json, ser::PrettyFormatter, Serializer, Value};

/// Stroke width given to every GTFS shape feature
pub const SHAPE_STROKE_WIDTH: f64 = 3.0;

const COORDINATE_PRECISION: f64 = 1e6;

pub fn convert_to_geojson(features: Vec<Value>) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

/// Serializes with sorted keys and a one space indent. `serde_json::Map` is
/// ordered by key, so equal values always produce equal bytes.
pub fn to_stable_string(value: &Value) -> Result<String, serde_json::Error> {
    let mut out = Vec::new();
    let mut ser = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b" "));
    value.serialize(&mut ser)?;
    // serde_json only ever emits valid UTF-8
    Ok(String::from_utf8_lossy(&out).into_owned())
}

pub fn round6(value: f64) -> f64 {
    (value * COORDINATE_PRECISION).round() / COORDINATE_PRECISION
}

fn line_coords(line: &LineString<f64>) -> Vec<[f64; 2]> {
    line.coords().map(|c| [round6(c.x), round6(c.y)]).collect()
}

pub fn line_string_geometry(line: &LineString<f64>) -> Value {
    json!({
        "type": "LineString",
        "coordinates": line_coords(line),
    })
}

pub fn multi_line_string_geometry(lines: &MultiLineString<f64>) -> Value {
    json!({
        "type": "MultiLineString",
        "coordinates": lines.iter().map(line_coords).collect::<Vec<_>>(),
    })
}

pub fn point_geometry(lon: f64, lat: f64) -> Value {
    json!({
        "type": "Point",
        "coordinates": [round6(lon), round6(lat)],
    })
}

// Build a shape feature from an assembled GTFS shape
pub fn shape_feature(shape: &Shape) -> Value {
    json!({
        "type": "Feature",
        "id": &shape.id,
        "geometry": line_string_geometry(&shape.line),
        "properties": {
            "id": &shape.id,
            "stroke-width": SHAPE_STROKE_WIDTH,
        }
    })
}

// Build a stop feature; `zone` and `wheelchair_boarding` are null when the
// column is absent or blank.
pub fn stop_feature(stop: &Stop) -> Result<Value, Error> {
    let (lon, lat) = stop.lon_lat()?;
    Ok(json!({
        "type": "Feature",
        "id": &stop.stop_id,
        "geometry": point_geometry(lon, lat),
        "properties": {
            "id": &stop.stop_id,
            "name": &stop.stop_name,
            "desc": &stop.stop_desc,
            "code": &stop.stop_code,
            "zone": stop.zone(),
            "wheelchair_boarding": stop.wheelchair(),
        }
    }))
}

/// Simplestyle feature for a decoded route map, merged with the route and
/// pattern metadata.
/// https://github.com/mapbox/simplestyle-spec/tree/master/1.1.0
pub fn route_pattern_feature(track: &DecodedTrack, route: &Route, pattern: &Pattern) -> Value {
    json!({
        "type": "Feature",
        "geometry": multi_line_string_geometry(&track.geometry),
        "properties": {
            "name": &track.name,
            "stroke": &track.stroke_color,
            "stroke-width": track.stroke_width,
            "destination": &pattern.destination,
            "direction": &pattern.direction,
            "pattern-number": &pattern.pattern_no,
            "route-name": route.name.trim(),
            "route-number": &route.route_no,
            "operating-company": &route.operating_company,
        }
    })
}
