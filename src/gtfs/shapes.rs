use crate::error::Error;
use crate::geojson;
use crate::gtfs::{error::Error as GtfsError, rows::RowSource, structs::ShapePoint};
use crate::sink::FileSink;

use geo_types::LineString;
use log::info;
use std::collections::HashSet;
use std::iter::Peekable;
use std::path::PathBuf;

pub const SHAPES_DIR: &str = "shapes";

/// A GTFS shape with its points in `shape_pt_sequence` order.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub id: String,
    pub line: LineString<f64>,
}

impl Shape {
    /// Builds the shape from the points of one group. Points are stably
    /// sorted by sequence, so duplicate sequence numbers keep file order.
    pub fn from_points(id: String, mut points: Vec<ShapePoint>) -> Shape {
        points.sort_by_key(|p| p.sequence);
        Shape {
            id,
            line: points.iter().map(|p| (p.lon, p.lat)).collect(),
        }
    }

    /// Output bucket, `floor(shape_id / 100) * 100`
    pub fn bucket(&self) -> Result<i64, GtfsError> {
        let id = self.id.parse::<i64>().map_err(|_| GtfsError::FieldParse {
            field: "shape_id".to_owned(),
            value: self.id.clone(),
        })?;
        Ok(id.div_euclid(100) * 100)
    }

    pub fn relative_path(&self) -> Result<PathBuf, GtfsError> {
        Ok(PathBuf::from(SHAPES_DIR)
            .join(self.bucket()?.to_string())
            .join(format!("{}.geojson", self.id)))
    }
}

/// Groups adjacent points with the same `shape_id` into shapes.
///
/// The points must already be grouped by `shape_id`, as GTFS producers
/// usually write them. A shape id that comes back after its group ended
/// yields [`GtfsError::UngroupedShape`] instead of a second, partial shape.
pub struct ShapeAssembler<I>
where
    I: Iterator<Item = Result<ShapePoint, GtfsError>>,
{
    points: Peekable<I>,
    closed: HashSet<String>,
}

impl<I> ShapeAssembler<I>
where
    I: Iterator<Item = Result<ShapePoint, GtfsError>>,
{
    pub fn new(points: I) -> Self {
        ShapeAssembler {
            points: points.peekable(),
            closed: HashSet::new(),
        }
    }
}

impl<I> Iterator for ShapeAssembler<I>
where
    I: Iterator<Item = Result<ShapePoint, GtfsError>>,
{
    type Item = Result<Shape, GtfsError>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = match self.points.next()? {
            Ok(point) => point,
            Err(e) => return Some(Err(e)),
        };
        let shape_id = first.shape_id.clone();
        if self.closed.contains(&shape_id) {
            return Some(Err(GtfsError::UngroupedShape(shape_id)));
        }

        // A bad row inside a group fails the group, never a partial shape.
        let mut members = vec![first];
        loop {
            match self.points.peek() {
                Some(Ok(point)) if point.shape_id == shape_id => {}
                Some(Err(_)) => {
                    if let Some(Err(e)) = self.points.next() {
                        return Some(Err(e));
                    }
                }
                _ => break,
            }
            if let Some(Ok(point)) = self.points.next() {
                members.push(point);
            }
        }

        self.closed.insert(shape_id.clone());
        Some(Ok(Shape::from_points(shape_id, members)))
    }
}

/// Reads `shapes.csv` and lazily assembles its shapes in first-seen order.
pub fn read_shapes(
    source: &RowSource,
) -> Result<ShapeAssembler<impl Iterator<Item = Result<ShapePoint, GtfsError>>>, GtfsError> {
    let points = source
        .rows()?
        .map(|row| row.and_then(|row| ShapePoint::from_row(&row)));
    Ok(ShapeAssembler::new(points))
}

/// Replaces the `shapes` tree of the sink with one GeoJSON file per shape.
/// Returns the number of shapes written.
pub fn write_shapes(source: &RowSource, sink: &FileSink) -> Result<usize, Error> {
    sink.clear(SHAPES_DIR)?;

    let mut written = 0;
    for shape in read_shapes(source)? {
        let shape = shape?;
        info!("Working on {}", shape.id);
        let feature = geojson::shape_feature(&shape);
        sink.write_json(shape.relative_path()?, &feature)?;
        written += 1;
    }
    Ok(written)
}
