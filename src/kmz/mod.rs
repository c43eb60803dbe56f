//! Decoding of the KMZ route maps published for each route pattern.
//!
//! A route map is a zip archive holding a single `doc.kml`:
//!
//! ```text
//! kml
//! └── Document
//!     └── Folder
//!         └── Placemark   (name, Style/LineStyle, MultiGeometry of LineStrings)
//! ```
//!
//! Each level must hold exactly one feature. Anything else is reported as
//! [`Error::Structure`]; the decoder does not search for the "right" one.

pub mod error;

pub use error::Error;

use crate::geojson::round6;

use geo_types::{coord, Coord, LineString, MultiLineString};
use roxmltree::{Document, Node};
use std::io::{Cursor, Read};
use zip::{result::ZipError, ZipArchive};

/// Path of the KML document inside a KMZ archive
pub const DOC_KML: &str = "doc.kml";

/// KML feature elements counted when checking that a container has exactly
/// one child.
const FEATURE_TAGS: [&str; 7] = [
    "Document",
    "Folder",
    "Placemark",
    "NetworkLink",
    "GroundOverlay",
    "ScreenOverlay",
    "PhotoOverlay",
];

/// KML default for a LineStyle without `<color>`, opaque white
const DEFAULT_LINE_COLOR: &str = "ffffffff";
const DEFAULT_LINE_WIDTH: f64 = 1.0;

/// Limit on StyleMap to Style indirections
const MAX_STYLE_DEPTH: usize = 4;

/// The line of a route pattern map with its style.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTrack {
    pub name: String,
    /// `#RRGGBB`
    pub stroke_color: String,
    pub stroke_width: f64,
    /// Coordinates rounded to 6 decimal places, in document order
    pub geometry: MultiLineString<f64>,
}

/// Decodes the bytes of a KMZ archive.
pub fn decode(bytes: &[u8]) -> Result<DecodedTrack, Error> {
    let kml = read_doc_kml(bytes)?;
    decode_kml(&kml)
}

/// Extracts `doc.kml` from a KMZ archive.
pub fn read_doc_kml(bytes: &[u8]) -> Result<String, Error> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::ArchiveFormat(format!("not a zip archive: {}", e)))?;
    let mut doc = archive.by_name(DOC_KML).map_err(|e| match e {
        ZipError::FileNotFound => Error::ArchiveFormat(format!("no {} in archive", DOC_KML)),
        e => Error::ArchiveFormat(e.to_string()),
    })?;

    let mut kml = String::new();
    doc.read_to_string(&mut kml)
        .map_err(|e| Error::ArchiveFormat(format!("unreadable {}: {}", DOC_KML, e)))?;
    Ok(kml)
}

/// Decodes a KML document holding a single placemark.
pub fn decode_kml(kml: &str) -> Result<DecodedTrack, Error> {
    let doc = Document::parse(kml)?;
    let placemark = find_placemark(&doc)?;

    let name = child_text(placemark, "name")
        .unwrap_or_default()
        .trim()
        .to_owned();

    let line_style = find_line_style(&doc, placemark)
        .ok_or_else(|| Error::MissingLineStyle(name.clone()))?;
    let color = child_text(line_style, "color")
        .map(str::trim)
        .unwrap_or(DEFAULT_LINE_COLOR);
    let stroke_width = match child_text(line_style, "width") {
        Some(width) => width.trim().parse::<f64>().map_err(|_| {
            Error::Structure(format!("LineStyle width '{}' is not a number", width))
        })?,
        None => DEFAULT_LINE_WIDTH,
    };

    Ok(DecodedTrack {
        name,
        stroke_color: kml_color_to_hex(color),
        stroke_width,
        geometry: placemark_geometry(placemark)?,
    })
}

/// KML colors are `aabbggrr`. The alpha byte is dropped; the remaining six
/// characters are kept as-is, channels are not swapped.
pub fn kml_color_to_hex(color: &str) -> String {
    format!("#{}", color.get(2..).unwrap_or_default())
}

fn find_placemark<'a, 'input>(doc: &'a Document<'input>) -> Result<Node<'a, 'input>, Error> {
    let root = doc.root_element();
    if !root.has_tag_name("kml") {
        return Err(Error::Structure(format!(
            "root element is <{}>, expected <kml>",
            root.tag_name().name()
        )));
    }
    let document = only_feature(root, "Document")?;
    let folder = only_feature(document, "Folder")?;
    only_feature(folder, "Placemark")
}

/// The single feature child of `parent`, which must be a `expected` element.
fn only_feature<'a, 'input>(
    parent: Node<'a, 'input>,
    expected: &str,
) -> Result<Node<'a, 'input>, Error> {
    let mut features = parent
        .children()
        .filter(|n| n.is_element() && FEATURE_TAGS.contains(&n.tag_name().name()));
    let found = match (features.next(), features.next()) {
        (Some(only), None) => only,
        (None, _) => {
            return Err(Error::Structure(format!(
                "<{}> has no <{}>",
                parent.tag_name().name(),
                expected
            )))
        }
        (Some(_), Some(_)) => {
            return Err(Error::Structure(format!(
                "<{}> has {} features, expected a single <{}>",
                parent.tag_name().name(),
                2 + features.count(),
                expected
            )))
        }
    };
    if !found.has_tag_name(expected) {
        return Err(Error::Structure(format!(
            "expected <{}> in <{}>, found <{}>",
            expected,
            parent.tag_name().name(),
            found.tag_name().name()
        )));
    }
    Ok(found)
}

fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(tag))
}

fn child_text<'a>(node: Node<'a, '_>, tag: &str) -> Option<&'a str> {
    child(node, tag).and_then(|n| n.text())
}

/// LineStyle of the placemark's first inline Style. Without an inline Style,
/// the LineStyle of the shared style its `styleUrl` points at.
fn find_line_style<'a, 'input>(
    doc: &'a Document<'input>,
    placemark: Node<'a, 'input>,
) -> Option<Node<'a, 'input>> {
    if let Some(style) = child(placemark, "Style") {
        return child(style, "LineStyle");
    }
    let url = child_text(placemark, "styleUrl")?;
    resolve_style_url(doc, url, 0)
}

fn resolve_style_url<'a, 'input>(
    doc: &'a Document<'input>,
    url: &str,
    depth: usize,
) -> Option<Node<'a, 'input>> {
    // Only styles of the same document can be resolved
    let id = url.trim().strip_prefix('#')?;
    let target = doc
        .descendants()
        .find(|n| n.is_element() && n.attribute("id") == Some(id))?;

    if target.has_tag_name("Style") {
        return child(target, "LineStyle");
    }
    if target.has_tag_name("StyleMap") && depth < MAX_STYLE_DEPTH {
        let normal = target
            .children()
            .filter(|n| n.has_tag_name("Pair"))
            .find(|pair| child_text(*pair, "key").map(str::trim) == Some("normal"))?;
        if let Some(style) = child(normal, "Style") {
            return child(style, "LineStyle");
        }
        return resolve_style_url(doc, child_text(normal, "styleUrl")?, depth + 1);
    }
    None
}

fn placemark_geometry(placemark: Node) -> Result<MultiLineString<f64>, Error> {
    if let Some(multi) = child(placemark, "MultiGeometry") {
        let lines = multi
            .children()
            .filter(|n| n.is_element())
            .map(|geometry| {
                if geometry.has_tag_name("LineString") {
                    line_string(geometry)
                } else {
                    Err(Error::Structure(format!(
                        "unexpected <{}> in MultiGeometry",
                        geometry.tag_name().name()
                    )))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(MultiLineString::new(lines));
    }
    if let Some(line) = child(placemark, "LineString") {
        return Ok(MultiLineString::new(vec![line_string(line)?]));
    }
    Err(Error::Structure(
        "placemark has no MultiGeometry or LineString".to_owned(),
    ))
}

fn line_string(node: Node) -> Result<LineString<f64>, Error> {
    child_text(node, "coordinates")
        .unwrap_or_default()
        .split_whitespace()
        .map(parse_coordinate)
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

/// Parses a `lon,lat[,alt]` tuple, dropping the altitude.
fn parse_coordinate(tuple: &str) -> Result<Coord<f64>, Error> {
    let mut parts = tuple.split(',').map(|p| p.trim().parse::<f64>());
    match (parts.next(), parts.next()) {
        (Some(Ok(x)), Some(Ok(y))) => Ok(coord! { x: round6(x), y: round6(y) }),
        _ => Err(Error::InvalidCoordinate(tuple.to_owned())),
    }
}
