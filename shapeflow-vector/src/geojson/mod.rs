/*
This code is part of the Shapeflow geospatial I/O library.
Created: 12/03/2025
Last Modified: 14/06/2026
License: MIT

Notes: The bidirectional translator between the shapefile triple and
the GeoJSON Feature data model, including the ring split for
multi-part polylines and the DBF field inference.
*/
use crate::error::ShapeError;
use crate::options::ReaderOptions;
use crate::shapefile::attributes::{AttributeField, FieldData};
use crate::shapefile::geometry::{MultiPoint, PolyLine, Polygon, Shape, ShapeType};
use crate::shapefile::{Reader, Writer};
use crate::validator::{DefaultValidator, Validate};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shapeflow_common::structures::Point2D;
use std::io::Write;

/// One coordinate: `[x, y]` or `[x, y, z]`.
pub type Position = Vec<f64>;

/// A GeoJSON geometry, tagged by its `type` member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<Geometry> },
}

impl Geometry {
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point { .. } => "Point",
            Geometry::MultiPoint { .. } => "MultiPoint",
            Geometry::LineString { .. } => "LineString",
            Geometry::MultiLineString { .. } => "MultiLineString",
            Geometry::Polygon { .. } => "Polygon",
            Geometry::MultiPolygon { .. } => "MultiPolygon",
            Geometry::GeometryCollection { .. } => "GeometryCollection",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub feature_type: String,
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new(geometry: Option<Geometry>, properties: Map<String, Value>) -> Feature {
        Feature {
            feature_type: "Feature".to_string(),
            geometry,
            properties,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub collection_type: String,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> FeatureCollection {
        FeatureCollection {
            collection_type: "FeatureCollection".to_string(),
            features,
        }
    }
}

/// Translates one shape to a GeoJSON geometry. `Null` shapes map to a
/// null geometry; Z values populate the third coordinate slot and M
/// values are discarded. Multipatch translation is incomplete and
/// yields an empty `GeometryCollection`.
pub fn shape_to_geometry(shape: &Shape) -> Result<Option<Geometry>, ShapeError> {
    let geometry = match shape {
        Shape::Null => return Ok(None),

        Shape::Point(p) => Geometry::Point {
            coordinates: vec![p.x, p.y],
        },
        Shape::PointM(p) => Geometry::Point {
            coordinates: vec![p.x, p.y],
        },
        Shape::PointZ(p) => Geometry::Point {
            coordinates: vec![p.x, p.y, p.z],
        },

        Shape::MultiPoint(s) => Geometry::MultiPoint {
            coordinates: positions(&s.points, None),
        },
        Shape::MultiPointM(s) => Geometry::MultiPoint {
            coordinates: positions(&s.points, None),
        },
        Shape::MultiPointZ(s) => Geometry::MultiPoint {
            coordinates: positions(&s.points, Some(&s.z_array)),
        },

        Shape::PolyLine(s) => line_geometry(&s.parts, &s.points, None)?,
        Shape::PolyLineM(s) => line_geometry(&s.parts, &s.points, None)?,
        Shape::PolyLineZ(s) => line_geometry(&s.parts, &s.points, Some(&s.z_array))?,

        Shape::Polygon(s) => polygon_geometry(&s.parts, &s.points, None)?,
        Shape::PolygonM(s) => polygon_geometry(&s.parts, &s.points, None)?,
        Shape::PolygonZ(s) => polygon_geometry(&s.parts, &s.points, Some(&s.z_array))?,

        Shape::MultiPatch(_) => Geometry::GeometryCollection { geometries: vec![] },
    };
    Ok(Some(geometry))
}

fn positions(points: &[Point2D], z: Option<&[f64]>) -> Vec<Position> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| match z {
            Some(z) => vec![p.x, p.y, z.get(i).copied().unwrap_or(0.0)],
            None => vec![p.x, p.y],
        })
        .collect()
}

/// The half-open point ranges of each part, clamped to the points
/// array so malformed part indices cannot panic.
fn part_ranges(parts: &[i32], num_points: usize) -> Vec<(usize, usize)> {
    let mut ranges = Vec::with_capacity(parts.len());
    for (i, &start) in parts.iter().enumerate() {
        let start = (start.max(0) as usize).min(num_points);
        let end = match parts.get(i + 1) {
            Some(&next) => (next.max(0) as usize).min(num_points),
            None => num_points,
        };
        ranges.push((start, end.max(start)));
    }
    ranges
}

/// One part becomes a `LineString`, several become a
/// `MultiLineString` with one line per part.
fn line_geometry(
    parts: &[i32],
    points: &[Point2D],
    z: Option<&[f64]>,
) -> Result<Geometry, ShapeError> {
    if parts.is_empty() {
        return Err(ShapeError::InvalidFormat(
            "polyline record has no parts".to_string(),
        ));
    }
    if parts.len() == 1 {
        return Ok(Geometry::LineString {
            coordinates: positions(points, z),
        });
    }
    let mut lines = Vec::with_capacity(parts.len());
    for (start, end) in part_ranges(parts, points.len()) {
        let zs = z.map(|z| &z[start.min(z.len())..end.min(z.len())]);
        lines.push(positions(&points[start..end], zs));
    }
    Ok(Geometry::MultiLineString { coordinates: lines })
}

/// Every shapefile part is emitted as one ring of a single `Polygon`,
/// in storage order; no hole assignment or MultiPolygon promotion is
/// attempted.
fn polygon_geometry(
    parts: &[i32],
    points: &[Point2D],
    z: Option<&[f64]>,
) -> Result<Geometry, ShapeError> {
    if parts.is_empty() {
        return Err(ShapeError::InvalidFormat(
            "polygon record has no parts".to_string(),
        ));
    }
    let mut rings = Vec::with_capacity(parts.len());
    for (start, end) in part_ranges(parts, points.len()) {
        let zs = z.map(|z| &z[start.min(z.len())..end.min(z.len())]);
        rings.push(positions(&points[start..end], zs));
    }
    Ok(Geometry::Polygon {
        coordinates: rings,
    })
}

/// Parses one DBF cell into a JSON property value: integer, float and
/// boolean literals are recognized in that order, anything else stays
/// a string, and empty cells become null.
pub fn parse_attribute(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = cell.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = cell.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    match cell {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(cell.to_string()),
    }
}

/// Selects the file-level shape type from a feature's geometry.
fn infer_shape_type(geometry: &Geometry) -> Result<ShapeType, ShapeError> {
    match geometry {
        Geometry::Point { .. } => Ok(ShapeType::Point),
        Geometry::MultiPoint { .. } => Ok(ShapeType::MultiPoint),
        Geometry::LineString { .. } | Geometry::MultiLineString { .. } => Ok(ShapeType::PolyLine),
        Geometry::Polygon { .. } | Geometry::MultiPolygon { .. } => Ok(ShapeType::Polygon),
        Geometry::GeometryCollection { .. } => Err(ShapeError::InvalidFormat(
            "cannot infer a shapefile type from a GeometryCollection".to_string(),
        )),
    }
}

/// Derives the DBF schema from a property map. Fields are emitted in
/// sorted name order for reproducibility; names are truncated to the
/// ten characters the DBF descriptor allows.
pub fn infer_fields(properties: &Map<String, Value>) -> Vec<AttributeField> {
    let mut names: Vec<&String> = properties.keys().collect();
    names.sort();
    let mut fields = Vec::with_capacity(names.len());
    for name in names {
        let value = &properties[name];
        let field_name: String = name.chars().take(10).collect();
        let field = match value {
            Value::String(s) => {
                AttributeField::character(&field_name, s.len().clamp(1, 254) as u8)
            }
            Value::Number(n) if n.is_i64() || n.is_u64() => {
                AttributeField::numeric(&field_name, 10)
            }
            Value::Number(_) => AttributeField::float(&field_name, 15, 6),
            Value::Bool(_) => AttributeField::character(&field_name, 1),
            _ => AttributeField::character(&field_name, 50),
        };
        fields.push(field);
    }
    fields
}

fn field_value_for(value: &Value) -> Option<FieldData> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(FieldData::Text(s.clone())),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(FieldData::Int(i))
            } else {
                n.as_f64().map(FieldData::Real)
            }
        }
        Value::Bool(b) => Some(FieldData::Text(
            (if *b { "T" } else { "F" }).to_string(),
        )),
        other => Some(FieldData::Text(other.to_string())),
    }
}

/// Finds a property for a declared field, falling back to matching by
/// the field's (possibly truncated) name.
fn lookup_property<'a>(properties: &'a Map<String, Value>, field_name: &str) -> Option<&'a Value> {
    if let Some(v) = properties.get(field_name) {
        return Some(v);
    }
    properties
        .iter()
        .find(|(name, _)| name.chars().take(10).collect::<String>() == field_name)
        .map(|(_, v)| v)
}

/// Translates a GeoJSON geometry to a shape compatible with the
/// file-level shape type, dropping any third coordinate.
pub fn geometry_to_shape(geometry: &Geometry, file_type: ShapeType) -> Result<Shape, ShapeError> {
    let mismatch = || {
        ShapeError::InvalidFormat(format!(
            "geometry type {} does not fit shapefile type {}",
            geometry.type_name(),
            file_type
        ))
    };
    match geometry {
        Geometry::Point { coordinates } => {
            if file_type != ShapeType::Point {
                return Err(mismatch());
            }
            Ok(Shape::Point(point_of(coordinates)?))
        }
        Geometry::MultiPoint { coordinates } => {
            if file_type != ShapeType::MultiPoint {
                return Err(mismatch());
            }
            Ok(Shape::MultiPoint(MultiPoint::new(points_of(coordinates)?)))
        }
        Geometry::LineString { coordinates } => {
            if file_type != ShapeType::PolyLine {
                return Err(mismatch());
            }
            Ok(Shape::PolyLine(PolyLine::new(&[points_of(coordinates)?])))
        }
        Geometry::MultiLineString { coordinates } => {
            if file_type != ShapeType::PolyLine {
                return Err(mismatch());
            }
            let mut parts = Vec::with_capacity(coordinates.len());
            for line in coordinates {
                parts.push(points_of(line)?);
            }
            Ok(Shape::PolyLine(PolyLine::new(&parts)))
        }
        Geometry::Polygon { coordinates } => {
            if file_type != ShapeType::Polygon {
                return Err(mismatch());
            }
            let mut rings = Vec::with_capacity(coordinates.len());
            for ring in coordinates {
                rings.push(points_of(ring)?);
            }
            Ok(Shape::Polygon(Polygon::new(&rings)))
        }
        Geometry::MultiPolygon { coordinates } => {
            if file_type != ShapeType::Polygon {
                return Err(mismatch());
            }
            // every ring of every polygon becomes one part
            let mut rings = Vec::new();
            for polygon in coordinates {
                for ring in polygon {
                    rings.push(points_of(ring)?);
                }
            }
            Ok(Shape::Polygon(Polygon::new(&rings)))
        }
        Geometry::GeometryCollection { .. } => Err(mismatch()),
    }
}

fn point_of(position: &Position) -> Result<Point2D, ShapeError> {
    if position.len() < 2 {
        return Err(ShapeError::InvalidFormat(
            "coordinate needs at least two elements".to_string(),
        ));
    }
    Ok(Point2D::new(position[0], position[1]))
}

fn points_of(positions: &[Position]) -> Result<Vec<Point2D>, ShapeError> {
    positions.iter().map(point_of).collect()
}

/// Reads an entire shapefile into a `FeatureCollection`.
pub fn shapefile_to_geojson(file_name: &str) -> Result<FeatureCollection, ShapeError> {
    shapefile_to_geojson_with_options(file_name, ReaderOptions::default())
}

pub fn shapefile_to_geojson_with_options(
    file_name: &str,
    options: ReaderOptions,
) -> Result<FeatureCollection, ShapeError> {
    let mut reader = Reader::open_with_options(file_name, options)?;
    let fields = reader.fields().to_vec();
    let mut features = Vec::new();
    while reader.next() {
        match feature_from_current(&mut reader, &fields) {
            Ok(feature) => features.push(feature),
            Err(e) => warn!("skipping untranslatable record: {}", e),
        }
    }
    reader.close()?;
    Ok(FeatureCollection::new(features))
}

fn feature_from_current(
    reader: &mut Reader,
    fields: &[AttributeField],
) -> Result<Feature, ShapeError> {
    let row = reader.current_index();
    let mut properties = Map::new();
    for (i, field) in fields.iter().enumerate() {
        let cell = reader.read_attribute(row, i);
        properties.insert(field.name.clone(), parse_attribute(&cell));
    }
    let (_, shape) = reader.shape();
    let geometry = shape_to_geometry(shape)?;
    Ok(Feature::new(geometry, properties))
}

/// Writes a `FeatureCollection` out as a shapefile triple. The first
/// feature picks the file-level shape type and the DBF schema;
/// features that do not fit are skipped with a diagnostic.
pub fn geojson_to_shapefile(
    collection: &FeatureCollection,
    file_name: &str,
) -> Result<(), ShapeError> {
    if collection.collection_type != "FeatureCollection" || collection.features.is_empty() {
        return Err(ShapeError::InvalidFormat(
            "GeoJSON must be a FeatureCollection with at least one feature".to_string(),
        ));
    }
    let first_geometry = collection.features[0]
        .geometry
        .as_ref()
        .ok_or_else(|| ShapeError::InvalidFormat("first feature has no geometry".to_string()))?;
    let shape_type = infer_shape_type(first_geometry)?;
    // the first feature must be translatable
    geometry_to_shape(first_geometry, shape_type)?;

    let mut writer = Writer::create(file_name, shape_type)?;
    let fields = infer_fields(&collection.features[0].properties);
    writer.set_fields(fields.clone())?;

    let validator = DefaultValidator;
    for feature in &collection.features {
        let geometry = match &feature.geometry {
            Some(g) => g,
            None => {
                warn!("skipping feature without geometry");
                continue;
            }
        };
        let shape = match geometry_to_shape(geometry, shape_type) {
            Ok(s) => s,
            Err(e) => {
                warn!("skipping feature: {}", e);
                continue;
            }
        };
        if let Err(e) = validator.validate(&shape) {
            warn!("skipping invalid feature: {}", e);
            continue;
        }
        let row = writer.write(&shape)? as usize;
        for (j, field) in fields.iter().enumerate() {
            let value = match lookup_property(&feature.properties, &field.name) {
                Some(v) => v,
                None => continue, // missing property keeps the blank cell
            };
            if let Some(data) = field_value_for(value) {
                if let Err(e) = writer.write_attribute(row, j, &data) {
                    warn!("attribute {:?} of row {} not written: {}", field.name, row, e);
                }
            }
        }
    }
    writer.close()
}

/// Streams a shapefile to a GeoJSON byte sink without accumulating the
/// feature list; memory use is bounded by the largest single geometry.
pub fn shapefile_to_geojson_stream<W: Write>(
    file_name: &str,
    sink: &mut W,
) -> Result<(), ShapeError> {
    shapefile_to_geojson_stream_with_options(file_name, sink, ReaderOptions::default())
}

pub fn shapefile_to_geojson_stream_with_options<W: Write>(
    file_name: &str,
    sink: &mut W,
    options: ReaderOptions,
) -> Result<(), ShapeError> {
    let mut reader = Reader::open_with_options(file_name, options)?;
    let fields = reader.fields().to_vec();
    sink.write_all(b"{\"type\":\"FeatureCollection\",\"features\":[")?;
    let mut first = true;
    while reader.next() {
        let feature = match feature_from_current(&mut reader, &fields) {
            Ok(feature) => feature,
            Err(e) => {
                warn!("skipping untranslatable record: {}", e);
                continue;
            }
        };
        if !first {
            sink.write_all(b",")?;
        }
        serde_json::to_writer(&mut *sink, &feature)?;
        first = false;
    }
    sink.write_all(b"]}")?;
    reader.close()
}
