/*
This code is part of the Shapeflow geospatial I/O library.
Created: 21/02/2025
Last Modified: 14/06/2026
License: MIT

Notes: The thirteen shape variants of the ESRI Shapefile main file, their
wire codec, and the per-variant content-length arithmetic.
*/
use crate::error::ShapeError;
use shapeflow_common::structures::{BoundingBox, Point2D};
use shapeflow_common::utils::{ByteOrderReader, ByteOrderWriter, Endianness};
use std::fmt;
use std::io;
use std::io::{Read, Seek, Write};

/// The shape-type tag, persisted on disk as a little-endian i32. Any
/// other value is rejected.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShapeType {
    Null = 0,
    Point = 1,
    PolyLine = 3,
    Polygon = 5,
    MultiPoint = 8,
    PointZ = 11,
    PolyLineZ = 13,
    PolygonZ = 15,
    MultiPointZ = 18,
    PointM = 21,
    PolyLineM = 23,
    PolygonM = 25,
    MultiPointM = 28,
    MultiPatch = 31,
}

impl ShapeType {
    pub fn from_int(value: i32) -> Result<ShapeType, ShapeError> {
        match value {
            0 => Ok(ShapeType::Null),
            1 => Ok(ShapeType::Point),
            3 => Ok(ShapeType::PolyLine),
            5 => Ok(ShapeType::Polygon),
            8 => Ok(ShapeType::MultiPoint),
            11 => Ok(ShapeType::PointZ),
            13 => Ok(ShapeType::PolyLineZ),
            15 => Ok(ShapeType::PolygonZ),
            18 => Ok(ShapeType::MultiPointZ),
            21 => Ok(ShapeType::PointM),
            23 => Ok(ShapeType::PolyLineM),
            25 => Ok(ShapeType::PolygonM),
            28 => Ok(ShapeType::MultiPointM),
            31 => Ok(ShapeType::MultiPatch),
            _ => Err(ShapeError::UnsupportedType(value)),
        }
    }

    pub fn is_known(value: i32) -> bool {
        ShapeType::from_int(value).is_ok()
    }

    pub fn to_int(&self) -> i32 {
        *self as i32
    }

    /// Collapses the Z and M refinements onto the plain variant.
    pub fn base_shape_type(&self) -> ShapeType {
        match self {
            ShapeType::Null => ShapeType::Null,
            ShapeType::Point | ShapeType::PointZ | ShapeType::PointM => ShapeType::Point,
            ShapeType::PolyLine | ShapeType::PolyLineZ | ShapeType::PolyLineM => {
                ShapeType::PolyLine
            }
            ShapeType::Polygon | ShapeType::PolygonZ | ShapeType::PolygonM => ShapeType::Polygon,
            ShapeType::MultiPoint | ShapeType::MultiPointZ | ShapeType::MultiPointM => {
                ShapeType::MultiPoint
            }
            ShapeType::MultiPatch => ShapeType::MultiPatch,
        }
    }

    pub fn dimension(&self) -> ShapeTypeDimension {
        match self {
            ShapeType::Null
            | ShapeType::Point
            | ShapeType::PolyLine
            | ShapeType::Polygon
            | ShapeType::MultiPoint => ShapeTypeDimension::XY,
            ShapeType::PointM
            | ShapeType::PolyLineM
            | ShapeType::PolygonM
            | ShapeType::MultiPointM => ShapeTypeDimension::Measure,
            ShapeType::PointZ
            | ShapeType::PolyLineZ
            | ShapeType::PolygonZ
            | ShapeType::MultiPointZ
            | ShapeType::MultiPatch => ShapeTypeDimension::Z,
        }
    }
}

impl Default for ShapeType {
    fn default() -> ShapeType {
        ShapeType::Null
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let printable = match *self {
            ShapeType::Null => "Null",
            ShapeType::Point => "Point",
            ShapeType::PolyLine => "PolyLine",
            ShapeType::Polygon => "Polygon",
            ShapeType::MultiPoint => "MultiPoint",
            ShapeType::PointZ => "PointZ",
            ShapeType::PolyLineZ => "PolyLineZ",
            ShapeType::PolygonZ => "PolygonZ",
            ShapeType::MultiPointZ => "MultiPointZ",
            ShapeType::PointM => "PointM",
            ShapeType::PolyLineM => "PolyLineM",
            ShapeType::PolygonM => "PolygonM",
            ShapeType::MultiPointM => "MultiPointM",
            ShapeType::MultiPatch => "MultiPatch",
        };
        write!(f, "{}", printable)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShapeTypeDimension {
    XY,
    Measure,
    Z,
}

/// Multipatch part-type codes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PartType {
    TriangleStrip = 0,
    TriangleFan = 1,
    OuterRing = 2,
    InnerRing = 3,
    FirstRing = 4,
    Ring = 5,
}

impl PartType {
    pub fn from_int(value: i32) -> Result<PartType, ShapeError> {
        match value {
            0 => Ok(PartType::TriangleStrip),
            1 => Ok(PartType::TriangleFan),
            2 => Ok(PartType::OuterRing),
            3 => Ok(PartType::InnerRing),
            4 => Ok(PartType::FirstRing),
            5 => Ok(PartType::Ring),
            _ => Err(ShapeError::CorruptedFile(format!(
                "unknown multipatch part type: {}",
                value
            ))),
        }
    }

    pub fn to_int(&self) -> i32 {
        *self as i32
    }
}

/// Maps an I/O failure inside a record payload to `CorruptedFile`.
pub(crate) trait RecordRead<T> {
    fn in_record(self) -> Result<T, ShapeError>;
}

impl<T> RecordRead<T> for io::Result<T> {
    fn in_record(self) -> Result<T, ShapeError> {
        self.map_err(|e| ShapeError::CorruptedFile(format!("short read in record payload: {}", e)))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointM {
    pub x: f64,
    pub y: f64,
    pub m: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointZ {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// The measure is optional on disk even for Z shapes.
    pub m: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultiPoint {
    pub bbox: BoundingBox,
    pub points: Vec<Point2D>,
}

impl MultiPoint {
    pub fn new(points: Vec<Point2D>) -> MultiPoint {
        MultiPoint {
            bbox: BoundingBox::from_points(&points),
            points,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultiPointM {
    pub bbox: BoundingBox,
    pub points: Vec<Point2D>,
    pub m_range: [f64; 2],
    pub m_array: Vec<f64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultiPointZ {
    pub bbox: BoundingBox,
    pub points: Vec<Point2D>,
    pub z_range: [f64; 2],
    pub z_array: Vec<f64>,
    pub m_range: Option<[f64; 2]>,
    pub m_array: Vec<f64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolyLine {
    pub bbox: BoundingBox,
    /// Start index of each part; strictly increasing, first at 0.
    pub parts: Vec<i32>,
    pub points: Vec<Point2D>,
}

impl PolyLine {
    /// Builds a polyline from one point sequence per part.
    pub fn new(part_points: &[Vec<Point2D>]) -> PolyLine {
        let (bbox, parts, points) = build_parts(part_points);
        PolyLine {
            bbox,
            parts,
            points,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolyLineM {
    pub bbox: BoundingBox,
    pub parts: Vec<i32>,
    pub points: Vec<Point2D>,
    pub m_range: [f64; 2],
    pub m_array: Vec<f64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolyLineZ {
    pub bbox: BoundingBox,
    pub parts: Vec<i32>,
    pub points: Vec<Point2D>,
    pub z_range: [f64; 2],
    pub z_array: Vec<f64>,
    pub m_range: Option<[f64; 2]>,
    pub m_array: Vec<f64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polygon {
    pub bbox: BoundingBox,
    /// One ring per part. Outer rings are stored clockwise, holes
    /// counter-clockwise; the codec does not enforce orientation.
    pub parts: Vec<i32>,
    pub points: Vec<Point2D>,
}

impl Polygon {
    pub fn new(rings: &[Vec<Point2D>]) -> Polygon {
        let (bbox, parts, points) = build_parts(rings);
        Polygon {
            bbox,
            parts,
            points,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolygonM {
    pub bbox: BoundingBox,
    pub parts: Vec<i32>,
    pub points: Vec<Point2D>,
    pub m_range: [f64; 2],
    pub m_array: Vec<f64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolygonZ {
    pub bbox: BoundingBox,
    pub parts: Vec<i32>,
    pub points: Vec<Point2D>,
    pub z_range: [f64; 2],
    pub z_array: Vec<f64>,
    pub m_range: Option<[f64; 2]>,
    pub m_array: Vec<f64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultiPatch {
    pub bbox: BoundingBox,
    pub parts: Vec<i32>,
    pub part_types: Vec<PartType>,
    pub points: Vec<Point2D>,
    pub z_range: [f64; 2],
    pub z_array: Vec<f64>,
    pub m_range: Option<[f64; 2]>,
    pub m_array: Vec<f64>,
}

/// A single record's geometry. Each variant owns its payload; dispatch
/// happens by matching on the enum.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Null,
    Point(Point2D),
    PointM(PointM),
    PointZ(PointZ),
    MultiPoint(MultiPoint),
    MultiPointM(MultiPointM),
    MultiPointZ(MultiPointZ),
    PolyLine(PolyLine),
    PolyLineM(PolyLineM),
    PolyLineZ(PolyLineZ),
    Polygon(Polygon),
    PolygonM(PolygonM),
    PolygonZ(PolygonZ),
    MultiPatch(MultiPatch),
}

impl Default for Shape {
    fn default() -> Shape {
        Shape::Null
    }
}

impl Shape {
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Shape::Null => ShapeType::Null,
            Shape::Point(_) => ShapeType::Point,
            Shape::PointM(_) => ShapeType::PointM,
            Shape::PointZ(_) => ShapeType::PointZ,
            Shape::MultiPoint(_) => ShapeType::MultiPoint,
            Shape::MultiPointM(_) => ShapeType::MultiPointM,
            Shape::MultiPointZ(_) => ShapeType::MultiPointZ,
            Shape::PolyLine(_) => ShapeType::PolyLine,
            Shape::PolyLineM(_) => ShapeType::PolyLineM,
            Shape::PolyLineZ(_) => ShapeType::PolyLineZ,
            Shape::Polygon(_) => ShapeType::Polygon,
            Shape::PolygonM(_) => ShapeType::PolygonM,
            Shape::PolygonZ(_) => ShapeType::PolygonZ,
            Shape::MultiPatch(_) => ShapeType::MultiPatch,
        }
    }

    pub fn bbox(&self) -> BoundingBox {
        match self {
            Shape::Null => BoundingBox::default(),
            Shape::Point(p) => BoundingBox::new(p.x, p.y, p.x, p.y),
            Shape::PointM(p) => BoundingBox::new(p.x, p.y, p.x, p.y),
            Shape::PointZ(p) => BoundingBox::new(p.x, p.y, p.x, p.y),
            Shape::MultiPoint(s) => s.bbox,
            Shape::MultiPointM(s) => s.bbox,
            Shape::MultiPointZ(s) => s.bbox,
            Shape::PolyLine(s) => s.bbox,
            Shape::PolyLineM(s) => s.bbox,
            Shape::PolyLineZ(s) => s.bbox,
            Shape::Polygon(s) => s.bbox,
            Shape::PolygonM(s) => s.bbox,
            Shape::PolygonZ(s) => s.bbox,
            Shape::MultiPatch(s) => s.bbox,
        }
    }

    /// Record content length in 16-bit words, including the shape-type
    /// tag. This is what the record header and the index entry carry.
    pub fn content_length(&self) -> i32 {
        match self {
            Shape::Null => 2,
            Shape::Point(_) => 10,
            Shape::PointM(_) => 14,
            Shape::PointZ(p) => {
                if p.m.is_some() {
                    18
                } else {
                    16
                }
            }
            Shape::MultiPoint(s) => 20 + 8 * s.points.len() as i32,
            Shape::MultiPointM(s) => 28 + 12 * s.points.len() as i32,
            Shape::MultiPointZ(s) => {
                let n = s.points.len() as i32;
                if s.m_range.is_some() {
                    36 + 16 * n
                } else {
                    28 + 12 * n
                }
            }
            Shape::PolyLine(s) => 22 + 2 * s.parts.len() as i32 + 8 * s.points.len() as i32,
            Shape::Polygon(s) => 22 + 2 * s.parts.len() as i32 + 8 * s.points.len() as i32,
            Shape::PolyLineM(s) => 30 + 2 * s.parts.len() as i32 + 12 * s.points.len() as i32,
            Shape::PolygonM(s) => 30 + 2 * s.parts.len() as i32 + 12 * s.points.len() as i32,
            Shape::PolyLineZ(s) => poly_z_length(s.parts.len(), s.points.len(), s.m_range.is_some()),
            Shape::PolygonZ(s) => poly_z_length(s.parts.len(), s.points.len(), s.m_range.is_some()),
            Shape::MultiPatch(s) => {
                let p = s.parts.len() as i32;
                let n = s.points.len() as i32;
                if s.m_range.is_some() {
                    38 + 4 * p + 16 * n
                } else {
                    30 + 4 * p + 12 * n
                }
            }
        }
    }

    /// Decodes the payload of a record whose shape-type tag has already
    /// been consumed. `content_len` is the record content length in
    /// bytes (tag included); Z variants use it to detect whether the
    /// optional measure plane is present.
    pub fn read<R: Read + Seek>(
        shape_type: ShapeType,
        content_len: i32,
        bor: &mut ByteOrderReader<R>,
    ) -> Result<Shape, ShapeError> {
        bor.set_byte_order(Endianness::LittleEndian);
        match shape_type {
            ShapeType::Null => Ok(Shape::Null),

            ShapeType::Point => {
                if content_len < 20 {
                    return Err(invalid_point_length(content_len, shape_type));
                }
                Ok(Shape::Point(Point2D::new(
                    bor.read_f64().in_record()?,
                    bor.read_f64().in_record()?,
                )))
            }

            ShapeType::PointM => {
                if content_len < 28 {
                    return Err(invalid_point_length(content_len, shape_type));
                }
                Ok(Shape::PointM(PointM {
                    x: bor.read_f64().in_record()?,
                    y: bor.read_f64().in_record()?,
                    m: bor.read_f64().in_record()?,
                }))
            }

            ShapeType::PointZ => {
                if content_len < 28 {
                    return Err(invalid_point_length(content_len, shape_type));
                }
                let x = bor.read_f64().in_record()?;
                let y = bor.read_f64().in_record()?;
                let z = bor.read_f64().in_record()?;
                let m = if content_len >= 36 {
                    Some(bor.read_f64().in_record()?)
                } else {
                    None
                };
                Ok(Shape::PointZ(PointZ { x, y, z, m }))
            }

            ShapeType::MultiPoint => {
                let (bbox, n) = read_multipoint_header(bor)?;
                check_record_size(content_len, 40 + 16 * n as i64)?;
                Ok(Shape::MultiPoint(MultiPoint {
                    bbox,
                    points: read_points(bor, n).in_record()?,
                }))
            }

            ShapeType::MultiPointM => {
                let (bbox, n) = read_multipoint_header(bor)?;
                check_record_size(content_len, 40 + 16 * n as i64 + 16 + 8 * n as i64)?;
                let points = read_points(bor, n).in_record()?;
                let (m_range, m_array) = read_plane(bor, n).in_record()?;
                Ok(Shape::MultiPointM(MultiPointM {
                    bbox,
                    points,
                    m_range,
                    m_array,
                }))
            }

            ShapeType::MultiPointZ => {
                let (bbox, n) = read_multipoint_header(bor)?;
                let without_m = 40 + 16 * n as i64 + 16 + 8 * n as i64;
                check_record_size(content_len, without_m)?;
                let points = read_points(bor, n).in_record()?;
                let (z_range, z_array) = read_plane(bor, n).in_record()?;
                let (m_range, m_array) = if content_len as i64 >= without_m + 16 + 8 * n as i64 {
                    let (r, v) = read_plane(bor, n).in_record()?;
                    (Some(r), v)
                } else {
                    (None, vec![])
                };
                Ok(Shape::MultiPointZ(MultiPointZ {
                    bbox,
                    points,
                    z_range,
                    z_array,
                    m_range,
                    m_array,
                }))
            }

            ShapeType::PolyLine | ShapeType::Polygon => {
                let (bbox, p, n) = read_poly_header(bor)?;
                check_record_size(content_len, 44 + 4 * p as i64 + 16 * n as i64)?;
                let parts = read_parts(bor, p).in_record()?;
                let points = read_points(bor, n).in_record()?;
                if shape_type == ShapeType::PolyLine {
                    Ok(Shape::PolyLine(PolyLine {
                        bbox,
                        parts,
                        points,
                    }))
                } else {
                    Ok(Shape::Polygon(Polygon {
                        bbox,
                        parts,
                        points,
                    }))
                }
            }

            ShapeType::PolyLineM | ShapeType::PolygonM => {
                let (bbox, p, n) = read_poly_header(bor)?;
                check_record_size(
                    content_len,
                    44 + 4 * p as i64 + 16 * n as i64 + 16 + 8 * n as i64,
                )?;
                let parts = read_parts(bor, p).in_record()?;
                let points = read_points(bor, n).in_record()?;
                let (m_range, m_array) = read_plane(bor, n).in_record()?;
                if shape_type == ShapeType::PolyLineM {
                    Ok(Shape::PolyLineM(PolyLineM {
                        bbox,
                        parts,
                        points,
                        m_range,
                        m_array,
                    }))
                } else {
                    Ok(Shape::PolygonM(PolygonM {
                        bbox,
                        parts,
                        points,
                        m_range,
                        m_array,
                    }))
                }
            }

            ShapeType::PolyLineZ | ShapeType::PolygonZ => {
                let (bbox, p, n) = read_poly_header(bor)?;
                let without_m = 44 + 4 * p as i64 + 16 * n as i64 + 16 + 8 * n as i64;
                check_record_size(content_len, without_m)?;
                let parts = read_parts(bor, p).in_record()?;
                let points = read_points(bor, n).in_record()?;
                let (z_range, z_array) = read_plane(bor, n).in_record()?;
                let (m_range, m_array) = if content_len as i64 >= without_m + 16 + 8 * n as i64 {
                    let (r, v) = read_plane(bor, n).in_record()?;
                    (Some(r), v)
                } else {
                    (None, vec![])
                };
                if shape_type == ShapeType::PolyLineZ {
                    Ok(Shape::PolyLineZ(PolyLineZ {
                        bbox,
                        parts,
                        points,
                        z_range,
                        z_array,
                        m_range,
                        m_array,
                    }))
                } else {
                    Ok(Shape::PolygonZ(PolygonZ {
                        bbox,
                        parts,
                        points,
                        z_range,
                        z_array,
                        m_range,
                        m_array,
                    }))
                }
            }

            ShapeType::MultiPatch => {
                let (bbox, p, n) = read_poly_header(bor)?;
                let without_m =
                    44 + 8 * p as i64 + 16 * n as i64 + 16 + 8 * n as i64;
                check_record_size(content_len, without_m)?;
                let parts = read_parts(bor, p).in_record()?;
                let mut part_types = Vec::with_capacity(p as usize);
                for _ in 0..p {
                    part_types.push(PartType::from_int(bor.read_i32().in_record()?)?);
                }
                let points = read_points(bor, n).in_record()?;
                let (z_range, z_array) = read_plane(bor, n).in_record()?;
                let (m_range, m_array) = if content_len as i64 >= without_m + 16 + 8 * n as i64 {
                    let (r, v) = read_plane(bor, n).in_record()?;
                    (Some(r), v)
                } else {
                    (None, vec![])
                };
                Ok(Shape::MultiPatch(MultiPatch {
                    bbox,
                    parts,
                    part_types,
                    points,
                    z_range,
                    z_array,
                    m_range,
                    m_array,
                }))
            }
        }
    }

    /// Encodes the payload. The shape-type tag itself is written by the
    /// record framer, not here.
    pub fn write<W: Write + Seek>(&self, bow: &mut ByteOrderWriter<W>) -> Result<(), ShapeError> {
        bow.set_byte_order(Endianness::LittleEndian);
        match self {
            Shape::Null => {}

            Shape::Point(p) => {
                bow.write_f64(p.x)?;
                bow.write_f64(p.y)?;
            }

            Shape::PointM(p) => {
                bow.write_f64(p.x)?;
                bow.write_f64(p.y)?;
                bow.write_f64(p.m)?;
            }

            Shape::PointZ(p) => {
                bow.write_f64(p.x)?;
                bow.write_f64(p.y)?;
                bow.write_f64(p.z)?;
                if let Some(m) = p.m {
                    bow.write_f64(m)?;
                }
            }

            Shape::MultiPoint(s) => {
                write_bbox(bow, s.bbox)?;
                bow.write_i32(s.points.len() as i32)?;
                write_points(bow, &s.points)?;
            }

            Shape::MultiPointM(s) => {
                write_bbox(bow, s.bbox)?;
                bow.write_i32(s.points.len() as i32)?;
                write_points(bow, &s.points)?;
                write_plane(bow, s.m_range, &s.m_array)?;
            }

            Shape::MultiPointZ(s) => {
                write_bbox(bow, s.bbox)?;
                bow.write_i32(s.points.len() as i32)?;
                write_points(bow, &s.points)?;
                write_plane(bow, s.z_range, &s.z_array)?;
                if let Some(m_range) = s.m_range {
                    write_plane(bow, m_range, &s.m_array)?;
                }
            }

            Shape::PolyLine(s) => write_poly(bow, s.bbox, &s.parts, &s.points)?,
            Shape::Polygon(s) => write_poly(bow, s.bbox, &s.parts, &s.points)?,

            Shape::PolyLineM(s) => {
                write_poly(bow, s.bbox, &s.parts, &s.points)?;
                write_plane(bow, s.m_range, &s.m_array)?;
            }
            Shape::PolygonM(s) => {
                write_poly(bow, s.bbox, &s.parts, &s.points)?;
                write_plane(bow, s.m_range, &s.m_array)?;
            }

            Shape::PolyLineZ(s) => {
                write_poly(bow, s.bbox, &s.parts, &s.points)?;
                write_plane(bow, s.z_range, &s.z_array)?;
                if let Some(m_range) = s.m_range {
                    write_plane(bow, m_range, &s.m_array)?;
                }
            }
            Shape::PolygonZ(s) => {
                write_poly(bow, s.bbox, &s.parts, &s.points)?;
                write_plane(bow, s.z_range, &s.z_array)?;
                if let Some(m_range) = s.m_range {
                    write_plane(bow, m_range, &s.m_array)?;
                }
            }

            Shape::MultiPatch(s) => {
                write_bbox(bow, s.bbox)?;
                bow.write_i32(s.parts.len() as i32)?;
                bow.write_i32(s.points.len() as i32)?;
                for part in &s.parts {
                    bow.write_i32(*part)?;
                }
                for pt in &s.part_types {
                    bow.write_i32(pt.to_int())?;
                }
                write_points(bow, &s.points)?;
                write_plane(bow, s.z_range, &s.z_array)?;
                if let Some(m_range) = s.m_range {
                    write_plane(bow, m_range, &s.m_array)?;
                }
            }
        }
        Ok(())
    }
}

fn invalid_point_length(content_len: i32, shape_type: ShapeType) -> ShapeError {
    ShapeError::InvalidFormat(format!(
        "content length {} is invalid for a {} record",
        content_len, shape_type
    ))
}

fn check_record_size(content_len: i32, needed: i64) -> Result<(), ShapeError> {
    if (content_len as i64) < needed {
        return Err(ShapeError::CorruptedFile(format!(
            "record content length {} too small for declared counts",
            content_len
        )));
    }
    Ok(())
}

fn read_bbox<R: Read + Seek>(bor: &mut ByteOrderReader<R>) -> io::Result<BoundingBox> {
    Ok(BoundingBox::new(
        bor.read_f64()?,
        bor.read_f64()?,
        bor.read_f64()?,
        bor.read_f64()?,
    ))
}

fn write_bbox<W: Write + Seek>(bow: &mut ByteOrderWriter<W>, bbox: BoundingBox) -> io::Result<()> {
    bow.write_f64(bbox.min_x)?;
    bow.write_f64(bbox.min_y)?;
    bow.write_f64(bbox.max_x)?;
    bow.write_f64(bbox.max_y)
}

fn read_multipoint_header<R: Read + Seek>(
    bor: &mut ByteOrderReader<R>,
) -> Result<(BoundingBox, i32), ShapeError> {
    let bbox = read_bbox(bor).in_record()?;
    let num_points = bor.read_i32().in_record()?;
    if num_points < 0 {
        return Err(ShapeError::CorruptedFile(
            "negative point count in record".to_string(),
        ));
    }
    Ok((bbox, num_points))
}

fn read_poly_header<R: Read + Seek>(
    bor: &mut ByteOrderReader<R>,
) -> Result<(BoundingBox, i32, i32), ShapeError> {
    let bbox = read_bbox(bor).in_record()?;
    let num_parts = bor.read_i32().in_record()?;
    let num_points = bor.read_i32().in_record()?;
    if num_parts < 0 || num_points < 0 {
        return Err(ShapeError::CorruptedFile(
            "negative part or point count in record".to_string(),
        ));
    }
    Ok((bbox, num_parts, num_points))
}

fn read_parts<R: Read + Seek>(bor: &mut ByteOrderReader<R>, n: i32) -> io::Result<Vec<i32>> {
    let mut parts = Vec::with_capacity(n as usize);
    for _ in 0..n {
        parts.push(bor.read_i32()?);
    }
    Ok(parts)
}

fn read_points<R: Read + Seek>(bor: &mut ByteOrderReader<R>, n: i32) -> io::Result<Vec<Point2D>> {
    let mut points = Vec::with_capacity(n as usize);
    for _ in 0..n {
        points.push(Point2D::new(bor.read_f64()?, bor.read_f64()?));
    }
    Ok(points)
}

fn read_plane<R: Read + Seek>(
    bor: &mut ByteOrderReader<R>,
    n: i32,
) -> io::Result<([f64; 2], Vec<f64>)> {
    let range = [bor.read_f64()?, bor.read_f64()?];
    let mut values = Vec::with_capacity(n as usize);
    for _ in 0..n {
        values.push(bor.read_f64()?);
    }
    Ok((range, values))
}

fn write_points<W: Write + Seek>(
    bow: &mut ByteOrderWriter<W>,
    points: &[Point2D],
) -> io::Result<()> {
    for p in points {
        bow.write_f64(p.x)?;
        bow.write_f64(p.y)?;
    }
    Ok(())
}

fn write_poly<W: Write + Seek>(
    bow: &mut ByteOrderWriter<W>,
    bbox: BoundingBox,
    parts: &[i32],
    points: &[Point2D],
) -> io::Result<()> {
    write_bbox(bow, bbox)?;
    bow.write_i32(parts.len() as i32)?;
    bow.write_i32(points.len() as i32)?;
    for part in parts {
        bow.write_i32(*part)?;
    }
    write_points(bow, points)
}

fn write_plane<W: Write + Seek>(
    bow: &mut ByteOrderWriter<W>,
    range: [f64; 2],
    values: &[f64],
) -> io::Result<()> {
    bow.write_f64(range[0])?;
    bow.write_f64(range[1])?;
    for v in values {
        bow.write_f64(*v)?;
    }
    Ok(())
}

fn poly_z_length(parts: usize, points: usize, has_m: bool) -> i32 {
    let p = parts as i32;
    let n = points as i32;
    if has_m {
        38 + 2 * p + 16 * n
    } else {
        30 + 2 * p + 12 * n
    }
}

/// Flattens per-part point sequences into the contiguous points array
/// and the part-start index array.
fn build_parts(part_points: &[Vec<Point2D>]) -> (BoundingBox, Vec<i32>, Vec<Point2D>) {
    let mut parts = Vec::with_capacity(part_points.len());
    let mut points = Vec::new();
    for pp in part_points {
        parts.push(points.len() as i32);
        points.extend_from_slice(pp);
    }
    (BoundingBox::from_points(&points), parts, points)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn roundtrip(shape: &Shape) -> Shape {
        let mut bow = ByteOrderWriter::new(Cursor::new(Vec::new()), Endianness::LittleEndian);
        shape.write(&mut bow).unwrap();
        let buf = bow.into_inner().into_inner();
        assert_eq!(
            buf.len() as i32,
            shape.content_length() * 2 - 4,
            "payload size must match the content-length formula minus the tag"
        );
        let mut bor =
            ByteOrderReader::new(Cursor::new(buf), Endianness::LittleEndian).unwrap();
        Shape::read(shape.shape_type(), shape.content_length() * 2, &mut bor).unwrap()
    }

    #[test]
    fn test_polyline_from_parts() {
        let parts = vec![
            vec![
                Point2D::new(0.0, 0.0),
                Point2D::new(1.0, 1.0),
                Point2D::new(2.0, 0.0),
            ],
            vec![
                Point2D::new(3.0, 3.0),
                Point2D::new(4.0, 4.0),
                Point2D::new(5.0, 3.0),
            ],
        ];
        let pl = PolyLine::new(&parts);
        assert_eq!(pl.parts, vec![0, 3]);
        assert_eq!(pl.points.len(), 6);
        assert_eq!(pl.bbox, BoundingBox::new(0.0, 0.0, 5.0, 4.0));
    }

    #[test]
    fn test_content_length_formulas() {
        assert_eq!(Shape::Null.content_length(), 2);
        assert_eq!(Shape::Point(Point2D::new(1.0, 2.0)).content_length(), 10);
        assert_eq!(
            Shape::PointZ(PointZ {
                x: 1.0,
                y: 2.0,
                z: 3.0,
                m: Some(0.0)
            })
            .content_length(),
            18
        );
        let pl = PolyLine::new(&[vec![Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0)]]);
        // 22 + 2*1 + 8*2
        assert_eq!(Shape::PolyLine(pl).content_length(), 40);
        let mp = MultiPoint::new(vec![Point2D::new(0.0, 0.0); 3]);
        assert_eq!(Shape::MultiPoint(mp).content_length(), 44);
    }

    #[test]
    fn test_polyline_z_roundtrip_with_and_without_m() {
        let points = vec![Point2D::new(0.0, 0.0), Point2D::new(1.0, 2.0)];
        let with_m = Shape::PolyLineZ(PolyLineZ {
            bbox: BoundingBox::from_points(&points),
            parts: vec![0],
            points: points.clone(),
            z_range: [5.0, 9.0],
            z_array: vec![5.0, 9.0],
            m_range: Some([0.0, 1.0]),
            m_array: vec![0.0, 1.0],
        });
        assert_eq!(roundtrip(&with_m), with_m);

        let without_m = Shape::PolyLineZ(PolyLineZ {
            bbox: BoundingBox::from_points(&points),
            parts: vec![0],
            points,
            z_range: [5.0, 9.0],
            z_array: vec![5.0, 9.0],
            m_range: None,
            m_array: vec![],
        });
        assert_eq!(roundtrip(&without_m), without_m);
    }

    #[test]
    fn test_multipatch_roundtrip() {
        let points = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(1.0, 1.0),
            Point2D::new(0.0, 0.0),
        ];
        let patch = Shape::MultiPatch(MultiPatch {
            bbox: BoundingBox::from_points(&points),
            parts: vec![0],
            part_types: vec![PartType::OuterRing],
            points,
            z_range: [0.0, 0.0],
            z_array: vec![0.0; 4],
            m_range: Some([0.0, 0.0]),
            m_array: vec![0.0; 4],
        });
        assert_eq!(roundtrip(&patch), patch);
    }

    #[test]
    fn test_base_types_and_dimensions() {
        assert_eq!(ShapeType::PolygonZ.base_shape_type(), ShapeType::Polygon);
        assert_eq!(ShapeType::PolyLineM.base_shape_type(), ShapeType::PolyLine);
        assert_eq!(ShapeType::PointM.dimension(), ShapeTypeDimension::Measure);
        assert_eq!(ShapeType::MultiPatch.dimension(), ShapeTypeDimension::Z);
        assert_eq!(ShapeType::MultiPoint.dimension(), ShapeTypeDimension::XY);
        assert_eq!(ShapeType::PolygonZ.to_int(), 15);
    }

    #[test]
    fn test_unknown_shape_type_rejected() {
        assert!(matches!(
            ShapeType::from_int(2),
            Err(ShapeError::UnsupportedType(2))
        ));
        assert!(ShapeType::is_known(31));
        assert!(!ShapeType::is_known(-1));
    }

    #[test]
    fn test_point_with_zero_content_length() {
        let mut bor =
            ByteOrderReader::new(Cursor::new(vec![0u8; 16]), Endianness::LittleEndian).unwrap();
        let err = Shape::read(ShapeType::Point, 0, &mut bor).unwrap_err();
        assert!(matches!(err, ShapeError::InvalidFormat(_)));
    }
}
