/*
This code is part of the Shapeflow geospatial I/O library.
Created: 14/02/2025
Last Modified: 14/06/2026
License: MIT
*/

//! Streaming I/O for the ESRI Shapefile triple (`.shp`, `.shx`,
//! `.dbf`) and a bidirectional translator to the GeoJSON Feature data
//! model.
//!
//! ```no_run
//! use shapeflow_vector::{
//!     AttributeField, FieldData, Point2D, Reader, Shape, ShapeType, Writer,
//! };
//!
//! # fn main() -> Result<(), shapeflow_vector::ShapeError> {
//! let mut writer = Writer::create("cities", ShapeType::Point)?;
//! writer.set_fields(vec![AttributeField::character("NAME", 20)])?;
//! let row = writer.write(&Shape::Point(Point2D::new(3.0, 4.0)))?;
//! writer.write_attribute(row as usize, 0, &FieldData::Text("Guelph".to_string()))?;
//! writer.close()?;
//!
//! let mut reader = Reader::open("cities.shp")?;
//! while reader.next() {
//!     let (index, shape) = reader.shape();
//!     println!("{}: {}", index, shape.shape_type());
//! }
//! # Ok(())
//! # }
//! ```

pub mod convert;
pub mod error;
pub mod geojson;
pub mod options;
pub mod shapefile;
pub mod validator;

pub use crate::error::{ErrorKind, ShapeError};
pub use crate::options::ReaderOptions;
pub use crate::shapefile::attributes::{AttributeField, DateData, FieldData, FieldDataType};
pub use crate::shapefile::geometry::{
    MultiPatch, MultiPoint, MultiPointM, MultiPointZ, PartType, PointM, PointZ, PolyLine,
    PolyLineM, PolyLineZ, Polygon, PolygonM, PolygonZ, Shape, ShapeType, ShapeTypeDimension,
};
pub use crate::shapefile::{IndexEntry, Reader, ShapefileHeader, Writer};
pub use shapeflow_common::structures::{BoundingBox, Point2D};
