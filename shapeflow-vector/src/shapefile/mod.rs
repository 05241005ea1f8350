/*
This code is part of the Shapeflow geospatial I/O library.
Created: 21/02/2025
Last Modified: 14/06/2026
License: MIT

Notes: The logic behind working with the ESRI Shapefile format: the
100-byte file header shared by .shp and .shx, the per-record framing,
and the index-entry codec.
*/

pub mod attributes;
pub mod geometry;
mod reader;
mod writer;

pub use self::reader::Reader;
pub use self::writer::Writer;

use crate::error::ShapeError;
use self::geometry::ShapeType;
use shapeflow_common::structures::BoundingBox;
use shapeflow_common::utils::{ByteOrderReader, ByteOrderWriter, Endianness};
use std::fmt;
use std::io;
use std::io::{Read, Seek, Write};

/// Size of the .shp/.shx file header in bytes.
pub const FILE_HEADER_LEN: u64 = 100;
/// Magic number at byte 0, big-endian.
pub const FILE_CODE: i32 = 9994;
/// Format version at byte 28, little-endian.
pub const VERSION: i32 = 1000;

/// The 100-byte header shared by the main and index files. Note the
/// format's mixed endianness: the file code and length are big-endian,
/// everything from the version on is little-endian.
#[derive(Debug, Default, Clone)]
pub struct ShapefileHeader {
    /// File length in 16-bit words.
    pub file_length: i32,
    pub version: i32,
    pub shape_type: ShapeType,
    pub bbox: BoundingBox,
    pub z_min: f64,
    pub z_max: f64,
    pub m_min: f64,
    pub m_max: f64,
}

impl ShapefileHeader {
    /// Reads and validates a header, leaving the stream positioned at
    /// the first record.
    pub fn read<R: Read + Seek>(
        bor: &mut ByteOrderReader<R>,
    ) -> Result<ShapefileHeader, ShapeError> {
        bor.set_byte_order(Endianness::BigEndian);
        bor.seek(0)?;
        let file_code = bor.read_i32()?;
        if file_code != FILE_CODE {
            return Err(ShapeError::InvalidFormat(format!(
                "bad file code {} (expected {})",
                file_code, FILE_CODE
            )));
        }
        bor.seek(24)?;
        let file_length = bor.read_i32()?;

        // the rest of the header is little-endian
        bor.set_byte_order(Endianness::LittleEndian);
        let version = bor.read_i32()?;
        if version != VERSION {
            return Err(ShapeError::InvalidFormat(format!(
                "bad version {} (expected {})",
                version, VERSION
            )));
        }
        let shape_type = ShapeType::from_int(bor.read_i32()?)?;
        let bbox = BoundingBox::new(
            bor.read_f64()?,
            bor.read_f64()?,
            bor.read_f64()?,
            bor.read_f64()?,
        );
        if !bbox.is_valid() {
            return Err(ShapeError::InvalidFormat(format!(
                "invalid bounding box in header: ({}, {}, {}, {})",
                bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y
            )));
        }
        let z_min = bor.read_f64()?;
        let z_max = bor.read_f64()?;
        let m_min = bor.read_f64()?;
        let m_max = bor.read_f64()?;
        bor.seek(FILE_HEADER_LEN)?;
        Ok(ShapefileHeader {
            file_length,
            version,
            shape_type,
            bbox,
            z_min,
            z_max,
            m_min,
            m_max,
        })
    }

    /// Writes a header at the start of the stream. `file_length` is in
    /// bytes; the file-level Z/M ranges are left zeroed.
    pub fn write<W: Write + Seek>(
        bow: &mut ByteOrderWriter<W>,
        file_length: u64,
        shape_type: ShapeType,
        bbox: BoundingBox,
    ) -> Result<(), ShapeError> {
        bow.seek(0)?;
        bow.set_byte_order(Endianness::BigEndian);
        bow.write_i32(FILE_CODE)?;
        for _ in 0..5 {
            bow.write_i32(0)?;
        }
        bow.write_i32((file_length / 2) as i32)?;
        bow.set_byte_order(Endianness::LittleEndian);
        bow.write_i32(VERSION)?;
        bow.write_i32(shape_type.to_int())?;
        bow.write_f64(bbox.min_x)?;
        bow.write_f64(bbox.min_y)?;
        bow.write_f64(bbox.max_x)?;
        bow.write_f64(bbox.max_y)?;
        for _ in 0..4 {
            bow.write_f64(0.0)?;
        }
        Ok(())
    }
}

impl fmt::Display for ShapefileHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "file_length: {}\nversion: {}\nshape_type: {}\nbbox: ({}, {}, {}, {})",
            self.file_length,
            self.version,
            self.shape_type,
            self.bbox.min_x,
            self.bbox.min_y,
            self.bbox.max_x,
            self.bbox.max_y
        )
    }
}

/// Reads the per-record triple: record number and content length (both
/// big-endian, length in 16-bit words) followed by the raw shape-type
/// tag (little-endian). The tag is returned undecoded so callers can
/// decide how to treat unknown values.
pub(crate) fn read_record_header<R: Read + Seek>(
    bor: &mut ByteOrderReader<R>,
) -> io::Result<(i32, i32, i32)> {
    bor.set_byte_order(Endianness::BigEndian);
    let num = bor.read_i32()?;
    let content_length = bor.read_i32()?;
    bor.set_byte_order(Endianness::LittleEndian);
    let shape_type = bor.read_i32()?;
    Ok((num, content_length, shape_type))
}

/// One .shx entry: record offset and content length, both big-endian
/// and measured in 16-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub offset: i32,
    pub content_length: i32,
}

impl IndexEntry {
    pub fn read<R: Read + Seek>(bor: &mut ByteOrderReader<R>) -> io::Result<IndexEntry> {
        bor.set_byte_order(Endianness::BigEndian);
        Ok(IndexEntry {
            offset: bor.read_i32()?,
            content_length: bor.read_i32()?,
        })
    }

    pub fn write<W: Write + Seek>(&self, bow: &mut ByteOrderWriter<W>) -> io::Result<()> {
        bow.set_byte_order(Endianness::BigEndian);
        bow.write_i32(self.offset)?;
        bow.write_i32(self.content_length)
    }
}
