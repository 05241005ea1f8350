/*
This code is part of the Shapeflow geospatial I/O library.
Created: 24/02/2025
Last Modified: 14/06/2026
License: MIT

Notes: Structures and codecs for the Shapefile attribute table held in
the associated .dbf file (dBase III layout).
*/
use crate::error::ShapeError;
use chrono::prelude::*;
use shapeflow_common::utils::{ByteOrderReader, ByteOrderWriter, Endianness};
use std::fmt;
use std::io::{Read, Seek, Write};

/// Row deletion flag for a live record.
pub const DELETION_FLAG_LIVE: u8 = 0x20;
/// Row deletion flag for a deleted record.
pub const DELETION_FLAG_DELETED: u8 = 0x2a;
/// Terminator byte after the field descriptor array.
pub const FIELD_TERMINATOR: u8 = 0x0d;

const FIELD_DESCRIPTOR_LEN: u16 = 32;
const HEADER_FIELDS_BASE: u16 = 33;
const FIELD_NAME_LEN: usize = 11;

/// The five dBase III field types used by shapefile attribute tables.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldDataType {
    Int,
    Real,
    Text,
    Date,
    Bool,
}

impl FieldDataType {
    pub fn to_char(&self) -> char {
        match self {
            FieldDataType::Int => 'N',
            FieldDataType::Real => 'F',
            FieldDataType::Text => 'C',
            FieldDataType::Date => 'D',
            FieldDataType::Bool => 'L',
        }
    }

    pub fn from_char(c: char) -> Option<FieldDataType> {
        match c {
            'N' => Some(FieldDataType::Int),
            'F' => Some(FieldDataType::Real),
            'C' => Some(FieldDataType::Text),
            'D' => Some(FieldDataType::Date),
            'L' => Some(FieldDataType::Bool),
            _ => None,
        }
    }
}

/// A `D` field value, stored on disk as `YYYYMMDD`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DateData {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl fmt::Display for DateData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04}{:02}{:02}", self.year, self.month, self.day)
    }
}

/// A single attribute cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldData {
    Int(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Date(DateData),
    Null,
}

/// One 32-byte field descriptor.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AttributeField {
    pub name: String,
    pub field_type: char,
    pub field_length: u8,
    pub decimal_count: u8,
}

impl AttributeField {
    pub fn new(name: &str, field_type: FieldDataType, field_length: u8, decimal_count: u8) -> AttributeField {
        AttributeField {
            name: name.to_string(),
            field_type: field_type.to_char(),
            field_length,
            decimal_count,
        }
    }

    /// A `C` field of the given length.
    pub fn character(name: &str, field_length: u8) -> AttributeField {
        AttributeField::new(name, FieldDataType::Text, field_length, 0)
    }

    /// An `N` field holding textual integers.
    pub fn numeric(name: &str, field_length: u8) -> AttributeField {
        AttributeField::new(name, FieldDataType::Int, field_length, 0)
    }

    /// An `F` field holding fixed-notation floats.
    pub fn float(name: &str, field_length: u8, decimal_count: u8) -> AttributeField {
        AttributeField::new(name, FieldDataType::Real, field_length, decimal_count)
    }

    /// A `D` date field, always 8 bytes.
    pub fn date(name: &str) -> AttributeField {
        AttributeField::new(name, FieldDataType::Date, 8, 0)
    }

    /// An `L` logical field, always 1 byte.
    pub fn logical(name: &str) -> AttributeField {
        AttributeField::new(name, FieldDataType::Bool, 1, 0)
    }
}

/// The fixed portion of the .dbf header.
#[derive(Debug, Default, Clone)]
pub struct AttributeHeader {
    pub version: u8,
    pub year: u32,
    pub month: u8,
    pub day: u8,
    pub num_records: u32,
    /// Derived from the header length, not stored in the file.
    pub num_fields: u32,
    pub header_length: u16,
    pub record_length: u16,
}

/// `recordLength = 1 + sum of field lengths` (the 1 is the deletion flag).
pub(crate) fn record_length_of(fields: &[AttributeField]) -> u16 {
    1 + fields
        .iter()
        .map(|f| f.field_length as u16)
        .sum::<u16>()
}

/// `headerLength = 32 + 32 * fieldCount + 1`.
pub(crate) fn header_length_of(fields: &[AttributeField]) -> u16 {
    FIELD_DESCRIPTOR_LEN + FIELD_DESCRIPTOR_LEN * fields.len() as u16 + 1
}

/// Absolute byte offset of the cell at (`row`, `field_index`). The +1
/// skips the row's deletion flag.
pub(crate) fn cell_offset(
    header_length: u16,
    record_length: u16,
    fields: &[AttributeField],
    row: usize,
    field_index: usize,
) -> u64 {
    let mut offset = header_length as u64 + row as u64 * record_length as u64 + 1;
    for f in &fields[..field_index] {
        offset += f.field_length as u64;
    }
    offset
}

/// Parses the fixed header and the field descriptor array, leaving the
/// stream positioned just past the 0x0D terminator.
pub(crate) fn read_header<R: Read + Seek>(
    bor: &mut ByteOrderReader<R>,
) -> Result<(AttributeHeader, Vec<AttributeField>), ShapeError> {
    bor.set_byte_order(Endianness::LittleEndian);
    bor.seek(0)?;
    let mut header = AttributeHeader {
        version: bor.read_u8()?,
        year: 1900u32 + bor.read_u8()? as u32,
        month: bor.read_u8()?,
        day: bor.read_u8()?,
        num_records: bor.read_u32()?,
        header_length: bor.read_u16()?,
        record_length: bor.read_u16()?,
        num_fields: 0,
    };
    if header.header_length < HEADER_FIELDS_BASE {
        return Err(ShapeError::InvalidFormat(format!(
            "attribute table header length {} is too small",
            header.header_length
        )));
    }
    // reserved bytes
    bor.inc_pos(20)?;

    let num_fields = (header.header_length - HEADER_FIELDS_BASE) / FIELD_DESCRIPTOR_LEN;
    let mut fields = Vec::with_capacity(num_fields as usize);
    for _ in 0..num_fields {
        let name = bor.read_utf8(FIELD_NAME_LEN)?.replace(char::from(0), "");
        let field_type = char::from(bor.read_u8()?);
        bor.inc_pos(4)?;
        let field_length = bor.read_u8()?;
        let decimal_count = bor.read_u8()?;
        bor.inc_pos(14)?;
        fields.push(AttributeField {
            name,
            field_type,
            field_length,
            decimal_count,
        });
    }
    header.num_fields = fields.len() as u32;
    bor.inc_pos(1)?; // 0x0D terminator
    Ok((header, fields))
}

/// Writes the full .dbf header (fixed part, descriptors, terminator)
/// at the start of the stream, stamped with the current date.
pub(crate) fn write_header<W: Write + Seek>(
    bow: &mut ByteOrderWriter<W>,
    num_records: u32,
    fields: &[AttributeField],
) -> Result<(), ShapeError> {
    bow.seek(0)?;
    bow.set_byte_order(Endianness::LittleEndian);
    bow.write_u8(3)?;
    let now = Local::now();
    bow.write_u8((now.year() - 1900) as u8)?;
    bow.write_u8(now.month() as u8)?;
    bow.write_u8(now.day() as u8)?;
    bow.write_u32(num_records)?;
    bow.write_u16(header_length_of(fields))?;
    bow.write_u16(record_length_of(fields))?;
    bow.write_bytes(&[0u8; 20])?;

    for field in fields {
        let mut name = field.name.as_bytes().to_vec();
        name.truncate(FIELD_NAME_LEN);
        name.resize(FIELD_NAME_LEN, 0);
        bow.write_bytes(&name)?;
        bow.write_u8(field.field_type as u8)?;
        bow.write_bytes(&[0u8; 4])?;
        bow.write_u8(field.field_length)?;
        bow.write_u8(field.decimal_count)?;
        bow.write_bytes(&[0u8; 14])?;
    }
    bow.write_u8(FIELD_TERMINATOR)?;
    Ok(())
}

/// Encodes a cell value to exactly the field's width: numerics are
/// right-justified, everything else left-justified, space padded. A
/// representation longer than the field is rejected.
pub(crate) fn encode_value(
    value: &FieldData,
    field: &AttributeField,
) -> Result<Vec<u8>, ShapeError> {
    let width = field.field_length as usize;
    let (repr, right_justified) = match value {
        FieldData::Null => return Ok(vec![b' '; width]),
        FieldData::Int(v) => (v.to_string(), true),
        FieldData::Real(v) => (format!("{:.*}", field.decimal_count as usize, v), true),
        FieldData::Text(v) => (v.clone(), false),
        FieldData::Bool(v) => ((if *v { "T" } else { "F" }).to_string(), false),
        FieldData::Date(v) => (v.to_string(), false),
    };
    if repr.len() > width {
        return Err(ShapeError::InvalidField(format!(
            "field value too long: {:?} exceeds field length {}",
            repr, width
        )));
    }
    let mut cell = Vec::with_capacity(width);
    if right_justified {
        cell.resize(width - repr.len(), b' ');
        cell.extend_from_slice(repr.as_bytes());
    } else {
        cell.extend_from_slice(repr.as_bytes());
        cell.resize(width, b' ');
    }
    Ok(cell)
}

#[cfg(test)]
mod test {
    use super::*;
    use shapeflow_common::utils::{ByteOrderReader, ByteOrderWriter, Endianness};
    use std::io::Cursor;

    fn fields() -> Vec<AttributeField> {
        vec![
            AttributeField::character("NAME", 20),
            AttributeField::numeric("ID", 10),
            AttributeField::float("VALUE", 15, 6),
        ]
    }

    #[test]
    fn test_length_invariants() {
        let f = fields();
        assert_eq!(record_length_of(&f), 1 + 20 + 10 + 15);
        assert_eq!(header_length_of(&f), 32 + 32 * 3 + 1);
    }

    #[test]
    fn test_cell_offset() {
        let f = fields();
        let hl = header_length_of(&f);
        let rl = record_length_of(&f);
        // row 2, field 2 skips two rows, the deletion flag and two fields
        assert_eq!(
            cell_offset(hl, rl, &f, 2, 2),
            hl as u64 + 2 * rl as u64 + 1 + 20 + 10
        );
    }

    #[test]
    fn test_encode_justification() {
        let f = fields();
        assert_eq!(
            encode_value(&FieldData::Text("Point B".to_string()), &f[0]).unwrap(),
            b"Point B             ".to_vec()
        );
        assert_eq!(
            encode_value(&FieldData::Int(42), &f[1]).unwrap(),
            b"        42".to_vec()
        );
        assert_eq!(
            encode_value(&FieldData::Real(1.5), &f[2]).unwrap(),
            b"       1.500000".to_vec()
        );
    }

    #[test]
    fn test_field_type_chars() {
        assert_eq!(FieldDataType::from_char('N'), Some(FieldDataType::Int));
        assert_eq!(FieldDataType::from_char('C'), Some(FieldDataType::Text));
        assert_eq!(FieldDataType::from_char('X'), None);
        assert_eq!(FieldDataType::Real.to_char(), 'F');
    }

    #[test]
    fn test_encode_date_and_logical() {
        let when = AttributeField::date("WHEN");
        assert_eq!(
            encode_value(
                &FieldData::Date(DateData {
                    year: 2026,
                    month: 6,
                    day: 3
                }),
                &when
            )
            .unwrap(),
            b"20260603".to_vec()
        );
        let flag = AttributeField::logical("FLAG");
        assert_eq!(encode_value(&FieldData::Bool(true), &flag).unwrap(), b"T");
        assert_eq!(encode_value(&FieldData::Bool(false), &flag).unwrap(), b"F");
    }

    #[test]
    fn test_encode_too_long_is_rejected() {
        let field = AttributeField::character("SHORT", 3);
        let err = encode_value(&FieldData::Text("too long".to_string()), &field).unwrap_err();
        assert!(matches!(err, ShapeError::InvalidField(_)));
    }

    #[test]
    fn test_header_roundtrip_truncates_long_names() {
        let declared = vec![
            AttributeField::character("exactly11ch", 5), // 11 bytes, kept
            AttributeField::character("twelve_chars", 5), // 12 bytes, truncated
        ];
        let mut bow = ByteOrderWriter::new(Cursor::new(Vec::new()), Endianness::LittleEndian);
        write_header(&mut bow, 7, &declared).unwrap();
        let buf = bow.into_inner().into_inner();

        let mut bor = ByteOrderReader::new(Cursor::new(buf), Endianness::LittleEndian).unwrap();
        let (header, parsed) = read_header(&mut bor).unwrap();
        assert_eq!(header.num_records, 7);
        assert_eq!(header.num_fields, 2);
        assert_eq!(header.record_length, 11);
        assert_eq!(parsed[0].name, "exactly11ch");
        assert_eq!(parsed[1].name, "twelve_char");
    }
}
