/*
This code is part of the Shapeflow geospatial I/O library.
Created: 02/04/2025
Last Modified: 14/06/2026
License: MIT
*/
use shapeflow_vector::{
    AttributeField, ErrorKind, FieldData, Point2D, PolyLine, Reader, ReaderOptions, Shape,
    ShapeType, Writer,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn path_in(dir: &TempDir, name: &str) -> String {
    dir.path().join(name).to_string_lossy().to_string()
}

/// Writes the two-record point file used by several tests and returns
/// the .shp path.
fn write_tiny_point_file(dir: &TempDir) -> String {
    let base = path_in(dir, "tiny");
    let mut writer = Writer::create(&base, ShapeType::Point).unwrap();
    writer
        .set_fields(vec![
            AttributeField::character("NAME", 20),
            AttributeField::numeric("ID", 10),
        ])
        .unwrap();
    let row = writer.write(&Shape::Point(Point2D::new(0.0, 0.0))).unwrap();
    writer
        .write_attribute(row as usize, 0, &FieldData::Text("Point A".to_string()))
        .unwrap();
    writer
        .write_attribute(row as usize, 1, &FieldData::Int(1))
        .unwrap();
    let row = writer.write(&Shape::Point(Point2D::new(3.0, 4.0))).unwrap();
    writer
        .write_attribute(row as usize, 0, &FieldData::Text("Point B".to_string()))
        .unwrap();
    writer
        .write_attribute(row as usize, 1, &FieldData::Int(2))
        .unwrap();
    writer.close().unwrap();
    format!("{}.shp", base)
}

fn read_be_i32(bytes: &[u8], offset: usize) -> i32 {
    i32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[test]
fn tiny_point_file_roundtrip() {
    let dir = TempDir::new().unwrap();
    let shp = write_tiny_point_file(&dir);

    let mut reader = Reader::open(&shp).unwrap();
    assert_eq!(reader.geometry_type(), ShapeType::Point);
    let bbox = reader.bbox();
    assert_eq!(
        (bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y),
        (0.0, 0.0, 3.0, 4.0)
    );

    let mut shapes = Vec::new();
    while reader.next() {
        let (index, shape) = reader.shape();
        shapes.push((index, shape.clone()));
        if index == 1 {
            // current-row shorthand for read_attribute
            assert_eq!(reader.attribute(0), "Point B");
        }
    }
    assert!(reader.err().is_none());
    assert_eq!(shapes.len(), 2);
    assert_eq!(shapes[0].0, 0);
    assert_eq!(shapes[1].1, Shape::Point(Point2D::new(3.0, 4.0)));

    assert_eq!(reader.attribute_count(), 2);
    let fields: Vec<AttributeField> = reader.fields().to_vec();
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].name, "NAME");
    assert_eq!(fields[1].field_type, 'N');
    assert_eq!(reader.read_attribute(1, 0), "Point B");
    assert_eq!(reader.read_attribute(0, 1), "1");
    reader.close().unwrap();
}

#[test]
fn index_entries_match_record_offsets() {
    let dir = TempDir::new().unwrap();
    let shp = write_tiny_point_file(&dir);
    let shx = shp.replace(".shp", ".shx");

    let shx_bytes = fs::read(shx).unwrap();
    assert_eq!(shx_bytes.len(), 100 + 2 * 8);
    // record 0 starts at byte 100, record 1 at 100 + 8 + 20
    assert_eq!(read_be_i32(&shx_bytes, 100), 50);
    assert_eq!(read_be_i32(&shx_bytes, 104), 10);
    assert_eq!(read_be_i32(&shx_bytes, 108), 64);
    assert_eq!(read_be_i32(&shx_bytes, 112), 10);

    // the framing invariant: offset*2 is the byte offset of the header
    let shp_bytes = fs::read(shp).unwrap();
    assert_eq!(read_be_i32(&shp_bytes, 100), 1); // record number 1
    assert_eq!(read_be_i32(&shp_bytes, 128), 2);
}

#[test]
fn header_only_file_yields_no_records() {
    let dir = TempDir::new().unwrap();
    let base = path_in(&dir, "empty");
    let writer = Writer::create(&base, ShapeType::Point).unwrap();
    writer.close().unwrap();

    let shp = format!("{}.shp", base);
    assert_eq!(fs::metadata(&shp).unwrap().len(), 100);

    let mut reader = Reader::open(&shp).unwrap();
    let mut records = 0;
    while reader.next() {
        records += 1;
    }
    assert_eq!(records, 0);
    assert!(reader.err().is_none());
    // a writer that was never given fields still leaves an empty-schema DBF
    assert_eq!(reader.fields().len(), 0);
    assert_eq!(reader.attribute_count(), 0);
    reader.close().unwrap();
}

#[test]
fn truncated_file_strict_vs_resync() {
    let dir = TempDir::new().unwrap();
    let base = path_in(&dir, "truncated");
    let mut writer = Writer::create(&base, ShapeType::Point).unwrap();
    for i in 0..5 {
        writer
            .write(&Shape::Point(Point2D::new(i as f64, i as f64)))
            .unwrap();
    }
    writer.close().unwrap();

    // cut the last record short, leaving 13 bytes of it
    let shp = format!("{}.shp", base);
    let mut bytes = fs::read(&shp).unwrap();
    bytes.truncate(100 + 4 * 28 + 13);
    fs::write(&shp, &bytes).unwrap();

    let mut strict = Reader::open(&shp).unwrap();
    let mut records = 0;
    while strict.next() {
        records += 1;
    }
    assert_eq!(records, 4);
    assert_eq!(strict.err().unwrap().kind(), ErrorKind::CorruptedFile);

    let mut lenient = Reader::open_with_options(
        &shp,
        ReaderOptions::default().with_ignore_corrupted_shapes(true),
    )
    .unwrap();
    let mut records = 0;
    while lenient.next() {
        records += 1;
    }
    assert_eq!(records, 4);
    assert!(lenient.err().is_none());
    lenient.close().unwrap();
}

#[test]
fn unknown_shape_tag_strict_vs_resync() {
    let dir = TempDir::new().unwrap();
    let base = path_in(&dir, "badtag");
    let mut writer = Writer::create(&base, ShapeType::Point).unwrap();
    writer.write(&Shape::Point(Point2D::new(1.0, 1.0))).unwrap();
    writer.write(&Shape::Point(Point2D::new(9.0, 9.0))).unwrap();
    writer.write(&Shape::Point(Point2D::new(5.0, 5.0))).unwrap();
    writer.close().unwrap();

    // overwrite the second record's shape-type tag with 99
    let shp = format!("{}.shp", base);
    let mut bytes = fs::read(&shp).unwrap();
    let tag_offset = 100 + 28 + 8;
    bytes[tag_offset..tag_offset + 4].copy_from_slice(&99i32.to_le_bytes());
    fs::write(&shp, &bytes).unwrap();

    let mut strict = Reader::open(&shp).unwrap();
    assert!(strict.next());
    assert!(!strict.next());
    assert_eq!(strict.err().unwrap().kind(), ErrorKind::UnsupportedType);

    let mut lenient = Reader::open_with_options(
        &shp,
        ReaderOptions::default().with_ignore_corrupted_shapes(true),
    )
    .unwrap();
    let mut yielded = Vec::new();
    while lenient.next() {
        let (index, shape) = lenient.shape();
        yielded.push((index, shape.clone()));
    }
    assert!(lenient.err().is_none());
    assert_eq!(yielded.len(), 2);
    assert_eq!(yielded[0], (0, Shape::Point(Point2D::new(1.0, 1.0))));
    assert_eq!(yielded[1], (2, Shape::Point(Point2D::new(5.0, 5.0))));
}

#[test]
fn append_extends_an_existing_file() {
    let dir = TempDir::new().unwrap();
    let base = path_in(&dir, "grows");
    let mut writer = Writer::create(&base, ShapeType::Point).unwrap();
    for i in 0..100 {
        writer
            .write(&Shape::Point(Point2D::new(i as f64, i as f64)))
            .unwrap();
    }
    writer.close().unwrap();

    let shp = format!("{}.shp", base);
    let mut appender = Writer::append(&shp).unwrap();
    assert_eq!(appender.record_count(), 100);
    assert_eq!(appender.geometry_type(), ShapeType::Point);
    assert_eq!(appender.bbox().max_x, 99.0);
    let row = appender
        .write(&Shape::Point(Point2D::new(-1.0, 120.0)))
        .unwrap();
    assert_eq!(row, 100);
    appender.close().unwrap();

    let shp_bytes = fs::read(&shp).unwrap();
    let expected_len = 100 + 101 * 28;
    assert_eq!(shp_bytes.len(), expected_len);
    // header file length is in 16-bit words
    assert_eq!(read_be_i32(&shp_bytes, 24), (expected_len / 2) as i32);

    // the last index entry points at the appended record
    let shx_bytes = fs::read(shp.replace(".shp", ".shx")).unwrap();
    let last = shx_bytes.len() - 8;
    assert_eq!(read_be_i32(&shx_bytes, last) as usize * 2, 100 + 100 * 28);

    let mut reader = Reader::open(&shp).unwrap();
    let mut records = 0;
    let mut last_shape = Shape::Null;
    while reader.next() {
        records += 1;
        last_shape = reader.shape().1.clone();
    }
    assert_eq!(records, 101);
    assert_eq!(last_shape, Shape::Point(Point2D::new(-1.0, 120.0)));
    // the appended record extended the file-level bounding box
    let bbox = reader.bbox();
    assert_eq!((bbox.min_x, bbox.max_y), (-1.0, 120.0));
}

#[test]
fn unwritten_attributes_read_back_empty() {
    let dir = TempDir::new().unwrap();
    let base = path_in(&dir, "blank");
    let mut writer = Writer::create(&base, ShapeType::Point).unwrap();
    writer
        .set_fields(vec![AttributeField::character("NOTE", 12)])
        .unwrap();
    writer.write(&Shape::Point(Point2D::new(1.0, 2.0))).unwrap();
    writer.close().unwrap();

    let mut reader = Reader::open(&format!("{}.shp", base)).unwrap();
    assert!(reader.next());
    assert_eq!(reader.read_attribute(0, 0), "");
}

#[test]
fn schema_state_machine_errors() {
    let dir = TempDir::new().unwrap();
    let base = path_in(&dir, "states");
    let mut writer = Writer::create(&base, ShapeType::Point).unwrap();

    // attributes before the schema is declared
    let err = writer
        .write_attribute(0, 0, &FieldData::Int(1))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidField);

    // geometry before the schema is fine; rows materialize later
    writer.write(&Shape::Point(Point2D::new(1.0, 1.0))).unwrap();
    writer.write(&Shape::Point(Point2D::new(2.0, 2.0))).unwrap();
    writer
        .set_fields(vec![AttributeField::numeric("ID", 10)])
        .unwrap();
    writer.write_attribute(0, 0, &FieldData::Int(7)).unwrap();
    writer.write_attribute(1, 0, &FieldData::Int(8)).unwrap();

    // re-declaring the schema
    let err = writer
        .set_fields(vec![AttributeField::numeric("ID", 10)])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidField);

    // a row with no record yet
    let err = writer
        .write_attribute(5, 0, &FieldData::Int(9))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidField);
    writer.close().unwrap();

    let mut reader = Reader::open(&format!("{}.shp", base)).unwrap();
    assert_eq!(reader.read_attribute(0, 0), "7");
    assert_eq!(reader.read_attribute(1, 0), "8");
}

#[test]
fn value_exceeding_field_length_is_rejected() {
    let dir = TempDir::new().unwrap();
    let base = path_in(&dir, "overflow");
    let mut writer = Writer::create(&base, ShapeType::Point).unwrap();
    writer
        .set_fields(vec![AttributeField::character("TAG", 4)])
        .unwrap();
    writer.write(&Shape::Point(Point2D::new(0.0, 0.0))).unwrap();
    let err = writer
        .write_attribute(0, 0, &FieldData::Text("too long".to_string()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidField);
    writer.close().unwrap();
}

#[test]
fn rewrite_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    let base = path_in(&dir, "source");
    let mut writer = Writer::create(&base, ShapeType::PolyLine).unwrap();
    writer
        .set_fields(vec![
            AttributeField::character("NAME", 10),
            AttributeField::numeric("RANK", 6),
        ])
        .unwrap();
    let two_parts = PolyLine::new(&[
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
    ]);
    let one_part = PolyLine::new(&[vec![Point2D::new(-4.0, 2.0), Point2D::new(6.0, 7.0)]]);
    for (row, shape) in [two_parts, one_part].iter().enumerate() {
        writer.write(&Shape::PolyLine(shape.clone())).unwrap();
        writer
            .write_attribute(row, 0, &FieldData::Text(format!("line{}", row)))
            .unwrap();
        writer
            .write_attribute(row, 1, &FieldData::Int(row as i64 * 3))
            .unwrap();
    }
    writer.close().unwrap();

    // read everything back and write it to a fresh basename
    let shp = format!("{}.shp", base);
    let mut reader = Reader::open(&shp).unwrap();
    let fields: Vec<AttributeField> = reader.fields().to_vec();
    let mut records: Vec<(Shape, Vec<String>)> = Vec::new();
    while reader.next() {
        let row = reader.current_index();
        let attributes: Vec<String> = (0..fields.len())
            .map(|i| reader.read_attribute(row, i))
            .collect();
        records.push((reader.shape().1.clone(), attributes));
    }
    reader.close().unwrap();

    let copy_base = path_in(&dir, "copy");
    let mut copier = Writer::create(&copy_base, ShapeType::PolyLine).unwrap();
    copier.set_fields(fields.clone()).unwrap();
    for (row, (shape, attributes)) in records.iter().enumerate() {
        copier.write(shape).unwrap();
        for (i, value) in attributes.iter().enumerate() {
            copier
                .write_attribute(row, i, &FieldData::Text(value.clone()))
                .unwrap();
        }
    }
    copier.close().unwrap();

    assert_eq!(
        fs::read(&shp).unwrap(),
        fs::read(format!("{}.shp", copy_base)).unwrap()
    );
    assert_eq!(
        fs::read(format!("{}.shx", base)).unwrap(),
        fs::read(format!("{}.shx", copy_base)).unwrap()
    );

    // the attribute tables must agree on every live row
    let mut original = Reader::open(&shp).unwrap();
    let mut copied = Reader::open(&format!("{}.shp", copy_base)).unwrap();
    for row in 0..2 {
        for field in 0..fields.len() {
            assert_eq!(
                original.read_attribute(row, field),
                copied.read_attribute(row, field)
            );
        }
    }
}

fn open_error(path: &str) -> shapeflow_vector::ShapeError {
    match Reader::open(path) {
        Ok(_) => panic!("expected opening {} to fail", path),
        Err(e) => e,
    }
}

#[test]
fn open_rejects_bad_inputs() {
    let dir = TempDir::new().unwrap();

    let err = open_error(&path_in(&dir, "whatever.dbf"));
    assert_eq!(err.kind(), ErrorKind::InvalidFormat);

    let bogus = path_in(&dir, "bogus.shp");
    fs::write(&bogus, vec![0u8; 200]).unwrap();
    let err = open_error(&bogus);
    assert_eq!(err.kind(), ErrorKind::InvalidFormat);

    let err = open_error(&path_in(&dir, "missing.shp"));
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn missing_dbf_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let base = path_in(&dir, "nodbf");
    let mut writer = Writer::create(&base, ShapeType::Point).unwrap();
    writer.write(&Shape::Point(Point2D::new(1.0, 1.0))).unwrap();
    writer.close().unwrap();
    let shp = format!("{}.shp", base);
    fs::remove_file(format!("{}.dbf", base)).unwrap();

    let mut reader = Reader::open(&shp).unwrap();
    assert!(reader.next());
    assert_eq!(reader.fields().len(), 0);
    assert_eq!(reader.read_attribute(0, 0), "");
    assert!(Path::new(&shp).exists());
    reader.close().unwrap();
}
