/*
This code is part of the Shapeflow geospatial I/O library.
Created: 04/03/2025
Last Modified: 14/06/2026
License: MIT

Notes: The appending shapefile writer. Records go to .shp with a
seek-back length patch, the index entry to .shx, and a blank row to the
attribute table; the three file headers are rewritten at close.
*/
use crate::error::ShapeError;
use crate::shapefile::attributes::{self, AttributeField, FieldData};
use crate::shapefile::geometry::{Shape, ShapeType};
use crate::shapefile::{IndexEntry, ShapefileHeader, FILE_HEADER_LEN};
use shapeflow_common::structures::BoundingBox;
use shapeflow_common::utils::{ByteOrderReader, ByteOrderWriter, Endianness};
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;

/// Writes a shapefile triple record by record. `close` must be called
/// at the end of the transaction; it writes the final headers to the
/// three files.
pub struct Writer {
    file_name: String, // basename, without extension
    shp: ByteOrderWriter<File>,
    shx: ByteOrderWriter<File>,
    geometry_type: ShapeType,
    num: i32,
    bbox: BoundingBox,
    dbf: DbfState,
}

/// The attribute table lifecycle: nothing exists until the schema is
/// declared (or an existing table is picked up by `append`).
enum DbfState {
    Unset,
    Ready {
        file: ByteOrderWriter<File>,
        fields: Vec<AttributeField>,
        header_length: u16,
        record_length: u16,
    },
}

impl Writer {
    /// Creates `<basename>.shp` and `<basename>.shx`, reserving space
    /// for their headers. A trailing `.shp` on `file_name` is ignored.
    pub fn create(file_name: &str, shape_type: ShapeType) -> Result<Writer, ShapeError> {
        let basename = trim_shp_extension(file_name);
        let shp_file = File::create(format!("{}.shp", basename))?;
        let shx_file = File::create(format!("{}.shx", basename))?;
        let mut shp = ByteOrderWriter::new(shp_file, Endianness::BigEndian);
        let mut shx = ByteOrderWriter::new(shx_file, Endianness::BigEndian);
        shp.seek(FILE_HEADER_LEN)?;
        shx.seek(FILE_HEADER_LEN)?;
        Ok(Writer {
            file_name: basename,
            shp,
            shx,
            geometry_type: shape_type,
            num: 0,
            bbox: BoundingBox::default(),
            dbf: DbfState::Unset,
        })
    }

    /// Opens an existing triple for appending. The shape type and
    /// bounding box are read back from the header, the record counter
    /// from the last index entry, and new rows reuse the existing DBF
    /// schema. The index file must be present and consistent.
    pub fn append(file_name: &str) -> Result<Writer, ShapeError> {
        let basename = trim_shp_extension(file_name);
        let mut shp_file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(format!("{}.shp", basename))?;

        let (geometry_type, bbox) = {
            let mut bor = ByteOrderReader::new(&mut shp_file, Endianness::BigEndian)?;
            let header = ShapefileHeader::read(&mut bor)?;
            (header.shape_type, header.bbox)
        };

        let mut shx_file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(format!("{}.shx", basename))?;

        // The record number of the last shape tells us where to
        // continue the sequence.
        let mut num = 0i32;
        {
            let mut bor = ByteOrderReader::new(&mut shx_file, Endianness::BigEndian)?;
            let shx_len = bor.len();
            if shx_len >= FILE_HEADER_LEN + 8 {
                bor.seek(shx_len - 8)?;
                let entry = IndexEntry::read(&mut bor)?;
                let mut shp_bor = ByteOrderReader::new(&mut shp_file, Endianness::BigEndian)?;
                shp_bor.seek(entry.offset as u64 * 2)?;
                num = shp_bor.read_i32()?;
            }
        }

        let mut shp = ByteOrderWriter::new(shp_file, Endianness::BigEndian);
        shp.seek_end()?;
        let mut shx = ByteOrderWriter::new(shx_file, Endianness::BigEndian);
        shx.seek_end()?;

        // the attribute table is optional
        let dbf = match OpenOptions::new()
            .read(true)
            .write(true)
            .open(format!("{}.dbf", basename))
        {
            Ok(mut f) => {
                let (header, fields) = {
                    let mut bor = ByteOrderReader::new(&mut f, Endianness::LittleEndian)?;
                    attributes::read_header(&mut bor)?
                };
                let mut bow = ByteOrderWriter::new(f, Endianness::LittleEndian);
                bow.seek_end()?;
                DbfState::Ready {
                    file: bow,
                    fields,
                    header_length: header.header_length,
                    record_length: header.record_length,
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => DbfState::Unset,
            Err(e) => return Err(e.into()),
        };

        Ok(Writer {
            file_name: basename,
            shp,
            shx,
            geometry_type,
            num,
            bbox,
            dbf,
        })
    }

    /// Writes one shape record, appends its index entry, and, when the
    /// attribute table exists, a blank row to keep the files
    /// row-aligned. Returns the record index for `write_attribute`.
    pub fn write(&mut self, shape: &Shape) -> Result<i32, ShapeError> {
        if self.num == 0 {
            self.bbox = shape.bbox();
        } else {
            self.bbox.extend(shape.bbox());
        }

        self.num += 1;
        self.shp.set_byte_order(Endianness::BigEndian);
        self.shp.write_i32(self.num)?;
        self.shp.write_i32(0)?; // content length, patched below
        let start = self.shp.stream_position()?;
        self.shp.set_byte_order(Endianness::LittleEndian);
        self.shp.write_i32(shape.shape_type().to_int())?;
        shape.write(&mut self.shp)?;
        let finish = self.shp.stream_position()?;
        let content_length = ((finish - start) / 2) as i32;
        self.shp.seek(start - 4)?;
        self.shp.set_byte_order(Endianness::BigEndian);
        self.shp.write_i32(content_length)?;
        self.shp.seek(finish)?;

        IndexEntry {
            offset: ((start - 8) / 2) as i32,
            content_length,
        }
        .write(&mut self.shx)?;

        if let DbfState::Ready {
            file,
            record_length,
            ..
        } = &mut self.dbf
        {
            file.seek_end()?;
            file.write_bytes(&vec![b' '; *record_length as usize])?;
        }

        Ok(self.num - 1)
    }

    /// Declares the DBF schema. This creates the attribute table and
    /// retroactively materializes a blank row for every record already
    /// written. Declaring the schema twice is an error.
    pub fn set_fields(&mut self, fields: Vec<AttributeField>) -> Result<(), ShapeError> {
        if let DbfState::Ready { .. } = self.dbf {
            return Err(ShapeError::InvalidField(
                "attribute schema is already set".to_string(),
            ));
        }
        let file = File::create(format!("{}.dbf", self.file_name))?;
        let mut bow = ByteOrderWriter::new(file, Endianness::LittleEndian);
        let header_length = attributes::header_length_of(&fields);
        let record_length = attributes::record_length_of(&fields);
        // reserve header space; the real header is written at close
        bow.write_bytes(&vec![0u8; header_length as usize])?;
        for _ in 0..self.num {
            bow.write_bytes(&vec![b' '; record_length as usize])?;
        }
        self.dbf = DbfState::Ready {
            file: bow,
            fields,
            header_length,
            record_length,
        };
        Ok(())
    }

    /// Writes one attribute cell for a row that has already been
    /// written. The schema must have been declared first.
    pub fn write_attribute(
        &mut self,
        row: usize,
        field: usize,
        value: &FieldData,
    ) -> Result<(), ShapeError> {
        let num_records = self.num as usize;
        match &mut self.dbf {
            DbfState::Unset => Err(ShapeError::InvalidField(
                "declare the attribute schema with set_fields before writing attributes"
                    .to_string(),
            )),
            DbfState::Ready {
                file,
                fields,
                header_length,
                record_length,
            } => {
                if field >= fields.len() {
                    return Err(ShapeError::InvalidField(format!(
                        "no field at index {}",
                        field
                    )));
                }
                if row >= num_records {
                    return Err(ShapeError::InvalidField(format!(
                        "row {} has no record yet",
                        row
                    )));
                }
                let cell = attributes::encode_value(value, &fields[field])?;
                let offset =
                    attributes::cell_offset(*header_length, *record_length, fields, row, field);
                file.seek(offset)?;
                file.write_bytes(&cell)?;
                Ok(())
            }
        }
    }

    /// Rewrites the `.shp`, `.shx` and `.dbf` headers and releases the
    /// handles. A writer that was never given fields still closes the
    /// DBF with an empty schema.
    pub fn close(mut self) -> Result<(), ShapeError> {
        let mut shp_len = self.shp.seek_end()?;
        if shp_len == 0 {
            shp_len = FILE_HEADER_LEN;
        }
        ShapefileHeader::write(&mut self.shp, shp_len, self.geometry_type, self.bbox)?;
        self.shp.flush()?;

        let mut shx_len = self.shx.seek_end()?;
        if shx_len == 0 {
            shx_len = FILE_HEADER_LEN;
        }
        ShapefileHeader::write(&mut self.shx, shx_len, self.geometry_type, self.bbox)?;
        self.shx.flush()?;

        if let DbfState::Unset = self.dbf {
            self.set_fields(Vec::new())?;
        }
        let num_records = self.num as u32;
        if let DbfState::Ready { file, fields, .. } = &mut self.dbf {
            attributes::write_header(file, num_records, fields)?;
            file.flush()?;
        }
        Ok(())
    }

    /// The running file-level bounding box.
    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    pub fn geometry_type(&self) -> ShapeType {
        self.geometry_type
    }

    /// Number of records written so far (including any pre-existing
    /// records picked up by `append`).
    pub fn record_count(&self) -> i32 {
        self.num
    }
}

fn trim_shp_extension(file_name: &str) -> String {
    if file_name.to_lowercase().ends_with(".shp") {
        file_name[..file_name.len() - 4].to_string()
    } else {
        file_name.to_string()
    }
}
