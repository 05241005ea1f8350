/*
This code is part of the Shapeflow geospatial I/O library.
Created: 28/02/2025
Last Modified: 14/06/2026
License: MIT

Notes: The streaming shapefile reader. Records are decoded one at a
time; with `ignore_corrupted_shapes` enabled the reader scans forward
for the next plausible record header instead of failing the iteration.
*/
use crate::error::ShapeError;
use crate::options::ReaderOptions;
use crate::shapefile::attributes::{self, AttributeField, AttributeHeader};
use crate::shapefile::geometry::{Shape, ShapeType};
use crate::shapefile::{read_record_header, ShapefileHeader};
use log::debug;
use shapeflow_common::structures::BoundingBox;
use shapeflow_common::utils::{ByteOrderReader, Endianness};
use std::fs::File;
use std::io::BufReader;

/// Step, in bytes, between candidate offsets during resynchronization.
pub const RESYNC_STRIDE: u64 = 4;
/// A candidate record header is rejected when its content length (in
/// 16-bit words) reaches this bound.
pub const MAX_PLAUSIBLE_CONTENT_WORDS: i32 = 100_000;

/// A streaming reader over the `.shp`/`.shx`/`.dbf` triple identified
/// by one basename. Calls to `next` advance by exactly one record; the
/// record is then available through `shape` and `read_attribute`.
pub struct Reader {
    file_name: String, // basename, without extension
    geometry_type: ShapeType,
    bbox: BoundingBox,
    shp: ByteOrderReader<BufReader<File>>,
    /// Iteration bound in bytes: the smaller of the header-declared
    /// length and the physical file size.
    file_length: u64,
    shape: Shape,
    num: i32,
    err: Option<ShapeError>,
    options: ReaderOptions,
    dbf: Option<DbfTable>,
    dbf_attempted: bool,
}

/// The lazily opened attribute table.
struct DbfTable {
    bor: ByteOrderReader<BufReader<File>>,
    header: AttributeHeader,
    fields: Vec<AttributeField>,
}

impl Reader {
    pub fn open(file_name: &str) -> Result<Reader, ShapeError> {
        Reader::open_with_options(file_name, ReaderOptions::default())
    }

    pub fn open_with_options(
        file_name: &str,
        options: ReaderOptions,
    ) -> Result<Reader, ShapeError> {
        if !file_name.to_lowercase().ends_with(".shp") {
            return Err(ShapeError::InvalidFormat(format!(
                "invalid file extension: {}",
                file_name
            )));
        }
        let basename = file_name[..file_name.len() - 4].to_string();

        let file = File::open(file_name)?;
        let capacity = if options.enable_buffering {
            options.buffer_size
        } else {
            0
        };
        let mut shp = ByteOrderReader::new(
            BufReader::with_capacity(capacity, file),
            Endianness::BigEndian,
        )?;
        let physical = shp.len();
        let header = ShapefileHeader::read(&mut shp)?;

        // don't trust the header-declared length alone
        let declared = header.file_length.max(0) as u64 * 2;
        let file_length = declared.min(physical);
        if options.debug {
            debug!(
                "opened {}: {} records bound at {} bytes ({} declared, {} physical)",
                file_name, header.shape_type, file_length, declared, physical
            );
        }

        Ok(Reader {
            file_name: basename,
            geometry_type: header.shape_type,
            bbox: header.bbox,
            shp,
            file_length,
            shape: Shape::Null,
            num: 0,
            err: None,
            options,
            dbf: None,
            dbf_attempted: false,
        })
    }

    /// Advances to the next record. Returns false at the end of the
    /// file or on error; a clean end at a record boundary is not an
    /// error and leaves `err` empty.
    pub fn next(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }
        match self.advance() {
            Ok(have_record) => have_record,
            Err(e) => {
                self.err = Some(e);
                false
            }
        }
    }

    fn advance(&mut self) -> Result<bool, ShapeError> {
        let mut cur = self.shp.pos();
        loop {
            if cur >= self.file_length {
                return Ok(false);
            }
            let (err, resync_from) = match self.read_record_at(cur) {
                Ok(()) => return Ok(true),
                Err(fail) => fail,
            };
            if !self.options.ignore_corrupted_shapes {
                return Err(err);
            }
            if self.options.debug {
                debug!("skipping corrupted record at offset {}: {}", cur, err);
            }
            match self.resync(resync_from)? {
                Some(offset) => cur = offset,
                None => {
                    // no plausible record remains
                    self.shp.seek(self.file_length)?;
                    return Ok(false);
                }
            }
        }
    }

    /// Attempts to read one full record at `cur`. On failure, returns
    /// the error together with the offset resynchronization should
    /// start from: right after the record header when the header was
    /// readable, `cur` itself otherwise.
    fn read_record_at(&mut self, cur: u64) -> Result<(), (ShapeError, u64)> {
        if let Err(e) = self.shp.seek(cur) {
            return Err((e.into(), cur));
        }
        let (num, content_words, raw_type) = match read_record_header(&mut self.shp) {
            Ok(triple) => triple,
            Err(e) => {
                let err = ShapeError::CorruptedFile(format!("failed to read record header: {}", e));
                return Err((err, cur));
            }
        };
        let after_header = cur + 8;
        if content_words < 0 {
            let err =
                ShapeError::CorruptedFile(format!("negative content length {}", content_words));
            return Err((err, after_header));
        }
        let end = after_header + content_words as u64 * 2;
        if end > self.file_length {
            let err = ShapeError::CorruptedFile(format!(
                "record ends at byte {} but the file ends at {}",
                end, self.file_length
            ));
            return Err((err, after_header));
        }
        let shape_type = match ShapeType::from_int(raw_type) {
            Ok(st) => st,
            Err(e) => return Err((e, after_header)),
        };
        match Shape::read(shape_type, content_words * 2, &mut self.shp) {
            Ok(shape) => {
                self.shape = shape;
                self.num = num;
            }
            Err(e) => return Err((e, after_header)),
        }
        if let Err(e) = self.shp.seek(end) {
            return Err((e.into(), after_header));
        }
        Ok(())
    }

    /// Scans forward from `from` in `RESYNC_STRIDE` steps for the next
    /// offset at which a plausible record header starts. Returns None
    /// when the end of the file is reached first.
    fn resync(&mut self, from: u64) -> Result<Option<u64>, ShapeError> {
        let mut pos = from;
        while pos + 12 <= self.file_length {
            self.shp.seek(pos)?;
            match read_record_header(&mut self.shp) {
                Ok((_, content_words, raw_type)) => {
                    if content_words >= 0
                        && content_words < MAX_PLAUSIBLE_CONTENT_WORDS
                        && ShapeType::is_known(raw_type)
                        && pos + 8 + content_words as u64 * 2 <= self.file_length
                    {
                        if self.options.debug {
                            debug!("resynchronized at offset {}", pos);
                        }
                        return Ok(Some(pos));
                    }
                }
                Err(_) => return Ok(None),
            }
            pos += RESYNC_STRIDE;
        }
        Ok(None)
    }

    /// The zero-based index and geometry of the most recently read
    /// record. The reference is valid until the next call to `next`.
    pub fn shape(&self) -> (usize, &Shape) {
        (self.current_index(), &self.shape)
    }

    pub fn current_index(&self) -> usize {
        if self.num > 0 {
            self.num as usize - 1
        } else {
            0
        }
    }

    /// The file-level bounding box from the header.
    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    pub fn geometry_type(&self) -> ShapeType {
        self.geometry_type
    }

    /// The last non-EOF error encountered.
    pub fn err(&self) -> Option<&ShapeError> {
        self.err.as_ref()
    }

    /// Releases the file handles, surfacing any stored iteration error.
    pub fn close(self) -> Result<(), ShapeError> {
        match self.err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn ensure_dbf(&mut self) {
        if self.dbf_attempted {
            return;
        }
        self.dbf_attempted = true;
        let path = format!("{}.dbf", self.file_name);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) => {
                if self.options.debug {
                    debug!("no attribute table at {}: {}", path, e);
                }
                return;
            }
        };
        let capacity = if self.options.enable_buffering {
            self.options.buffer_size
        } else {
            0
        };
        let table = ByteOrderReader::new(
            BufReader::with_capacity(capacity, file),
            Endianness::LittleEndian,
        )
        .map_err(ShapeError::from)
        .and_then(|mut bor| {
            let (header, fields) = attributes::read_header(&mut bor)?;
            Ok(DbfTable {
                bor,
                header,
                fields,
            })
        });
        match table {
            Ok(t) => self.dbf = Some(t),
            Err(e) => {
                if self.options.debug {
                    debug!("unreadable attribute table at {}: {}", path, e);
                }
            }
        }
    }

    /// The DBF field schema; empty when no attribute table exists.
    pub fn fields(&mut self) -> &[AttributeField] {
        self.ensure_dbf();
        match &self.dbf {
            Some(t) => &t.fields,
            None => &[],
        }
    }

    /// Number of rows in the attribute table.
    pub fn attribute_count(&mut self) -> usize {
        self.ensure_dbf();
        self.dbf
            .as_ref()
            .map(|t| t.header.num_records as usize)
            .unwrap_or(0)
    }

    /// Reads one cell, trimmed of padding spaces. Attribute failures
    /// are local: any problem yields the empty string and iteration
    /// keeps advancing.
    pub fn read_attribute(&mut self, row: usize, field: usize) -> String {
        self.ensure_dbf();
        let table = match self.dbf.as_mut() {
            Some(t) => t,
            None => return String::new(),
        };
        if field >= table.fields.len() || row >= table.header.num_records as usize {
            return String::new();
        }
        let offset = attributes::cell_offset(
            table.header.header_length,
            table.header.record_length,
            &table.fields,
            row,
            field,
        );
        if table.bor.seek(offset).is_err() {
            return String::new();
        }
        match table.bor.read_utf8(table.fields[field].field_length as usize) {
            Ok(s) => s.trim_matches(|c| c == ' ' || c == '\0').to_string(),
            Err(_) => String::new(),
        }
    }

    /// The n-th attribute of the most recently read record.
    pub fn attribute(&mut self, field: usize) -> String {
        let row = self.current_index();
        self.read_attribute(row, field)
    }
}
