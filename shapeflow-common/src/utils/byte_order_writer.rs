/*
This code is part of the Shapeflow geospatial I/O library.
Created: 14/02/2025
Last Modified: 27/05/2026
License: MIT
*/
use super::byte_order_reader::Endianness;
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use std::io::prelude::*;
use std::io::{Result, SeekFrom};

/// The writing counterpart of `ByteOrderReader`. The stream must be
/// seekable because record and file headers are patched in place after
/// their payloads have been written.
pub struct ByteOrderWriter<W: Write + Seek> {
    is_le: bool,
    writer: W,
}

impl<W: Write + Seek> ByteOrderWriter<W> {
    pub fn new(writer: W, byte_order: Endianness) -> ByteOrderWriter<W> {
        ByteOrderWriter {
            is_le: byte_order == Endianness::LittleEndian,
            writer,
        }
    }

    pub fn set_byte_order(&mut self, byte_order: Endianness) {
        self.is_le = byte_order == Endianness::LittleEndian;
    }

    pub fn seek(&mut self, position: u64) -> Result<u64> {
        self.writer.seek(SeekFrom::Start(position))
    }

    /// Seeks to the end of the stream and returns the resulting offset,
    /// i.e. the current file length.
    pub fn seek_end(&mut self) -> Result<u64> {
        self.writer.seek(SeekFrom::End(0))
    }

    pub fn stream_position(&mut self) -> Result<u64> {
        self.writer.stream_position()
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.writer.write_u8(value)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        if self.is_le {
            self.writer.write_u16::<LittleEndian>(value)
        } else {
            self.writer.write_u16::<BigEndian>(value)
        }
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        if self.is_le {
            self.writer.write_u32::<LittleEndian>(value)
        } else {
            self.writer.write_u32::<BigEndian>(value)
        }
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        if self.is_le {
            self.writer.write_i32::<LittleEndian>(value)
        } else {
            self.writer.write_i32::<BigEndian>(value)
        }
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        if self.is_le {
            self.writer.write_f64::<LittleEndian>(value)
        } else {
            self.writer.write_f64::<BigEndian>(value)
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod test {
    use super::{ByteOrderWriter, Endianness};
    use std::io::Cursor;

    #[test]
    fn test_seek_back_patch() {
        let mut bow = ByteOrderWriter::new(Cursor::new(Vec::new()), Endianness::BigEndian);
        bow.write_i32(0).unwrap(); // placeholder
        bow.write_i32(7).unwrap();
        bow.seek(0).unwrap();
        bow.write_i32(42).unwrap();
        assert_eq!(bow.seek_end().unwrap(), 8);
        let buf = bow.into_inner().into_inner();
        assert_eq!(buf, vec![0, 0, 0, 42, 0, 0, 0, 7]);
    }

    #[test]
    fn test_endianness_switch() {
        let mut bow = ByteOrderWriter::new(Cursor::new(Vec::new()), Endianness::BigEndian);
        bow.write_i32(1).unwrap();
        bow.set_byte_order(Endianness::LittleEndian);
        bow.write_i32(1).unwrap();
        assert_eq!(bow.stream_position().unwrap(), 8);
    }
}
