/*
This code is part of the Shapeflow geospatial I/O library.
Created: 14/02/2025
Last Modified: 27/05/2026
License: MIT
*/
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use std::io::prelude::*;
use std::io::{Result, SeekFrom};

/// A positioned reader that decodes integers and floats in a selectable
/// byte order. The shapefile family mixes big- and little-endian fields
/// within one stream, so the byte order can be switched between reads.
///
/// Every read propagates the underlying I/O error; a short read at
/// end-of-stream surfaces as `ErrorKind::UnexpectedEof`.
pub struct ByteOrderReader<R: Read + Seek> {
    is_le: bool,
    reader: R,
    pos: u64,
    len: u64,
}

impl<R: Read + Seek> ByteOrderReader<R> {
    pub fn new(mut reader: R, byte_order: Endianness) -> Result<ByteOrderReader<R>> {
        let len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        Ok(ByteOrderReader {
            is_le: byte_order == Endianness::LittleEndian,
            reader,
            pos: 0,
            len,
        })
    }

    pub fn set_byte_order(&mut self, byte_order: Endianness) {
        self.is_le = byte_order == Endianness::LittleEndian;
    }

    pub fn seek(&mut self, position: u64) -> Result<()> {
        self.pos = position;
        self.reader.seek(SeekFrom::Start(position))?;
        Ok(())
    }

    /// Skips `skip` bytes forward without decoding them.
    pub fn inc_pos(&mut self, skip: u64) -> Result<()> {
        self.seek(self.pos + skip)
    }

    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// The total stream length, captured at construction.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads `length` bytes and interprets them as (lossy) UTF-8.
    pub fn read_utf8(&mut self, length: usize) -> Result<String> {
        let mut bytes = vec![0u8; length];
        self.read_exact(&mut bytes)?;
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reader.read_exact(buf)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let val = self.reader.read_u8()?;
        self.pos += 1;
        Ok(val)
    }

    /// Reads one byte and rewinds, leaving the position unchanged.
    pub fn peek_u8(&mut self) -> Result<u8> {
        let val = self.reader.read_u8()?;
        self.reader.seek(SeekFrom::Start(self.pos))?;
        Ok(val)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let val = if self.is_le {
            self.reader.read_u16::<LittleEndian>()?
        } else {
            self.reader.read_u16::<BigEndian>()?
        };
        self.pos += 2;
        Ok(val)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let val = if self.is_le {
            self.reader.read_u32::<LittleEndian>()?
        } else {
            self.reader.read_u32::<BigEndian>()?
        };
        self.pos += 4;
        Ok(val)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let val = if self.is_le {
            self.reader.read_i32::<LittleEndian>()?
        } else {
            self.reader.read_i32::<BigEndian>()?
        };
        self.pos += 4;
        Ok(val)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let val = if self.is_le {
            self.reader.read_f64::<LittleEndian>()?
        } else {
            self.reader.read_f64::<BigEndian>()?
        };
        self.pos += 8;
        Ok(val)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Endianness {
    LittleEndian,
    BigEndian,
}

impl Default for Endianness {
    fn default() -> Endianness {
        Endianness::LittleEndian
    }
}

#[cfg(test)]
mod test {
    use super::{ByteOrderReader, Endianness};
    use std::io::Cursor;

    #[test]
    fn test_mixed_endian_reads() {
        // 1i32 BE followed by 1i32 LE
        let data = vec![0u8, 0, 0, 1, 1, 0, 0, 0];
        let mut bor = ByteOrderReader::new(Cursor::new(data), Endianness::BigEndian).unwrap();
        assert_eq!(bor.read_i32().unwrap(), 1);
        bor.set_byte_order(Endianness::LittleEndian);
        assert_eq!(bor.read_i32().unwrap(), 1);
        assert_eq!(bor.pos(), 8);
    }

    #[test]
    fn test_peek_does_not_advance() {
        let mut bor =
            ByteOrderReader::new(Cursor::new(vec![0x0d, 0x20]), Endianness::LittleEndian).unwrap();
        assert_eq!(bor.peek_u8().unwrap(), 0x0d);
        assert_eq!(bor.read_u8().unwrap(), 0x0d);
        assert_eq!(bor.pos(), 1);
    }

    #[test]
    fn test_short_read_is_an_error() {
        let mut bor =
            ByteOrderReader::new(Cursor::new(vec![1u8, 2]), Endianness::LittleEndian).unwrap();
        assert!(bor.read_i32().is_err());
    }
}
