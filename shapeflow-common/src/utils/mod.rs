/*
This code is part of the Shapeflow geospatial I/O library.
Created: 14/02/2025
Last Modified: 03/06/2026
License: MIT
*/

mod byte_order_reader;
mod byte_order_writer;

pub use self::byte_order_reader::{ByteOrderReader, Endianness};
pub use self::byte_order_writer::ByteOrderWriter;
