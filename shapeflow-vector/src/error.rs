/*
This code is part of the Shapeflow geospatial I/O library.
Created: 18/02/2025
Last Modified: 03/06/2026
License: MIT
*/
use thiserror::Error;

/// The error type for every fallible operation in the library. Each
/// variant is one of the five error kinds; the message describes the
/// concrete failure and, for I/O, the underlying cause rides along.
#[derive(Debug, Error)]
pub enum ShapeError {
    /// Header magic, version or extension is wrong, or a bounding box
    /// contains NaN/infinity or has min > max.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// A record extends past the end of the file, declares a negative
    /// length, or its payload could not be read in full.
    #[error("corrupted file: {0}")]
    CorruptedFile(String),

    /// A shape-type tag outside the fourteen known values.
    #[error("unsupported shape type: {0}")]
    UnsupportedType(i32),

    /// A DBF cell value exceeds its declared length, an attribute was
    /// written before the schema was set, or the schema was re-declared.
    #[error("invalid field: {0}")]
    InvalidField(String),

    /// An underlying file-system error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// The kind tag of a `ShapeError`, for callers that dispatch on the
/// category rather than the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidFormat,
    CorruptedFile,
    UnsupportedType,
    InvalidField,
    Io,
}

impl ShapeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShapeError::InvalidFormat(_) => ErrorKind::InvalidFormat,
            ShapeError::CorruptedFile(_) => ErrorKind::CorruptedFile,
            ShapeError::UnsupportedType(_) => ErrorKind::UnsupportedType,
            ShapeError::InvalidField(_) => ErrorKind::InvalidField,
            ShapeError::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<serde_json::Error> for ShapeError {
    fn from(err: serde_json::Error) -> ShapeError {
        ShapeError::InvalidFormat(format!("json: {}", err))
    }
}
