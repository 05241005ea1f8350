/*
This code is part of the Shapeflow geospatial I/O library.
Created: 18/02/2025
Last Modified: 21/04/2026
License: MIT
*/

/// Configuration recognized by `Reader::open_with_options`.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Divert per-record failures to the resynchronization routine
    /// instead of failing the iteration.
    pub ignore_corrupted_shapes: bool,
    /// Emit diagnostics through the `log` facade.
    pub debug: bool,
    /// Advisory ceiling, in bytes, on translator buffering. Conversions
    /// switch to the streaming path above this size.
    pub max_memory_usage: u64,
    /// Controls buffering of the underlying file reads.
    pub enable_buffering: bool,
    pub buffer_size: usize,
}

impl Default for ReaderOptions {
    fn default() -> ReaderOptions {
        ReaderOptions {
            ignore_corrupted_shapes: false,
            debug: false,
            max_memory_usage: 100 * 1024 * 1024,
            enable_buffering: true,
            buffer_size: 64 * 1024,
        }
    }
}

impl ReaderOptions {
    pub fn with_ignore_corrupted_shapes(mut self, ignore: bool) -> ReaderOptions {
        self.ignore_corrupted_shapes = ignore;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> ReaderOptions {
        self.debug = debug;
        self
    }

    pub fn with_max_memory_usage(mut self, bytes: u64) -> ReaderOptions {
        self.max_memory_usage = bytes;
        self
    }

    pub fn with_buffering(mut self, enabled: bool, size: usize) -> ReaderOptions {
        self.enable_buffering = enabled;
        self.buffer_size = size;
        self
    }
}
