/*
This code is part of the Shapeflow geospatial I/O library.
Created: 14/02/2025
Last Modified: 03/06/2026
License: MIT
*/

pub mod structures;
pub mod utils;
