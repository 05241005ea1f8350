/*
This code is part of the Shapeflow geospatial I/O library.
Created: 14/02/2025
Last Modified: 03/06/2026
License: MIT
*/

// private sub-modules defined in other files
mod bounding_box;
mod point2d;

pub use self::bounding_box::BoundingBox;
pub use self::point2d::Point2D;
