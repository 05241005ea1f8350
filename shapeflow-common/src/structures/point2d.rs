/*
This code is part of the Shapeflow geospatial I/O library.
Created: 14/02/2025
Last Modified: 19/02/2025
License: MIT
*/
use std::fmt;

/// A 2-D point, with x and y fields.
#[derive(Default, Copy, Clone, Debug, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    /// Creates a new Point2D.
    pub fn new(x: f64, y: f64) -> Point2D {
        Point2D { x, y }
    }

    /// Returns true if either coordinate is NaN or infinite.
    pub fn is_non_finite(&self) -> bool {
        !self.x.is_finite() || !self.y.is_finite()
    }
}

impl fmt::Display for Point2D {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
