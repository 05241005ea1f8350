/*
This code is part of the Shapeflow geospatial I/O library.
Created: 14/02/2025
Last Modified: 11/03/2025
License: MIT
*/
use super::Point2D;
use std::f64;

/// An axis-aligned bounding rectangle, stored in the on-disk field order
/// of the shapefile header (x-min, y-min, x-max, y-max).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> BoundingBox {
        BoundingBox {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Returns the box of a point sequence. An empty sequence yields the
    /// all-zero box.
    pub fn from_points(points: &[Point2D]) -> BoundingBox {
        if points.is_empty() {
            return BoundingBox::default();
        }
        let mut bb = BoundingBox {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for p in points {
            if p.x < bb.min_x {
                bb.min_x = p.x;
            }
            if p.x > bb.max_x {
                bb.max_x = p.x;
            }
            if p.y < bb.min_y {
                bb.min_y = p.y;
            }
            if p.y > bb.max_y {
                bb.max_y = p.y;
            }
        }
        bb
    }

    /// Grows the box to the componentwise union with `other`.
    pub fn extend(&mut self, other: BoundingBox) {
        if other.min_x < self.min_x {
            self.min_x = other.min_x;
        }
        if other.min_y < self.min_y {
            self.min_y = other.min_y;
        }
        if other.max_x > self.max_x {
            self.max_x = other.max_x;
        }
        if other.max_y > self.max_y {
            self.max_y = other.max_y;
        }
    }

    /// A box is valid when every bound is finite and the minima do not
    /// exceed the maxima.
    pub fn is_valid(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
            && self.min_x <= self.max_x
            && self.min_y <= self.max_y
    }
}
