/*
This code is part of the Shapeflow geospatial I/O library.
Created: 20/03/2025
Last Modified: 09/05/2026
License: MIT

Notes: A pluggable post-parse gate over decoded shapes. The reader
does not run it; callers that need NaN/consistency guarantees layer it
on after parsing or before writing.
*/
use crate::error::ShapeError;
use crate::shapefile::geometry::Shape;
use shapeflow_common::structures::Point2D;

pub trait Validate {
    fn validate(&self, shape: &Shape) -> Result<(), ShapeError>;
}

/// Checks bounding boxes and coordinates for NaN/infinity and the
/// structural invariants of multi-part geometries: strictly increasing
/// part starts within range, and Z/M arrays matching the point count.
pub struct DefaultValidator;

impl Validate for DefaultValidator {
    fn validate(&self, shape: &Shape) -> Result<(), ShapeError> {
        if !shape.bbox().is_valid() {
            return Err(ShapeError::InvalidFormat(
                "bounding box contains NaN or infinite values, or min exceeds max".to_string(),
            ));
        }
        match shape {
            Shape::Null => Ok(()),
            Shape::Point(p) => check_finite(&[p.x, p.y]),
            Shape::PointM(p) => check_finite(&[p.x, p.y, p.m]),
            Shape::PointZ(p) => check_finite(&[p.x, p.y, p.z, p.m.unwrap_or(0.0)]),
            Shape::MultiPoint(s) => check_points(&s.points),
            Shape::MultiPointM(s) => {
                check_points(&s.points)?;
                check_plane(s.m_array.len(), s.points.len(), "M")
            }
            Shape::MultiPointZ(s) => {
                check_points(&s.points)?;
                check_plane(s.z_array.len(), s.points.len(), "Z")?;
                if s.m_range.is_some() {
                    check_plane(s.m_array.len(), s.points.len(), "M")?;
                }
                Ok(())
            }
            Shape::PolyLine(s) => check_multipart(&s.parts, &s.points),
            Shape::Polygon(s) => check_multipart(&s.parts, &s.points),
            Shape::PolyLineM(s) => {
                check_multipart(&s.parts, &s.points)?;
                check_plane(s.m_array.len(), s.points.len(), "M")
            }
            Shape::PolygonM(s) => {
                check_multipart(&s.parts, &s.points)?;
                check_plane(s.m_array.len(), s.points.len(), "M")
            }
            Shape::PolyLineZ(s) => {
                check_multipart(&s.parts, &s.points)?;
                check_plane(s.z_array.len(), s.points.len(), "Z")?;
                if s.m_range.is_some() {
                    check_plane(s.m_array.len(), s.points.len(), "M")?;
                }
                Ok(())
            }
            Shape::PolygonZ(s) => {
                check_multipart(&s.parts, &s.points)?;
                check_plane(s.z_array.len(), s.points.len(), "Z")?;
                if s.m_range.is_some() {
                    check_plane(s.m_array.len(), s.points.len(), "M")?;
                }
                Ok(())
            }
            Shape::MultiPatch(s) => {
                check_multipart(&s.parts, &s.points)?;
                if s.part_types.len() != s.parts.len() {
                    return Err(ShapeError::InvalidFormat(
                        "part types array length mismatch".to_string(),
                    ));
                }
                check_plane(s.z_array.len(), s.points.len(), "Z")?;
                if s.m_range.is_some() {
                    check_plane(s.m_array.len(), s.points.len(), "M")?;
                }
                Ok(())
            }
        }
    }
}

fn check_finite(values: &[f64]) -> Result<(), ShapeError> {
    for v in values {
        if !v.is_finite() {
            return Err(ShapeError::InvalidFormat(
                "coordinate contains NaN or infinite values".to_string(),
            ));
        }
    }
    Ok(())
}

fn check_points(points: &[Point2D]) -> Result<(), ShapeError> {
    for (i, p) in points.iter().enumerate() {
        if p.is_non_finite() {
            return Err(ShapeError::InvalidFormat(format!(
                "invalid point at index {}",
                i
            )));
        }
    }
    Ok(())
}

fn check_multipart(parts: &[i32], points: &[Point2D]) -> Result<(), ShapeError> {
    let mut previous = -1i64;
    for &part in parts {
        let part = part as i64;
        if part <= previous || part < 0 || part >= points.len() as i64 {
            return Err(ShapeError::InvalidFormat(
                "part start indices must be strictly increasing and within the points array"
                    .to_string(),
            ));
        }
        previous = part;
    }
    check_points(points)
}

fn check_plane(len: usize, num_points: usize, plane: &str) -> Result<(), ShapeError> {
    if len != num_points {
        return Err(ShapeError::InvalidFormat(format!(
            "{} array length mismatch",
            plane
        )));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shapefile::geometry::{PolyLine, Shape};
    use shapeflow_common::structures::BoundingBox;

    #[test]
    fn test_valid_polyline_passes() {
        let parts = vec![
            vec![Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0)],
            vec![Point2D::new(2.0, 2.0), Point2D::new(3.0, 3.0)],
        ];
        let shape = Shape::PolyLine(PolyLine::new(&parts));
        assert!(DefaultValidator.validate(&shape).is_ok());
    }

    #[test]
    fn test_nan_point_is_rejected() {
        let shape = Shape::Point(Point2D::new(f64::NAN, 0.0));
        assert!(DefaultValidator.validate(&shape).is_err());
    }

    #[test]
    fn test_non_monotonic_parts_are_rejected() {
        let shape = Shape::PolyLine(PolyLine {
            bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            parts: vec![0, 3, 2],
            points: vec![Point2D::default(); 5],
        });
        assert!(DefaultValidator.validate(&shape).is_err());
    }

    #[test]
    fn test_empty_part_is_rejected() {
        let shape = Shape::PolyLine(PolyLine {
            bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            parts: vec![0, 2, 2],
            points: vec![Point2D::default(); 4],
        });
        assert!(DefaultValidator.validate(&shape).is_err());
    }
}
