//! Stateless vector arithmetic over coordinate slices of arbitrary dimensionality.
//!
//! All functions take plain `&[f64]` slices so that they can be used with kd-tree payloads of any
//! dimension as well as with `nalgebra` vectors (through `as_slice()`). Functions that only make sense
//! in a fixed dimension (cross product, axis rotation, 2D turn angles) say so in their documentation.

use std::f64::consts::PI;

/// Coordinate axis of the 3D space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Component-wise sum of `a` and `b`
pub fn add(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b.iter()).map(|(x, y)| x + y).collect()
}

/// Component-wise difference `a - b`
pub fn subtract(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b.iter()).map(|(x, y)| x - y).collect()
}

/// Multiplies every component of `v` with `factor`
pub fn scale(v: &[f64], factor: f64) -> Vec<f64> {
    v.iter().map(|x| x * factor).collect()
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Euclidean length of `v`
pub fn length(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

/// Squared euclidean distance between `a` and `b`
pub fn distance_squared(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

/// Euclidean distance between `a` and `b`
///
/// ```
/// # use facet_core::math::vector::distance;
/// assert_eq!(distance(&[0.0, 0.0, 0.0], &[0.0, 3.0, 4.0]), 5.0);
/// ```
pub fn distance(a: &[f64], b: &[f64]) -> f64 {
    distance_squared(a, b).sqrt()
}

/// Returns true if every component of `v` is finite and `v` is not empty
pub fn is_valid_vector(v: &[f64]) -> bool {
    !v.is_empty() && v.iter().all(|x| x.is_finite())
}

/// Returns `v` scaled to unit length, or `None` if `v` has zero length or contains NaN/Inf components
pub fn normalize(v: &[f64]) -> Option<Vec<f64>> {
    if !is_valid_vector(v) {
        return None;
    }
    let len = length(v);
    if len == 0.0 || !len.is_finite() {
        return None;
    }
    Some(scale(v, 1.0 / len))
}

/// Angle between `a` and `b` in radians, in the range `[0, π]`. Returns NaN if one of the vectors
/// has zero length.
pub fn angle_between(a: &[f64], b: &[f64]) -> f64 {
    let denominator = length(a) * length(b);
    if denominator == 0.0 {
        return f64::NAN;
    }
    // Rounding can push the cosine slightly out of [-1, 1]
    (dot(a, b) / denominator).max(-1.0).min(1.0).acos()
}

/// Angle between the undirected lines spanned by `a` and `b` in radians, in the range `[0, π/2]`.
/// This is the angle to use for plane normals whose sign carries no meaning.
pub fn acute_angle_between(a: &[f64], b: &[f64]) -> f64 {
    let angle = angle_between(a, b);
    if angle > PI / 2.0 {
        PI - angle
    } else {
        angle
    }
}

/// Cross product of two 3D vectors
///
/// # Panics
///
/// If `a` or `b` has less than three components
pub fn cross(a: &[f64], b: &[f64]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Rotates the 3D vector `v` counterclockwise around `axis` by `angle` radians (right-hand rule)
///
/// ```
/// # use facet_core::math::vector::{rotate_around_axis, Axis};
/// let rotated = rotate_around_axis(&[1.0, 0.0, 0.0], Axis::Z, std::f64::consts::FRAC_PI_2);
/// assert!((rotated[0]).abs() < 1e-12);
/// assert!((rotated[1] - 1.0).abs() < 1e-12);
/// ```
pub fn rotate_around_axis(v: &[f64], axis: Axis, angle: f64) -> [f64; 3] {
    let (sin, cos) = angle.sin_cos();
    let (x, y, z) = (v[0], v[1], v[2]);
    match axis {
        Axis::X => [x, y * cos - z * sin, y * sin + z * cos],
        Axis::Y => [x * cos + z * sin, y, -x * sin + z * cos],
        Axis::Z => [x * cos - y * sin, x * sin + y * cos, z],
    }
}

/// Angle in radians, within `[0, 2π)`, by which the 2D direction `from` has to be turned
/// counterclockwise to point along the 2D direction `to`.
pub fn counter_clockwise_angle(from: &[f64], to: &[f64]) -> f64 {
    let angle = to[1].atan2(to[0]) - from[1].atan2(from[0]);
    let wrapped = angle.rem_euclid(2.0 * PI);
    // rem_euclid may return exactly 2π for tiny negative inputs
    if wrapped >= 2.0 * PI {
        0.0
    } else {
        wrapped
    }
}

/// Sign of the 2D cross product `(b - a) x (c - a)`: positive if `c` lies left of the directed line `a -> b`
pub fn orientation_2d(a: &[f64], b: &[f64], c: &[f64]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

/// Returns true if the 2D segments `a1 a2` and `b1 b2` cross each other in a single point that is interior
/// to both of them. Touching endpoints and collinear overlaps are not considered crossings.
pub fn segments_intersect(a1: &[f64], a2: &[f64], b1: &[f64], b2: &[f64]) -> bool {
    let o1 = orientation_2d(a1, a2, b1);
    let o2 = orientation_2d(a1, a2, b2);
    let o3 = orientation_2d(b1, b2, a1);
    let o4 = orientation_2d(b1, b2, a2);
    o1 * o2 < 0.0 && o3 * o4 < 0.0
}

/// Intersection point of the two infinite 2D lines through `a1 a2` and `b1 b2`. Returns `None` if the lines
/// are parallel or one of them is degenerate.
pub fn line_intersection(a1: &[f64], a2: &[f64], b1: &[f64], b2: &[f64]) -> Option<[f64; 2]> {
    let da = [a2[0] - a1[0], a2[1] - a1[1]];
    let db = [b2[0] - b1[0], b2[1] - b1[1]];
    let denominator = da[0] * db[1] - da[1] * db[0];
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }
    let t = ((b1[0] - a1[0]) * db[1] - (b1[1] - a1[1]) * db[0]) / denominator;
    Some([a1[0] + t * da[0], a1[1] + t * da[1]])
}

pub fn degrees_to_radians(degrees: f64) -> f64 {
    degrees * PI / 180.0
}

pub fn radians_to_degrees(radians: f64) -> f64 {
    radians * 180.0 / PI
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_distance_and_length() {
        assert_eq!(distance(&[1.0, 1.0], &[4.0, 5.0]), 5.0);
        assert_eq!(length(&[3.0, 4.0, 12.0]), 13.0);
        assert_eq!(distance_squared(&[0.0], &[2.0]), 4.0);
    }

    #[test]
    fn test_normalize_rejects_degenerate_vectors() {
        assert!(normalize(&[0.0, 0.0, 0.0]).is_none());
        assert!(normalize(&[f64::NAN, 1.0, 0.0]).is_none());
        assert!(normalize(&[]).is_none());

        let unit = normalize(&[0.0, 0.0, 2.0]).unwrap();
        assert_eq!(unit, vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_angles() {
        assert_approx_eq!(angle_between(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]), PI / 2.0);
        assert_approx_eq!(angle_between(&[1.0, 0.0], &[-1.0, 0.0]), PI);
        assert_approx_eq!(acute_angle_between(&[0.0, 0.0, 1.0], &[0.0, 0.0, -1.0]), 0.0);
        assert!(angle_between(&[0.0, 0.0], &[1.0, 0.0]).is_nan());
    }

    #[test]
    fn test_counter_clockwise_angle() {
        assert_approx_eq!(counter_clockwise_angle(&[1.0, 0.0], &[0.0, 1.0]), PI / 2.0);
        assert_approx_eq!(counter_clockwise_angle(&[0.0, 1.0], &[1.0, 0.0]), 1.5 * PI);
        assert_approx_eq!(counter_clockwise_angle(&[0.0, -1.0], &[1.0, 0.0]), PI / 2.0);
        assert_eq!(counter_clockwise_angle(&[1.0, 0.0], &[2.0, 0.0]), 0.0);
    }

    #[test]
    fn test_rotation_maps_axes() {
        let v = rotate_around_axis(&[0.0, 1.0, 0.0], Axis::X, PI / 2.0);
        assert_approx_eq!(v[0], 0.0);
        assert_approx_eq!(v[1], 0.0);
        assert_approx_eq!(v[2], 1.0);

        let v = rotate_around_axis(&[0.0, 0.0, 1.0], Axis::Y, PI / 2.0);
        assert_approx_eq!(v[0], 1.0);
        assert_approx_eq!(v[2], 0.0);
    }

    #[test]
    fn test_cross() {
        assert_eq!(cross(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_segments_intersect() {
        assert!(segments_intersect(
            &[0.0, 0.0],
            &[1.0, 1.0],
            &[0.0, 1.0],
            &[1.0, 0.0]
        ));
        // shared endpoint
        assert!(!segments_intersect(
            &[0.0, 0.0],
            &[1.0, 0.0],
            &[1.0, 0.0],
            &[1.0, 1.0]
        ));
        // collinear overlap
        assert!(!segments_intersect(
            &[0.0, 0.0],
            &[2.0, 0.0],
            &[1.0, 0.0],
            &[3.0, 0.0]
        ));
        assert!(!segments_intersect(
            &[0.0, 0.0],
            &[1.0, 0.0],
            &[0.0, 1.0],
            &[1.0, 1.0]
        ));
    }

    #[test]
    fn test_line_intersection() {
        let p = line_intersection(&[0.0, 0.0], &[2.0, 2.0], &[0.0, 2.0], &[2.0, 0.0]).unwrap();
        assert_approx_eq!(p[0], 1.0);
        assert_approx_eq!(p[1], 1.0);
        assert!(line_intersection(&[0.0, 0.0], &[1.0, 0.0], &[0.0, 1.0], &[1.0, 1.0]).is_none());
    }
}
