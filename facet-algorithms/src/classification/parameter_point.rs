use facet_core::kdtree::KdPoint;
use facet_core::math::vector::{acute_angle_between, angle_between};
use facet_core::nalgebra::Vector3;

use super::SpatialDomainPoint;

/// A fitted plane as a point of the parameter domain. Its coordinate is the foot of the perpendicular from the
/// origin onto the plane, and it refers back to the spatial point it was derived from by index
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDomainPoint {
    coordinate: [f64; 3],
    normal: Vector3<f64>,
    spatial_index: usize,
    pub(crate) extent_point_count: usize,
    pub(crate) added_to_plane: bool,
    pub(crate) tagged_to_refresh: bool,
}

impl ParameterDomainPoint {
    /// Creates the parameter point of `point`. Returns `None` if the plane of `point` has invalid parameters
    pub fn from_spatial(point: &SpatialDomainPoint) -> Option<Self> {
        if !point.has_valid_parameters() {
            return None;
        }
        let foot = point.plane().foot_point();
        Some(Self {
            coordinate: [foot.x, foot.y, foot.z],
            normal: *point.plane().normal(),
            spatial_index: point.index(),
            extent_point_count: 0,
            added_to_plane: false,
            tagged_to_refresh: true,
        })
    }

    /// Unit normal of the plane, pointing away from the origin
    pub fn normal(&self) -> &Vector3<f64> {
        &self.normal
    }

    /// Distance of the plane from the origin
    pub fn plane_distance(&self) -> f64 {
        Vector3::from(self.coordinate).norm()
    }

    /// Index of the spatial point this parameter point belongs to
    pub fn spatial_index(&self) -> usize {
        self.spatial_index
    }

    /// Number of unassigned parameter points in the extent of this point as of the last refresh
    pub fn extent_point_count(&self) -> usize {
        self.extent_point_count
    }

    pub fn is_added_to_plane(&self) -> bool {
        self.added_to_plane
    }

    pub fn is_tagged_to_refresh(&self) -> bool {
        self.tagged_to_refresh
    }

    /// Returns true if the planes of `self` and `other` are coplanar within the given tolerances: their distances
    /// from the origin differ by at most `plane_distance` and their normals enclose at most `max_angle` radians.
    /// Planes that pass close to the origin (within `plane_distance`) compare their normals without orientation,
    /// because the orientation of such normals flips on tiny changes of the fit. The relation is symmetric
    pub fn is_in_extent_of(&self, other: &ParameterDomainPoint, max_angle: f64, plane_distance: f64) -> bool {
        let a = self.plane_distance();
        let b = other.plane_distance();
        if (a - b).abs() > plane_distance {
            return false;
        }
        let angle = if a <= plane_distance || b <= plane_distance {
            acute_angle_between(self.normal.as_slice(), other.normal.as_slice())
        } else {
            angle_between(self.normal.as_slice(), other.normal.as_slice())
        };
        angle <= max_angle
    }
}

impl KdPoint for ParameterDomainPoint {
    fn coordinate(&self) -> &[f64] {
        &self.coordinate
    }
}

/// Radius around a parameter point with plane distance `a` that contains the parameter points of all planes in
/// its extent. For `a > 2 * plane_distance` the farthest member has plane distance `a + plane_distance` and a
/// normal tilted by `max_angle`, which gives the law of cosines bound. Closer to the origin, members with flipped
/// normals are possible, bounded by `a + (a + plane_distance)`
pub fn max_parameter_distance(a: f64, max_angle: f64, plane_distance: f64) -> f64 {
    if a <= 2.0 * plane_distance {
        2.0 * a + plane_distance
    } else {
        let b = a + plane_distance;
        (a * a + b * b - 2.0 * a * b * max_angle.cos()).max(0.0).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::least_squares::HessianPlane;
    use facet_core::math::vector::degrees_to_radians;

    fn parameter_point(normal: [f64; 3], d: f64) -> ParameterDomainPoint {
        let normal = Vector3::from(normal).normalize();
        let mut spatial = SpatialDomainPoint::new(Vector3::zeros(), 0);
        spatial.plane = HessianPlane::from_normal_and_point(&normal, &(normal * d));
        ParameterDomainPoint::from_spatial(&spatial).unwrap()
    }

    #[test]
    fn test_extent_membership() {
        let max_angle = degrees_to_radians(10.0);
        let base = parameter_point([0.0, 0.0, 1.0], 5.0);
        let shifted = parameter_point([0.0, 0.0, 1.0], 5.4);
        let far = parameter_point([0.0, 0.0, 1.0], 6.0);
        let tilted = parameter_point([0.0, 0.2, 1.0], 5.0);

        assert!(base.is_in_extent_of(&base, max_angle, 0.5));
        assert!(base.is_in_extent_of(&shifted, max_angle, 0.5));
        assert!(shifted.is_in_extent_of(&base, max_angle, 0.5));
        assert!(!base.is_in_extent_of(&far, max_angle, 0.5));
        // atan(0.2) is about 11.3 degrees
        assert!(!base.is_in_extent_of(&tilted, max_angle, 0.5));
    }

    #[test]
    fn test_planes_near_origin_ignore_orientation() {
        let max_angle = degrees_to_radians(10.0);
        let up = parameter_point([0.0, 0.0, 1.0], 0.1);
        let down = parameter_point([0.0, 0.0, -1.0], 0.2);
        assert!(up.is_in_extent_of(&down, max_angle, 0.5));
        assert!(down.is_in_extent_of(&up, max_angle, 0.5));
    }

    #[test]
    fn test_max_parameter_distance_covers_extent() {
        let max_angle = degrees_to_radians(10.0);
        let base = parameter_point([0.0, 0.0, 1.0], 5.0);
        let member = parameter_point([0.0, 0.17, 1.0], 5.4);
        assert!(base.is_in_extent_of(&member, max_angle, 0.5));
        let distance = (Vector3::from(base.coordinate) - Vector3::from(member.coordinate)).norm();
        assert!(distance <= max_parameter_distance(base.plane_distance(), max_angle, 0.5));

        assert_eq!(max_parameter_distance(0.5, max_angle, 0.5), 1.5);
    }

    #[test]
    fn test_invalid_plane_has_no_parameter_point() {
        let spatial = SpatialDomainPoint::new(Vector3::zeros(), 3);
        assert!(ParameterDomainPoint::from_spatial(&spatial).is_none());
    }
}
