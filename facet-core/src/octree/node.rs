use nalgebra::{Point3, Vector3};

use crate::math::AABB;

/// Tolerance used when comparing center distances of octree nodes
pub(crate) const NODE_EPSILON: f64 = 1e-9;

/// A cubic cell of an [Octree](super::Octree). Nodes live in an arena owned by the octree and refer to their
/// children by index
#[derive(Debug, Clone)]
pub struct OctreeNode {
    center: Point3<f64>,
    radius: f64,
    pub(crate) children: [Option<usize>; 8],
    point_count: usize,
    bounds: Option<AABB>,
    pub(crate) group: Option<usize>,
}

impl OctreeNode {
    pub(crate) fn new(center: Point3<f64>, radius: f64) -> Self {
        Self {
            center,
            radius,
            children: [None; 8],
            point_count: 0,
            bounds: None,
            group: None,
        }
    }

    pub fn center(&self) -> &Point3<f64> {
        &self.center
    }

    /// Half of the edge length of this cube
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Number of points that were registered within this node
    pub fn point_count(&self) -> usize {
        self.point_count
    }

    /// The bounding box of all points that were registered within this node, or `None` if there are none
    pub fn bounds(&self) -> Option<&AABB> {
        self.bounds.as_ref()
    }

    /// The group id of this node. Only set on leaves after grouping
    pub fn group(&self) -> Option<usize> {
        self.group
    }

    pub fn has_children(&self) -> bool {
        self.children.iter().any(Option::is_some)
    }

    /// Returns true if `point` lies within the half-open cube `[center - radius, center + radius)`
    pub fn fits(&self, point: &Point3<f64>) -> bool {
        (0..3).all(|axis| {
            point[axis] >= self.center[axis] - self.radius
                && point[axis] < self.center[axis] + self.radius
        })
    }

    /// Index of the octant of this node that contains `point`. Bit 0 is set for `x >= center.x`, bit 1 for
    /// `y >= center.y` and bit 2 for `z >= center.z`
    pub fn octant_of(&self, point: &Point3<f64>) -> usize {
        (0..3)
            .filter(|axis| point[*axis] >= self.center[*axis])
            .fold(0, |octant, axis| octant | (1 << axis))
    }

    /// Checks whether this node and `other` are neighbours under the given corner neighbour class. The cubes
    /// have to overlap or touch along every axis, and the number of axes along which they only touch must not
    /// exceed `corner_neighbour_class` (1 = faces, 2 = faces and edges, 3 = faces, edges and corners)
    pub fn is_connected_to(&self, other: &OctreeNode, corner_neighbour_class: u8) -> bool {
        let radius_sum = self.radius + other.radius;
        let mut touching_axes = 0;
        for axis in 0..3 {
            let center_distance = (self.center[axis] - other.center[axis]).abs();
            if center_distance > radius_sum + NODE_EPSILON {
                return false;
            }
            if (center_distance - radius_sum).abs() <= NODE_EPSILON {
                touching_axes += 1;
            }
        }
        touching_axes <= corner_neighbour_class as usize
    }

    /// Takes over point count and bounds of `other`, used when re-parenting nodes during root expansion
    pub(crate) fn inherit_statistics(&mut self, other: &OctreeNode) {
        self.point_count = other.point_count;
        self.bounds = other.bounds;
    }

    /// Registers `point` within this node, updating the point count and bounds
    pub(crate) fn touch(&mut self, point: &Point3<f64>) {
        self.point_count += 1;
        self.bounds = Some(match &self.bounds {
            Some(bounds) => bounds.extend_with_point(point),
            None => AABB::from_point(point),
        });
    }
}

/// Offset from the center of a node with the given `radius` to the center of its child in `octant`
pub(crate) fn octant_offset(octant: usize, radius: f64) -> Vector3<f64> {
    let half = radius / 2.0;
    let sign = |bit: usize| if octant & bit != 0 { half } else { -half };
    Vector3::new(sign(1), sign(2), sign(4))
}
