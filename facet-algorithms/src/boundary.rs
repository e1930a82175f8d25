//! Splits coplanar clusters into spatially connected parts.
//!
//! A cluster produced by extent clustering contains every point on a plane, even if the points belong to several
//! separate patches of that plane. The [BoundaryDetector] rotates the cluster into the XY plane and repeatedly
//! walks the generalized (concave) hull around the leftmost remaining point. Hull steps are only allowed between
//! points that can reach each other, where the reach of a point is the distance to its farthest classification
//! neighbour. All points inside a closed hull form one connected part.
//!
//! The reach test assumes a roughly even point density across a patch. Gaps narrower than the larger reach of
//! the two points across them are bridged, wider gaps separate parts. Where the density varies a lot, e.g. on
//! sparse patches with only a few dozen points per unit square, single points at the rim can have a reach too
//! short to connect back to the hull and end up as small parts of their own. Raising the neighbour count or
//! distance of the classifier increases the reach.

use std::collections::HashSet;
use std::f64::consts::PI;

use anyhow::{bail, Result};
use facet_core::kdtree::{IndexedPoint, KdTree};
use facet_core::math::vector::{
    counter_clockwise_angle, normalize, rotate_around_axis, segments_intersect, Axis,
};
use facet_core::math::AABB;
use facet_core::nalgebra::{Point3, Vector3};
use facet_core::search::PointSearcher;
use log::trace;

use crate::classification::SpatialDomainPoint;

/// Turn angles closer than this are considered equal, the nearer candidate wins
const ANGLE_TIE_TOLERANCE: f64 = 1e-9;

/// Splits one coplanar cluster into its spatially connected parts
#[derive(Debug, Clone, Default)]
pub struct BoundaryDetector;

impl BoundaryDetector {
    pub fn new() -> Self {
        Self
    }

    /// Splits the cluster made of `members` (indices into `points`) into connected parts. Every member ends up
    /// in exactly one part. Returns an error if the mean plane normal of the cluster is undefined or if a hull walk
    /// degenerates into a loop. In that case the cluster should be processed again or kept as it is
    pub fn split_cluster(
        &self,
        points: &[SpatialDomainPoint],
        members: &[usize],
    ) -> Result<Vec<Vec<usize>>> {
        if members.len() < 2 {
            return Ok(members.iter().map(|member| vec![*member]).collect());
        }

        let coordinates = planar_coordinates(points, members)?;
        let reach: Vec<f64> = members
            .iter()
            .map(|member| {
                let distance = points[*member].nth_neighbour_distance();
                if distance.is_finite() {
                    distance
                } else {
                    0.0
                }
            })
            .collect();
        let max_reach = reach.iter().cloned().fold(0.0, f64::max);

        let mut tree = KdTree::new(2);
        tree.add(
            coordinates
                .iter()
                .enumerate()
                .map(|(index, c)| IndexedPoint::new(c.to_vec(), index))
                .collect(),
        );
        let walker = HullWalker {
            coordinates: &coordinates,
            reach: &reach,
            max_reach,
            tree: &tree,
        };

        let mut available = vec![true; members.len()];
        let mut parts = vec![];
        while let Some(start) = leftmost(&coordinates, &available) {
            let hull = walker.walk(start, &available)?;
            let part = walker.enclosed_points(&hull, &available);
            for &index in &part {
                available[index] = false;
            }
            trace!(
                "Boundary with {} vertices encloses {} points",
                hull.len(),
                part.len()
            );
            parts.push(part.into_iter().map(|index| members[index]).collect());
        }
        Ok(parts)
    }
}

/// Rotates the points of a cluster so that the mean normal of their planes becomes the Z axis and returns the
/// resulting XY coordinates. Normals are flipped into the hemisphere of the first valid normal before averaging
pub fn planar_coordinates(points: &[SpatialDomainPoint], members: &[usize]) -> Result<Vec<[f64; 2]>> {
    let mut reference: Option<Vector3<f64>> = None;
    let mut sum = Vector3::zeros();
    for member in members {
        let plane = points[*member].plane();
        if !plane.has_valid_parameters() {
            continue;
        }
        let normal = *plane.normal();
        let reference = *reference.get_or_insert(normal);
        sum += if normal.dot(&reference) < 0.0 {
            -normal
        } else {
            normal
        };
    }
    let normal = match normalize(sum.as_slice()) {
        Some(normal) => normal,
        None => bail!("Cluster of {} points has no valid mean plane normal", members.len()),
    };

    let angle_z = -normal[1].atan2(normal[0]);
    let rho = (normal[0] * normal[0] + normal[1] * normal[1]).sqrt();
    let angle_y = -rho.atan2(normal[2]);

    Ok(members
        .iter()
        .map(|member| {
            let coordinate = points[*member].coordinate();
            let rotated = rotate_around_axis(coordinate.as_slice(), Axis::Z, angle_z);
            let rotated = rotate_around_axis(&rotated, Axis::Y, angle_y);
            [rotated[0], rotated[1]]
        })
        .collect())
}

/// Ray casting point in polygon test. Counts how often the segment from `point` to an exterior point left of the
/// polygon crosses its edges. Vertices are compared half-open in Y so that rays through vertices count once
pub fn point_in_polygon(polygon: &[[f64; 2]], point: [f64; 2]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut previous = polygon[polygon.len() - 1];
    for vertex in polygon {
        if (vertex[1] > point[1]) != (previous[1] > point[1]) {
            let crossing_x = vertex[0]
                + (point[1] - vertex[1]) * (previous[0] - vertex[0]) / (previous[1] - vertex[1]);
            if crossing_x < point[0] {
                inside = !inside;
            }
        }
        previous = *vertex;
    }
    inside
}

/// Index of the available point with minimum X (then minimum Y)
fn leftmost(coordinates: &[[f64; 2]], available: &[bool]) -> Option<usize> {
    (0..coordinates.len())
        .filter(|index| available[*index])
        .min_by(|a, b| {
            let (a, b) = (coordinates[*a], coordinates[*b]);
            a[0].partial_cmp(&b[0])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a[1].partial_cmp(&b[1]).unwrap_or(std::cmp::Ordering::Equal))
        })
}

/// A hull chain is closed once its last two points repeat its first two points
fn is_closed(chain: &[usize]) -> bool {
    let len = chain.len();
    len >= 4 && chain[len - 2] == chain[0] && chain[len - 1] == chain[1]
}

/// A walk that repeats the point pair in the middle of the chain at its end is running in circles without ever
/// reaching its start again
fn bound_chain_still_valid(chain: &[usize]) -> bool {
    let len = chain.len();
    if len < 4 {
        return true;
    }
    let middle = len / 2;
    !(chain[middle - 2] == chain[len - 2] && chain[middle - 1] == chain[len - 1])
}

struct HullWalker<'a> {
    coordinates: &'a [[f64; 2]],
    reach: &'a [f64],
    max_reach: f64,
    tree: &'a KdTree<IndexedPoint>,
}

impl<'a> HullWalker<'a> {
    /// Walks counterclockwise around the available points starting at `start`, which must be a leftmost point.
    /// Returns the hull vertices without repeating the start. A single vertex means that `start` can't reach any
    /// other point
    fn walk(&self, start: usize, available: &[bool]) -> Result<Vec<usize>> {
        let max_steps = 4 * self.coordinates.len() + 4;
        let mut chain = vec![start];
        // Nothing lies left of the start, so the walk begins heading down along the hull
        let mut back = [0.0, -1.0];

        loop {
            let current = chain[chain.len() - 1];
            let next = match self.next_hull_point(current, back, &chain, available) {
                Some(next) => next,
                None if chain.len() == 1 => return Ok(chain),
                None => bail!(
                    "Boundary walk got stuck after {} steps, no admissible successor",
                    chain.len()
                ),
            };
            let (from, to) = (self.coordinates[current], self.coordinates[next]);
            back = [from[0] - to[0], from[1] - to[1]];
            chain.push(next);

            if is_closed(&chain) {
                chain.truncate(chain.len() - 2);
                return Ok(chain);
            }
            if chain.len().is_power_of_two() && !bound_chain_still_valid(&chain) {
                bail!(
                    "Boundary walk is cycling without closing after {} steps",
                    chain.len()
                );
            }
            if chain.len() > max_steps {
                bail!("Boundary walk did not close within {} steps", max_steps);
            }
        }
    }

    /// Among the available points reachable from `current`, picks the one with the smallest counterclockwise turn
    /// away from the `back` direction whose connecting edge does not cross the chain built so far
    fn next_hull_point(
        &self,
        current: usize,
        back: [f64; 2],
        chain: &[usize],
        available: &[bool],
    ) -> Option<usize> {
        let origin = self.coordinates[current];
        let search_radius = self.reach[current].max(self.max_reach);

        let mut best: Option<(usize, f64, f64)> = None;
        for neighbour in PointSearcher::new(self.tree, &origin)
            .with_max_radius(search_radius)
            .get_nearest_points()
        {
            let candidate = neighbour.point.index();
            if candidate == current
                || !available[candidate]
                || neighbour.distance == 0.0
                || neighbour.distance > self.reach[current].max(self.reach[candidate])
            {
                continue;
            }
            let target = self.coordinates[candidate];
            let direction = [target[0] - origin[0], target[1] - origin[1]];
            let mut angle = counter_clockwise_angle(&back, &direction);
            if angle < ANGLE_TIE_TOLERANCE {
                angle = 2.0 * PI;
            }
            let is_better = match best {
                None => true,
                Some((_, best_angle, best_distance)) => {
                    angle < best_angle - ANGLE_TIE_TOLERANCE
                        || (angle <= best_angle + ANGLE_TIE_TOLERANCE
                            && neighbour.distance < best_distance)
                }
            };
            if is_better && !self.crosses_chain(chain, current, candidate) {
                best = Some((candidate, angle, neighbour.distance));
            }
        }
        best.map(|(candidate, _, _)| candidate)
    }

    /// Returns true if the edge `from -> to` properly crosses an edge of `chain` that shares no endpoint with it
    fn crosses_chain(&self, chain: &[usize], from: usize, to: usize) -> bool {
        let (a1, a2) = (self.coordinates[from], self.coordinates[to]);
        chain.windows(2).any(|edge| {
            let (e1, e2) = (edge[0], edge[1]);
            if e1 == from || e1 == to || e2 == from || e2 == to {
                return false;
            }
            segments_intersect(&a1, &a2, &self.coordinates[e1], &self.coordinates[e2])
        })
    }

    /// The hull vertices followed by every other available point that lies inside the hull or coincides with a
    /// hull vertex
    fn enclosed_points(&self, hull: &[usize], available: &[bool]) -> Vec<usize> {
        let mut part: Vec<usize> = vec![];
        let mut seen = HashSet::new();
        for &vertex in hull {
            if seen.insert(vertex) {
                part.push(vertex);
            }
        }

        let polygon: Vec<[f64; 2]> = hull.iter().map(|v| self.coordinates[*v]).collect();
        let vertex_positions: HashSet<(u64, u64)> = polygon
            .iter()
            .map(|c| (c[0].to_bits(), c[1].to_bits()))
            .collect();
        let bounds = AABB::from_points(
            polygon
                .iter()
                .map(|c| Point3::new(c[0], c[1], 0.0))
                .collect::<Vec<_>>()
                .iter(),
        );

        for (index, coordinate) in self.coordinates.iter().enumerate() {
            if !available[index] || seen.contains(&index) {
                continue;
            }
            let coincides = vertex_positions.contains(&(coordinate[0].to_bits(), coordinate[1].to_bits()));
            let inside = match &bounds {
                Some(bounds) => {
                    bounds.contains(&Point3::new(coordinate[0], coordinate[1], 0.0))
                        && point_in_polygon(&polygon, *coordinate)
                }
                None => false,
            };
            if coincides || inside {
                part.push(index);
            }
        }
        part
    }
}
