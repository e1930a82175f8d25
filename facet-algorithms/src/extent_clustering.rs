use std::cmp::Reverse;

use anyhow::{bail, Result};
use facet_core::kdtree::{IndexedPoint, KdPoint, KdTree};
use facet_core::math::vector::degrees_to_radians;
use facet_core::parallel::{ShutdownFlag, StridedPool};
use facet_core::search::PointSearcher;
use log::debug;

use crate::classification::{max_parameter_distance, ParameterDomainPoint, SpatialDomainPoint};

/// Parameters of the [ExtentClusteringEngine]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ExtentClusteringParams {
    /// Maximum angle between the normals of two coplanar planes
    pub max_angle_degrees: f64,
    /// Maximum difference of the origin distances of two coplanar planes
    pub plane_distance: f64,
    pub thread_count: usize,
}

impl Default for ExtentClusteringParams {
    fn default() -> Self {
        Self {
            max_angle_degrees: 10.0,
            plane_distance: 0.5,
            thread_count: 8,
        }
    }
}

impl ExtentClusteringParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.max_angle_degrees >= 0.0 && self.max_angle_degrees <= 180.0) {
            bail!(
                "Maximum angle must be within [0, 180] degrees, got {}",
                self.max_angle_degrees
            );
        }
        if !(self.plane_distance >= 0.0 && self.plane_distance.is_finite()) {
            bail!(
                "Plane distance must be non-negative and finite, got {}",
                self.plane_distance
            );
        }
        if self.thread_count == 0 {
            bail!("Thread count must be at least 1");
        }
        Ok(())
    }
}

/// Groups parameter domain points into coplanar clusters by repeatedly picking the point with the largest extent.
///
/// The extent of a parameter point P is the set of unassigned parameter points whose planes are coplanar with the
/// plane of P (see [ParameterDomainPoint::is_in_extent_of]). Each iteration
/// 1. refreshes the extent point count of every point tagged for refresh (in parallel),
/// 2. picks the unassigned point with the largest count as the peak (lowest index on ties),
/// 3. assigns a new cluster id to the whole extent of the peak and writes it to the spatial points,
/// 4. tags every unassigned point that had one of the new members in its extent.
///
/// The peak is always part of its own extent, so each iteration assigns at least one point and the loop
/// terminates. Clusters are coplanar but not necessarily spatially connected.
pub struct ExtentClusteringEngine {
    params: ExtentClusteringParams,
    shutdown: Option<ShutdownFlag>,
}

impl ExtentClusteringEngine {
    pub fn new(params: ExtentClusteringParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            shutdown: None,
        })
    }

    /// Makes the engine check `flag` before every iteration
    pub fn with_shutdown_flag(mut self, flag: ShutdownFlag) -> Self {
        self.shutdown = Some(flag);
        self
    }

    /// Clusters `parameter_points` and writes the cluster ids to the matching `spatial_points`. Cluster ids start
    /// at `spatial_points.len()`, so they never collide with the singleton ids of unassigned points. Returns the
    /// number of clusters
    pub fn cluster(
        &self,
        parameter_points: &mut [ParameterDomainPoint],
        spatial_points: &mut [SpatialDomainPoint],
    ) -> Result<usize> {
        if let Some(point) = parameter_points
            .iter()
            .find(|p| p.spatial_index() >= spatial_points.len())
        {
            bail!(
                "Parameter point refers to spatial point {} but there are only {}",
                point.spatial_index(),
                spatial_points.len()
            );
        }

        let mut tree = KdTree::new(3);
        tree.add(
            parameter_points
                .iter()
                .enumerate()
                .map(|(index, point)| IndexedPoint::new(point.coordinate().to_vec(), index))
                .collect(),
        );
        for point in parameter_points.iter_mut() {
            point.added_to_plane = false;
            point.tagged_to_refresh = true;
        }

        let pool = StridedPool::new(self.params.thread_count)?;
        let mut remaining = parameter_points.len();
        let mut next_cluster_id = spatial_points.len();
        let mut cluster_count = 0;

        while remaining > 0 {
            if let Some(flag) = &self.shutdown {
                flag.check("extent clustering")?;
            }

            let points: &[ParameterDomainPoint] = parameter_points;
            let refreshed = pool.map(points.len(), |index| {
                let point = &points[index];
                if point.tagged_to_refresh && !point.added_to_plane {
                    Some(self.extent(&tree, points, index).len())
                } else {
                    None
                }
            });
            for (point, count) in parameter_points.iter_mut().zip(refreshed) {
                if let Some(count) = count {
                    point.extent_point_count = count;
                    point.tagged_to_refresh = false;
                }
            }

            let peak = match (0..parameter_points.len())
                .filter(|index| !parameter_points[*index].added_to_plane)
                .max_by_key(|index| (parameter_points[*index].extent_point_count, Reverse(*index)))
            {
                Some(peak) => peak,
                None => break,
            };

            let members = self.extent(&tree, parameter_points, peak);
            for &member in &members {
                parameter_points[member].added_to_plane = true;
                spatial_points[parameter_points[member].spatial_index()].cluster_id = next_cluster_id;
            }
            for &member in &members {
                for neighbour in self.extent(&tree, parameter_points, member) {
                    parameter_points[neighbour].tagged_to_refresh = true;
                }
            }

            debug!(
                "Cluster {} has {} members, {} parameter points left",
                next_cluster_id,
                members.len(),
                remaining - members.len()
            );
            remaining -= members.len();
            next_cluster_id += 1;
            cluster_count += 1;
        }

        Ok(cluster_count)
    }

    /// Indices of the unassigned parameter points in the extent of `points[index]`, including the point itself if it
    /// is unassigned
    fn extent(
        &self,
        tree: &KdTree<IndexedPoint>,
        points: &[ParameterDomainPoint],
        index: usize,
    ) -> Vec<usize> {
        let max_angle = degrees_to_radians(self.params.max_angle_degrees);
        let center = &points[index];
        let radius = max_parameter_distance(center.plane_distance(), max_angle, self.params.plane_distance);

        PointSearcher::new(tree, center.coordinate())
            .with_max_radius(radius)
            .get_nearest_points()
            .into_iter()
            .map(|neighbour| neighbour.point.index())
            .filter(|candidate| {
                let candidate = &points[*candidate];
                !candidate.added_to_plane
                    && center.is_in_extent_of(candidate, max_angle, self.params.plane_distance)
            })
            .collect()
    }
}
