use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use anyhow::Result;
use facet_core::nalgebra::{Point3, Vector3};
use facet_core::octree::color_for_group;
use facet_core::parallel::ShutdownFlag;
use facet_core::points::PointSet;
use log::{info, warn};

use crate::boundary::BoundaryDetector;
use crate::classification::{
    parameter_domain_points, ClassifierParams, PointClassifier, SpatialDomainPoint,
};
use crate::extent_clustering::{ExtentClusteringEngine, ExtentClusteringParams};

/// Parameters of a [PlaneSegmentation] run
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct SegmentationParams {
    pub classifier: ClassifierParams,
    pub extent: ExtentClusteringParams,
    /// Split coplanar clusters into spatially connected parts
    pub detect_boundaries: bool,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            classifier: Default::default(),
            extent: Default::default(),
            detect_boundaries: true,
        }
    }
}

/// Result of a [PlaneSegmentation] run
#[derive(Debug, Clone)]
pub struct Segmentation {
    spatial_points: Vec<SpatialDomainPoint>,
    cluster_ids: Vec<usize>,
    cluster_count: usize,
}

impl Segmentation {
    /// Classified input points. Their cluster ids are the raw ids of the pipeline, use [Self::cluster_ids] for
    /// the compacted ids
    pub fn spatial_points(&self) -> &[SpatialDomainPoint] {
        &self.spatial_points
    }

    /// One cluster id per input point, in the range `0..cluster_count`, numbered by first appearance
    pub fn cluster_ids(&self) -> &[usize] {
        &self.cluster_ids
    }

    pub fn cluster_count(&self) -> usize {
        self.cluster_count
    }

    /// Converts the segmentation into a grouped [PointSet]. Without `colors`, every point gets the colour of its
    /// cluster
    pub fn to_point_set(&self, colors: Option<&[f32]>) -> Result<PointSet> {
        let vertices: Vec<f64> = self
            .spatial_points
            .iter()
            .flat_map(|point| {
                let coordinate = point.coordinate();
                [coordinate.x, coordinate.y, coordinate.z]
            })
            .collect();
        let colors = match colors {
            Some(colors) => colors.to_vec(),
            None => self
                .cluster_ids
                .iter()
                .flat_map(|id| color_for_group(*id))
                .collect(),
        };
        PointSet::from_buffers(vertices, colors, Some(self.cluster_ids.clone()))
    }
}

/// The complete plane segmentation: classification, extent clustering and the optional split of the coplanar
/// clusters into connected parts. Points that never join a coplanar cluster end up in singleton clusters
pub struct PlaneSegmentation {
    params: SegmentationParams,
    shutdown: Option<ShutdownFlag>,
}

impl PlaneSegmentation {
    pub fn new(params: SegmentationParams) -> Result<Self> {
        params.classifier.validate()?;
        params.extent.validate()?;
        Ok(Self {
            params,
            shutdown: None,
        })
    }

    pub fn with_shutdown_flag(mut self, flag: ShutdownFlag) -> Self {
        self.shutdown = Some(flag);
        self
    }

    pub fn params(&self) -> &SegmentationParams {
        &self.params
    }

    /// Segments a point set given by its vertex buffer
    pub fn run_point_set(&self, points: &PointSet) -> Result<Segmentation> {
        let positions: Vec<Vector3<f64>> = points.positions().map(|p: Point3<f64>| p.coords).collect();
        self.run(&positions)
    }

    pub fn run(&self, positions: &[Vector3<f64>]) -> Result<Segmentation> {
        let timer = Instant::now();
        let classifier = PointClassifier::new(self.params.classifier.clone())?;
        let mut spatial_points = classifier.classify(positions)?;
        let mut parameter_points = parameter_domain_points(&spatial_points);
        info!(
            "Classified {} points ({} in the parameter domain) in {:.2?}",
            spatial_points.len(),
            parameter_points.len(),
            timer.elapsed()
        );

        let timer = Instant::now();
        let mut engine = ExtentClusteringEngine::new(self.params.extent.clone())?;
        if let Some(flag) = &self.shutdown {
            engine = engine.with_shutdown_flag(flag.clone());
        }
        let coplanar_count = engine.cluster(&mut parameter_points, &mut spatial_points)?;
        info!(
            "Found {} coplanar clusters in {:.2?}",
            coplanar_count,
            timer.elapsed()
        );

        if self.params.detect_boundaries {
            let timer = Instant::now();
            let part_count = self.split_clusters(&mut spatial_points)?;
            info!(
                "Split {} coplanar clusters into {} connected parts in {:.2?}",
                coplanar_count,
                part_count,
                timer.elapsed()
            );
        }

        let (cluster_ids, cluster_count) = compact_cluster_ids(&spatial_points);
        Ok(Segmentation {
            spatial_points,
            cluster_ids,
            cluster_count,
        })
    }

    /// Runs the [BoundaryDetector] on every coplanar cluster. The first part of a cluster keeps its id, further
    /// parts get fresh ids. Clusters whose boundary walk fails stay as they are. Returns the number of parts
    fn split_clusters(&self, spatial_points: &mut [SpatialDomainPoint]) -> Result<usize> {
        let mut clusters: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (index, point) in spatial_points.iter().enumerate() {
            if !point.is_unassigned() {
                clusters.entry(point.cluster_id()).or_default().push(index);
            }
        }
        let mut next_id = clusters
            .keys()
            .next_back()
            .map_or(spatial_points.len(), |id| id + 1);

        let detector = BoundaryDetector::new();
        let mut part_count = 0;
        for (id, members) in clusters {
            if let Some(flag) = &self.shutdown {
                flag.check("boundary detection")?;
            }
            match detector.split_cluster(spatial_points, &members) {
                Ok(parts) => {
                    for part in parts.iter().skip(1) {
                        for &member in part {
                            spatial_points[member].cluster_id = next_id;
                        }
                        next_id += 1;
                    }
                    part_count += parts.len();
                }
                Err(why) => {
                    warn!(
                        "Keeping coplanar cluster {} with {} points unsplit: {}",
                        id,
                        members.len(),
                        why
                    );
                    part_count += 1;
                }
            }
        }
        Ok(part_count)
    }
}

/// Maps the cluster ids of `points` to `0..count` in order of first appearance
pub fn compact_cluster_ids(points: &[SpatialDomainPoint]) -> (Vec<usize>, usize) {
    let mut dense = HashMap::new();
    let ids = points
        .iter()
        .map(|point| {
            let next = dense.len();
            *dense.entry(point.cluster_id()).or_insert(next)
        })
        .collect();
    (ids, dense.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(origin: [f64; 3], size: usize, spacing: f64) -> Vec<Vector3<f64>> {
        let mut points = vec![];
        for x in 0..size {
            for y in 0..size {
                points.push(Vector3::new(
                    origin[0] + x as f64 * spacing,
                    origin[1] + y as f64 * spacing,
                    origin[2],
                ));
            }
        }
        points
    }

    #[test]
    fn test_compact_cluster_ids() {
        let mut points: Vec<SpatialDomainPoint> = (0..5)
            .map(|index| SpatialDomainPoint::new(Vector3::zeros(), index))
            .collect();
        points[0].cluster_id = 9;
        points[2].cluster_id = 9;
        points[3].cluster_id = 7;
        let (ids, count) = compact_cluster_ids(&points);
        assert_eq!(ids, vec![0, 1, 0, 2, 3]);
        assert_eq!(count, 4);
    }

    #[test]
    fn test_single_plane() -> Result<()> {
        let positions = grid([0.0, 0.0, 2.0], 6, 0.2);
        let segmentation = PlaneSegmentation::new(SegmentationParams::default())?.run(&positions)?;
        assert_eq!(segmentation.cluster_count(), 1);
        assert!(segmentation.cluster_ids().iter().all(|id| *id == 0));

        let set = segmentation.to_point_set(None)?;
        assert_eq!(set.len(), positions.len());
        assert_eq!(set.group(7), Some(0));
        assert_eq!(set.color(7), color_for_group(0));
        Ok(())
    }

    #[test]
    fn test_boundaries_can_be_disabled() -> Result<()> {
        let mut positions = grid([0.0, 0.0, 2.0], 6, 0.2);
        positions.extend(grid([5.0, 0.0, 2.0], 6, 0.2));
        let params = SegmentationParams {
            detect_boundaries: false,
            ..Default::default()
        };
        let segmentation = PlaneSegmentation::new(params)?.run(&positions)?;
        assert_eq!(segmentation.cluster_count(), 1);
        Ok(())
    }

    #[test]
    fn test_unclassifiable_points_stay_singletons() -> Result<()> {
        let positions = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(10.0, 0.0, 0.0),
            Vector3::new(20.0, 0.0, 0.0),
        ];
        let segmentation = PlaneSegmentation::new(SegmentationParams::default())?.run(&positions)?;
        assert_eq!(segmentation.cluster_ids(), &[0, 1, 2]);
        assert_eq!(segmentation.cluster_count(), 3);
        Ok(())
    }

    #[test]
    fn test_explicit_colors_are_kept() -> Result<()> {
        let positions = grid([0.0, 0.0, 0.0], 4, 0.2);
        let colors = vec![0.25f32; positions.len() * 3];
        let segmentation = PlaneSegmentation::new(SegmentationParams::default())?.run(&positions)?;
        let set = segmentation.to_point_set(Some(&colors))?;
        assert_eq!(set.color(3), [0.25, 0.25, 0.25]);
        assert!(segmentation.to_point_set(Some(&colors[1..])).is_err());
        Ok(())
    }
}
