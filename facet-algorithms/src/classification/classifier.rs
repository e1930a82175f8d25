use anyhow::{bail, Result};
use facet_core::kdtree::{IndexedPoint, KdTree};
use facet_core::nalgebra::Vector3;
use facet_core::parallel::StridedPool;
use facet_core::search::PointSearcher;
use log::debug;

use super::{ParameterDomainPoint, SpatialDomainPoint};
use crate::least_squares::HessianPlane;
use crate::pca::PrincipalComponents;

/// Acceptance intervals `(min, max]` for the three normalized eigenvalues, largest eigenvalue first
pub type EigenvalueRanges = [(f64, f64); 3];

/// Flat neighbourhoods: one small and two clearly non-zero eigenvalues
pub const DEFAULT_PLANAR_RANGES: EigenvalueRanges = [(0.0, 1.0), (0.05, 1.0), (-1.0, 0.05)];

/// Elongated, curved neighbourhoods: one dominant eigenvalue, a medium and a small but non-zero one
pub const DEFAULT_CYLINDRICAL_RANGES: EigenvalueRanges = [(0.5, 1.0), (0.1, 0.5), (0.0, 0.3)];

/// Parameters of the [PointClassifier]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ClassifierParams {
    /// Number of nearest neighbours (including the point itself) that make up a neighbourhood
    pub neighbour_count: usize,
    /// Neighbours farther away than this are ignored
    pub max_neighbour_distance: f64,
    pub thread_count: usize,
    pub planar_ranges: EigenvalueRanges,
    pub cylindrical_ranges: EigenvalueRanges,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            neighbour_count: 10,
            max_neighbour_distance: 1.0,
            thread_count: 8,
            planar_ranges: DEFAULT_PLANAR_RANGES,
            cylindrical_ranges: DEFAULT_CYLINDRICAL_RANGES,
        }
    }
}

impl ClassifierParams {
    pub fn validate(&self) -> Result<()> {
        if self.neighbour_count == 0 {
            bail!("Neighbour count must be at least 1");
        }
        if !(self.max_neighbour_distance > 0.0) {
            bail!(
                "Maximum neighbour distance must be positive, got {}",
                self.max_neighbour_distance
            );
        }
        if self.thread_count == 0 {
            bail!("Thread count must be at least 1");
        }
        Ok(())
    }
}

/// Returns true if every eigenvalue, divided by the sum of all eigenvalues, lies within the half-open interval
/// `(min, max]` of its rank. Eigenvalues whose sum is not positive and finite are never accepted
/// ```
/// # use facet_algorithms::classification::is_in_eigenvalue_ranges;
/// let ranges = [(0.4, 0.5), (0.2, 0.5), (0.0, 0.25)];
/// assert!(is_in_eigenvalue_ranges([2.0, 1.0, 1.0], &ranges));
/// assert!(!is_in_eigenvalue_ranges([1.0, 1.0, 0.0], &ranges));
/// ```
pub fn is_in_eigenvalue_ranges(eigenvalues: [f64; 3], ranges: &EigenvalueRanges) -> bool {
    let sum: f64 = eigenvalues.iter().sum();
    if !(sum > 0.0 && sum.is_finite()) {
        return false;
    }
    eigenvalues
        .iter()
        .zip(ranges.iter())
        .all(|(value, (min, max))| {
            let normalized = value / sum;
            normalized > *min && normalized <= *max
        })
}

/// Computes neighbourhood descriptors for every point and classifies it as planar and/or cylindrical
pub struct PointClassifier {
    params: ClassifierParams,
}

impl PointClassifier {
    pub fn new(params: ClassifierParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &ClassifierParams {
        &self.params
    }

    /// Classifies all `positions`. The result holds one [SpatialDomainPoint] per position, in input order.
    /// Points are distributed over the worker threads by their index
    pub fn classify(&self, positions: &[Vector3<f64>]) -> Result<Vec<SpatialDomainPoint>> {
        if let Some(index) = positions
            .iter()
            .position(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
        {
            bail!("Point {} has non-finite coordinates", index);
        }

        let mut tree = KdTree::new(3);
        tree.add(
            positions
                .iter()
                .enumerate()
                .map(|(index, p)| IndexedPoint::new(vec![p.x, p.y, p.z], index))
                .collect(),
        );

        let pool = StridedPool::new(self.params.thread_count)?;
        let points = pool.map(positions.len(), |index| {
            self.classify_point(&tree, positions, index)
        });

        debug!(
            "Classified {} points: {} planar, {} cylindrical",
            points.len(),
            points.iter().filter(|p| p.is_planar()).count(),
            points.iter().filter(|p| p.is_cylindrical()).count()
        );
        Ok(points)
    }

    fn classify_point(
        &self,
        tree: &KdTree<IndexedPoint>,
        positions: &[Vector3<f64>],
        index: usize,
    ) -> SpatialDomainPoint {
        let position = positions[index];
        let mut point = SpatialDomainPoint::new(position, index);

        let neighbours = PointSearcher::new(tree, position.as_slice())
            .with_max_result_count(self.params.neighbour_count)
            .with_max_radius(self.params.max_neighbour_distance)
            .get_nearest_points();
        point.neighbour_count = neighbours.len();
        if let Some(farthest) = neighbours.last() {
            point.nth_neighbour_distance = farthest.distance;
        }

        let neighbourhood: Vec<Vector3<f64>> = neighbours
            .iter()
            .map(|neighbour| positions[neighbour.point.index()])
            .collect();
        if let Ok(pca) = PrincipalComponents::compute(&neighbourhood) {
            point.eigenvalues = pca.eigenvalues();
            point.eigenvectors = *pca.eigenvectors();
            point.is_planar = self.is_planar_point(point.eigenvalues);
            point.is_cylindrical = self.is_cylindrical_point(point.eigenvalues);
        }
        point.plane = HessianPlane::fit(&neighbourhood);
        point
    }

    /// Planar test with the configured planar ranges, see [is_in_eigenvalue_ranges]
    pub fn is_planar_point(&self, eigenvalues: [f64; 3]) -> bool {
        is_in_eigenvalue_ranges(eigenvalues, &self.params.planar_ranges)
    }

    /// Cylindrical test with the configured cylindrical ranges, see [is_in_eigenvalue_ranges]
    pub fn is_cylindrical_point(&self, eigenvalues: [f64; 3]) -> bool {
        is_in_eigenvalue_ranges(eigenvalues, &self.params.cylindrical_ranges)
    }
}

/// Creates the parameter domain points of all planar points with valid plane parameters
pub fn parameter_domain_points(points: &[SpatialDomainPoint]) -> Vec<ParameterDomainPoint> {
    points
        .iter()
        .filter(|point| point.is_planar())
        .filter_map(ParameterDomainPoint::from_spatial)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use facet_core::kdtree::KdPoint;

    fn grid(z: f64) -> Vec<Vector3<f64>> {
        (0..8)
            .flat_map(|x| (0..8).map(move |y| Vector3::new(x as f64 * 0.25, y as f64 * 0.25, z)))
            .collect()
    }

    #[test]
    fn test_range_bounds_are_exclusive_below_and_inclusive_above() {
        // Normalized eigenvalues are exactly [0.5, 0.3, 0.2]
        let eigenvalues = [5.0, 3.0, 2.0];
        assert!(is_in_eigenvalue_ranges(
            eigenvalues,
            &[(0.4, 0.5), (0.2, 0.3), (0.1, 0.2)]
        ));
        assert!(!is_in_eigenvalue_ranges(
            eigenvalues,
            &[(0.5, 0.6), (0.2, 0.3), (0.1, 0.2)]
        ));
        assert!(!is_in_eigenvalue_ranges(
            eigenvalues,
            &[(0.4, 0.5), (0.3, 0.4), (0.1, 0.2)]
        ));
        assert!(!is_in_eigenvalue_ranges(
            eigenvalues,
            &[(0.4, 0.5), (0.2, 0.3), (0.2, 0.3)]
        ));
    }

    #[test]
    fn test_degenerate_eigenvalues_are_rejected() {
        assert!(!is_in_eigenvalue_ranges([0.0, 0.0, 0.0], &DEFAULT_PLANAR_RANGES));
        assert!(!is_in_eigenvalue_ranges([f64::NAN, 1.0, 0.0], &DEFAULT_PLANAR_RANGES));
        // Collinear neighbourhoods have a single non-zero eigenvalue
        assert!(!is_in_eigenvalue_ranges([1.0, 0.0, 0.0], &DEFAULT_PLANAR_RANGES));
        assert!(is_in_eigenvalue_ranges([1.0, 1.0, 0.0], &DEFAULT_PLANAR_RANGES));
    }

    #[test]
    fn test_grid_points_are_planar() {
        let positions = grid(3.0);
        let classifier = PointClassifier::new(ClassifierParams {
            thread_count: 3,
            ..Default::default()
        })
        .unwrap();
        let points = classifier.classify(&positions).unwrap();
        assert_eq!(points.len(), positions.len());

        for (index, point) in points.iter().enumerate() {
            assert_eq!(point.index(), index);
            assert_eq!(point.cluster_id(), index);
            assert_eq!(point.neighbour_count(), 10);
            assert!(point.nth_neighbour_distance() > 0.0);
            assert!(point.is_planar());
            assert!(point.has_valid_parameters());
            assert_approx_eq!(point.plane().d(), -3.0);
        }

        let parameter_points = parameter_domain_points(&points);
        assert_eq!(parameter_points.len(), positions.len());
        let foot = parameter_points[5].coordinate();
        assert_approx_eq!(foot[2], 3.0);
    }

    #[test]
    fn test_sparse_points_have_no_neighbourhood() {
        let positions = vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(10.0, 0.0, 0.0)];
        let classifier = PointClassifier::new(ClassifierParams::default()).unwrap();
        let points = classifier.classify(&positions).unwrap();
        assert!(points.iter().all(|p| p.neighbour_count() == 1));
        assert!(points.iter().all(|p| p.nth_neighbour_distance() == 0.0));
        assert!(points.iter().all(|p| !p.is_planar() && !p.has_valid_parameters()));
        assert!(parameter_domain_points(&points).is_empty());
    }

    #[test]
    fn test_invalid_input() {
        assert!(PointClassifier::new(ClassifierParams {
            thread_count: 0,
            ..Default::default()
        })
        .is_err());
        let classifier = PointClassifier::new(ClassifierParams::default()).unwrap();
        assert!(classifier
            .classify(&[Vector3::new(f64::INFINITY, 0.0, 0.0)])
            .is_err());
        assert!(classifier.classify(&[]).unwrap().is_empty());
    }
}
