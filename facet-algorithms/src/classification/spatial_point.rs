use facet_core::nalgebra::Vector3;

use crate::least_squares::HessianPlane;

/// An input point together with the descriptors of its local neighbourhood
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialDomainPoint {
    coordinate: Vector3<f64>,
    index: usize,
    pub(crate) neighbour_count: usize,
    pub(crate) nth_neighbour_distance: f64,
    pub(crate) eigenvalues: [f64; 3],
    pub(crate) eigenvectors: [Vector3<f64>; 3],
    pub(crate) plane: HessianPlane,
    pub(crate) is_planar: bool,
    pub(crate) is_cylindrical: bool,
    pub(crate) cluster_id: usize,
}

impl SpatialDomainPoint {
    /// Creates an unclassified point. Its cluster id is its own `index`, which marks it as unassigned
    pub fn new(coordinate: Vector3<f64>, index: usize) -> Self {
        let nan = Vector3::new(f64::NAN, f64::NAN, f64::NAN);
        Self {
            coordinate,
            index,
            neighbour_count: 0,
            nth_neighbour_distance: f64::NAN,
            eigenvalues: [f64::NAN; 3],
            eigenvectors: [nan, nan, nan],
            plane: HessianPlane::invalid(),
            is_planar: false,
            is_cylindrical: false,
            cluster_id: index,
        }
    }

    pub fn coordinate(&self) -> &Vector3<f64> {
        &self.coordinate
    }

    /// Index of this point in the input array
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of neighbours found during classification, including the point itself
    pub fn neighbour_count(&self) -> usize {
        self.neighbour_count
    }

    /// Distance to the farthest of the found neighbours. Used as the reach of this point when testing whether
    /// two points are adjacent
    pub fn nth_neighbour_distance(&self) -> f64 {
        self.nth_neighbour_distance
    }

    /// Eigenvalues of the neighbourhood covariance, largest first
    pub fn eigenvalues(&self) -> [f64; 3] {
        self.eigenvalues
    }

    pub fn eigenvectors(&self) -> &[Vector3<f64>; 3] {
        &self.eigenvectors
    }

    /// Least squares plane through the neighbourhood
    pub fn plane(&self) -> &HessianPlane {
        &self.plane
    }

    pub fn is_planar(&self) -> bool {
        self.is_planar
    }

    pub fn is_cylindrical(&self) -> bool {
        self.is_cylindrical
    }

    /// Returns true if the plane of this point has finite parameters
    pub fn has_valid_parameters(&self) -> bool {
        self.plane.has_valid_parameters()
    }

    pub fn cluster_id(&self) -> usize {
        self.cluster_id
    }

    pub fn set_cluster_id(&mut self, cluster_id: usize) {
        self.cluster_id = cluster_id;
    }

    /// True while the point still carries its initial singleton cluster id
    pub fn is_unassigned(&self) -> bool {
        self.cluster_id == self.index
    }
}
