use anyhow::{bail, Result};
use facet_core::nalgebra::{Matrix3, SymmetricEigen, Vector3};

/// Principal components of a 3D point neighbourhood. Eigenvalues are sorted in descending order and
/// `eigenvectors[i]` is the unit eigenvector belonging to `eigenvalues[i]`
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalComponents {
    centroid: Vector3<f64>,
    eigenvalues: [f64; 3],
    eigenvectors: [Vector3<f64>; 3],
}

impl PrincipalComponents {
    /// Runs a principal component analysis over `points`. Fails for an empty neighbourhood or if the
    /// neighbourhood contains non-finite coordinates
    pub fn compute(points: &[Vector3<f64>]) -> Result<Self> {
        if points.is_empty() {
            bail!("Can't compute principal components of an empty neighbourhood");
        }
        if let Some(point) = points
            .iter()
            .find(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
        {
            bail!("Neighbourhood contains the non-finite point {}", point);
        }

        let centroid = calc_centroid(points);
        let covariance_matrix = calc_covariance_matrix(&centroid, points);
        let eigen = SymmetricEigen::new(covariance_matrix);

        let mut order = [0, 1, 2];
        order.sort_by(|a, b| {
            eigen.eigenvalues[*b]
                .partial_cmp(&eigen.eigenvalues[*a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let eigenvalues = [
            eigen.eigenvalues[order[0]],
            eigen.eigenvalues[order[1]],
            eigen.eigenvalues[order[2]],
        ];
        let eigenvectors = [
            eigen.eigenvectors.column(order[0]).into_owned(),
            eigen.eigenvectors.column(order[1]).into_owned(),
            eigen.eigenvectors.column(order[2]).into_owned(),
        ];

        Ok(Self {
            centroid,
            eigenvalues,
            eigenvectors,
        })
    }

    pub fn centroid(&self) -> &Vector3<f64> {
        &self.centroid
    }

    /// Eigenvalues of the covariance matrix, largest first
    pub fn eigenvalues(&self) -> [f64; 3] {
        self.eigenvalues
    }

    /// Unit eigenvectors matching [eigenvalues](Self::eigenvalues)
    pub fn eigenvectors(&self) -> &[Vector3<f64>; 3] {
        &self.eigenvectors
    }

    /// Direction of least variance, i.e. the normal of the best fitting plane
    pub fn smallest_eigenvector(&self) -> &Vector3<f64> {
        &self.eigenvectors[2]
    }
}

pub(crate) fn calc_centroid(points: &[Vector3<f64>]) -> Vector3<f64> {
    let sum: Vector3<f64> = points.iter().sum();

    sum / (points.len() as f64)
}

pub(crate) fn calc_covariance_matrix(centroid: &Vector3<f64>, points: &[Vector3<f64>]) -> Matrix3<f64> {
    let unweighted_covariance_matrix: Matrix3<f64> = points
        .iter()
        .map(|v| {
            let diff: Vector3<f64> = v - centroid;
            diff * diff.transpose()
        })
        .sum();
    unweighted_covariance_matrix / (points.len() as f64)
}
