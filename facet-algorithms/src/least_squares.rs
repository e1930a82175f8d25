use facet_core::nalgebra::Vector3;

use crate::pca::PrincipalComponents;

/// Relative size below which the second largest eigenvalue marks a neighbourhood as degenerate (collinear or
/// coincident points), in which case the plane normal is undefined
const DEGENERACY_TOLERANCE: f64 = 1e-12;

/// A plane in Hessian normal form `normal · x + d = 0` with a unit `normal`. Planes created by this module are
/// oriented so that `d <= 0`, which makes the normal point away from the origin. Invalid planes carry NaN
/// parameters and are recognized by [has_valid_parameters](HessianPlane::has_valid_parameters)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HessianPlane {
    normal: Vector3<f64>,
    d: f64,
}

impl HessianPlane {
    /// A plane with NaN parameters
    pub fn invalid() -> Self {
        Self {
            normal: Vector3::new(f64::NAN, f64::NAN, f64::NAN),
            d: f64::NAN,
        }
    }

    /// Creates the plane with the given normal passing through `point`. Returns an invalid plane if `normal`
    /// can't be normalized
    pub fn from_normal_and_point(normal: &Vector3<f64>, point: &Vector3<f64>) -> Self {
        let length = normal.norm();
        if length == 0.0 || !length.is_finite() {
            return Self::invalid();
        }
        let normal = normal / length;
        let d = -normal.dot(point);
        if d > 0.0 {
            Self { normal: -normal, d: -d }
        } else {
            Self { normal, d }
        }
    }

    /// Fits a plane to `points` by total least squares: the plane passes through the centroid and its normal is
    /// the direction of least variance. Fewer than three points or a degenerate neighbourhood yield an invalid
    /// plane
    /// ```
    /// # use facet_algorithms::least_squares::HessianPlane;
    /// # use facet_core::nalgebra::Vector3;
    /// let plane = HessianPlane::fit(&[
    ///     Vector3::new(0.0, 0.0, 2.0),
    ///     Vector3::new(1.0, 0.0, 2.0),
    ///     Vector3::new(0.0, 1.0, 2.0),
    /// ]);
    /// assert!((plane.d() + 2.0).abs() < 1e-9);
    /// assert!((plane.normal().z - 1.0).abs() < 1e-9);
    /// ```
    pub fn fit(points: &[Vector3<f64>]) -> Self {
        if points.len() < 3 {
            return Self::invalid();
        }
        let pca = match PrincipalComponents::compute(points) {
            Ok(pca) => pca,
            Err(_) => return Self::invalid(),
        };
        let eigenvalues = pca.eigenvalues();
        if eigenvalues[1] <= DEGENERACY_TOLERANCE * eigenvalues[0].max(f64::MIN_POSITIVE) {
            return Self::invalid();
        }
        Self::from_normal_and_point(pca.smallest_eigenvector(), pca.centroid())
    }

    pub fn normal(&self) -> &Vector3<f64> {
        &self.normal
    }

    pub fn d(&self) -> f64 {
        self.d
    }

    /// The coefficients `[A, B, C, D]` of `Ax + By + Cz + D = 0`
    pub fn coefficients(&self) -> [f64; 4] {
        [self.normal.x, self.normal.y, self.normal.z, self.d]
    }

    /// Returns true if all plane parameters are finite
    pub fn has_valid_parameters(&self) -> bool {
        self.normal.iter().all(|c| c.is_finite()) && self.d.is_finite()
    }

    /// Foot of the perpendicular from the origin onto this plane. This is the position of the plane in the
    /// parameter domain
    pub fn foot_point(&self) -> Vector3<f64> {
        self.normal * -self.d
    }

    /// Distance of `point` from this plane
    pub fn distance_to(&self, point: &Vector3<f64>) -> f64 {
        (self.normal.dot(point) + self.d).abs()
    }

    /// Orthogonal projection of `point` onto this plane
    pub fn project(&self, point: &Vector3<f64>) -> Vector3<f64> {
        point - self.normal * (self.normal.dot(point) + self.d)
    }
}
