use nalgebra::{Point3, Vector3};

/// 3D axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AABB {
    min: Point3<f64>,
    max: Point3<f64>,
}

impl AABB {
    /// Creates a new AABB from the given minimum and maximum coordinates. Panics if the minimum position is
    /// not less than or equal to the maximum position
    /// ```
    /// # use facet_core::math::AABB;
    /// let bounds = AABB::from_min_max(nalgebra::Point3::new(0.0, 0.0, 0.0), nalgebra::Point3::new(1.0, 1.0, 1.0));
    /// ```
    pub fn from_min_max(min: Point3<f64>, max: Point3<f64>) -> Self {
        if min.x > max.x || min.y > max.y || min.z > max.z {
            panic!("AABB::from_min_max: Minimum position must be <= maximum position!");
        }
        Self { min, max }
    }

    /// Creates a degenerate AABB that contains only `point`
    pub fn from_point(point: &Point3<f64>) -> Self {
        Self {
            min: *point,
            max: *point,
        }
    }

    /// Creates the smallest AABB containing all `points`. Returns `None` for an empty iterator
    /// ```
    /// # use facet_core::math::AABB;
    /// # use nalgebra::Point3;
    /// let bounds = AABB::from_points([Point3::new(1.0, 0.0, 2.0), Point3::new(-1.0, 3.0, 0.0)].iter()).unwrap();
    /// assert_eq!(*bounds.min(), Point3::new(-1.0, 0.0, 0.0));
    /// assert_eq!(*bounds.max(), Point3::new(1.0, 3.0, 2.0));
    /// ```
    pub fn from_points<'a, I: IntoIterator<Item = &'a Point3<f64>>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self::from_point(first), |bounds, point| {
            bounds.extend_with_point(point)
        }))
    }

    pub fn min(&self) -> &Point3<f64> {
        &self.min
    }

    pub fn max(&self) -> &Point3<f64> {
        &self.max
    }

    /// Returns the extent of this AABB. The extent is the size between the minimum and maximum position of this AABB
    pub fn extent(&self) -> Vector3<f64> {
        self.max - self.min
    }

    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Performs an intersection test between this AABB and the given AABB. Touching boxes and boxes
    /// contained within each other count as intersecting
    pub fn intersects(&self, other: &AABB) -> bool {
        (self.min.x <= other.max.x && self.max.x >= other.min.x)
            && (self.min.y <= other.max.y && self.max.y >= other.min.y)
            && (self.min.z <= other.max.z && self.max.z >= other.min.z)
    }

    /// Returns true if the given point is contained within this AABB. Points right on the boundary count as contained
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Computes the smallest AABB that fully contains both `self` and `other`
    pub fn union(&self, other: &AABB) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Returns a copy of this AABB extended so that it contains `point`
    pub fn extend_with_point(&self, point: &Point3<f64>) -> AABB {
        Self {
            min: self.min.inf(point),
            max: self.max.sup(point),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_and_union() {
        let bounds = AABB::from_point(&Point3::new(1.0, 1.0, 1.0));
        let bounds = bounds.extend_with_point(&Point3::new(-1.0, 2.0, 0.5));
        assert_eq!(*bounds.min(), Point3::new(-1.0, 1.0, 0.5));
        assert_eq!(*bounds.max(), Point3::new(1.0, 2.0, 1.0));

        let other = AABB::from_min_max(Point3::new(5.0, 5.0, 5.0), Point3::new(6.0, 6.0, 6.0));
        assert!(!bounds.intersects(&other));
        let merged = bounds.union(&other);
        assert_eq!(*merged.max(), Point3::new(6.0, 6.0, 6.0));
        assert!(merged.contains(&Point3::new(3.0, 3.0, 3.0)));
    }

    #[test]
    fn test_center_and_extent() {
        let bounds = AABB::from_min_max(Point3::new(-2.0, 0.0, 0.0), Point3::new(2.0, 1.0, 4.0));
        assert_eq!(bounds.center(), Point3::new(0.0, 0.5, 2.0));
        assert_eq!(bounds.extent(), Vector3::new(4.0, 1.0, 4.0));
    }

    #[test]
    fn test_from_points_empty() {
        let points: Vec<Point3<f64>> = vec![];
        assert!(AABB::from_points(points.iter()).is_none());
    }

    #[test]
    #[should_panic]
    fn test_from_min_max_rejects_inverted_bounds() {
        AABB::from_min_max(Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 1.0));
    }
}
