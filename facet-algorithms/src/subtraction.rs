use facet_core::kdtree::KdTree;
use facet_core::points::PointSet;
use facet_core::search::PointSearcher;
use log::debug;

/// Removes the points of one point set that lie close to the points of another one
#[derive(Debug, Clone, PartialEq)]
pub struct PointSubtraction {
    max_distance: f64,
    include_coincident: bool,
}

impl PointSubtraction {
    /// Subtraction that removes minuend points with a subtrahend point within `max_distance`. Exactly coincident
    /// points are not considered a match
    pub fn new(max_distance: f64) -> Self {
        Self {
            max_distance,
            include_coincident: false,
        }
    }

    /// Whether a subtrahend point at distance zero counts as a match
    pub fn with_include_coincident(mut self, include_coincident: bool) -> Self {
        self.include_coincident = include_coincident;
        self
    }

    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    /// Returns the points of `minuend` without a matching point in `subtrahend`. Colours and, for grouped sets,
    /// group ids are carried over
    pub fn subtract(&self, minuend: &PointSet, subtrahend: &PointSet) -> PointSet {
        let mut tree = KdTree::new(3);
        tree.add(
            subtrahend
                .positions()
                .map(|p| [p.x, p.y, p.z])
                .collect(),
        );

        let mut result = if minuend.is_grouped() {
            PointSet::new_grouped()
        } else {
            PointSet::new()
        };
        for (index, position) in minuend.positions().enumerate() {
            let has_match = !tree.is_empty()
                && PointSearcher::new(&tree, position.coords.as_slice())
                    .with_max_radius(self.max_distance)
                    .get_nearest_points()
                    .iter()
                    .any(|neighbour| self.include_coincident || neighbour.distance > 0.0);
            if !has_match {
                result.push(position, minuend.color(index), minuend.group(index));
            }
        }
        debug!(
            "Subtraction kept {} of {} points",
            result.len(),
            minuend.len()
        );
        result
    }
}
