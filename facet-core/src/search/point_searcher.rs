use float_ord::FloatOrd;

use crate::kdtree::{KdNode, KdPoint, KdTree};
use crate::math::vector::distance;

/// Number of radius widening passes used by default
pub const DEFAULT_DISTANCE_STEPS: u32 = 4;

/// A point found by a [PointSearcher] together with its euclidean distance to the query coordinate
#[derive(Debug, Clone, Copy)]
pub struct Neighbour<'a, P> {
    pub point: &'a P,
    pub distance: f64,
}

/// Radius and nearest neighbour queries over a [KdTree].
///
/// If the number of results is bounded, the searcher does not scan the full radius right away. It runs up to
/// `distance_steps` passes, pass `i` (counting from 1) using the radius `max_radius * 2^(i - distance_steps)`,
/// and stops after the first pass that found enough points. This makes small `k` queries in dense regions cheap,
/// at the price of returning only approximately the `k` nearest points when the local density is very uneven.
/// Unbounded queries always search the full radius in a single pass and are exact.
///
/// The query coordinate itself is not excluded: an indexed point at distance 0 is part of the result.
/// ```
/// # use facet_core::kdtree::KdTree;
/// # use facet_core::search::PointSearcher;
/// let mut tree = KdTree::new(2);
/// tree.add(vec![[0.0, 0.0], [1.0, 0.0], [5.0, 0.0]]);
/// let neighbours = PointSearcher::new(&tree, &[0.2, 0.0])
///     .with_max_radius(2.0)
///     .get_nearest_points();
/// assert_eq!(neighbours.len(), 2);
/// assert_eq!(*neighbours[0].point, [0.0, 0.0]);
/// ```
pub struct PointSearcher<'a, P> {
    tree: &'a KdTree<P>,
    query: Vec<f64>,
    max_result_count: Option<usize>,
    max_radius: f64,
    distance_steps: u32,
}

impl<'a, P: KdPoint> PointSearcher<'a, P> {
    /// Creates a searcher around `query` with an unbounded result count and an infinite search radius
    ///
    /// # Panics
    ///
    /// If the dimensionality of `query` differs from the dimensionality of `tree`
    pub fn new(tree: &'a KdTree<P>, query: &[f64]) -> Self {
        if query.len() != tree.dimensions() {
            panic!(
                "PointSearcher::new: Query has {} dimensions but the tree has {}",
                query.len(),
                tree.dimensions()
            );
        }
        Self {
            tree,
            query: query.to_vec(),
            max_result_count: None,
            max_radius: f64::INFINITY,
            distance_steps: DEFAULT_DISTANCE_STEPS,
        }
    }

    /// Limits the number of returned points to the `count` nearest ones
    pub fn with_max_result_count(mut self, count: usize) -> Self {
        self.max_result_count = Some(count);
        self
    }

    /// Only points within `radius` (inclusive) of the query coordinate are returned
    pub fn with_max_radius(mut self, radius: f64) -> Self {
        self.max_radius = radius;
        self
    }

    /// Sets the number of widening passes for bounded queries. Zero is treated as a single pass
    pub fn with_distance_steps(mut self, steps: u32) -> Self {
        self.distance_steps = steps.max(1);
        self
    }

    /// Moves the query coordinate, keeping all other settings
    pub fn set_query(&mut self, query: &[f64]) {
        self.query.clear();
        self.query.extend_from_slice(query);
    }

    /// Returns the points within the search radius, sorted ascending by distance and truncated to the maximum
    /// result count
    pub fn get_nearest_points(&self) -> Vec<Neighbour<'a, P>> {
        let mut results = vec![];
        match self.max_result_count {
            None => self.collect(self.max_radius, &mut results),
            Some(0) => return results,
            Some(max_count) => {
                for step in 1..=self.distance_steps {
                    let exponent = step as i32 - self.distance_steps as i32;
                    let radius = self.max_radius * 2.0_f64.powi(exponent);
                    results.clear();
                    self.collect(radius, &mut results);
                    if results.len() >= max_count {
                        break;
                    }
                }
            }
        }
        results.sort_by_key(|neighbour| FloatOrd(neighbour.distance));
        if let Some(max_count) = self.max_result_count {
            results.truncate(max_count);
        }
        results
    }

    /// Returns the number of points that [get_nearest_points](Self::get_nearest_points) would return. Unbounded
    /// queries count matches without collecting them
    pub fn get_nearest_neighbor_count(&self) -> usize {
        match self.max_result_count {
            None => self.count(self.max_radius),
            Some(_) => self.get_nearest_points().len(),
        }
    }

    /// Visits every leaf whose cell may contain points within `radius` of the query coordinate
    fn visit_leaves<F: FnMut(&'a KdNode<P>)>(&self, radius: f64, mut visitor: F) {
        let mut worklist = vec![self.tree.root()];
        while let Some(node) = worklist.pop() {
            match (node.children(), node.split_dimension(), node.split_position()) {
                (Some((lower, higher)), Some(dimension), Some(position)) => {
                    let value = self.query[dimension];
                    if value - radius < position {
                        worklist.push(lower);
                    }
                    if value + radius >= position {
                        worklist.push(higher);
                    }
                }
                _ => visitor(node),
            }
        }
    }

    fn collect(&self, radius: f64, results: &mut Vec<Neighbour<'a, P>>) {
        let query = &self.query;
        self.visit_leaves(radius, |leaf| {
            for point in leaf.points() {
                let distance = distance(point.coordinate(), query);
                if distance <= radius {
                    results.push(Neighbour { point, distance });
                }
            }
        });
    }

    fn count(&self, radius: f64) -> usize {
        let query = &self.query;
        let mut count = 0;
        self.visit_leaves(radius, |leaf| {
            count += leaf
                .points()
                .iter()
                .filter(|point| distance(point.coordinate(), query) <= radius)
                .count();
        });
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_tree(count: usize, seed: u64) -> (KdTree<[f64; 3]>, Vec<[f64; 3]>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let points: Vec<[f64; 3]> = (0..count)
            .map(|_| {
                [
                    rng.gen_range(0.0..10.0),
                    rng.gen_range(0.0..10.0),
                    rng.gen_range(0.0..10.0),
                ]
            })
            .collect();
        let mut tree = KdTree::new(3);
        tree.add(points.clone());
        (tree, points)
    }

    #[test]
    fn test_radius_search_matches_brute_force() {
        let (tree, points) = random_tree(400, 42);
        let query = [5.0, 5.0, 5.0];
        for radius in [0.5, 1.5, 3.0, 20.0].iter() {
            let found = PointSearcher::new(&tree, &query)
                .with_max_radius(*radius)
                .get_nearest_points();

            let mut expected: Vec<f64> = points
                .iter()
                .map(|p| distance(p, &query))
                .filter(|d| d <= radius)
                .collect();
            expected.sort_by_key(|d| FloatOrd(*d));

            let distances: Vec<f64> = found.iter().map(|n| n.distance).collect();
            assert_eq!(distances, expected);
            assert_eq!(
                PointSearcher::new(&tree, &query)
                    .with_max_radius(*radius)
                    .get_nearest_neighbor_count(),
                expected.len()
            );
        }
    }

    #[test]
    fn test_bounded_search_returns_nearest_for_uniform_data() {
        let mut points = vec![];
        for x in 0..10 {
            for y in 0..10 {
                points.push([x as f64, y as f64, 0.0]);
            }
        }
        let mut tree = KdTree::new(3);
        tree.add(points);

        let found = PointSearcher::new(&tree, &[4.0, 4.0, 0.0])
            .with_max_result_count(5)
            .with_max_radius(8.0)
            .get_nearest_points();
        assert_eq!(found.len(), 5);
        assert_eq!(found[0].distance, 0.0);
        assert!(found[1..].iter().all(|n| n.distance == 1.0));
    }

    #[test]
    fn test_bounded_search_respects_radius() {
        let mut tree = KdTree::new(1);
        tree.add(vec![[0.0], [1.0], [10.0]]);
        let found = PointSearcher::new(&tree, &[0.0])
            .with_max_result_count(3)
            .with_max_radius(2.0)
            .get_nearest_points();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_empty_tree() {
        let tree: KdTree<[f64; 2]> = KdTree::new(2);
        let searcher = PointSearcher::new(&tree, &[0.0, 0.0]).with_max_radius(1.0);
        assert!(searcher.get_nearest_points().is_empty());
        assert_eq!(searcher.get_nearest_neighbor_count(), 0);
    }

    #[test]
    fn test_coincident_point_is_included() {
        let mut tree = KdTree::new(2);
        tree.add(vec![[1.0, 1.0], [1.0, 1.0], [2.0, 1.0]]);
        let found = PointSearcher::new(&tree, &[1.0, 1.0])
            .with_max_radius(0.5)
            .get_nearest_points();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|n| n.distance == 0.0));
    }

    #[test]
    fn test_set_query() {
        let mut tree = KdTree::new(1);
        tree.add(vec![[0.0], [10.0]]);
        let mut searcher = PointSearcher::new(&tree, &[0.0]).with_max_radius(1.0);
        assert_eq!(*searcher.get_nearest_points()[0].point, [0.0]);
        searcher.set_query(&[9.5]);
        assert_eq!(*searcher.get_nearest_points()[0].point, [10.0]);
    }
}
