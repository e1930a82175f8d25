//! Generic N-dimensional kd-tree.
//!
//! The tree is built incrementally from batches of points. Leaves split at the median of the dimension with
//! the largest spread (never reusing the parent's dimension if another one is available), so repeated inserts
//! of evenly distributed data keep the tree roughly balanced. Points that can't be separated because all of
//! their coordinates coincide stay together in a single leaf.

mod node;
pub use self::node::*;

/// Types that can be stored inside a [KdTree]
pub trait KdPoint {
    /// The coordinate of this point. All points of the same tree have to share one dimensionality
    fn coordinate(&self) -> &[f64];
}

impl KdPoint for Vec<f64> {
    fn coordinate(&self) -> &[f64] {
        self.as_slice()
    }
}

impl<const N: usize> KdPoint for [f64; N] {
    fn coordinate(&self) -> &[f64] {
        &self[..]
    }
}

impl<T: KdPoint> KdPoint for &T {
    fn coordinate(&self) -> &[f64] {
        (*self).coordinate()
    }
}

/// A coordinate together with the index of the item it was taken from. Useful for indexing points that live
/// in some external array, e.g. the spatial points of a classification run.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedPoint {
    coordinate: Vec<f64>,
    index: usize,
}

impl IndexedPoint {
    pub fn new(coordinate: Vec<f64>, index: usize) -> Self {
        Self { coordinate, index }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl KdPoint for IndexedPoint {
    fn coordinate(&self) -> &[f64] {
        &self.coordinate
    }
}

/// Kd-tree over points of type `P`. The tree owns its points, queries are performed through
/// [PointSearcher](crate::search::PointSearcher)
/// ```
/// # use facet_core::kdtree::KdTree;
/// let mut tree = KdTree::new(2);
/// tree.add(vec![[0.0, 0.0], [1.0, 2.0], [3.0, 1.0]]);
/// assert_eq!(tree.len(), 3);
/// assert_eq!(tree.get_all_points().len(), 3);
/// ```
#[derive(Debug)]
pub struct KdTree<P> {
    root: KdNode<P>,
    dimensions: usize,
    leaf_capacity: usize,
    len: usize,
}

impl<P: KdPoint> KdTree<P> {
    /// Creates an empty tree for points with `dimensions` coordinates. Leaves split as soon as they hold more
    /// than a single point
    pub fn new(dimensions: usize) -> Self {
        Self::with_leaf_capacity(dimensions, 1)
    }

    /// Creates an empty tree whose leaves only split once they hold more than `leaf_capacity` points
    ///
    /// # Panics
    ///
    /// If `leaf_capacity` is zero
    pub fn with_leaf_capacity(dimensions: usize, leaf_capacity: usize) -> Self {
        if leaf_capacity == 0 {
            panic!("KdTree::with_leaf_capacity: leaf_capacity must be at least 1");
        }
        Self {
            root: KdNode::new_leaf(None),
            dimensions,
            leaf_capacity,
            len: 0,
        }
    }

    /// Inserts a batch of points into the tree. Empty batches are a no-op
    ///
    /// # Panics
    ///
    /// If the dimensionality of any point differs from the dimensionality of this tree
    pub fn add(&mut self, points: Vec<P>) {
        if let Some(point) = points
            .iter()
            .find(|point| point.coordinate().len() != self.dimensions)
        {
            panic!(
                "KdTree::add: Expected points with {} dimensions but got a point with {} dimensions",
                self.dimensions,
                point.coordinate().len()
            );
        }
        self.len += points.len();
        self.root.add(points, self.leaf_capacity);
    }

    /// Returns all points of this tree, ordered by a depth-first traversal (lower child first)
    pub fn get_all_points(&self) -> Vec<&P> {
        let mut points = Vec::with_capacity(self.len);
        self.root.collect_points(&mut points);
        points
    }

    /// Returns all leaf nodes of this tree, ordered by a depth-first traversal (lower child first)
    pub fn get_all_leaf_nodes(&self) -> Vec<&KdNode<P>> {
        let mut leaves = vec![];
        self.root.collect_leaves(&mut leaves);
        leaves
    }

    pub fn root(&self) -> &KdNode<P> {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of nodes on the longest path from the root to a leaf. An empty tree has depth 1
    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    pub fn leaf_count(&self) -> usize {
        self.get_all_leaf_nodes().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_points(count: usize, seed: u64) -> Vec<[f64; 3]> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                [
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                ]
            })
            .collect()
    }

    fn sorted(points: Vec<[f64; 3]>) -> Vec<[f64; 3]> {
        let mut points = points;
        points.sort_by(|a, b| a.partial_cmp(b).unwrap());
        points
    }

    fn check_split_invariant(node: &KdNode<[f64; 3]>) {
        if let Some((lower, higher)) = node.children() {
            let dimension = node.split_dimension().unwrap();
            let position = node.split_position().unwrap();
            assert!(node.points().is_empty());
            let mut lower_points = vec![];
            lower.collect_points(&mut lower_points);
            assert!(lower_points.iter().all(|p| p[dimension] < position));
            let mut higher_points = vec![];
            higher.collect_points(&mut higher_points);
            assert!(higher_points.iter().all(|p| p[dimension] >= position));
            check_split_invariant(lower);
            check_split_invariant(higher);
        }
    }

    #[test]
    fn test_round_trip_returns_all_points() {
        let points = random_points(500, 7);
        let mut tree = KdTree::new(3);
        tree.add(points.clone());

        let stored = tree.get_all_points().into_iter().copied().collect();
        assert_eq!(sorted(stored), sorted(points));
        assert_eq!(tree.len(), 500);
        assert_eq!(tree.leaf_count(), 500);
    }

    #[test]
    fn test_round_trip_is_independent_of_batching() {
        let points = random_points(300, 11);
        let mut tree = KdTree::new(3);
        for chunk in points.chunks(37) {
            tree.add(chunk.to_vec());
        }
        tree.add(vec![]);

        let stored = tree.get_all_points().into_iter().copied().collect();
        assert_eq!(sorted(stored), sorted(points));
        check_split_invariant(tree.root());
    }

    #[test]
    fn test_split_invariant() {
        let mut tree = KdTree::new(3);
        tree.add(random_points(1000, 3));
        check_split_invariant(tree.root());
        // A median split keeps the tree far from degenerate
        assert!(tree.depth() < 40);
    }

    #[test]
    fn test_identical_points_stay_in_one_leaf() {
        let mut tree = KdTree::new(3);
        tree.add(vec![[1.0, 2.0, 3.0]; 10]);
        assert!(tree.root().is_leaf());
        assert_eq!(tree.root().points().len(), 10);

        tree.add(vec![[5.0, 2.0, 3.0]]);
        assert!(!tree.root().is_leaf());
        assert_eq!(tree.leaf_count(), 2);
        check_split_invariant(tree.root());
    }

    #[test]
    fn test_leaf_capacity() {
        let mut tree = KdTree::with_leaf_capacity(3, 16);
        tree.add(random_points(10, 1));
        assert!(tree.root().is_leaf());

        tree.add(random_points(100, 2));
        assert!(tree
            .get_all_leaf_nodes()
            .iter()
            .all(|leaf| leaf.points().len() <= 16));
    }

    #[test]
    fn test_sorted_incremental_inserts() {
        let count = 20_000;
        let mut tree = KdTree::new(1);
        for i in 0..count {
            tree.add(vec![[i as f64]]);
        }
        assert_eq!(tree.len(), count);
        assert!(tree.depth() > 1000);
        assert_eq!(tree.leaf_count(), count);

        let stored: Vec<f64> = tree.get_all_points().iter().map(|p| p[0]).collect();
        let expected: Vec<f64> = (0..count).map(|i| i as f64).collect();
        assert_eq!(stored, expected);

        let searcher = crate::search::PointSearcher::new(&tree, &[count as f64 - 1.0])
            .with_max_radius(1.5)
            .with_max_result_count(2);
        assert_eq!(searcher.get_nearest_points().len(), 2);
    }

    #[test]
    fn test_indexed_points() {
        let mut tree = KdTree::new(2);
        tree.add(vec![
            IndexedPoint::new(vec![0.0, 0.0], 4),
            IndexedPoint::new(vec![1.0, 1.0], 9),
        ]);
        let mut indices: Vec<usize> = tree.get_all_points().iter().map(|p| p.index()).collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![4, 9]);
    }

    #[test]
    #[should_panic]
    fn test_dimension_mismatch_panics() {
        let mut tree = KdTree::new(3);
        tree.add(vec![vec![1.0, 2.0]]);
    }
}
