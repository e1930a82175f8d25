use float_ord::FloatOrd;

use super::KdPoint;

/// The two possible states of a kd-tree node. A node either stores points directly or owns exactly two
/// children, never both.
#[derive(Debug)]
enum NodeContent<P> {
    Leaf(Vec<P>),
    Split {
        dimension: usize,
        position: f64,
        lower: Box<KdNode<P>>,
        higher: Box<KdNode<P>>,
    },
}

/// A single node of a [KdTree](super::KdTree). Leaf nodes hold points, internal nodes hold a splitting plane
/// and two children: the `lower` child receives all points with `coordinate[dimension] < position`, the
/// `higher` child all remaining points.
#[derive(Debug)]
pub struct KdNode<P> {
    content: NodeContent<P>,
    parent_split_dimension: Option<usize>,
}

impl<P: KdPoint> KdNode<P> {
    pub(crate) fn new_leaf(parent_split_dimension: Option<usize>) -> Self {
        Self {
            content: NodeContent::Leaf(vec![]),
            parent_split_dimension,
        }
    }

    /// Returns true if this node stores points directly instead of having children
    pub fn is_leaf(&self) -> bool {
        matches!(self.content, NodeContent::Leaf(_))
    }

    /// The points stored in this node. Always empty for internal nodes
    pub fn points(&self) -> &[P] {
        match &self.content {
            NodeContent::Leaf(points) => points,
            NodeContent::Split { .. } => &[],
        }
    }

    /// The splitting dimension of this node, or `None` for leaf nodes
    pub fn split_dimension(&self) -> Option<usize> {
        match &self.content {
            NodeContent::Split { dimension, .. } => Some(*dimension),
            NodeContent::Leaf(_) => None,
        }
    }

    /// The splitting position of this node, or `None` for leaf nodes
    pub fn split_position(&self) -> Option<f64> {
        match &self.content {
            NodeContent::Split { position, .. } => Some(*position),
            NodeContent::Leaf(_) => None,
        }
    }

    /// The `(lower, higher)` children of this node, or `None` for leaf nodes
    pub fn children(&self) -> Option<(&KdNode<P>, &KdNode<P>)> {
        match &self.content {
            NodeContent::Split { lower, higher, .. } => Some((lower, higher)),
            NodeContent::Leaf(_) => None,
        }
    }

    /// Adds a batch of points below this node. Internal nodes route every point into the matching child.
    /// Leaf nodes take the points over and split once they hold more than `leaf_capacity` points, provided
    /// that the points can be separated along some dimension. Sorted inserts can make the tree as deep as it
    /// holds points, so the descent works on an explicit stack.
    pub(crate) fn add(&mut self, points: Vec<P>, leaf_capacity: usize) {
        let mut pending = vec![(self, points)];
        while let Some((node, points)) = pending.pop() {
            if points.is_empty() {
                continue;
            }
            let points = match node.absorb(points, leaf_capacity) {
                Some(points) => points,
                None => continue,
            };
            if let NodeContent::Split {
                dimension,
                position,
                lower,
                higher,
            } = &mut node.content
            {
                let (dimension, position) = (*dimension, *position);
                let (lower_points, higher_points): (Vec<P>, Vec<P>) = points
                    .into_iter()
                    .partition(|point| point.coordinate()[dimension] < position);
                pending.push((&mut **higher, higher_points));
                pending.push((&mut **lower, lower_points));
            }
        }
    }

    /// Stores `points` in this node if it is a leaf that stays a leaf. Otherwise returns the points that still
    /// have to be routed into the children: the given batch for internal nodes, or all points of a leaf that
    /// just turned into an internal node with two empty children.
    fn absorb(&mut self, points: Vec<P>, leaf_capacity: usize) -> Option<Vec<P>> {
        let existing = match &mut self.content {
            NodeContent::Leaf(existing) => existing,
            NodeContent::Split { .. } => return Some(points),
        };
        existing.extend(points);
        if existing.len() <= leaf_capacity {
            return None;
        }
        // All points share the same coordinate, they stay together in this leaf
        let dimension = splitting_dimension(existing, self.parent_split_dimension)?;
        let position = splitting_position(existing, dimension);
        let points = std::mem::take(existing);
        self.content = NodeContent::Split {
            dimension,
            position,
            lower: Box::new(KdNode::new_leaf(Some(dimension))),
            higher: Box::new(KdNode::new_leaf(Some(dimension))),
        };
        Some(points)
    }

    /// Visits all nodes below and including this one in depth-first order, lower child first
    fn depth_first(&self) -> impl Iterator<Item = (&KdNode<P>, usize)> {
        let mut stack = vec![(self, 1)];
        std::iter::from_fn(move || {
            let (node, depth) = stack.pop()?;
            if let NodeContent::Split { lower, higher, .. } = &node.content {
                stack.push((&**higher, depth + 1));
                stack.push((&**lower, depth + 1));
            }
            Some((node, depth))
        })
    }

    pub(crate) fn collect_points<'a>(&'a self, target: &mut Vec<&'a P>) {
        for (node, _) in self.depth_first() {
            target.extend(node.points().iter());
        }
    }

    pub(crate) fn collect_leaves<'a>(&'a self, target: &mut Vec<&'a KdNode<P>>) {
        target.extend(self.depth_first().map(|(node, _)| node).filter(|node| node.is_leaf()));
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth_first().map(|(_, depth)| depth).max().unwrap_or(1)
    }
}

impl<P> Drop for KdNode<P> {
    // Unlinks the children iteratively, dropping a degenerate tree recursively would exhaust the stack
    fn drop(&mut self) {
        let mut stack = vec![];
        if let NodeContent::Split { lower, higher, .. } =
            std::mem::replace(&mut self.content, NodeContent::Leaf(vec![]))
        {
            stack.push(lower);
            stack.push(higher);
        }
        while let Some(mut node) = stack.pop() {
            if let NodeContent::Split { lower, higher, .. } =
                std::mem::replace(&mut node.content, NodeContent::Leaf(vec![]))
            {
                stack.push(lower);
                stack.push(higher);
            }
        }
    }
}

/// Returns the spread `max - min` of the coordinates of `points` along `dimension`. Zero for empty input
pub fn coordinate_spread<P: KdPoint>(points: &[P], dimension: usize) -> f64 {
    let mut values = points.iter().map(|point| point.coordinate()[dimension]);
    let first = match values.next() {
        Some(value) => value,
        None => return 0.0,
    };
    let (min, max) = values.fold((first, first), |(min, max), value| {
        (min.min(value), max.max(value))
    });
    max - min
}

/// Picks the dimension with the largest spread, skipping the splitting dimension of the parent node. Falls
/// back to the parent's dimension if all other dimensions are degenerate. Returns `None` if the points can't
/// be separated at all.
fn splitting_dimension<P: KdPoint>(points: &[P], parent_dimension: Option<usize>) -> Option<usize> {
    if points.len() < 2 {
        return None;
    }
    let dimensions = points[0].coordinate().len();
    let mut best: Option<(usize, f64)> = None;
    for dimension in (0..dimensions).filter(|d| Some(*d) != parent_dimension) {
        let spread = coordinate_spread(points, dimension);
        let is_better = match best {
            Some((_, best_spread)) => spread > best_spread,
            None => true,
        };
        if spread > 0.0 && is_better {
            best = Some((dimension, spread));
        }
    }
    match (best, parent_dimension) {
        (Some((dimension, _)), _) => Some(dimension),
        (None, Some(parent)) if coordinate_spread(points, parent) > 0.0 => Some(parent),
        _ => None,
    }
}

/// Computes the median coordinate along `dimension`. If the median value is shared by its predecessor (so that
/// the `<` comparison could not separate them), the split index is nudged alternately upwards and downwards until
/// it sits on a boundary between two distinct values. Requires a non-zero spread along `dimension`.
fn splitting_position<P: KdPoint>(points: &[P], dimension: usize) -> f64 {
    let mut values: Vec<f64> = points
        .iter()
        .map(|point| point.coordinate()[dimension])
        .collect();
    values.sort_by_key(|value| FloatOrd(*value));

    let median = values.len() / 2;
    let is_boundary = |index: usize| index > 0 && index < values.len() && values[index - 1] < values[index];
    for offset in 0..values.len() {
        if is_boundary(median + offset) {
            return values[median + offset];
        }
        if offset <= median && is_boundary(median - offset) {
            return values[median - offset];
        }
    }
    // Unreachable for a non-zero spread, the largest value always separates
    values[values.len() - 1]
}
