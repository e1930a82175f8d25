//! Voxel octree used to group points into spatially connected components.
//!
//! Points are registered one at a time. The root grows on demand by doubling its radius, and nodes are created
//! lazily down to the leaves, whose radius equals the configured detail level. After registration,
//! [Octree::group_neighbour_leafs_from_root] labels every occupied leaf with a group id so that touching leaves
//! end up in the same group.

use std::collections::HashMap;

use anyhow::{bail, Result};
use log::error;
use nalgebra::Point3;

mod colors;
pub use self::colors::*;

mod node;
pub use self::node::OctreeNode;
use self::node::{octant_offset, NODE_EPSILON};

/// Parameters of an [Octree]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct OctreeParams {
    /// Radius of the leaf voxels. Power-of-two values avoid rounding in the node centers
    pub detail_level: f64,
    /// Which touching leaves count as neighbours: 1 = shared faces (6-connectivity), 2 = shared faces or edges
    /// (18-connectivity), 3 = shared faces, edges or corners (26-connectivity)
    pub corner_neighbour_class: u8,
}

impl Default for OctreeParams {
    fn default() -> Self {
        Self {
            detail_level: 1.0,
            corner_neighbour_class: 3,
        }
    }
}

impl OctreeParams {
    pub fn validate(&self) -> Result<()> {
        if !self.detail_level.is_finite() || self.detail_level <= 0.0 {
            bail!(
                "Octree detail level must be positive and finite, got {}",
                self.detail_level
            );
        }
        if !(1..=3).contains(&self.corner_neighbour_class) {
            bail!(
                "Corner neighbour class must be 1, 2 or 3, got {}",
                self.corner_neighbour_class
            );
        }
        Ok(())
    }
}

/// Octree over 3D points with a fixed leaf size
/// ```
/// # use facet_core::octree::{Octree, OctreeParams};
/// # use nalgebra::Point3;
/// let mut octree = Octree::new(OctreeParams::default()).unwrap();
/// octree.register_point(Point3::new(0.5, 0.5, 0.5)).unwrap();
/// octree.register_point(Point3::new(1.5, 0.5, 0.5)).unwrap();
/// octree.register_point(Point3::new(9.5, 0.5, 0.5)).unwrap();
/// assert_eq!(octree.group_neighbour_leafs_from_root(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
    root: usize,
    params: OctreeParams,
    group_count: usize,
}

impl Octree {
    /// Creates an empty octree whose root is centered at the origin
    pub fn new(params: OctreeParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            nodes: vec![OctreeNode::new(Point3::origin(), params.detail_level)],
            root: 0,
            params,
            group_count: 0,
        })
    }

    /// Registers a single point. The root is expanded until it contains the point, then the path down to the
    /// matching leaf is created as needed. Every node on that path counts the point and extends its bounds
    pub fn register_point(&mut self, point: Point3<f64>) -> Result<()> {
        if !(point.x.is_finite() && point.y.is_finite() && point.z.is_finite()) {
            bail!("Can't register non-finite point {} in octree", point);
        }
        while !self.nodes[self.root].fits(&point)
            || self.nodes[self.root].radius() <= self.params.detail_level
        {
            if !(self.nodes[self.root].radius() * 2.0).is_finite() {
                bail!(
                    "Can't register point {} in octree, it lies outside of the representable range",
                    point
                );
            }
            self.expand();
        }

        let mut current = self.root;
        loop {
            self.nodes[current].touch(&point);
            let (center, radius) = (*self.nodes[current].center(), self.nodes[current].radius());
            if self.is_leaf_sized(radius) {
                if self.nodes[current].has_children() {
                    error!("Octree leaf at {} has child nodes", center);
                }
                return Ok(());
            }
            let octant = self.nodes[current].octant_of(&point);
            current = match self.nodes[current].children[octant] {
                Some(child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(OctreeNode::new(
                        center + octant_offset(octant, radius),
                        radius / 2.0,
                    ));
                    self.nodes[current].children[octant] = Some(child);
                    child
                }
            };
        }
    }

    /// Registers all points of the given iterator
    pub fn register_points<I: IntoIterator<Item = Point3<f64>>>(&mut self, points: I) -> Result<()> {
        for point in points {
            self.register_point(point)?;
        }
        Ok(())
    }

    /// Doubles the radius of the root while keeping its center. Every former child of the root is moved below a
    /// new intermediate node that takes the former child's octant, sitting in the opposite octant of that node.
    fn expand(&mut self) {
        let old_root = self.nodes[self.root].clone();
        let new_root_radius = old_root.radius() * 2.0;
        let mut expanded = OctreeNode::new(*old_root.center(), new_root_radius);
        expanded.inherit_statistics(&old_root);

        for (octant, child) in old_root.children.iter().enumerate() {
            if let Some(child) = child {
                let mut intermediate = OctreeNode::new(
                    *old_root.center() + octant_offset(octant, new_root_radius),
                    old_root.radius(),
                );
                intermediate.children[octant ^ 7] = Some(*child);
                intermediate.inherit_statistics(&self.nodes[*child]);
                let index = self.nodes.len();
                self.nodes.push(intermediate);
                expanded.children[octant] = Some(index);
            }
        }
        self.nodes[self.root] = expanded;
    }

    fn is_leaf_sized(&self, radius: f64) -> bool {
        radius <= self.params.detail_level + NODE_EPSILON
    }

    /// Indices of all occupied leaves in depth-first order (octant 0 first). Nodes that are neither a clean leaf
    /// nor a clean internal node are logged and skipped together with their subtree
    fn leaf_indices(&self) -> Vec<usize> {
        let mut leaves = vec![];
        let mut stack = vec![self.root];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            match (self.is_leaf_sized(node.radius()), node.has_children()) {
                (true, false) => {
                    if node.point_count() > 0 {
                        leaves.push(index);
                    }
                }
                (false, true) => stack.extend(node.children.iter().rev().flatten().copied()),
                (false, false) => {
                    if node.point_count() > 0 {
                        error!(
                            "Octree node at {} holds {} points but has no children, skipping it",
                            node.center(),
                            node.point_count()
                        );
                    }
                }
                (true, true) => error!(
                    "Octree leaf at {} has child nodes, skipping this branch",
                    node.center()
                ),
            }
        }
        leaves
    }

    /// Integer grid cell of a leaf-sized node
    fn cell_of(&self, node: &OctreeNode) -> [i64; 3] {
        let cell_size = 2.0 * self.params.detail_level;
        let center = node.center();
        [
            (center.x / cell_size).floor() as i64,
            (center.y / cell_size).floor() as i64,
            (center.z / cell_size).floor() as i64,
        ]
    }

    /// Assigns a group id to every occupied leaf so that connected leaves (see
    /// [OctreeNode::is_connected_to]) share an id. Ids are dense, starting at zero in depth-first order of the
    /// leaves. Returns the number of groups
    pub fn group_neighbour_leafs_from_root(&mut self) -> usize {
        let leaves = self.leaf_indices();
        let class = self.params.corner_neighbour_class;

        let mut visited: HashMap<[i64; 3], usize> = HashMap::with_capacity(leaves.len());
        let mut equivalence: Vec<usize> = vec![];
        let mut provisional: Vec<usize> = Vec::with_capacity(leaves.len());

        for (position, &leaf) in leaves.iter().enumerate() {
            let node = &self.nodes[leaf];
            let cell = self.cell_of(node);
            let mut groups = vec![];
            for offset in neighbour_offsets() {
                let key = [cell[0] + offset[0], cell[1] + offset[1], cell[2] + offset[2]];
                if let Some(&neighbour_position) = visited.get(&key) {
                    let neighbour = &self.nodes[leaves[neighbour_position]];
                    if node.is_connected_to(neighbour, class) {
                        groups.push(resolve(&equivalence, provisional[neighbour_position]));
                    }
                }
            }
            let group = match groups.iter().min() {
                Some(&min) => {
                    for &group in &groups {
                        equivalence[group] = min;
                    }
                    min
                }
                None => {
                    equivalence.push(equivalence.len());
                    equivalence.len() - 1
                }
            };
            provisional.push(group);
            visited.insert(cell, position);
        }

        let mut dense: Vec<Option<usize>> = vec![None; equivalence.len()];
        let mut group_count = 0;
        for (position, &leaf) in leaves.iter().enumerate() {
            let root = resolve(&equivalence, provisional[position]);
            let id = *dense[root].get_or_insert_with(|| {
                group_count += 1;
                group_count - 1
            });
            self.nodes[leaf].group = Some(id);
        }
        self.group_count = group_count;
        group_count
    }

    /// All occupied leaves in depth-first order
    pub fn leaves(&self) -> Vec<&OctreeNode> {
        self.leaf_indices()
            .into_iter()
            .map(|index| &self.nodes[index])
            .collect()
    }

    /// The occupied leaf that contains `point`, if any
    pub fn leaf_at(&self, point: &Point3<f64>) -> Option<&OctreeNode> {
        let mut node = &self.nodes[self.root];
        if !node.fits(point) {
            return None;
        }
        loop {
            if self.is_leaf_sized(node.radius()) {
                return if node.point_count() > 0 { Some(node) } else { None };
            }
            let child = node.children[node.octant_of(point)]?;
            node = &self.nodes[child];
        }
    }

    /// The group id of the leaf containing `point`. `None` if there is no such leaf or grouping did not run yet
    pub fn group_at(&self, point: &Point3<f64>) -> Option<usize> {
        self.leaf_at(point).and_then(OctreeNode::group)
    }

    pub fn root(&self) -> &OctreeNode {
        &self.nodes[self.root]
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_indices().len()
    }

    /// Total number of registered points
    pub fn point_count(&self) -> usize {
        self.root().point_count()
    }

    /// Number of groups found by the last call to [group_neighbour_leafs_from_root](Self::group_neighbour_leafs_from_root)
    pub fn group_count(&self) -> usize {
        self.group_count
    }

    pub fn detail_level(&self) -> f64 {
        self.params.detail_level
    }

    pub fn root_radius(&self) -> f64 {
        self.root().radius()
    }
}

fn resolve(equivalence: &[usize], mut group: usize) -> usize {
    while equivalence[group] != group {
        group = equivalence[group];
    }
    group
}

fn neighbour_offsets() -> impl Iterator<Item = [i64; 3]> {
    (-1..=1)
        .flat_map(|x| (-1..=1).flat_map(move |y| (-1..=1).map(move |z| [x, y, z])))
        .filter(|offset| *offset != [0, 0, 0])
}
