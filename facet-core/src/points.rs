use anyhow::{bail, Result};
use nalgebra::Point3;

/// A flat point set as exchanged with the outside world: an interleaved vertex buffer `[x0, y0, z0, x1, ...]`, a
/// parallel colour buffer `[r0, g0, b0, r1, ...]` with components in `[0, 1]` and optionally one group id per
/// point.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointSet {
    vertices: Vec<f64>,
    colors: Vec<f32>,
    groups: Option<Vec<usize>>,
}

impl PointSet {
    /// Creates an empty, ungrouped point set
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty set that expects a group id for every point
    pub fn new_grouped() -> Self {
        Self {
            groups: Some(vec![]),
            ..Default::default()
        }
    }

    /// Creates a point set from existing buffers. Fails if the buffer lengths don't describe the same number of
    /// points
    pub fn from_buffers(
        vertices: Vec<f64>,
        colors: Vec<f32>,
        groups: Option<Vec<usize>>,
    ) -> Result<Self> {
        if vertices.len() % 3 != 0 {
            bail!(
                "Vertex buffer length {} is not a multiple of 3",
                vertices.len()
            );
        }
        if colors.len() != vertices.len() {
            bail!(
                "Colour buffer has {} entries but the vertex buffer has {}",
                colors.len(),
                vertices.len()
            );
        }
        let set = Self {
            vertices,
            colors,
            groups: None,
        };
        match groups {
            Some(groups) => set.with_groups(groups),
            None => Ok(set),
        }
    }

    /// Attaches one group id per point to this set, replacing existing groups
    pub fn with_groups(mut self, groups: Vec<usize>) -> Result<Self> {
        if groups.len() != self.len() {
            bail!(
                "Got {} group ids for {} points",
                groups.len(),
                self.len()
            );
        }
        self.groups = Some(groups);
        Ok(self)
    }

    /// Appends a point. For grouped sets, `group` must be given, for ungrouped sets it is ignored
    ///
    /// # Panics
    ///
    /// If this set is grouped and `group` is `None`
    pub fn push(&mut self, position: Point3<f64>, color: [f32; 3], group: Option<usize>) {
        if let Some(groups) = self.groups.as_mut() {
            match group {
                Some(group) => groups.push(group),
                None => panic!("PointSet::push: Grouped point sets need a group id for every point"),
            }
        }
        self.vertices.extend_from_slice(position.coords.as_slice());
        self.colors.extend_from_slice(&color);
    }

    pub fn len(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn is_grouped(&self) -> bool {
        self.groups.is_some()
    }

    /// Position of the point at `index`
    ///
    /// # Panics
    ///
    /// If `index` is out of bounds
    pub fn position(&self, index: usize) -> Point3<f64> {
        Point3::from_slice(&self.vertices[index * 3..index * 3 + 3])
    }

    /// Colour of the point at `index`
    ///
    /// # Panics
    ///
    /// If `index` is out of bounds
    pub fn color(&self, index: usize) -> [f32; 3] {
        [
            self.colors[index * 3],
            self.colors[index * 3 + 1],
            self.colors[index * 3 + 2],
        ]
    }

    /// Group of the point at `index`, `None` for ungrouped sets
    pub fn group(&self, index: usize) -> Option<usize> {
        self.groups.as_ref().map(|groups| groups[index])
    }

    pub fn positions(&self) -> impl Iterator<Item = Point3<f64>> + '_ {
        self.vertices.chunks_exact(3).map(Point3::from_slice)
    }

    pub fn vertices(&self) -> &[f64] {
        &self.vertices
    }

    pub fn colors(&self) -> &[f32] {
        &self.colors
    }

    pub fn groups(&self) -> Option<&[usize]> {
        self.groups.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_access() {
        let mut set = PointSet::new();
        set.push(Point3::new(1.0, 2.0, 3.0), [0.5, 0.5, 1.0], None);
        set.push(Point3::new(4.0, 5.0, 6.0), [1.0, 0.0, 0.0], Some(3));
        assert_eq!(set.len(), 2);
        assert!(!set.is_grouped());
        assert_eq!(set.position(1), Point3::new(4.0, 5.0, 6.0));
        assert_eq!(set.color(0), [0.5, 0.5, 1.0]);
        assert_eq!(set.group(1), None);
        assert_eq!(set.vertices(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let grouped = set.with_groups(vec![7, 8]).unwrap();
        assert_eq!(grouped.group(0), Some(7));
        assert_eq!(grouped.positions().count(), 2);
    }

    #[test]
    fn test_from_buffers_checks_lengths() {
        assert!(PointSet::from_buffers(vec![0.0; 4], vec![0.0; 4], None).is_err());
        assert!(PointSet::from_buffers(vec![0.0; 6], vec![0.0; 3], None).is_err());
        assert!(PointSet::from_buffers(vec![0.0; 6], vec![0.0; 6], Some(vec![1])).is_err());
        assert!(PointSet::from_buffers(vec![0.0; 6], vec![0.0; 6], Some(vec![1, 2])).is_ok());
    }

    #[test]
    #[should_panic]
    fn test_grouped_push_needs_group() {
        let mut set = PointSet::new().with_groups(vec![]).unwrap();
        set.push(Point3::new(0.0, 0.0, 0.0), [1.0, 1.0, 1.0], None);
    }
}
