use facet_core::nalgebra::Vector3;

use super::Tract;

/// A set of tract indices, kept sorted
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FiberCluster {
    indices: Vec<usize>,
}

impl FiberCluster {
    pub fn singleton(index: usize) -> Self {
        Self {
            indices: vec![index],
        }
    }

    pub fn from_indices(mut indices: Vec<usize>) -> Self {
        indices.sort_unstable();
        indices.dedup();
        Self { indices }
    }

    /// Moves all indices of `other` into this cluster. `other` is empty afterwards
    pub fn meld(&mut self, other: &mut FiberCluster) {
        self.indices.append(&mut other.indices);
        self.indices.sort_unstable();
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Mean of the member tracts after resampling them to `samples` points. Members are flipped if they run in the
    /// opposite direction of the first member. Returns `None` for empty clusters
    pub fn center_line(&self, tracts: &[Tract], samples: usize) -> Option<Tract> {
        let first = *self.indices.first()?;
        let reference = tracts[first].resample(samples);
        if reference.is_empty() {
            return None;
        }

        let mut sum: Vec<Vector3<f64>> = reference.points().to_vec();
        for index in &self.indices[1..] {
            let resampled = tracts[*index].resample(samples);
            if resampled.is_empty() {
                continue;
            }
            let flipped = resampled.reversed();
            let aligned = if pointwise_distance(&reference, &flipped)
                < pointwise_distance(&reference, &resampled)
            {
                flipped
            } else {
                resampled
            };
            for (total, point) in sum.iter_mut().zip(aligned.points()) {
                *total += point;
            }
        }

        let count = self
            .indices
            .iter()
            .filter(|index| !tracts[**index].is_empty())
            .count() as f64;
        Some(Tract::new(sum.into_iter().map(|p| p / count).collect()))
    }
}

fn pointwise_distance(a: &Tract, b: &Tract) -> f64 {
    a.points()
        .iter()
        .zip(b.points())
        .map(|(p, q)| (p - q).norm())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_meld() {
        let mut low = FiberCluster::from_indices(vec![4, 0]);
        let mut high = FiberCluster::from_indices(vec![3, 1, 3]);
        assert_eq!(high.indices(), &[1, 3]);
        low.meld(&mut high);
        assert_eq!(low.indices(), &[0, 1, 3, 4]);
        assert!(high.is_empty());
        low.clear();
        assert_eq!(low.len(), 0);
    }

    #[test]
    fn test_center_line_aligns_orientation() {
        let forward = Tract::from_flat(&[0.0, 0.0, 0.0, 4.0, 0.0, 0.0]).unwrap();
        let backward = Tract::from_flat(&[4.0, 2.0, 0.0, 0.0, 2.0, 0.0]).unwrap();
        let tracts = vec![forward, backward];
        let cluster = FiberCluster::from_indices(vec![0, 1]);

        let center = cluster.center_line(&tracts, 3).unwrap();
        assert_eq!(center.len(), 3);
        assert_approx_eq!(center.points()[0].x, 0.0);
        assert_approx_eq!(center.points()[0].y, 1.0);
        assert_approx_eq!(center.points()[2].x, 4.0);
        assert!(FiberCluster::default().center_line(&tracts, 3).is_none());
    }
}
