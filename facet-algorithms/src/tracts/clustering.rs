use std::time::Instant;

use anyhow::{bail, Result};
use facet_core::matrix::SymmetricMatrix;
use facet_core::parallel::{ShutdownFlag, StridedPool};
use log::{debug, info};

use super::{FiberCluster, MetricKind, Tract};

/// Parameters of the [TractClustering]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct TractClusteringParams {
    /// Tracts closer than this are put into the same cluster
    pub max_distance: f64,
    /// Clusters with fewer tracts are dropped
    pub min_cluster_size: usize,
    /// Closest point distances up to this value count as zero in the tract metric
    pub proximity_threshold: f64,
    pub thread_count: usize,
    pub metric: MetricKind,
}

impl Default for TractClusteringParams {
    fn default() -> Self {
        Self {
            max_distance: 6.5,
            min_cluster_size: 10,
            proximity_threshold: 1.0,
            thread_count: 8,
            metric: MetricKind::Dlt,
        }
    }
}

impl TractClusteringParams {
    pub fn validate(&self) -> Result<()> {
        if self.max_distance.is_nan() {
            bail!("Maximum tract distance must not be NaN");
        }
        if !(self.proximity_threshold >= 0.0) {
            bail!(
                "Proximity threshold must be non-negative, got {}",
                self.proximity_threshold
            );
        }
        if self.thread_count == 0 {
            bail!("Thread count must be at least 1");
        }
        Ok(())
    }
}

/// Clusters tracts by their pairwise distances.
///
/// Every tract starts in its own cluster. All pairs `(q, r)` with `q < r` are visited once in index order, and if
/// the tracts are in different clusters and closer than [TractClusteringParams::max_distance], the cluster with the
/// larger id is melded into the one with the smaller id right away. Since melds are visible to all later pairs, the
/// single sweep yields the connected components of the "closer than" graph. Clusters smaller than
/// [TractClusteringParams::min_cluster_size] are dropped afterwards
pub struct TractClustering {
    params: TractClusteringParams,
    shutdown: Option<ShutdownFlag>,
}

impl TractClustering {
    pub fn new(params: TractClusteringParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            shutdown: None,
        })
    }

    /// Makes the melding sweep check `flag` before every row
    pub fn with_shutdown_flag(mut self, flag: ShutdownFlag) -> Self {
        self.shutdown = Some(flag);
        self
    }

    pub fn params(&self) -> &TractClusteringParams {
        &self.params
    }

    /// Computes the distances of all tract pairs with the configured metric. Row `q` of the matrix is computed
    /// by worker `q % thread_count`
    pub fn compute_distances(&self, tracts: &[Tract]) -> Result<SymmetricMatrix> {
        let timer = Instant::now();
        let metric = self.params.metric.build(self.params.proximity_threshold);
        let pool = StridedPool::new(self.params.thread_count)?;
        let count = tracts.len();
        let rows = pool.map(count, |q| {
            ((q + 1)..count)
                .map(|r| metric.distance(&tracts[q], &tracts[r]))
                .collect::<Vec<_>>()
        });

        let mut matrix = SymmetricMatrix::new(count);
        for (q, row) in rows.iter().enumerate() {
            matrix.set_row_tail(q, row);
        }
        info!(
            "Computed {} tract distances in {:.2?}",
            SymmetricMatrix::cell_count(count),
            timer.elapsed()
        );
        Ok(matrix)
    }

    /// Melds and prunes the clusters for the given distance matrix. The surviving clusters are ordered by their
    /// smallest tract index
    pub fn cluster(&self, distances: &SymmetricMatrix) -> Result<Vec<FiberCluster>> {
        let count = distances.size();
        let mut cluster_ids: Vec<usize> = (0..count).collect();
        let mut clusters: Vec<FiberCluster> = (0..count).map(FiberCluster::singleton).collect();

        for q in 0..count {
            if let Some(flag) = &self.shutdown {
                flag.check("tract clustering")?;
            }
            for r in (q + 1)..count {
                if cluster_ids[q] == cluster_ids[r] || !(distances.get(q, r) < self.params.max_distance) {
                    continue;
                }
                let low = cluster_ids[q].min(cluster_ids[r]);
                let high = cluster_ids[q].max(cluster_ids[r]);
                let (head, tail) = clusters.split_at_mut(high);
                for &member in tail[0].indices() {
                    cluster_ids[member] = low;
                }
                head[low].meld(&mut tail[0]);
            }
        }

        let melded = clusters.iter().filter(|c| !c.is_empty()).count();
        for cluster in clusters.iter_mut() {
            if cluster.len() < self.params.min_cluster_size {
                cluster.clear();
            }
        }
        clusters.retain(|c| !c.is_empty());
        debug!(
            "Melded {} tracts into {} clusters, {} of them have at least {} tracts",
            count,
            melded,
            clusters.len(),
            self.params.min_cluster_size
        );
        Ok(clusters)
    }

    /// Computes the distance matrix of `tracts` and clusters it
    pub fn run(&self, tracts: &[Tract]) -> Result<Vec<FiberCluster>> {
        let distances = self.compute_distances(tracts)?;
        let timer = Instant::now();
        let clusters = self.cluster(&distances)?;
        info!(
            "Clustered {} tracts into {} clusters in {:.2?}",
            tracts.len(),
            clusters.len(),
            timer.elapsed()
        );
        Ok(clusters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_core::nalgebra::Vector3;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use std::collections::VecDeque;

    fn params(max_distance: f64, min_cluster_size: usize) -> TractClusteringParams {
        TractClusteringParams {
            max_distance,
            min_cluster_size,
            thread_count: 3,
            ..Default::default()
        }
    }

    /// Connected components of the graph with an edge for every pair closer than `max_distance`
    fn components(distances: &SymmetricMatrix, max_distance: f64) -> Vec<Vec<usize>> {
        let count = distances.size();
        let mut visited = vec![false; count];
        let mut result = vec![];
        for start in 0..count {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            let mut component = vec![];
            let mut queue = VecDeque::from(vec![start]);
            while let Some(current) = queue.pop_front() {
                component.push(current);
                for next in 0..count {
                    if !visited[next] && next != current && distances.get(current, next) < max_distance {
                        visited[next] = true;
                        queue.push_back(next);
                    }
                }
            }
            component.sort_unstable();
            result.push(component);
        }
        result
    }

    fn random_matrix(rng: &mut StdRng, count: usize) -> SymmetricMatrix {
        let values = (0..SymmetricMatrix::cell_count(count))
            .map(|_| rng.gen_range(0.0..10.0))
            .collect();
        SymmetricMatrix::from_upper_triangle(count, values).unwrap()
    }

    fn index_sets(clusters: &[FiberCluster]) -> Vec<Vec<usize>> {
        let mut sets: Vec<Vec<usize>> = clusters.iter().map(|c| c.indices().to_vec()).collect();
        sets.sort();
        sets
    }

    #[test]
    fn test_single_pass_yields_connected_components() {
        let mut rng = StdRng::seed_from_u64(7);
        let clustering = TractClustering::new(params(1.0, 1)).unwrap();
        for _ in 0..20 {
            let distances = random_matrix(&mut rng, 25);
            let clusters = clustering.cluster(&distances).unwrap();
            assert_eq!(index_sets(&clusters), components(&distances, 1.0));
        }
    }

    #[test]
    fn test_result_does_not_depend_on_tract_order() {
        let mut rng = StdRng::seed_from_u64(42);
        let clustering = TractClustering::new(params(1.5, 1)).unwrap();
        let distances = random_matrix(&mut rng, 30);
        let reference = index_sets(&clustering.cluster(&distances).unwrap());

        for _ in 0..10 {
            let mut order: Vec<usize> = (0..30).collect();
            order.shuffle(&mut rng);
            let mut permuted = SymmetricMatrix::new(30);
            for i in 0..30 {
                for j in (i + 1)..30 {
                    permuted.set(i, j, distances.get(order[i], order[j]));
                }
            }
            let clusters: Vec<FiberCluster> = clustering
                .cluster(&permuted)
                .unwrap()
                .iter()
                .map(|c| FiberCluster::from_indices(c.indices().iter().map(|i| order[*i]).collect()))
                .collect();
            assert_eq!(index_sets(&clusters), reference);
        }
    }

    #[test]
    fn test_small_clusters_are_pruned() {
        let mut distances = SymmetricMatrix::new(5);
        for i in 0..5 {
            for j in (i + 1)..5 {
                distances.set(i, j, 100.0);
            }
        }
        distances.set(0, 4, 1.0);
        distances.set(2, 4, 1.0);
        let clusters = TractClustering::new(params(2.0, 2))
            .unwrap()
            .cluster(&distances)
            .unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].indices(), &[0, 2, 4]);
    }

    #[test]
    fn test_compute_distances() {
        let tracts: Vec<Tract> = (0..4)
            .map(|i| {
                Tract::new(vec![
                    Vector3::new(0.0, i as f64 * 3.0, 0.0),
                    Vector3::new(5.0, i as f64 * 3.0, 0.0),
                ])
            })
            .collect();
        let clustering = TractClustering::new(TractClusteringParams {
            proximity_threshold: 0.0,
            ..params(4.0, 1)
        })
        .unwrap();
        let distances = clustering.compute_distances(&tracts).unwrap();
        assert_eq!(distances.size(), 4);
        assert_eq!(distances.get(0, 1), 3.0);
        assert_eq!(distances.get(3, 0), 9.0);
        assert_eq!(clustering.cluster(&distances).unwrap().len(), 1);
    }

    #[test]
    fn test_shutdown() {
        let flag = ShutdownFlag::new();
        flag.request();
        let clustering = TractClustering::new(params(1.0, 1))
            .unwrap()
            .with_shutdown_flag(flag);
        assert!(clustering.cluster(&SymmetricMatrix::new(3)).is_err());
        assert!(clustering.cluster(&SymmetricMatrix::new(0)).unwrap().is_empty());
    }
}
