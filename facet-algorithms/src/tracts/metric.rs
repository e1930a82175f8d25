use float_ord::FloatOrd;

use super::Tract;

/// A symmetric distance between two tracts
pub trait TractMetric: Send + Sync {
    fn distance(&self, a: &Tract, b: &Tract) -> f64;
}

/// Directed thresholded mean closest point distance from `from` to `to`: for every point of `from` the distance
/// to the closest point of `to` is taken, distances up to `proximity_threshold` count as zero, and the sum is
/// divided by the number of points of `from`. Empty tracts are infinitely far away from everything
pub fn directed_distance(from: &Tract, to: &Tract, proximity_threshold: f64) -> f64 {
    if from.is_empty() || to.is_empty() {
        return f64::INFINITY;
    }
    let sum: f64 = from
        .points()
        .iter()
        .map(|p| {
            to.points()
                .iter()
                .map(|q| FloatOrd((p - q).norm()))
                .min()
                .map_or(f64::INFINITY, |d| d.0)
        })
        .filter(|d| *d > proximity_threshold)
        .sum();
    sum / from.len() as f64
}

/// Larger of the two directed distances. Two tracts are only close if each of them runs close to the other
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DltMetric {
    pub proximity_threshold: f64,
}

impl TractMetric for DltMetric {
    fn distance(&self, a: &Tract, b: &Tract) -> f64 {
        directed_distance(a, b, self.proximity_threshold)
            .max(directed_distance(b, a, self.proximity_threshold))
    }
}

/// Smaller of the two directed distances. A short tract running along a longer one counts as close
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DstMetric {
    pub proximity_threshold: f64,
}

impl TractMetric for DstMetric {
    fn distance(&self, a: &Tract, b: &Tract) -> f64 {
        directed_distance(a, b, self.proximity_threshold)
            .min(directed_distance(b, a, self.proximity_threshold))
    }
}

/// Selects a [TractMetric] in parameter structs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MetricKind {
    Dlt,
    Dst,
}

impl Default for MetricKind {
    fn default() -> Self {
        MetricKind::Dlt
    }
}

impl MetricKind {
    /// Short lowercase name, e.g. for file names
    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::Dlt => "dlt",
            MetricKind::Dst => "dst",
        }
    }

    pub fn build(&self, proximity_threshold: f64) -> Box<dyn TractMetric> {
        match self {
            MetricKind::Dlt => Box::new(DltMetric {
                proximity_threshold,
            }),
            MetricKind::Dst => Box::new(DstMetric {
                proximity_threshold,
            }),
        }
    }
}
