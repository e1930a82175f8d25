use anyhow::{bail, Result};
use facet_core::nalgebra::Vector3;

/// An ordered polyline, e.g. a fiber tract from deterministic tractography
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tract {
    points: Vec<Vector3<f64>>,
}

impl Tract {
    pub fn new(points: Vec<Vector3<f64>>) -> Self {
        Self { points }
    }

    /// Creates a tract from flat `[x0, y0, z0, x1, ...]` coordinates
    pub fn from_flat(coordinates: &[f64]) -> Result<Self> {
        if coordinates.len() % 3 != 0 {
            bail!(
                "Tract coordinates must come in triples, got {} values",
                coordinates.len()
            );
        }
        Ok(Self {
            points: coordinates
                .chunks_exact(3)
                .map(Vector3::from_column_slice)
                .collect(),
        })
    }

    pub fn points(&self) -> &[Vector3<f64>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Arc length of the polyline
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|s| (s[1] - s[0]).norm()).sum()
    }

    /// The same polyline traversed from its last point to its first point
    pub fn reversed(&self) -> Tract {
        Tract::new(self.points.iter().rev().cloned().collect())
    }

    /// Resamples the polyline to `count` points spaced equally along its arc length. The first and last points are
    /// kept. A tract of length zero yields `count` copies of its first point, an empty tract stays empty
    pub fn resample(&self, count: usize) -> Tract {
        if self.points.is_empty() || count == 0 {
            return Tract::default();
        }
        let length = self.length();
        if count == 1 || length == 0.0 {
            return Tract::new(vec![self.points[0]; count]);
        }

        let step = length / (count - 1) as f64;
        let mut resampled = Vec::with_capacity(count);
        resampled.push(self.points[0]);

        let mut segment = 0;
        let mut segment_start = 0.0;
        for sample in 1..count - 1 {
            let target = sample as f64 * step;
            while segment + 2 < self.points.len() {
                let segment_length = (self.points[segment + 1] - self.points[segment]).norm();
                if segment_start + segment_length >= target {
                    break;
                }
                segment_start += segment_length;
                segment += 1;
            }
            let from = self.points[segment];
            let to = self.points[segment + 1];
            let segment_length = (to - from).norm();
            let t = if segment_length > 0.0 {
                ((target - segment_start) / segment_length).min(1.0).max(0.0)
            } else {
                0.0
            };
            resampled.push(from + (to - from) * t);
        }

        resampled.push(self.points[self.points.len() - 1]);
        Tract::new(resampled)
    }
}

impl From<Vec<Vector3<f64>>> for Tract {
    fn from(points: Vec<Vector3<f64>>) -> Self {
        Self::new(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_from_flat() {
        let tract = Tract::from_flat(&[0.0, 0.0, 0.0, 3.0, 4.0, 0.0]).unwrap();
        assert_eq!(tract.len(), 2);
        assert_approx_eq!(tract.length(), 5.0);
        assert!(Tract::from_flat(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_resample_is_equidistant() {
        // An L shaped tract of length 4
        let tract = Tract::new(vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(3.0, 0.0, 0.0),
            Vector3::new(3.0, 1.0, 0.0),
        ]);
        let resampled = tract.resample(5);
        assert_eq!(resampled.len(), 5);
        let expected = [
            [0.0, 0.0],
            [1.0, 0.0],
            [2.0, 0.0],
            [3.0, 0.0],
            [3.0, 1.0],
        ];
        for (point, expected) in resampled.points().iter().zip(expected.iter()) {
            assert_approx_eq!(point.x, expected[0]);
            assert_approx_eq!(point.y, expected[1]);
        }
        assert_approx_eq!(resampled.length(), 4.0);
    }

    #[test]
    fn test_degenerate_resampling() {
        assert!(Tract::default().resample(4).is_empty());
        let point = Tract::new(vec![Vector3::new(1.0, 2.0, 3.0)]);
        assert_eq!(point.resample(3).points(), &[Vector3::new(1.0, 2.0, 3.0); 3]);
        let line = Tract::new(vec![Vector3::zeros(), Vector3::new(2.0, 0.0, 0.0)]);
        assert_eq!(line.resample(1).points(), &[Vector3::zeros()]);
        let resampled = line.resample(3);
        assert_approx_eq!(resampled.points()[1].x, 1.0);
    }

    #[test]
    fn test_reversed() {
        let tract = Tract::from_flat(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0]).unwrap();
        let reversed = tract.reversed();
        assert_eq!(reversed.points()[0], Vector3::new(1.0, 1.0, 0.0));
        assert_eq!(reversed.reversed(), tract);
    }
}
