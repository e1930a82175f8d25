use anyhow::Result;
use facet_algorithms::boundary::BoundaryDetector;
use facet_algorithms::classification::{parameter_domain_points, ClassifierParams, PointClassifier};
use facet_algorithms::extent_clustering::{ExtentClusteringEngine, ExtentClusteringParams};
use facet_algorithms::segmentation::{PlaneSegmentation, SegmentationParams};
use facet_algorithms::tracts::{Tract, TractClustering, TractClusteringParams};
use facet_core::nalgebra::Vector3;
use std::collections::HashSet;

fn square(origin_x: f64, z: f64) -> Vec<Vector3<f64>> {
    let mut points = vec![];
    for x in 0..6 {
        for y in 0..6 {
            points.push(Vector3::new(origin_x + x as f64 * 0.2, y as f64 * 0.2, z));
        }
    }
    points
}

#[test]
fn collinear_points_are_not_planar() -> Result<()> {
    let positions = vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(0.2, 0.2, 0.2),
        Vector3::new(0.4, 0.4, 0.4),
    ];
    let points = PointClassifier::new(ClassifierParams::default())?.classify(&positions)?;
    assert_eq!(points.len(), 3);
    for point in &points {
        assert_eq!(point.neighbour_count(), 3);
        assert!(!point.is_planar());
        assert!(!point.has_valid_parameters());
    }
    assert!(parameter_domain_points(&points).is_empty());

    let segmentation = PlaneSegmentation::new(SegmentationParams::default())?.run(&positions)?;
    assert_eq!(segmentation.cluster_count(), 3);
    Ok(())
}

#[test]
fn separated_coplanar_squares_are_split_by_boundaries() -> Result<()> {
    let mut positions = square(0.0, 5.0);
    positions.extend(square(10.0, 5.0));

    let mut spatial = PointClassifier::new(ClassifierParams::default())?.classify(&positions)?;
    assert!(spatial.iter().all(|p| p.is_planar() && p.has_valid_parameters()));
    let mut parameter = parameter_domain_points(&spatial);
    let coplanar = ExtentClusteringEngine::new(ExtentClusteringParams::default())?
        .cluster(&mut parameter, &mut spatial)?;
    assert_eq!(coplanar, 1);
    let ids: HashSet<usize> = spatial.iter().map(|p| p.cluster_id()).collect();
    assert_eq!(ids.len(), 1);

    let members: Vec<usize> = (0..spatial.len()).collect();
    let mut parts = BoundaryDetector::new().split_cluster(&spatial, &members)?;
    assert_eq!(parts.len(), 2);
    for part in parts.iter_mut() {
        part.sort_unstable();
    }
    parts.sort();
    assert_eq!(parts[0], (0..36).collect::<Vec<_>>());
    assert_eq!(parts[1], (36..72).collect::<Vec<_>>());

    let segmentation = PlaneSegmentation::new(SegmentationParams::default())?.run(&positions)?;
    assert_eq!(segmentation.cluster_count(), 2);
    let ids = segmentation.cluster_ids();
    assert!(ids[..36].iter().all(|id| *id == 0));
    assert!(ids[36..].iter().all(|id| *id == 1));
    Ok(())
}

#[test]
fn close_tracts_form_clusters() -> Result<()> {
    let tract = |y: f64| {
        Tract::new(
            (0..10)
                .map(|x| Vector3::new(x as f64, y, 0.0))
                .collect(),
        )
    };
    let tracts = vec![
        tract(0.0),
        tract(0.5),
        tract(1.0),
        tract(40.0),
        tract(40.5),
    ];
    let clustering = TractClustering::new(TractClusteringParams {
        min_cluster_size: 2,
        thread_count: 2,
        ..Default::default()
    })?;
    let clusters = clustering.run(&tracts)?;
    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters[0].indices(), &[0, 1, 2]);
    assert_eq!(clusters[1].indices(), &[3, 4]);

    let center = clusters[0].center_line(&tracts, 5).unwrap();
    assert!((center.points()[0].y - 0.5).abs() < 1e-9);
    Ok(())
}
