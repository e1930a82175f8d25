use facet_algorithms::segmentation::{PlaneSegmentation, SegmentationParams};
use facet_core::nalgebra::Vector3;
use rand::{rngs::StdRng, Rng, SeedableRng};

fn main() -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(1);

    // a floor, a wall standing on it and a second floor patch far away at the same height
    let mut points = vec![];
    for _ in 0..4000 {
        points.push(Vector3::new(rng.gen_range(0.0..10.0), rng.gen_range(0.0..10.0), 0.0));
    }
    for _ in 0..2000 {
        points.push(Vector3::new(0.0, rng.gen_range(0.0..10.0), rng.gen_range(0.2..5.0)));
    }
    for _ in 0..1000 {
        points.push(Vector3::new(rng.gen_range(30.0..35.0), rng.gen_range(0.0..5.0), 0.0));
    }
    println!("done generating pointcloud");

    let segmentation = PlaneSegmentation::new(SegmentationParams::default())?.run(&points)?;
    let mut sizes = vec![0usize; segmentation.cluster_count()];
    for id in segmentation.cluster_ids() {
        sizes[*id] += 1;
    }
    sizes.sort_unstable_by(|a, b| b.cmp(a));
    println!(
        "{} groups, the largest ones hold {:?} points",
        segmentation.cluster_count(),
        &sizes[..sizes.len().min(5)]
    );
    Ok(())
}
