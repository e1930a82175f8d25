#![warn(clippy::all)]

use std::{path::PathBuf, time::Instant};

use anyhow::Result;
use clap::{App, Arg};
use facet_algorithms::segmentation::{PlaneSegmentation, SegmentationParams};
use facet_io::points_file::{read_points_file, write_points_file};
use facet_tools::{override_arg, parse_arg, read_config};
use log::info;

struct Args {
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    pub params: SegmentationParams,
}

fn get_args() -> Result<Args> {
    let matches = App::new("facet segment_planes")
        .version("0.1")
        .about("Segments a point cloud into planar patches and writes them as a grouped point file")
        .arg(
            Arg::with_name("INPUT")
                .short("i")
                .takes_value(true)
                .value_name("INPUT")
                .help("Input .points file")
                .required(true),
        )
        .arg(
            Arg::with_name("OUTPUT")
                .short("o")
                .takes_value(true)
                .value_name("OUTPUT")
                .help("Output .groups file")
                .required(true),
        )
        .arg(
            Arg::with_name("CONFIG")
                .long("config")
                .takes_value(true)
                .value_name("FILE")
                .help("JSON file with segmentation parameters. Command line flags take precedence"),
        )
        .arg(
            Arg::with_name("NEIGHBOURS")
                .short("k")
                .takes_value(true)
                .help("Number of nearest neighbours used to classify a point"),
        )
        .arg(
            Arg::with_name("RADIUS")
                .short("r")
                .takes_value(true)
                .help("Maximum distance of the nearest neighbours"),
        )
        .arg(
            Arg::with_name("THREADS")
                .long("threads")
                .takes_value(true)
                .help("Number of worker threads"),
        )
        .arg(
            Arg::with_name("MAX_ANGLE")
                .long("max-angle")
                .takes_value(true)
                .value_name("DEGREES")
                .help("Maximum angle between the normals of coplanar points"),
        )
        .arg(
            Arg::with_name("PLANE_DISTANCE")
                .long("plane-distance")
                .takes_value(true)
                .help("Maximum difference of the origin distances of coplanar planes"),
        )
        .arg(
            Arg::with_name("NO_BOUNDARY")
                .long("no-boundary")
                .help("Keep coplanar patches together even if they are not connected"),
        )
        .get_matches();

    let mut params: SegmentationParams = read_config(matches.value_of("CONFIG"))?;
    override_arg(&matches, "NEIGHBOURS", &mut params.classifier.neighbour_count)?;
    override_arg(&matches, "RADIUS", &mut params.classifier.max_neighbour_distance)?;
    override_arg(&matches, "MAX_ANGLE", &mut params.extent.max_angle_degrees)?;
    override_arg(&matches, "PLANE_DISTANCE", &mut params.extent.plane_distance)?;
    if let Some(threads) = parse_arg::<usize>(&matches, "THREADS")? {
        params.classifier.thread_count = threads;
        params.extent.thread_count = threads;
    }
    if matches.is_present("NO_BOUNDARY") {
        params.detect_boundaries = false;
    }

    Ok(Args {
        input_file: PathBuf::from(matches.value_of("INPUT").unwrap()),
        output_file: PathBuf::from(matches.value_of("OUTPUT").unwrap()),
        params,
    })
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = get_args()?;
    let timer = Instant::now();
    let points = read_points_file(&args.input_file)?;
    info!(
        "Read {} points from {} in {:.2?}",
        points.len(),
        args.input_file.display(),
        timer.elapsed()
    );

    let timer = Instant::now();
    let segmentation = PlaneSegmentation::new(args.params)?.run_point_set(&points)?;
    info!(
        "Segmented {} points into {} groups in {:.2?}",
        points.len(),
        segmentation.cluster_count(),
        timer.elapsed()
    );

    write_points_file(&args.output_file, &segmentation.to_point_set(None)?)?;
    info!("Wrote {}", args.output_file.display());
    Ok(())
}
