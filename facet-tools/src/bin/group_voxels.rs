#![warn(clippy::all)]

use std::{path::PathBuf, time::Instant};

use anyhow::{anyhow, Result};
use clap::{App, Arg};
use facet_core::octree::{color_for_group, Octree, OctreeParams};
use facet_core::points::PointSet;
use facet_io::points_file::{read_points_file, write_points_file};
use facet_tools::{override_arg, read_config};
use log::info;

struct Args {
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    pub params: OctreeParams,
}

fn get_args() -> Result<Args> {
    let matches = App::new("facet group_voxels")
        .version("0.1")
        .about("Groups points by the connectivity of the octree voxels they fall into")
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
                .help("JSON file with octree parameters. Command line flags take precedence"),
        )
        .arg(
            Arg::with_name("DETAIL_LEVEL")
                .long("detail-level")
                .takes_value(true)
                .help("Radius of the leaf voxels"),
        )
        .arg(
            Arg::with_name("CORNER_CLASS")
                .long("corner-class")
                .takes_value(true)
                .possible_values(&["1", "2", "3"])
                .help("1: voxels sharing a face are connected, 2: also edges, 3: also corners"),
        )
        .get_matches();

    let mut params: OctreeParams = read_config(matches.value_of("CONFIG"))?;
    override_arg(&matches, "DETAIL_LEVEL", &mut params.detail_level)?;
    override_arg(&matches, "CORNER_CLASS", &mut params.corner_neighbour_class)?;

    Ok(Args {
        input_file: PathBuf::from(matches.value_of("INPUT").unwrap()),
        output_file: PathBuf::from(matches.value_of("OUTPUT").unwrap()),
        params,
    })
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = get_args()?;
    let points = read_points_file(&args.input_file)?;

    let timer = Instant::now();
    let mut octree = Octree::new(args.params)?;
    octree.register_points(points.positions())?;
    let group_count = octree.group_neighbour_leafs_from_root();
    info!(
        "Grouped {} points in {} voxels into {} groups in {:.2?}",
        points.len(),
        octree.leaf_count(),
        group_count,
        timer.elapsed()
    );

    let mut grouped = PointSet::new_grouped();
    for position in points.positions() {
        let group = octree
            .group_at(&position)
            .ok_or_else(|| anyhow!("Point {} does not lie in a grouped voxel", position))?;
        grouped.push(position, color_for_group(group), Some(group));
    }
    write_points_file(&args.output_file, &grouped)?;
    info!("Wrote {}", args.output_file.display());
    Ok(())
}
