#![warn(clippy::all)]

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
    time::Instant,
};

use anyhow::{Context, Result};
use clap::{App, Arg};
use facet_algorithms::tracts::{Tract, TractClustering, TractClusteringParams};
use facet_core::matrix::SymmetricMatrix;
use facet_io::matrix_cache::{load_matrix_cache, matrix_cache_path, save_matrix_cache, CacheError};
use facet_io::tracts_file::{read_tracts_file, write_tracts_file};
use facet_tools::{override_arg, read_config};
use itertools::Itertools;
use log::{info, warn};

/// Number of points of the written center lines
const CENTER_LINE_SAMPLES: usize = 50;

struct Args {
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    pub center_lines_file: Option<PathBuf>,
    pub use_cache: bool,
    pub params: TractClusteringParams,
}

fn get_args() -> Result<Args> {
    let matches = App::new("facet cluster_tracts")
        .version("0.1")
        .about("Clusters fiber tracts by their pairwise distances")
        .arg(
            Arg::with_name("INPUT")
                .short("i")
                .takes_value(true)
                .value_name("INPUT")
                .help("Input tract file, one tract per line")
                .required(true),
        )
        .arg(
            Arg::with_name("OUTPUT")
                .short("o")
                .takes_value(true)
                .value_name("OUTPUT")
                .help("Output file, one line of tract indices per cluster")
                .required(true),
        )
        .arg(
            Arg::with_name("CONFIG")
                .long("config")
                .takes_value(true)
                .value_name("FILE")
                .help("JSON file with clustering parameters. Command line flags take precedence"),
        )
        .arg(
            Arg::with_name("MAX_DISTANCE")
                .long("max-distance")
                .takes_value(true)
                .help("Tracts closer than this end up in the same cluster"),
        )
        .arg(
            Arg::with_name("MIN_CLUSTER_SIZE")
                .long("min-cluster-size")
                .takes_value(true)
                .help("Clusters with fewer tracts are dropped"),
        )
        .arg(
            Arg::with_name("PROXIMITY_THRESHOLD")
                .long("proximity-threshold")
                .takes_value(true)
                .help("Point distances up to this value are ignored by the tract metric"),
        )
        .arg(
            Arg::with_name("THREADS")
                .long("threads")
                .takes_value(true)
                .help("Number of worker threads"),
        )
        .arg(
            Arg::with_name("NO_CACHE")
                .long("no-cache")
                .help("Neither read nor write the distance matrix cache"),
        )
        .arg(
            Arg::with_name("CENTER_LINES")
                .long("center-lines")
                .takes_value(true)
                .value_name("FILE")
                .help("Also write the center line of every cluster to this tract file"),
        )
        .get_matches();

    let mut params: TractClusteringParams = read_config(matches.value_of("CONFIG"))?;
    override_arg(&matches, "MAX_DISTANCE", &mut params.max_distance)?;
    override_arg(&matches, "MIN_CLUSTER_SIZE", &mut params.min_cluster_size)?;
    override_arg(&matches, "PROXIMITY_THRESHOLD", &mut params.proximity_threshold)?;
    override_arg(&matches, "THREADS", &mut params.thread_count)?;

    Ok(Args {
        input_file: PathBuf::from(matches.value_of("INPUT").unwrap()),
        output_file: PathBuf::from(matches.value_of("OUTPUT").unwrap()),
        center_lines_file: matches.value_of("CENTER_LINES").map(PathBuf::from),
        use_cache: !matches.is_present("NO_CACHE"),
        params,
    })
}

/// Loads the cached distances of `tracts` or computes them. Fresh matrices are written to the cache, a failure to
/// do so is not fatal
fn distances(args: &Args, clustering: &TractClustering, tracts: &[Tract]) -> Result<SymmetricMatrix> {
    if !args.use_cache {
        return clustering.compute_distances(tracts);
    }

    let cache_path = matrix_cache_path(
        &args.input_file,
        args.params.metric.name(),
        args.params.proximity_threshold,
    );
    match load_matrix_cache(&cache_path, tracts.len()) {
        Ok(matrix) => {
            info!("Loaded tract distances from {}", cache_path.display());
            return Ok(matrix);
        }
        Err(CacheError::Missing(_)) => info!("No distance cache yet, computing distances"),
        Err(why) => warn!("Ignoring distance cache {}: {}", cache_path.display(), why),
    }

    let matrix = clustering.compute_distances(tracts)?;
    if let Err(why) = save_matrix_cache(&cache_path, &matrix) {
        warn!("Could not write distance cache: {:#}", why);
    }
    Ok(matrix)
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = get_args()?;
    let tracts: Vec<Tract> = read_tracts_file(&args.input_file)?
        .into_iter()
        .map(Tract::new)
        .collect();
    info!("Read {} tracts from {}", tracts.len(), args.input_file.display());

    let clustering = TractClustering::new(args.params.clone())?;
    let matrix = distances(&args, &clustering, &tracts)?;

    let timer = Instant::now();
    let clusters = clustering.cluster(&matrix)?;
    info!(
        "Found {} clusters with at least {} tracts in {:.2?}",
        clusters.len(),
        args.params.min_cluster_size,
        timer.elapsed()
    );

    let file = File::create(&args.output_file)
        .with_context(|| format!("Could not create {}", args.output_file.display()))?;
    let mut writer = BufWriter::new(file);
    for cluster in &clusters {
        writeln!(writer, "{}", cluster.indices().iter().join(" "))?;
    }
    writer.flush()?;

    if let Some(path) = &args.center_lines_file {
        let center_lines: Vec<_> = clusters
            .iter()
            .filter_map(|cluster| cluster.center_line(&tracts, CENTER_LINE_SAMPLES))
            .map(|line| line.points().to_vec())
            .collect();
        write_tracts_file(path, &center_lines)?;
        info!("Wrote {} center lines to {}", center_lines.len(), path.display());
    }
    Ok(())
}
