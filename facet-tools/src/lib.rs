//! Helpers shared by the facet command line tools
use std::{fs::File, io::BufReader, path::Path, str::FromStr};

use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::de::DeserializeOwned;

/// Reads parameters from the JSON file at `path`. Fields missing in the file keep their default values. Without a
/// path, the defaults are returned
pub fn read_config<T: DeserializeOwned + Default>(path: Option<&str>) -> Result<T> {
    let path = match path {
        Some(path) => Path::new(path),
        None => return Ok(T::default()),
    };
    let file = File::open(path).with_context(|| format!("Could not open config file {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Could not parse config file {}", path.display()))
}

/// Parses the value of the argument `name`, if it is present
pub fn parse_arg<T>(matches: &ArgMatches, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    matches
        .value_of(name)
        .map(|value| {
            value
                .parse::<T>()
                .with_context(|| format!("Invalid value '{}' for {}", value, name))
        })
        .transpose()
}

/// Overwrites `target` with the value of the argument `name`, if it is present
pub fn override_arg<T>(matches: &ArgMatches, name: &str, target: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Some(value) = parse_arg(matches, name)? {
        *target = value;
    }
    Ok(())
}
