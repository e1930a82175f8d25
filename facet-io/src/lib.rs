#![warn(clippy::all)]
//! Text file formats used by facet.
//!
//! - `.points` and `.groups` files hold one point per line, with colour and an optional group id ([points_file])
//! - tract files hold one fiber tract per line as flat coordinates ([tracts_file])
//! - matrix caches hold the pairwise tract distances of a tract file ([matrix_cache])

pub mod matrix_cache;
pub mod points_file;
pub mod tracts_file;
