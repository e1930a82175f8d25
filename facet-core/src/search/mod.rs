//! Queries over the kd-tree
mod point_searcher;
pub use self::point_searcher::*;
