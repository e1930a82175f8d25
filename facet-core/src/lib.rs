#![warn(clippy::all)]

//! Core data structures for spatial analysis of point clouds and tractograms
//!
//! facet provides the spatial indices that the segmentation and clustering algorithms in `facet-algorithms` are
//! built on: a generic N-dimensional [kd-tree](crate::kdtree::KdTree) with a [radius and nearest neighbour
//! search](crate::search::PointSearcher), a voxel [octree](crate::octree::Octree) for connectivity grouping, a
//! [symmetric matrix](crate::matrix::SymmetricMatrix) for pairwise distances and a [strided thread
//! pool](crate::parallel::StridedPool) for the data-parallel stages.

pub extern crate nalgebra;

/// Generic N-dimensional kd-tree
pub mod kdtree;
/// Useful mathematical tools when working with point cloud data
pub mod math;
/// Symmetric pairwise value storage
pub mod matrix;
/// Voxel octree with neighbourhood grouping
pub mod octree;
pub mod parallel;
/// Flat point buffers with colours and groups
pub mod points;
pub mod search;
