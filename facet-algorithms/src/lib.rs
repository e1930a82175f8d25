#![warn(clippy::all)]
//! Algorithms that operate on point clouds and fiber tracts.
//!
//! The plane segmentation consists of the [classification](classification) of every point by the shape of its
//! neighbourhood, the grouping of coplanar points in the [extent clustering](extent_clustering) and the split of
//! coplanar groups into connected parts by the [boundary detector](boundary). [segmentation] chains these stages.
//! Fiber tracts are clustered by pairwise similarity in [tracts].

// Detection of connected parts within a coplanar cluster by walking generalized hulls.
pub mod boundary;
// Neighbourhood descriptors and planar/cylindrical classification of points.
pub mod classification;
// Peak/extent grouping of coplanar planes in the parameter domain.
pub mod extent_clustering;
// Total least squares plane fitting in Hessian normal form.
pub mod least_squares;
// Principal component analysis of small point sets.
pub mod pca;
// The complete plane segmentation pipeline.
pub mod segmentation;
// Removal of points that lie close to the points of another point set.
pub mod subtraction;
// Tract metrics and similarity based tract clustering.
pub mod tracts;
