//! Clustering of fiber tracts by pairwise similarity.
//!
//! Tracts are compared with a [TractMetric], the pairwise distances are stored in a
//! [SymmetricMatrix](facet_core::matrix::SymmetricMatrix) and [TractClustering] melds every pair of tracts that is
//! closer than a threshold into one [FiberCluster].

mod cluster;
pub use self::cluster::*;

mod clustering;
pub use self::clustering::*;

mod metric;
pub use self::metric::*;

mod tract;
pub use self::tract::*;
