//! Per-point neighbourhood descriptors and planar/cylindrical classification.
//!
//! Every input point becomes a [SpatialDomainPoint] carrying the eigen decomposition and the least squares plane
//! of its `k` nearest neighbours. Planar points with a valid plane are additionally mapped into the parameter
//! domain as [ParameterDomainPoint]s, which is where coplanar points are grouped.

mod classifier;
pub use self::classifier::*;

mod parameter_point;
pub use self::parameter_point::*;

mod spatial_point;
pub use self::spatial_point::*;
