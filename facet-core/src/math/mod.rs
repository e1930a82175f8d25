mod bounds;
pub use self::bounds::*;

/// N-dimensional vector arithmetic on coordinate slices
pub mod vector;
