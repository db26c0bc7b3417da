pub mod rtree;
pub use rtree::{IndexedPoint, SpatialIndexManager};
