//! Raster data structures and pixel adjacency

mod connectivity;
mod element;
mod geotransform;
mod grid;

pub use connectivity::Connectivity;
pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
