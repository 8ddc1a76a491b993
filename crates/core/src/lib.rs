//! # morphoseg core
//!
//! Core types, traits and I/O shared by the morphoseg crates.
//!
//! This crate provides:
//! - `Raster<T>`: generic 2-D raster grid
//! - `GeoTransform`: affine georeferencing carried through the pipeline
//! - `Connectivity`: 4- and 8-neighbour pixel adjacency
//! - The `Algorithm` trait every pipeline stage implements
//! - Native GeoTIFF reading and writing

pub mod error;
pub mod io;
pub mod raster;

pub use error::{Error, Result};
pub use raster::{Connectivity, GeoTransform, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{Connectivity, GeoTransform, Raster, RasterElement};
    pub use crate::Algorithm;
}

/// Core trait for every pipeline stage.
///
/// Stages are pure transforms of their input according to parameters. The
/// trait is the composition boundary: per-pixel work happens inside the
/// concrete functions each stage wraps.
pub trait Algorithm {
    /// Input type for the stage
    type Input;
    /// Output type for the stage
    type Output;
    /// Parameters controlling stage behavior
    type Params: Default;
    /// Error type for stage execution
    type Error: std::error::Error;

    /// Returns the stage name
    fn name(&self) -> &'static str;

    /// Returns a description of what the stage does
    fn description(&self) -> &'static str;

    /// Execute the stage
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
