//! Morphological erosion (minimum filter)
//!
//! Replaces each pixel with the minimum value under the structuring element.
//! Shrinks bright regions and enlarges dark regions.

use morphoseg_core::raster::{Raster, RasterElement};
use morphoseg_core::{Algorithm, Error, Result};

use super::element::StructuringElement;
use super::flat::{flat_filter, min_of};

/// Parameters for morphological erosion
#[derive(Debug, Clone, Default)]
pub struct ErodeParams {
    /// Structuring element
    pub element: StructuringElement,
}

/// Erosion algorithm
#[derive(Debug, Clone, Default)]
pub struct Erode;

impl Algorithm for Erode {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = ErodeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Erode"
    }

    fn description(&self) -> &'static str {
        "Morphological erosion (minimum filter over a disk)"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        erode(&input, &params.element)
    }
}

/// Perform morphological erosion on a raster
///
/// Each output pixel is the minimum over the in-bounds cells of the element.
pub fn erode<T: RasterElement>(raster: &Raster<T>, element: &StructuringElement) -> Result<Raster<T>> {
    flat_filter(raster, element, T::max_value(), min_of)
}
