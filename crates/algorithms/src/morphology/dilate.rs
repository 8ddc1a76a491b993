//! Morphological dilation (maximum filter)
//!
//! Replaces each pixel with the maximum value under the structuring element.
//! Enlarges bright regions and shrinks dark regions.

use morphoseg_core::raster::{Raster, RasterElement};
use morphoseg_core::{Algorithm, Error, Result};

use super::element::StructuringElement;
use super::flat::{flat_filter, max_of};

/// Parameters for morphological dilation
#[derive(Debug, Clone, Default)]
pub struct DilateParams {
    /// Structuring element
    pub element: StructuringElement,
}

/// Dilation algorithm
#[derive(Debug, Clone, Default)]
pub struct Dilate;

impl Algorithm for Dilate {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = DilateParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Dilate"
    }

    fn description(&self) -> &'static str {
        "Morphological dilation (maximum filter over a disk)"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        dilate(&input, &params.element)
    }
}

/// Perform morphological dilation on a raster
///
/// Each output pixel is the maximum over the in-bounds cells of the element.
pub fn dilate<T: RasterElement>(raster: &Raster<T>, element: &StructuringElement) -> Result<Raster<T>> {
    flat_filter(raster, element, T::min_value(), max_of)
}
