//! Opening by reconstruction
//!
//! Erodes with a disk, then reconstructs the eroded image by dilation under
//! the source image. Bright structures the disk cannot fit inside disappear
//! entirely; every other structure keeps its exact contour.

use morphoseg_core::raster::{Connectivity, Raster, RasterElement};
use morphoseg_core::{Algorithm, Error, Result};

use super::element::StructuringElement;
use super::erode::erode;
use super::reconstruction::reconstruct_by_dilation;

/// Parameters for opening by reconstruction
#[derive(Debug, Clone)]
pub struct OpeningParams {
    /// Structuring element used for the initial erosion
    pub element: StructuringElement,
    /// Adjacency used by the reconstruction
    pub connectivity: Connectivity,
}

impl Default for OpeningParams {
    fn default() -> Self {
        Self {
            element: StructuringElement::default(),
            connectivity: Connectivity::Four,
        }
    }
}

/// Opening-by-reconstruction algorithm
#[derive(Debug, Clone, Default)]
pub struct OpeningByReconstruction;

impl Algorithm for OpeningByReconstruction {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = OpeningParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "OpeningByReconstruction"
    }

    fn description(&self) -> &'static str {
        "Erosion followed by geodesic reconstruction by dilation under the source"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        opening_by_reconstruction(&input, &params.element, params.connectivity)
    }
}

/// Opening by reconstruction of `raster` with `element`
///
/// Anti-extensive: the result never exceeds the source.
pub fn opening_by_reconstruction<T: RasterElement>(
    raster: &Raster<T>,
    element: &StructuringElement,
    connectivity: Connectivity,
) -> Result<Raster<T>> {
    if element.is_identity() {
        return Ok(raster.clone());
    }
    let eroded = erode(raster, element)?;
    reconstruct_by_dilation(&eroded, raster, connectivity)
}
