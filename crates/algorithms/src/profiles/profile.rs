//! Opening and closing profiles

use morphoseg_core::raster::{Connectivity, Raster, RasterElement};
use morphoseg_core::{Algorithm, Error, Result};
use tracing::{debug, warn};

use crate::maybe_rayon::*;
use crate::morphology::{closing_by_reconstruction, opening_by_reconstruction, StructuringElement};

/// Parameters shared by the opening and closing profile builders
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileParams {
    /// Number of scales
    pub size: usize,
    /// Disk radius of the first scale
    pub initial_value: usize,
    /// Radius increment between consecutive scales
    pub step: usize,
    /// Adjacency used by the geodesic reconstruction
    pub connectivity: Connectivity,
}

impl Default for ProfileParams {
    fn default() -> Self {
        Self {
            size: 5,
            initial_value: 1,
            step: 1,
            connectivity: Connectivity::Four,
        }
    }
}

impl ProfileParams {
    /// Reject configurations that cannot produce a profile
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::InvalidParameter {
                name: "profile_size",
                value: "0".to_string(),
                reason: "a profile needs at least one scale".to_string(),
            });
        }
        let last = (self.size - 1)
            .checked_mul(self.step)
            .and_then(|span| span.checked_add(self.initial_value));
        if last.is_none() {
            return Err(Error::InvalidParameter {
                name: "profile_step",
                value: self.step.to_string(),
                reason: format!("largest radius overflows for {} scales", self.size),
            });
        }
        Ok(())
    }

    /// Disk radius of scale `index`
    pub fn scale(&self, index: usize) -> usize {
        self.initial_value + index * self.step
    }

    fn warn_degenerate(&self) {
        if self.initial_value == 0 {
            warn!(
                "profile starts at radius 0: the first scale is the identity transform"
            );
        }
        if self.step == 0 && self.size > 1 {
            warn!(
                radius = self.initial_value,
                size = self.size,
                "profile step is 0: every scale uses the same radius"
            );
        }
    }
}

/// Ordered images of one operator applied at increasing disk radii
#[derive(Debug, Clone, PartialEq)]
pub struct Profile<T: RasterElement> {
    images: Vec<Raster<T>>,
    initial_value: usize,
    step: usize,
}

impl<T: RasterElement> Profile<T> {
    /// Assemble a profile from already computed images.
    ///
    /// Extents are not checked here; [`profile_derivative`](super::profile_derivative)
    /// rejects mismatching elements.
    pub fn new(images: Vec<Raster<T>>, initial_value: usize, step: usize) -> Self {
        Self {
            images,
            initial_value,
            step,
        }
    }

    /// Number of scales
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Whether the profile holds no image
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Image at scale `index`
    pub fn get(&self, index: usize) -> Option<&Raster<T>> {
        self.images.get(index)
    }

    /// All images, smallest radius first
    pub fn images(&self) -> &[Raster<T>] {
        &self.images
    }

    /// Disk radius of scale `index`
    pub fn scale(&self, index: usize) -> usize {
        self.initial_value + index * self.step
    }

    /// Disk radii of every scale
    pub fn scales(&self) -> Vec<usize> {
        (0..self.len()).map(|i| self.scale(i)).collect()
    }

    /// Radius of the first scale
    pub fn initial_value(&self) -> usize {
        self.initial_value
    }

    /// Radius increment between scales
    pub fn step(&self) -> usize {
        self.step
    }

    /// Consume the profile, returning its images
    pub fn into_images(self) -> Vec<Raster<T>> {
        self.images
    }
}

/// Opening profile: opening by reconstruction at each scale.
///
/// Every scale is computed from the source itself, never from the previous
/// scale, so the scales are built in parallel. Pixel-wise the profile is
/// non-increasing in the scale index.
pub fn opening_profile<T: RasterElement>(
    raster: &Raster<T>,
    params: &ProfileParams,
) -> Result<Profile<T>> {
    build_profile(raster, params, "opening", opening_by_reconstruction)
}

/// Closing profile: closing by reconstruction at each scale.
///
/// Pixel-wise non-decreasing in the scale index.
pub fn closing_profile<T: RasterElement>(
    raster: &Raster<T>,
    params: &ProfileParams,
) -> Result<Profile<T>> {
    build_profile(raster, params, "closing", closing_by_reconstruction)
}

fn build_profile<T, F>(
    raster: &Raster<T>,
    params: &ProfileParams,
    kind: &'static str,
    operator: F,
) -> Result<Profile<T>>
where
    T: RasterElement,
    F: Fn(&Raster<T>, &StructuringElement, Connectivity) -> Result<Raster<T>> + Sync + Send,
{
    params.validate()?;
    params.warn_degenerate();
    debug!(
        kind,
        size = params.size,
        start = params.initial_value,
        step = params.step,
        "building profile"
    );

    let images = (0..params.size)
        .into_par_iter()
        .map(|i| {
            let element = StructuringElement::disk(params.scale(i));
            operator(raster, &element, params.connectivity)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Profile::new(images, params.initial_value, params.step))
}

/// Opening profile builder
#[derive(Debug, Clone, Default)]
pub struct OpeningProfile;

impl Algorithm for OpeningProfile {
    type Input = Raster<f64>;
    type Output = Profile<f64>;
    type Params = ProfileParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "OpeningProfile"
    }

    fn description(&self) -> &'static str {
        "Openings by reconstruction at increasing disk radii"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        opening_profile(&input, &params)
    }
}

/// Closing profile builder
#[derive(Debug, Clone, Default)]
pub struct ClosingProfile;

impl Algorithm for ClosingProfile {
    type Input = Raster<f64>;
    type Output = Profile<f64>;
    type Params = ProfileParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "ClosingProfile"
    }

    fn description(&self) -> &'static str {
        "Closings by reconstruction at increasing disk radii"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        closing_profile(&input, &params)
    }
}
