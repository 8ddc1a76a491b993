//! Profile derivative: absolute differences between consecutive scales

use morphoseg_core::raster::{GeoTransform, Raster, RasterElement};
use morphoseg_core::{Algorithm, Error, Result};

use crate::maybe_rayon::*;

use super::profile::Profile;

/// `N - 1` difference images of an `N`-scale profile.
///
/// The extent is stored separately so that an empty derivative (profile of
/// one scale) still knows the size of the image it describes.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivativeProfile {
    images: Vec<Raster<f64>>,
    shape: (usize, usize),
    transform: GeoTransform,
}

impl DerivativeProfile {
    /// Number of difference images
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Whether there is no difference image, i.e. no signal
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Difference image `index`: `|P[index + 1] - P[index]|`
    pub fn get(&self, index: usize) -> Option<&Raster<f64>> {
        self.images.get(index)
    }

    /// All difference images in scale order
    pub fn images(&self) -> &[Raster<f64>] {
        &self.images
    }

    /// Extent of the source profile as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Georeferencing of the source profile
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }
}

/// Differentiate a profile.
///
/// Element `i` is the pixel-wise `|P[i+1] - P[i]|`. A profile of fewer than
/// two scales gives an empty derivative. All profile images must share one
/// extent.
pub fn profile_derivative<T: RasterElement>(profile: &Profile<T>) -> Result<DerivativeProfile> {
    let Some(first) = profile.get(0) else {
        return Ok(DerivativeProfile {
            images: Vec::new(),
            shape: (0, 0),
            transform: GeoTransform::default(),
        });
    };
    for image in &profile.images()[1..] {
        first.ensure_same_shape("profile derivative", image)?;
    }

    let images = profile
        .images()
        .windows(2)
        .map(|pair| absolute_difference(&pair[0], &pair[1]))
        .collect::<Result<Vec<_>>>()?;

    Ok(DerivativeProfile {
        images,
        shape: first.shape(),
        transform: *first.transform(),
    })
}

fn absolute_difference<T: RasterElement>(a: &Raster<T>, b: &Raster<T>) -> Result<Raster<f64>> {
    let (rows, cols) = a.shape();

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let va = unsafe { a.get_unchecked(row, col) }.to_f64();
                let vb = unsafe { b.get_unchecked(row, col) }.to_f64();
                if let (Some(va), Some(vb)) = (va, vb) {
                    *out = (vb - va).abs();
                }
            }
            row_data
        })
        .collect();

    a.with_data(output_data)
}

/// Profile derivative stage
#[derive(Debug, Clone, Default)]
pub struct ProfileDerivative;

impl Algorithm for ProfileDerivative {
    type Input = Profile<f64>;
    type Output = DerivativeProfile;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "ProfileDerivative"
    }

    fn description(&self) -> &'static str {
        "Absolute differences between consecutive profile scales"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        profile_derivative(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::{opening_profile, ProfileParams};

    #[test]
    fn test_derivative_values() {
        let images = vec![
            Raster::filled(2, 3, 10.0),
            Raster::filled(2, 3, 7.0),
            Raster::filled(2, 3, 7.5),
        ];
        let derivative = profile_derivative(&Profile::new(images, 1, 1)).unwrap();
        assert_eq!(derivative.len(), 2);
        assert_eq!(derivative.shape(), (2, 3));
        assert!(derivative.get(0).unwrap().data().iter().all(|&v| v == 3.0));
        assert!(derivative.get(1).unwrap().data().iter().all(|&v| v == 0.5));
    }

    #[test]
    fn test_derivative_length_follows_profile_size() {
        let raster = Raster::filled(6, 6, 4.0);
        for size in 1..5 {
            let params = ProfileParams {
                size,
                ..Default::default()
            };
            let profile = opening_profile(&raster, &params).unwrap();
            let derivative = profile_derivative(&profile).unwrap();
            assert_eq!(derivative.len(), size - 1);
            assert_eq!(derivative.shape(), (6, 6));
        }
    }

    #[test]
    fn test_single_scale_is_empty_not_error() {
        let profile = Profile::new(vec![Raster::filled(3, 4, 1_u8)], 2, 1);
        let derivative = profile_derivative(&profile).unwrap();
        assert!(derivative.is_empty());
        assert_eq!(derivative.shape(), (3, 4));
    }

    #[test]
    fn test_extent_mismatch_is_error() {
        let images = vec![
            Raster::filled(3, 3, 1.0),
            Raster::filled(3, 3, 1.0),
            Raster::filled(3, 4, 1.0),
        ];
        let err = profile_derivative(&Profile::new(images, 1, 1)).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch { stage: "profile derivative", .. }
        ));
    }

    #[test]
    fn test_derivative_stage_consumes_profile() {
        let images = vec![Raster::filled(2, 2, 0.0), Raster::filled(2, 2, 2.0)];
        let derivative = ProfileDerivative.execute_default(Profile::new(images, 1, 1)).unwrap();
        assert_eq!(derivative.get(0).unwrap().get(1, 1).unwrap(), 2.0);
    }
}
