//! Multi-scale characteristics of a derivative profile
//!
//! For every pixel: the largest derivative over all scales and the scale
//! (in disk-radius units) where it first occurs.

use morphoseg_core::raster::Raster;
use morphoseg_core::{Algorithm, Error, Result};

use crate::maybe_rayon::*;

use super::derivative::DerivativeProfile;

/// Rescaling of derivative indices into disk radii
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicsParams {
    /// Radius of the first profile scale
    pub initial_value: usize,
    /// Radius increment between scales
    pub step: usize,
}

impl Default for CharacteristicsParams {
    fn default() -> Self {
        Self {
            initial_value: 1,
            step: 1,
        }
    }
}

impl CharacteristicsParams {
    /// Characteristic reported for derivative index `index`
    pub fn characteristic(&self, index: usize) -> usize {
        self.initial_value + index * self.step
    }

    fn characteristic_u32(&self, index: usize) -> Result<u32> {
        self.initial_value
            .checked_add(index.checked_mul(self.step).unwrap_or(usize::MAX))
            .and_then(|c| u32::try_from(c).ok())
            .ok_or_else(|| Error::InvalidParameter {
                name: "profile_step",
                value: self.step.to_string(),
                reason: format!("characteristic of scale index {} does not fit in u32", index),
            })
    }
}

/// Per-pixel maximum derivative and the scale it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct CharacteristicsPair {
    /// Largest derivative value over all scales
    pub max_derivative: Raster<f64>,
    /// `initial_value + i_max * step`, first maximum wins
    pub characteristic: Raster<u32>,
}

impl CharacteristicsPair {
    /// Extent as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.max_derivative.shape()
    }
}

/// Extract the multi-scale characteristics of `derivative`.
///
/// The scan keeps a running maximum that only a strictly greater value
/// replaces, so ties resolve to the smallest scale. NaN derivatives never win
/// over a number. An empty derivative yields a zero maximum and the initial
/// value as characteristic everywhere.
pub fn multiscale_characteristics(
    derivative: &DerivativeProfile,
    params: &CharacteristicsParams,
) -> Result<CharacteristicsPair> {
    let (rows, cols) = derivative.shape();
    let scales = derivative.len();
    let last_index = scales.saturating_sub(1);
    // Checked once so the per-pixel conversion below cannot fail
    params.characteristic_u32(last_index)?;

    let images = derivative.images();
    let pixels: Vec<(f64, u32)> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = Vec::with_capacity(cols);
            for col in 0..cols {
                let mut best: f64 = 0.0;
                let mut best_index = 0;
                for (i, image) in images.iter().enumerate() {
                    let v = unsafe { image.get_unchecked(row, col) };
                    if i == 0 || (best.is_nan() && !v.is_nan()) || v > best {
                        best = v;
                        best_index = i;
                    }
                }
                let characteristic =
                    (params.initial_value + best_index * params.step) as u32;
                row_data.push((best, characteristic));
            }
            row_data
        })
        .collect();

    let (max_data, char_data): (Vec<f64>, Vec<u32>) = pixels.into_iter().unzip();

    let mut max_derivative = Raster::from_vec(max_data, rows, cols)?;
    max_derivative.set_transform(*derivative.transform());
    let mut characteristic = Raster::from_vec(char_data, rows, cols)?;
    characteristic.set_transform(*derivative.transform());

    Ok(CharacteristicsPair {
        max_derivative,
        characteristic,
    })
}

/// Multi-scale characteristics stage
#[derive(Debug, Clone, Default)]
pub struct MultiScaleCharacteristics;

impl Algorithm for MultiScaleCharacteristics {
    type Input = DerivativeProfile;
    type Output = CharacteristicsPair;
    type Params = CharacteristicsParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "MultiScaleCharacteristics"
    }

    fn description(&self) -> &'static str {
        "Per-pixel maximum profile derivative and the scale where it occurs"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        multiscale_characteristics(&input, &params)
    }
}
