//! Convex/concave classification of the two characteristic pairs

use morphoseg_core::raster::Raster;
use morphoseg_core::{Algorithm, Error, Result};
use serde::{Deserialize, Serialize};

use crate::maybe_rayon::*;
use crate::profiles::CharacteristicsPair;

/// Which profile produced a class value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Convexity {
    /// Bright structure, detected by the opening profile
    Convex,
    /// Dark structure, detected by the closing profile
    Concave,
}

/// Decision threshold and the offset separating convex from concave labels
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierParams {
    /// Minimum derivative magnitude a pixel needs to be classified
    pub sigma: f64,
    /// Added to opening characteristics; concave labels stay below it
    pub label_separator: u32,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            sigma: 1.0,
            label_separator: 6,
        }
    }
}

impl ClassifierParams {
    /// Reject a negative or non-finite threshold
    pub fn validate(&self) -> Result<()> {
        if !self.sigma.is_finite() || self.sigma < 0.0 {
            return Err(Error::InvalidParameter {
                name: "sigma",
                value: self.sigma.to_string(),
                reason: "must be a finite value >= 0".to_string(),
            });
        }
        Ok(())
    }

    /// Side a nonzero class value belongs to; `None` for background
    pub fn convexity(&self, class: u32) -> Option<Convexity> {
        match class {
            0 => None,
            c if c >= self.label_separator => Some(Convexity::Convex),
            _ => Some(Convexity::Concave),
        }
    }
}

/// Class value of one pixel.
///
/// Comparisons are strict: equal maxima, or a winning maximum that does not
/// exceed `sigma`, give 0.
#[inline]
pub fn classify_pixel(
    open_max: f64,
    close_max: f64,
    open_char: u32,
    close_char: u32,
    sigma: f64,
    label_separator: u32,
) -> u32 {
    if open_max > close_max && open_max > sigma {
        label_separator.saturating_add(open_char)
    } else if close_max > open_max && close_max > sigma {
        close_char
    } else {
        0
    }
}

/// Classify every pixel from the opening and closing characteristics.
///
/// All four input images must share one extent.
pub fn classify_convex_concave(
    opening: &CharacteristicsPair,
    closing: &CharacteristicsPair,
    params: &ClassifierParams,
) -> Result<Raster<u32>> {
    params.validate()?;

    const STAGE: &str = "convex/concave classification";
    let reference = &opening.max_derivative;
    reference.ensure_same_shape(STAGE, &opening.characteristic)?;
    reference.ensure_same_shape(STAGE, &closing.max_derivative)?;
    reference.ensure_same_shape(STAGE, &closing.characteristic)?;

    let (rows, cols) = reference.shape();
    let sigma = params.sigma;
    let separator = params.label_separator;

    let data: Vec<u32> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = Vec::with_capacity(cols);
            for col in 0..cols {
                let (open_max, close_max, open_char, close_char) = unsafe {
                    (
                        opening.max_derivative.get_unchecked(row, col),
                        closing.max_derivative.get_unchecked(row, col),
                        opening.characteristic.get_unchecked(row, col),
                        closing.characteristic.get_unchecked(row, col),
                    )
                };
                row_data.push(classify_pixel(
                    open_max, close_max, open_char, close_char, sigma, separator,
                ));
            }
            row_data
        })
        .collect();

    reference.with_data(data)
}

/// Class image together with the characteristics it was derived from
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedImage {
    pub classes: Raster<u32>,
    pub opening: CharacteristicsPair,
    pub closing: CharacteristicsPair,
}

/// Convex/concave classifier stage.
///
/// Input is the `(opening, closing)` characteristics; both pairs are handed
/// back with the class image for inspection.
#[derive(Debug, Clone, Default)]
pub struct ConvexConcaveClassifier;

impl Algorithm for ConvexConcaveClassifier {
    type Input = (CharacteristicsPair, CharacteristicsPair);
    type Output = ClassifiedImage;
    type Params = ClassifierParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "ConvexConcaveClassifier"
    }

    fn description(&self) -> &'static str {
        "Label pixels as convex or concave from opening/closing characteristics"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (opening, closing) = input;
        let classes = classify_convex_concave(&opening, &closing, &params)?;
        Ok(ClassifiedImage {
            classes,
            opening,
            closing,
        })
    }
}
