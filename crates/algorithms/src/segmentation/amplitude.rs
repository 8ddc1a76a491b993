//! Per-pixel Euclidean norm across bands

use morphoseg_core::raster::{Raster, RasterElement};
use morphoseg_core::{Algorithm, Error, Result};

use crate::maybe_rayon::*;

/// Collapse `bands` to `sqrt(sum b^2)` per pixel.
///
/// A pixel that is nodata (or not representable as `f64`) in any band is
/// NaN in the output, and the output declares NaN as its nodata value. The
/// georeferencing of the first band is kept.
pub fn amplitude<T: RasterElement>(bands: &[Raster<T>]) -> Result<Raster<f64>> {
    let Some(first) = bands.first() else {
        return Err(Error::MissingInput("amplitude needs at least one band"));
    };
    for band in &bands[1..] {
        first.ensure_same_shape("amplitude", band)?;
    }

    let (rows, cols) = first.shape();
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = Vec::with_capacity(cols);
            for col in 0..cols {
                let mut sum = 0.0;
                for band in bands {
                    let v = unsafe { band.get_unchecked(row, col) };
                    match v.to_f64() {
                        Some(x) if !band.is_nodata(v) => sum += x * x,
                        _ => {
                            sum = f64::NAN;
                            break;
                        }
                    }
                }
                row_data.push(sum.sqrt());
            }
            row_data
        })
        .collect();

    let mut output = first.with_data(data)?;
    output.set_nodata(Some(f64::NAN));
    Ok(output)
}

/// Band amplitude stage
#[derive(Debug, Clone, Default)]
pub struct Amplitude;

impl Algorithm for Amplitude {
    type Input = Vec<Raster<f64>>;
    type Output = Raster<f64>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Amplitude"
    }

    fn description(&self) -> &'static str {
        "Euclidean norm of a multi-band raster"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        amplitude(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm_of_two_bands() {
        let a = Raster::filled(2, 3, 3.0_f64);
        let b = Raster::filled(2, 3, -4.0_f64);
        let out = amplitude(&[a, b]).unwrap();
        assert!(out.data().iter().all(|&v| v == 5.0));
    }

    #[test]
    fn test_single_band_is_absolute_value() {
        let mut band = Raster::filled(1, 2, 2_i16);
        band.set(0, 1, -7).unwrap();
        let out = amplitude(&[band]).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 2.0);
        assert_eq!(out.get(0, 1).unwrap(), 7.0);
    }

    #[test]
    fn test_nodata_propagates() {
        let mut a = Raster::filled(2, 2, 1.0_f64);
        a.set_nodata(Some(-9999.0));
        a.set(1, 0, -9999.0).unwrap();
        let b = Raster::filled(2, 2, 1.0_f64);
        let out = amplitude(&[a, b]).unwrap();
        assert!(out.get(1, 0).unwrap().is_nan());
        assert!((out.get(0, 0).unwrap() - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_no_band_is_missing_input() {
        let bands: Vec<Raster<f64>> = Vec::new();
        assert!(matches!(amplitude(&bands), Err(Error::MissingInput(_))));
    }

    #[test]
    fn test_band_extent_mismatch() {
        let a = Raster::filled(2, 2, 1.0_f64);
        let b = Raster::filled(2, 3, 1.0_f64);
        let err = amplitude(&[a, b]).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch { stage: "amplitude", ar: 2, ac: 3, .. }
        ));
    }
}
