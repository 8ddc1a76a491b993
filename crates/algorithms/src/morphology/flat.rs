//! Shared kernel for flat (non-weighted) rank filters

use crate::maybe_rayon::*;
use morphoseg_core::raster::{Raster, RasterElement};
use morphoseg_core::Result;

use super::element::StructuringElement;

/// Fold every in-bounds sample under `element` with `pick`, starting from
/// `neutral`.
///
/// Cells of the element falling outside the raster are ignored, which is the
/// same as padding with `neutral`.
pub(crate) fn flat_filter<T, F>(
    raster: &Raster<T>,
    element: &StructuringElement,
    neutral: T,
    pick: F,
) -> Result<Raster<T>>
where
    T: RasterElement,
    F: Fn(T, T) -> T + Sync + Send,
{
    if element.is_identity() {
        return Ok(raster.clone());
    }

    let (rows, cols) = raster.shape();
    let offsets = element.offsets();

    let output_data: Vec<T> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![neutral; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let mut acc = neutral;
                for &(dr, dc) in offsets {
                    let nr = row as isize + dr;
                    let nc = col as isize + dc;
                    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                        continue;
                    }
                    let v = unsafe { raster.get_unchecked(nr as usize, nc as usize) };
                    acc = pick(acc, v);
                }
                *out = acc;
            }
            row_data
        })
        .collect();

    let mut output = raster.with_data(output_data)?;
    output.set_nodata(raster.nodata());
    Ok(output)
}

#[inline]
pub(crate) fn min_of<T: PartialOrd>(a: T, b: T) -> T {
    if b < a {
        b
    } else {
        a
    }
}

#[inline]
pub(crate) fn max_of<T: PartialOrd>(a: T, b: T) -> T {
    if b > a {
        b
    } else {
        a
    }
}
