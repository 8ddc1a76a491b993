//! Geodesic morphological reconstruction
//!
//! Reconstruction by dilation grows a `marker` under a `mask` until
//! stability: every regional maximum of the mask that the marker touches is
//! restored, every other one is flattened. Reconstruction by erosion is the
//! dual (marker above the mask, regional minima restored).
//!
//! Implementation is the hybrid algorithm: one forward raster scan, one
//! backward raster scan that also seeds a FIFO with pixels that can still
//! propagate, then queue propagation until stable.
//!
//! Reference:
//! Vincent, L. (1993). Morphological grayscale reconstruction in image
//! analysis: applications and efficient algorithms. *IEEE Transactions on
//! Image Processing*, 2(2), 176-201.

use std::collections::VecDeque;

use morphoseg_core::raster::{Connectivity, Raster, RasterElement};
use morphoseg_core::Result;

use super::flat::{max_of, min_of};

/// Direction in which a reconstruction grows the marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polarity {
    /// Marker grows upward, bounded above by the mask
    Dilation,
    /// Marker grows downward, bounded below by the mask
    Erosion,
}

impl Polarity {
    /// Propagation operator (max for dilation)
    #[inline]
    fn grow<T: PartialOrd>(self, a: T, b: T) -> T {
        match self {
            Polarity::Dilation => max_of(a, b),
            Polarity::Erosion => min_of(a, b),
        }
    }

    /// Geodesic bound against the mask (min for dilation)
    #[inline]
    fn bound<T: PartialOrd>(self, a: T, b: T) -> T {
        match self {
            Polarity::Dilation => min_of(a, b),
            Polarity::Erosion => max_of(a, b),
        }
    }

    /// `a` lies strictly on the growing side of `b`
    #[inline]
    fn beyond<T: PartialOrd>(self, a: T, b: T) -> bool {
        match self {
            Polarity::Dilation => a > b,
            Polarity::Erosion => a < b,
        }
    }
}

/// Reconstruction by dilation of `marker` under `mask`
///
/// The marker is clipped to the mask first, so any marker works; for
/// opening by reconstruction it is the eroded source.
pub fn reconstruct_by_dilation<T: RasterElement>(
    marker: &Raster<T>,
    mask: &Raster<T>,
    connectivity: Connectivity,
) -> Result<Raster<T>> {
    reconstruct(marker, mask, connectivity, Polarity::Dilation)
}

/// Reconstruction by erosion of `marker` above `mask`
pub fn reconstruct_by_erosion<T: RasterElement>(
    marker: &Raster<T>,
    mask: &Raster<T>,
    connectivity: Connectivity,
) -> Result<Raster<T>> {
    reconstruct(marker, mask, connectivity, Polarity::Erosion)
}

fn reconstruct<T: RasterElement>(
    marker: &Raster<T>,
    mask: &Raster<T>,
    connectivity: Connectivity,
    polarity: Polarity,
) -> Result<Raster<T>> {
    mask.ensure_same_shape("geodesic reconstruction", marker)?;

    let (rows, cols) = mask.shape();
    let bound: Vec<T> = mask.data().iter().copied().collect();
    let mut state: Vec<T> = marker
        .data()
        .iter()
        .zip(bound.iter())
        .map(|(&m, &b)| polarity.bound(m, b))
        .collect();

    // Forward scan
    for row in 0..rows {
        for col in 0..cols {
            let idx = row * cols + col;
            let mut v = state[idx];
            for &offset in connectivity.causal_offsets() {
                if let Some((nr, nc)) = Connectivity::neighbor(row, col, offset, rows, cols) {
                    v = polarity.grow(v, state[nr * cols + nc]);
                }
            }
            state[idx] = polarity.bound(v, bound[idx]);
        }
    }

    // Backward scan, seeding the queue
    let mut queue = VecDeque::new();
    for row in (0..rows).rev() {
        for col in (0..cols).rev() {
            let idx = row * cols + col;
            let mut v = state[idx];
            for &offset in connectivity.anti_causal_offsets() {
                if let Some((nr, nc)) = Connectivity::neighbor(row, col, offset, rows, cols) {
                    v = polarity.grow(v, state[nr * cols + nc]);
                }
            }
            v = polarity.bound(v, bound[idx]);
            state[idx] = v;

            let can_propagate = connectivity.anti_causal_offsets().iter().any(|&offset| {
                Connectivity::neighbor(row, col, offset, rows, cols).map_or(false, |(nr, nc)| {
                    let q = nr * cols + nc;
                    polarity.beyond(v, state[q]) && polarity.beyond(bound[q], state[q])
                })
            });
            if can_propagate {
                queue.push_back((row, col));
            }
        }
    }

    // Propagation
    while let Some((row, col)) = queue.pop_front() {
        let v = state[row * cols + col];
        for &offset in connectivity.offsets() {
            if let Some((nr, nc)) = Connectivity::neighbor(row, col, offset, rows, cols) {
                let q = nr * cols + nc;
                if polarity.beyond(v, state[q]) && bound[q] != state[q] {
                    state[q] = polarity.bound(v, bound[q]);
                    queue.push_back((nr, nc));
                }
            }
        }
    }

    let mut output = mask.with_data(state)?;
    output.set_nodata(mask.nodata());
    Ok(output)
}
