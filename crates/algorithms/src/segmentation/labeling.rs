//! Connected-component labeling of a class image
//!
//! Row strips are labeled in parallel with strip-local union-find, then the
//! strip boundaries are merged serially and ids are assigned in one scan.

use morphoseg_core::raster::{Connectivity, Raster};
use morphoseg_core::{Algorithm, Error, Result};
use tracing::debug;

use crate::maybe_rayon::*;

use super::classify::Convexity;

/// Rows per strip processed by one task
const STRIP_ROWS: usize = 64;

/// Parameters for component labeling
#[derive(Debug, Clone, PartialEq)]
pub struct LabelingParams {
    /// Adjacency joining pixels of equal class
    pub connectivity: Connectivity,
    /// Regions with fewer pixels are returned to background
    pub min_region_size: usize,
}

impl Default for LabelingParams {
    fn default() -> Self {
        Self {
            connectivity: Connectivity::Eight,
            min_region_size: 1,
        }
    }
}

impl LabelingParams {
    pub fn validate(&self) -> Result<()> {
        if self.min_region_size == 0 {
            return Err(Error::InvalidParameter {
                name: "min_region_size",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Union-find over pixel indices. The smaller index always becomes the
/// root, so a root is the first pixel of its set in raster-scan order.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn from_parents(parent: Vec<usize>) -> Self {
        Self { parent }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]]; // path halving
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra < rb {
            self.parent[rb] = ra;
        } else if rb < ra {
            self.parent[ra] = rb;
        }
    }
}

/// Resolve the rows `start..end` on their own. Returned parents are global
/// pixel indices pointing at the strip-local root.
fn label_strip(
    classes: &Raster<u32>,
    start: usize,
    end: usize,
    offsets: &[(isize, isize)],
) -> Vec<usize> {
    let (rows, cols) = classes.shape();
    let base = start * cols;
    let mut uf = UnionFind::new((end - start) * cols);

    for row in start..end {
        for col in 0..cols {
            let value = unsafe { classes.get_unchecked(row, col) };
            if value == 0 {
                continue;
            }
            let here = row * cols + col - base;
            for &offset in offsets {
                let Some((nr, nc)) = Connectivity::neighbor(row, col, offset, rows, cols) else {
                    continue;
                };
                if nr < start {
                    continue;
                }
                if unsafe { classes.get_unchecked(nr, nc) } == value {
                    uf.union(here, nr * cols + nc - base);
                }
            }
        }
    }

    (0..uf.parent.len()).map(|i| uf.find(i) + base).collect()
}

/// Label maximal connected sets of pixels sharing a nonzero class value.
///
/// Background (class 0) stays 0. Ids are consecutive from 1 in raster-scan
/// order of each region's first pixel; regions smaller than
/// `min_region_size` pixels are dropped before numbering.
pub fn label_components(classes: &Raster<u32>, params: &LabelingParams) -> Result<Raster<u32>> {
    params.validate()?;

    let (rows, cols) = classes.shape();
    let n = rows * cols;
    if n == 0 {
        return classes.with_data(Vec::new());
    }

    let offsets = params.connectivity.causal_offsets();
    let strip_count = rows.div_ceil(STRIP_ROWS);

    let parent: Vec<usize> = (0..strip_count)
        .into_par_iter()
        .flat_map(|strip| {
            let start = strip * STRIP_ROWS;
            let end = (start + STRIP_ROWS).min(rows);
            label_strip(classes, start, end, offsets)
        })
        .collect();
    let mut uf = UnionFind::from_parents(parent);

    // Serial merge across strip boundaries
    for strip in 1..strip_count {
        let row = strip * STRIP_ROWS;
        for col in 0..cols {
            let value = unsafe { classes.get_unchecked(row, col) };
            if value == 0 {
                continue;
            }
            for &offset in offsets.iter().filter(|(dr, _)| *dr < 0) {
                let Some((nr, nc)) = Connectivity::neighbor(row, col, offset, rows, cols) else {
                    continue;
                };
                if unsafe { classes.get_unchecked(nr, nc) } == value {
                    uf.union(row * cols + col, nr * cols + nc);
                }
            }
        }
    }

    let mut sizes = vec![0usize; n];
    let mut roots = vec![0usize; n];
    for (i, &value) in classes.data().iter().enumerate() {
        if value != 0 {
            let root = uf.find(i);
            roots[i] = root;
            sizes[root] += 1;
        }
    }

    // Roots are first pixels, so scanning assigns ids in first-pixel order
    let mut ids = vec![0u32; n];
    let mut next_id = 0u32;
    let mut dropped = 0usize;
    let data: Vec<u32> = classes
        .data()
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            if value == 0 {
                return 0;
            }
            let root = roots[i];
            if root == i {
                if sizes[root] >= params.min_region_size {
                    next_id += 1;
                    ids[root] = next_id;
                } else {
                    dropped += 1;
                }
            }
            ids[root]
        })
        .collect();

    debug!(
        "Labeled {} regions ({} dropped below {} px) with {} over {} strips",
        next_id, dropped, params.min_region_size, params.connectivity, strip_count
    );

    classes.with_data(data)
}

/// Summary of one labeled region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionStats {
    pub id: u32,
    /// Class value shared by every pixel of the region
    pub class_value: u32,
    pub convexity: Convexity,
    pub pixel_count: usize,
    pub min_row: usize,
    pub min_col: usize,
    pub max_row: usize,
    pub max_col: usize,
}

/// Per-region statistics, ordered by id.
///
/// Class values at or above `label_separator` are reported as convex.
pub fn region_stats(
    labels: &Raster<u32>,
    classes: &Raster<u32>,
    label_separator: u32,
) -> Result<Vec<RegionStats>> {
    labels.ensure_same_shape("region statistics", classes)?;

    let mut stats: Vec<RegionStats> = Vec::new();
    let cols = labels.cols();
    for (i, (&id, &class_value)) in labels.data().iter().zip(classes.data().iter()).enumerate() {
        if id == 0 {
            continue;
        }
        let (row, col) = (i / cols, i % cols);
        let slot = id as usize - 1;
        if slot >= stats.len() {
            // Ids are consecutive, so a new id is always the next one
            let convexity = if class_value >= label_separator {
                Convexity::Convex
            } else {
                Convexity::Concave
            };
            stats.push(RegionStats {
                id,
                class_value,
                convexity,
                pixel_count: 0,
                min_row: row,
                min_col: col,
                max_row: row,
                max_col: col,
            });
        }
        let Some(region) = stats.get_mut(slot) else {
            return Err(Error::Other(format!("region id {} is not consecutive", id)));
        };
        region.pixel_count += 1;
        region.min_row = region.min_row.min(row);
        region.min_col = region.min_col.min(col);
        region.max_row = region.max_row.max(row);
        region.max_col = region.max_col.max(col);
    }
    Ok(stats)
}

/// Connected-component labeling stage.
///
/// Unlike the per-pixel stages this one needs the whole class image before
/// any id is final: strip results are only complete after the boundary merge.
#[derive(Debug, Clone, Default)]
pub struct ConnectedComponents;

impl Algorithm for ConnectedComponents {
    type Input = Raster<u32>;
    type Output = Raster<u32>;
    type Params = LabelingParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "ConnectedComponents"
    }

    fn description(&self) -> &'static str {
        "Unique ids for connected regions of equal class value"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        label_components(&input, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes_from(rows: &[&[u32]]) -> Raster<u32> {
        let cols = rows[0].len();
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Raster::from_vec(data, rows.len(), cols).unwrap()
    }

    fn four() -> LabelingParams {
        LabelingParams {
            connectivity: Connectivity::Four,
            ..Default::default()
        }
    }

    #[test]
    fn test_diagonal_depends_on_connectivity() {
        let classes = classes_from(&[&[3, 0], &[0, 3]]);

        let eight = label_components(&classes, &LabelingParams::default()).unwrap();
        assert_eq!(eight.get(0, 0).unwrap(), 1);
        assert_eq!(eight.get(1, 1).unwrap(), 1);

        let four = label_components(&classes, &four()).unwrap();
        assert_eq!(four.get(0, 0).unwrap(), 1);
        assert_eq!(four.get(1, 1).unwrap(), 2);
        assert_eq!(four.get(0, 1).unwrap(), 0);
    }

    #[test]
    fn test_adjacent_classes_stay_apart() {
        let classes = classes_from(&[&[2, 2, 9], &[2, 9, 9]]);
        let labels = label_components(&classes, &LabelingParams::default()).unwrap();
        assert_eq!(labels.get(0, 0).unwrap(), 1);
        assert_eq!(labels.get(1, 0).unwrap(), 1);
        assert_eq!(labels.get(0, 2).unwrap(), 2);
        assert_eq!(labels.get(1, 1).unwrap(), 2);
    }

    #[test]
    fn test_ids_follow_first_pixel_order() {
        // The U shape's two arms join on the last row
        let classes = classes_from(&[&[0, 5, 0, 5], &[4, 5, 0, 5], &[0, 5, 5, 5]]);
        let labels = label_components(&classes, &four()).unwrap();
        assert_eq!(labels.get(0, 1).unwrap(), 1);
        assert_eq!(labels.get(0, 3).unwrap(), 1);
        assert_eq!(labels.get(1, 0).unwrap(), 2);
    }

    #[test]
    fn test_min_region_size_drops_small_regions() {
        let classes = classes_from(&[&[1, 0, 2, 2], &[0, 0, 2, 2]]);
        let params = LabelingParams {
            min_region_size: 2,
            ..Default::default()
        };
        let labels = label_components(&classes, &params).unwrap();
        assert_eq!(labels.get(0, 0).unwrap(), 0);
        assert_eq!(labels.get(0, 2).unwrap(), 1);
        assert_eq!(labels.get(1, 3).unwrap(), 1);
    }

    #[test]
    fn test_regions_span_strip_boundaries() {
        // A snake crossing several strips, plus a detached block per strip
        let rows = STRIP_ROWS * 3 + 5;
        let cols = 6;
        let mut classes = Raster::<u32>::new(rows, cols);
        for r in 0..rows {
            classes.set(r, 0, 7).unwrap();
            if r % STRIP_ROWS == 10 {
                classes.set(r, 4, 7).unwrap();
            }
        }
        let labels = label_components(&classes, &LabelingParams::default()).unwrap();
        assert!((0..rows).all(|r| labels.get(r, 0).unwrap() == 1));
        assert_eq!(labels.get(10, 4).unwrap(), 2);
        assert_eq!(labels.get(STRIP_ROWS + 10, 4).unwrap(), 3);
        assert_eq!(labels.get(3 * STRIP_ROWS + 4, 4).unwrap(), 0);
    }

    #[test]
    fn test_same_id_iff_connected_on_generated_images() {
        let mut rng: u64 = 42;
        let rows = STRIP_ROWS + 17;
        let cols = 23;
        let mut classes = Raster::<u32>::new(rows, cols);
        for r in 0..rows {
            for c in 0..cols {
                rng = rng
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                classes.set(r, c, ((rng >> 33) % 3) as u32).unwrap();
            }
        }

        for connectivity in [Connectivity::Four, Connectivity::Eight] {
            let params = LabelingParams {
                connectivity,
                ..Default::default()
            };
            let labels = label_components(&classes, &params).unwrap();

            // Reference: flood fill each unvisited nonzero pixel
            let mut visited = vec![false; rows * cols];
            let mut seen_ids = std::collections::HashSet::new();
            for r in 0..rows {
                for c in 0..cols {
                    let value = classes.get(r, c).unwrap();
                    if value == 0 {
                        assert_eq!(labels.get(r, c).unwrap(), 0);
                        continue;
                    }
                    if visited[r * cols + c] {
                        continue;
                    }
                    let id = labels.get(r, c).unwrap();
                    assert!(id > 0 && seen_ids.insert(id), "id {} reused", id);
                    let mut stack = vec![(r, c)];
                    visited[r * cols + c] = true;
                    while let Some((cr, cc)) = stack.pop() {
                        assert_eq!(labels.get(cr, cc).unwrap(), id);
                        for &offset in connectivity.offsets() {
                            if let Some((nr, nc)) = Connectivity::neighbor(cr, cc, offset, rows, cols) {
                                if !visited[nr * cols + nc] && classes.get(nr, nc).unwrap() == value {
                                    visited[nr * cols + nc] = true;
                                    stack.push((nr, nc));
                                }
                            }
                        }
                    }
                }
            }
            assert_eq!(seen_ids.len() as u32, *labels.data().iter().max().unwrap());
        }
    }

    #[test]
    fn test_region_stats() {
        let classes = classes_from(&[&[9, 9, 0], &[0, 3, 3], &[0, 0, 3]]);
        let labels = label_components(&classes, &four()).unwrap();
        let stats = region_stats(&labels, &classes, 6).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].convexity, Convexity::Convex);
        assert_eq!(stats[0].pixel_count, 2);
        assert_eq!(stats[1].class_value, 3);
        assert_eq!(stats[1].convexity, Convexity::Concave);
        assert_eq!((stats[1].min_row, stats[1].min_col), (1, 1));
        assert_eq!((stats[1].max_row, stats[1].max_col), (2, 2));
    }

    #[test]
    fn test_zero_min_size_rejected() {
        let classes = classes_from(&[&[1]]);
        let params = LabelingParams {
            min_region_size: 0,
            ..Default::default()
        };
        assert!(label_components(&classes, &params).is_err());
    }
}
