//! Pixel adjacency used by reconstruction and component labeling

use serde::{Deserialize, Serialize};

/// Neighbourhood relation between raster cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// Edge-sharing neighbours only (N, S, E, W)
    Four,
    /// Edge- and corner-sharing neighbours
    #[default]
    Eight,
}

/// Rook offsets (row, col)
const FOUR: [(isize, isize); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];

/// Queen offsets (row, col), in raster-scan order
const EIGHT: [(isize, isize); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1),           (0, 1),
    (1, -1),  (1, 0),  (1, 1),
];

impl Connectivity {
    /// All neighbour offsets, excluding the center
    pub fn offsets(&self) -> &'static [(isize, isize)] {
        match self {
            Connectivity::Four => &FOUR,
            Connectivity::Eight => &EIGHT,
        }
    }

    /// Neighbours visited before the center in a forward raster scan
    pub fn causal_offsets(&self) -> &'static [(isize, isize)] {
        match self {
            Connectivity::Four => &FOUR[..2],
            Connectivity::Eight => &EIGHT[..4],
        }
    }

    /// Neighbours visited after the center in a forward raster scan
    pub fn anti_causal_offsets(&self) -> &'static [(isize, isize)] {
        match self {
            Connectivity::Four => &FOUR[2..],
            Connectivity::Eight => &EIGHT[4..],
        }
    }

    /// Resolve `(row, col) + (dr, dc)` inside a `rows x cols` grid
    #[inline]
    pub fn neighbor(
        row: usize,
        col: usize,
        (dr, dc): (isize, isize),
        rows: usize,
        cols: usize,
    ) -> Option<(usize, usize)> {
        let nr = row as isize + dr;
        let nc = col as isize + dc;
        if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
            None
        } else {
            Some((nr as usize, nc as usize))
        }
    }
}

impl std::fmt::Display for Connectivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Connectivity::Four => write!(f, "4-connected"),
            Connectivity::Eight => write!(f, "8-connected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_counts() {
        assert_eq!(Connectivity::Four.offsets().len(), 4);
        assert_eq!(Connectivity::Eight.offsets().len(), 8);
    }

    #[test]
    fn test_causal_split_covers_all() {
        for conn in [Connectivity::Four, Connectivity::Eight] {
            let mut all: Vec<_> = conn.causal_offsets().to_vec();
            all.extend_from_slice(conn.anti_causal_offsets());
            assert_eq!(all, conn.offsets());
            for &(dr, dc) in conn.causal_offsets() {
                assert!(dr < 0 || (dr == 0 && dc < 0));
            }
        }
    }

    #[test]
    fn test_neighbor_bounds() {
        assert_eq!(Connectivity::neighbor(0, 0, (-1, 0), 3, 3), None);
        assert_eq!(Connectivity::neighbor(2, 2, (0, 1), 3, 3), None);
        assert_eq!(Connectivity::neighbor(1, 1, (1, -1), 3, 3), Some((2, 0)));
    }

    #[test]
    fn test_default_is_eight() {
        assert_eq!(Connectivity::default(), Connectivity::Eight);
    }
}
