//! Disk structuring elements
//!
//! Profiles grow a flat disk one radius step at a time. A disk of radius `r`
//! holds every cell whose center lies within Euclidean distance `r` of the
//! origin; radius 0 is the single center cell, which makes every flat
//! operator the identity.

/// Flat disk-shaped structuring element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    radius: usize,
    offsets: Vec<(isize, isize)>,
}

impl StructuringElement {
    /// Disk of the given radius (in cells)
    pub fn disk(radius: usize) -> Self {
        let r = radius as isize;
        let r2 = r * r;
        let mut offsets = Vec::new();
        for dr in -r..=r {
            for dc in -r..=r {
                if dr * dr + dc * dc <= r2 {
                    offsets.push((dr, dc));
                }
            }
        }
        Self { radius, offsets }
    }

    /// Radius of the disk
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Whether applying this element leaves any raster unchanged
    pub fn is_identity(&self) -> bool {
        self.radius == 0
    }

    /// (dr, dc) offsets of every active cell relative to the center
    pub fn offsets(&self) -> &[(isize, isize)] {
        &self.offsets
    }
}

impl Default for StructuringElement {
    fn default() -> Self {
        StructuringElement::disk(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_one_is_plus() {
        let se = StructuringElement::disk(1);
        // Center + 4 cardinal; diagonals are sqrt(2) > 1
        assert_eq!(se.offsets().len(), 5);
        assert!(se.offsets().contains(&(0, 0)));
        assert!(se.offsets().contains(&(-1, 0)));
        assert!(!se.offsets().contains(&(1, 1)));
    }

    #[test]
    fn test_disk_two() {
        let se = StructuringElement::disk(2);
        // 5x5 square minus the 4 corners and the 8 cells at distance sqrt(5)
        assert_eq!(se.offsets().len(), 13);
        assert!(se.offsets().contains(&(1, 1)));
        assert!(se.offsets().contains(&(0, 2)));
        assert!(!se.offsets().contains(&(1, 2)));
    }

    #[test]
    fn test_disk_zero_is_identity() {
        let se = StructuringElement::disk(0);
        assert!(se.is_identity());
        assert_eq!(se.offsets(), &[(0, 0)]);
    }

    #[test]
    fn test_disks_are_nested() {
        let small = StructuringElement::disk(3);
        let large = StructuringElement::disk(4);
        for offset in small.offsets() {
            assert!(large.offsets().contains(offset));
        }
        assert!(large.offsets().len() > small.offsets().len());
    }
}
