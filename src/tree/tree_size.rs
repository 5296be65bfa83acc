use crate::utils::{pow2, TreeError};

/// Dimensions of a level-complete binary tree sized for a particle count.
///
/// `levels` is the smallest non-negative integer with `2^levels * leaf_capacity >= n_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeSize {
    pub levels: usize,
    pub leaf_count: usize,
    pub cell_count: usize,
    /// `2^levels * leaf_capacity`, always at least `n_total`.
    pub particle_capacity: usize,
    pub leaf_capacity: usize,
}

impl TreeSize {
    /// Computes the tree dimensions for `n_total` particles and at most `leaf_capacity`
    /// particles per leaf.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidLeafCapacity`] if `leaf_capacity` is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use rs_sph_tree::tree::TreeSize;
    ///
    /// let size = TreeSize::estimate(8, 1).unwrap();
    /// assert_eq!((size.levels, size.leaf_count, size.cell_count), (3, 8, 15));
    ///
    /// let size = TreeSize::estimate(9, 2).unwrap();
    /// assert_eq!(size.levels, 3);
    /// assert_eq!(size.particle_capacity, 16);
    /// ```
    pub fn estimate(n_total: usize, leaf_capacity: usize) -> Result<Self, TreeError> {
        if leaf_capacity == 0 {
            return Err(TreeError::InvalidLeafCapacity);
        }
        let mut levels = 0usize;
        // A product that overflows is certainly larger than n_total.
        while let Some(capacity) = pow2(levels as u32).checked_mul(leaf_capacity) {
            if capacity >= n_total {
                break;
            }
            levels += 1;
        }
        let leaf_count = pow2(levels as u32);
        Ok(Self {
            levels,
            leaf_count,
            cell_count: 2 * leaf_count - 1,
            particle_capacity: leaf_count.saturating_mul(leaf_capacity),
            leaf_capacity,
        })
    }

    /// Distance from a cell at `level` to its second child, `2^(levels - level)`.
    #[inline]
    pub fn stride(&self, level: usize) -> usize {
        pow2((self.levels - level) as u32)
    }
}
