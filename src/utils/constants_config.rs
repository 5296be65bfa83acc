// src/utils/constants_config.rs
use crate::utils::{
    DEFAULT_TREE_CONFIG,
    errors::TreeError
};
#[cfg(feature = "density")]
use crate::utils::DEFAULT_DENSITY_CONFIG;

/// Tunable parameters of the neighbour index and the property driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeConfig {
    /// Maximum number of particles a leaf cell is sized for (Nleafmax).
    pub leaf_capacity: usize,
    /// Opening angle θ used for the multipole-acceptance distance.
    pub opening_angle: f64,
    /// Multiplier on `kernel_range * h` when gathering neighbours.
    pub gather_tolerance: f64,
    /// Initial capacity of the per-worker candidate buffers (Nneibmax).
    pub max_neighbours: usize,
    /// Number of steps between two full rebuilds.
    pub rebuild_interval: u64,
    /// How many times a worker may double its buffer after an overflow.
    pub max_buffer_growths: usize,
    /// How many times a particle's search radius may be widened after a solver failure.
    pub max_search_expansions: usize,
    /// Factor applied to the search radius on each widening.
    pub search_expansion_factor: f64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        DEFAULT_TREE_CONFIG
    }
}

impl TreeConfig {
    /// Builds a configuration, taking the default for every `None`.
    ///
    /// # Examples
    /// ```
    /// use rs_sph_tree::utils::TreeConfig;
    ///
    /// let config = TreeConfig::new(Some(1), None, None, Some(64), None);
    /// assert_eq!(config.leaf_capacity, 1);
    /// assert_eq!(config.max_neighbours, 64);
    /// assert_eq!(config.opening_angle, 0.5);
    /// ```
    pub fn new(
        leaf_capacity: Option<usize>,
        opening_angle: Option<f64>,
        gather_tolerance: Option<f64>,
        max_neighbours: Option<usize>,
        rebuild_interval: Option<u64>,
    ) -> Self {
        let default = DEFAULT_TREE_CONFIG;
        Self {
            leaf_capacity: leaf_capacity.unwrap_or(default.leaf_capacity),
            opening_angle: opening_angle.unwrap_or(default.opening_angle),
            gather_tolerance: gather_tolerance.unwrap_or(default.gather_tolerance),
            max_neighbours: max_neighbours.unwrap_or(default.max_neighbours),
            rebuild_interval: rebuild_interval.unwrap_or(default.rebuild_interval),
            ..default
        }
    }

    pub fn validate(&self) -> Result<(), TreeError> {
        if self.leaf_capacity == 0 { return Err(TreeError::InvalidLeafCapacity); }
        if !(self.opening_angle > 0.0) || !self.opening_angle.is_finite() {
            return Err(TreeError::InvalidConfig("Opening angle must be positive".to_string()));
        }
        if !(self.gather_tolerance >= 1.0) || !self.gather_tolerance.is_finite() {
            return Err(TreeError::InvalidConfig("Gather tolerance must be at least 1".to_string()));
        }
        if self.max_neighbours == 0 {
            return Err(TreeError::InvalidConfig("Neighbour buffer capacity must be positive".to_string()));
        }
        if self.rebuild_interval == 0 {
            return Err(TreeError::InvalidConfig("Rebuild interval must be positive".to_string()));
        }
        if !(self.search_expansion_factor > 1.0) || !self.search_expansion_factor.is_finite() {
            return Err(TreeError::InvalidConfig("Search expansion factor must exceed 1".to_string()));
        }
        Ok(())
    }

    /// Returns true when the index must be rebuilt before step `step`.
    ///
    /// # Examples
    /// ```
    /// use rs_sph_tree::utils::TreeConfig;
    ///
    /// let config = TreeConfig::new(None, None, None, None, Some(4));
    /// assert!(config.is_rebuild_step(0));
    /// assert!(!config.is_rebuild_step(3));
    /// assert!(config.is_rebuild_step(8));
    /// ```
    pub fn is_rebuild_step(&self, step: u64) -> bool {
        step % self.rebuild_interval.max(1) == 0
    }

    /// Squared-extent multiplier for the opening distance, `1/θ²`.
    pub fn opening_factor(&self) -> f64 {
        1.0 / (self.opening_angle * self.opening_angle)
    }
}

/// Parameters of the grad-h smoothing-length iteration.
#[cfg(feature = "density")]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityConfig {
    /// Ratio between smoothing length and mean particle spacing.
    pub h_fac: f64,
    /// Relative tolerance on `h` for the fixed-point iteration.
    pub h_converge: f64,
    /// Fixed-point iterations before switching to bisection.
    pub iteration_max: usize,
}

#[cfg(feature = "density")]
impl Default for DensityConfig {
    fn default() -> Self {
        DEFAULT_DENSITY_CONFIG
    }
}

#[cfg(feature = "density")]
impl DensityConfig {
    pub fn new(h_fac: Option<f64>, h_converge: Option<f64>, iteration_max: Option<usize>) -> Self {
        let default = DEFAULT_DENSITY_CONFIG;
        Self {
            h_fac: h_fac.unwrap_or(default.h_fac),
            h_converge: h_converge.unwrap_or(default.h_converge),
            iteration_max: iteration_max.unwrap_or(default.iteration_max),
        }
    }

    pub fn validate(&self) -> Result<(), TreeError> {
        if !(self.h_fac > 0.0) { return Err(TreeError::InvalidConfig("h_fac must be positive".to_string())); }
        if !(self.h_converge > 0.0) { return Err(TreeError::InvalidConfig("h_converge must be positive".to_string())); }
        if self.iteration_max == 0 {
            return Err(TreeError::InvalidConfig("iteration_max must be positive".to_string()));
        }
        Ok(())
    }
}
