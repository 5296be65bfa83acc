use crate::utils;

/// Guards divisions by vanishing densities in the smoothing-length iteration.
pub const SMALL_NUMBER: f64 = 1.0e-20;

/// Largest number of cells a uniform grid may allocate.
pub const MAX_GRID_CELLS: usize = 1 << 24;

pub const DEFAULT_TREE_CONFIG: utils::TreeConfig = utils::TreeConfig {
    leaf_capacity: 8,
    opening_angle: 0.5,
    gather_tolerance: 1.0,
    max_neighbours: 1024,
    rebuild_interval: 1,
    max_buffer_growths: 4,
    max_search_expansions: 4,
    search_expansion_factor: 1.25,
};

#[cfg(feature = "density")]
pub const DEFAULT_DENSITY_CONFIG: utils::DensityConfig = utils::DensityConfig {
    h_fac: 1.2,
    h_converge: 0.01,
    iteration_max: 30,
};
