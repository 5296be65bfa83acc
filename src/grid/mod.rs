mod uniform_grid;

pub use uniform_grid::*;
