//! Spatial index for SPH particle solvers.
//!
//! A level-complete weighted binary tree ([`tree::BinaryTree`]) and a uniform bucket grid
//! ([`grid::UniformGrid`]) are rebuilt from each particle snapshot and then queried in
//! parallel for active particles and gather-neighbour candidates. The
//! [`driver`] module dispatches those candidates to a per-particle density solver; a
//! reference grad-h solver lives in [`density`] behind the `density` feature.
pub mod utils;
pub mod models;
pub mod particles;
pub mod neighbours;
pub mod tree;
pub mod grid;
pub mod driver;
pub mod density;
