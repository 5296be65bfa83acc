mod tree_size;
mod cell;
mod topology;
mod ordering;
mod loader;
mod stocking;
mod observer;
mod binary_tree;
mod query;

pub use tree_size::*;
pub use cell::*;
pub use topology::*;
pub use ordering::*;
pub use loader::*;
pub use stocking::*;
pub use observer::*;
pub use binary_tree::*;

#[cfg(test)]
mod tree_tests;
