mod property_driver;
mod pairwise;

pub use property_driver::*;
pub use pairwise::*;
