#[cfg(feature = "density")]
mod kernels;
#[cfg(feature = "density")]
pub use kernels::*;
#[cfg(feature = "density")]
mod gradh;
#[cfg(feature = "density")]
pub use gradh::*;

#[cfg(test)]
#[cfg(feature = "density")]
mod density_tests;
