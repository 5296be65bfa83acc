mod candidate_buffer;
mod neighbour_search;
mod particle_chain;

pub use candidate_buffer::*;
pub use neighbour_search::*;
pub use particle_chain::*;
