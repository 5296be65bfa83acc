use crate::neighbours::CandidateBuffer;
use crate::particles::ParticleSet;
use crate::utils::{distance_squared, TreeError};

/// Read-only query interface shared by the binary tree and the uniform grid.
///
/// A "cell" is whatever unit of work the structure hands out: a leaf cell index for the
/// tree, a linear grid id for the grid. Every particle belongs to exactly one cell, so
/// cells can be processed concurrently without two workers owning the same particle.
///
/// Candidate lists are conservative supersets: callers re-filter by true distance.
pub trait NeighbourSearch<const D: usize>: Sync {
    /// Cells holding at least one active particle.
    fn active_cells(&self) -> Vec<usize>;

    /// Writes the active particles of `cell` into `out` (cleared first).
    fn active_particles(&self, cell: usize, particles: &ParticleSet<D>, out: &mut Vec<usize>);

    /// Collects every particle that may lie within `range_factor * h_i` of any active
    /// particle `i` of `cell`.
    fn cell_candidates(
        &self,
        cell: usize,
        particles: &ParticleSet<D>,
        range_factor: f64,
        buffer: &mut CandidateBuffer,
    ) -> Result<(), TreeError>;

    /// Collects every particle `j` that may lie within `range_factor * max(h_i, h_j)` of any
    /// active particle `i` of `cell`, given that no particle has `h` above `h_bound`.
    fn pair_candidates(
        &self,
        cell: usize,
        particles: &ParticleSet<D>,
        range_factor: f64,
        h_bound: f64,
        buffer: &mut CandidateBuffer,
    ) -> Result<(), TreeError>;

    /// Collects every particle that may lie within `radius` of `position`.
    fn gather_candidates(
        &self,
        position: &[f64; D],
        radius: f64,
        buffer: &mut CandidateBuffer,
    ) -> Result<(), TreeError>;
}

/// Brute-force list of the true gather neighbours of particle `i`, i.e. every `j`
/// (including `i`) with `|r_i - r_j| <= range_factor * h_i`.
pub fn brute_force_neighbours<const D: usize>(particles: &ParticleSet<D>, i: usize, range_factor: f64) -> Vec<usize> {
    let pi = particles.get(i);
    let range_sq = (range_factor * pi.h).powi(2);
    (0..particles.n_total())
        .filter(|&j| distance_squared(&pi.position, particles.position(j)) <= range_sq)
        .collect()
}

/// Checks a candidate list for particle `i` against the brute-force neighbour set: every
/// true neighbour must appear exactly once.
///
/// # Errors
///
/// Returns [`TreeError::CalculationError`] naming the first missing or duplicated neighbour.
pub fn validate_neighbour_list<const D: usize>(
    particles: &ParticleSet<D>,
    i: usize,
    candidates: &[usize],
    range_factor: f64,
) -> Result<(), TreeError> {
    for j in brute_force_neighbours(particles, i, range_factor) {
        let count = candidates.iter().filter(|&&c| c == j).count();
        if count != 1 {
            return Err(TreeError::CalculationError(format!(
                "neighbour {} of particle {} appears {} times in a list of {}",
                j,
                i,
                count,
                candidates.len()
            )));
        }
    }
    Ok(())
}
