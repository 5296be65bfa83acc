use rayon::prelude::*;

use crate::driver::query_with_growth;
use crate::neighbours::{CandidateBuffer, NeighbourSearch};
use crate::particles::ParticleSet;
use crate::utils::{distance_squared, TreeError};

struct PairWorker {
    acc: Vec<f64>,
    active: Vec<usize>,
    candidates: CandidateBuffer,
}

/// Accumulates a symmetric pair quantity over every interacting pair.
///
/// A pair `(i, j)` interacts when `i` is active and `|r_i - r_j| <= range_factor * max(h_i, h_j)`,
/// so a pair is found whichever of the two smoothing lengths reaches the other particle. It
/// is evaluated once, from the active particle with the lower index, or from `i` alone when
/// `j` is inactive. `pair_fn(i, j, dr2)` returns the contributions to `i` and to `j`.
///
/// Each rayon worker sums into a private accumulator; the accumulators are added together
/// once all cells are done, so no particle is written by two workers at once.
///
/// # Examples
///
/// ```
/// use rs_sph_tree::driver::accumulate_pairwise;
/// use rs_sph_tree::particles::{ParticleSet, SphParticle};
/// use rs_sph_tree::tree::BinaryTree;
/// use rs_sph_tree::utils::TreeConfig;
///
/// let particles = ParticleSet::from_real(
///     (0..4).map(|i| SphParticle::new([i as f64], 1.0, 0.6).unwrap()).collect(),
/// ).unwrap();
/// let mut tree = BinaryTree::<1>::new(TreeConfig::new(Some(1), None, None, None, None)).unwrap();
/// tree.update(&particles).unwrap();
///
/// // Count neighbours: each pair adds one to both sides.
/// let counts = accumulate_pairwise(&tree, &particles, 2.0, 16, |_, _, _| (1.0, 1.0)).unwrap();
/// assert_eq!(counts, vec![1.0, 2.0, 2.0, 1.0]);
/// ```
pub fn accumulate_pairwise<const D: usize, S, F>(
    search: &S,
    particles: &ParticleSet<D>,
    range_factor: f64,
    capacity: usize,
    pair_fn: F,
) -> Result<Vec<f64>, TreeError>
where
    S: NeighbourSearch<D> + ?Sized,
    F: Fn(usize, usize, f64) -> (f64, f64) + Sync,
{
    let n = particles.n_total();
    let h_bound = particles.max_smoothing_length();
    let cells = search.active_cells();

    cells
        .par_iter()
        .try_fold(
            || PairWorker {
                acc: vec![0.0; n],
                active: Vec::new(),
                candidates: CandidateBuffer::new(capacity.max(1)),
            },
            |mut worker: PairWorker, &cell: &usize| -> Result<PairWorker, TreeError> {
                search.active_particles(cell, particles, &mut worker.active);
                // Overflow always resolves: the buffer grows to the reported size.
                let mut growths = 0;
                query_with_growth(&mut worker.candidates, usize::MAX, &mut growths, |buffer| {
                    search.pair_candidates(cell, particles, range_factor, h_bound, buffer)
                })?;

                for &i in &worker.active {
                    let pi = particles.get(i);
                    for &j in worker.candidates.as_slice() {
                        if j == i || (particles.is_active(j) && j < i) {
                            continue;
                        }
                        let pj = particles.get(j);
                        let range_squared = (range_factor * pi.h.max(pj.h)).powi(2);
                        let dr2 = distance_squared(&pi.position, &pj.position);
                        if dr2 <= range_squared {
                            let (to_i, to_j) = pair_fn(i, j, dr2);
                            worker.acc[i] += to_i;
                            worker.acc[j] += to_j;
                        }
                    }
                }
                Ok(worker)
            },
        )
        .map(|worker: Result<PairWorker, TreeError>| worker.map(|w| w.acc))
        .try_reduce(
            || vec![0.0; n],
            |mut a, b| {
                for (x, y) in a.iter_mut().zip(b) {
                    *x += y;
                }
                Ok(a)
            },
        )
}
