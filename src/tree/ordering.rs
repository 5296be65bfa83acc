use crate::particles::ParticleSet;
use crate::utils::TreeError;

/// Per-axis permutations of particle indices, each sorted by that axis' coordinate.
///
/// Sorting is stable, so equal coordinates keep ascending index order.
#[derive(Debug, Clone)]
pub struct CoordinateOrder<const D: usize> {
    order: [Vec<usize>; D],
}

impl<const D: usize> Default for CoordinateOrder<D> {
    fn default() -> Self {
        Self { order: std::array::from_fn(|_| Vec::new()) }
    }
}

impl<const D: usize> CoordinateOrder<D> {
    /// Sorts `particles` along every axis, reusing the existing buffers.
    ///
    /// # Errors
    ///
    /// [`TreeError::NonFiniteCoordinate`] for a NaN or infinite coordinate, and
    /// [`TreeError::StructuralInvariantViolation`] if a sorted axis is found out of order.
    pub fn compute(&mut self, particles: &ParticleSet<D>) -> Result<(), TreeError> {
        let n = particles.n_total();
        for i in 0..n {
            let r = particles.position(i);
            if let Some(axis) = (0..D).find(|&k| !r[k].is_finite()) {
                return Err(TreeError::NonFiniteCoordinate { particle: i, axis });
            }
        }

        for (k, order) in self.order.iter_mut().enumerate() {
            order.clear();
            order.extend(0..n);
            order.sort_by(|&a, &b| particles.position(a)[k].total_cmp(&particles.position(b)[k]));
        }
        self.verify(particles)
    }

    /// Sorted permutation along `axis`.
    pub fn axis(&self, axis: usize) -> &[usize] {
        &self.order[axis]
    }

    fn verify(&self, particles: &ParticleSet<D>) -> Result<(), TreeError> {
        for (k, order) in self.order.iter().enumerate() {
            if order.len() != particles.n_total() {
                return Err(TreeError::StructuralInvariantViolation(format!(
                    "axis {} ordering holds {} of {} particles",
                    k,
                    order.len(),
                    particles.n_total()
                )));
            }
            if let Some(w) = order
                .windows(2)
                .position(|w| particles.position(w[1])[k] < particles.position(w[0])[k])
            {
                return Err(TreeError::StructuralInvariantViolation(format!(
                    "particle ordering broken on axis {} at position {}",
                    k,
                    w + 1
                )));
            }
        }
        Ok(())
    }
}
