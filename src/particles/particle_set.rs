//! Snapshot of all particles taking part in one rebuild cycle.
//!
//! Real particles occupy indices `[0, n_real)`; ghost particles (boundary images created by
//! an external collaborator) occupy `[n_real, n_total)`. Ghosts are searched like any other
//! particle but are never active.
use crate::models::BoundingBox;
use crate::particles::SphParticle;
use crate::utils::TreeError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Particle store consumed by the tree, the grid and the property driver.
#[derive(Debug, Clone, Default)]
pub struct ParticleSet<const D: usize> {
    particles: Vec<SphParticle<D>>,
    n_real: usize,
}

impl<const D: usize> ParticleSet<D> {
    /// Creates a set from real particles followed by ghosts.
    ///
    /// Ghosts are forced inactive.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidDimension`] unless `D` is 1, 2 or 3, and the first
    /// validation error of any particle.
    ///
    /// # Examples
    ///
    /// ```
    /// use rs_sph_tree::particles::{ParticleSet, SphParticle};
    ///
    /// let real = vec![SphParticle::new([0.0], 1.0, 0.5).unwrap()];
    /// let ghosts = vec![SphParticle::new([-0.2], 1.0, 0.5).unwrap()];
    /// let set = ParticleSet::new(real, ghosts).unwrap();
    ///
    /// assert_eq!(set.n_total(), 2);
    /// assert_eq!(set.n_real(), 1);
    /// assert!(set.is_ghost(1));
    /// assert!(!set.get(1).active);
    /// ```
    pub fn new(real: Vec<SphParticle<D>>, ghosts: Vec<SphParticle<D>>) -> Result<Self, TreeError> {
        if !(1..=3).contains(&D) {
            return Err(TreeError::InvalidDimension(D));
        }
        let n_real = real.len();
        let mut particles = real;
        particles.extend(ghosts.into_iter().map(|g| g.with_active(false)));
        for (i, p) in particles.iter().enumerate() {
            p.validate(i)?;
        }
        Ok(Self { particles, n_real })
    }

    /// Creates a set without ghosts.
    pub fn from_real(real: Vec<SphParticle<D>>) -> Result<Self, TreeError> {
        Self::new(real, Vec::new())
    }

    /// Seeded cloud of `n` equal-mass particles spread uniformly over `bounds`.
    ///
    /// Total mass is 1 and every particle starts with smoothing length `h`.
    pub fn uniform_random(n: usize, bounds: &BoundingBox<D>, h: f64, seed: u64) -> Result<Self, TreeError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mass = if n > 0 { 1.0 / n as f64 } else { 0.0 };
        let particles = (0..n)
            .map(|_| {
                let position: [f64; D] = std::array::from_fn(|k| {
                    if bounds.max[k] > bounds.min[k] {
                        rng.random_range(bounds.min[k]..bounds.max[k])
                    } else {
                        bounds.min[k]
                    }
                });
                SphParticle::new(position, mass, h)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_real(particles)
    }

    pub fn n_total(&self) -> usize {
        self.particles.len()
    }

    pub fn n_real(&self) -> usize {
        self.n_real
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn is_ghost(&self, index: usize) -> bool {
        index >= self.n_real
    }

    /// Only real particles can be active.
    #[inline]
    pub fn is_active(&self, index: usize) -> bool {
        index < self.n_real && self.particles[index].active
    }

    #[inline]
    pub fn get(&self, index: usize) -> &SphParticle<D> {
        &self.particles[index]
    }

    #[inline]
    pub fn position(&self, index: usize) -> &[f64; D] {
        &self.particles[index].position
    }

    pub fn as_slice(&self) -> &[SphParticle<D>] {
        &self.particles
    }

    /// Mutable access for the property driver and for callers advancing the state
    /// between rebuilds.
    pub fn as_mut_slice(&mut self) -> &mut [SphParticle<D>] {
        &mut self.particles
    }

    pub fn set_active(&mut self, index: usize, active: bool) {
        self.particles[index].active = active && index < self.n_real;
    }

    pub fn positions(&self) -> impl Iterator<Item = &[f64; D]> + '_ {
        self.particles.iter().map(|p| &p.position)
    }

    pub fn total_mass(&self) -> f64 {
        self.particles.iter().map(|p| p.mass).sum()
    }

    /// Largest smoothing length over all particles, ghosts included.
    pub fn max_smoothing_length(&self) -> f64 {
        self.particles.iter().map(|p| p.h).fold(0.0, f64::max)
    }

    pub fn bounding_box(&self) -> BoundingBox<D> {
        BoundingBox::from_points(self.positions())
    }

    /// Re-checks every particle, e.g. after the caller moved them.
    pub fn validate(&self) -> Result<(), TreeError> {
        for (i, p) in self.particles.iter().enumerate() {
            p.validate(i)?;
        }
        Ok(())
    }
}
