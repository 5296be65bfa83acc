use crate::density::SphKernel;
use crate::driver::{DensitySolver, GatherNeighbours};
use crate::particles::SphParticle;
use crate::utils::{DensityConfig, TreeError, SMALL_NUMBER};

/// Grad-h density and smoothing-length solver.
///
/// Iterates `h = h_fac (m/ρ)^(1/D)` to self-consistency. Plain fixed-point iteration runs
/// for `iteration_max` steps; if it has not settled by then the solver bisects between zero
/// and the largest `h` the gathered neighbour list can support, for up to
/// `5 * iteration_max` steps in total.
#[derive(Debug, Clone)]
pub struct GradhSolver<K: SphKernel> {
    kernel: K,
    config: DensityConfig,
}

impl<K: SphKernel> GradhSolver<K> {
    pub fn new(kernel: K, config: DensityConfig) -> Result<Self, TreeError> {
        config.validate()?;
        Ok(Self { kernel, config })
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn config(&self) -> &DensityConfig {
        &self.config
    }

    /// Density and `Σ m_j h^-(D+1) womega(s_j)` at smoothing length `h`.
    fn sums(&self, h: f64, dim: i32, neighbours: &GatherNeighbours<'_>) -> (f64, f64) {
        let invh = 1.0 / h;
        let hfactor = invh.powi(dim);
        let invhsqd = invh * invh;
        let mut rho = 0.0;
        let mut omega = 0.0;
        for (m, dr2) in neighbours.masses.iter().zip(neighbours.distances_squared) {
            let s = (dr2 * invhsqd).sqrt();
            rho += m * hfactor * self.kernel.w0(s);
            omega += m * hfactor * invh * self.kernel.womega(s);
        }
        (rho, omega)
    }
}

impl<const D: usize, K: SphKernel> DensitySolver<D> for GradhSolver<K> {
    fn solve(
        &self,
        index: usize,
        neighbours: &GatherNeighbours<'_>,
        particle: &mut SphParticle<D>,
    ) -> Result<(), TreeError> {
        if self.kernel.dimension() != D {
            return Err(TreeError::InvalidConfig(format!(
                "{}-dimensional kernel used for {}-dimensional particles",
                self.kernel.dimension(),
                D
            )));
        }
        let dim = D as i32;
        let invdim = 1.0 / D as f64;
        let h_fac = self.config.h_fac;
        let iteration_max = self.config.iteration_max;
        let h_max = neighbours.range_squared.sqrt() / self.kernel.range();
        let target = |rho: f64| h_fac * (particle.mass / rho.max(SMALL_NUMBER)).powf(invdim);

        let mut h = particle.h.min(h_max);
        let mut lower = 0.0;
        let mut upper = h_max;
        let mut iteration = 0;
        let (rho, omega) = loop {
            iteration += 1;
            let (rho, omega) = self.sums(h, dim, neighbours);

            if rho > 0.0 && h > lower && (h - target(rho)).abs() < self.config.h_converge * h {
                break (rho, omega);
            }

            if iteration < iteration_max {
                h = target(rho);
            } else if iteration == iteration_max {
                h = 0.5 * (lower + upper);
            } else if iteration < 5 * iteration_max {
                if rho < SMALL_NUMBER || rho * h.powi(dim) > h_fac.powi(dim) * particle.mass {
                    upper = h;
                } else {
                    lower = h;
                }
                h = 0.5 * (lower + upper);
            } else {
                return Err(TreeError::NonConvergence { particle: index, iterations: iteration });
            }

            if h > h_max {
                return Err(TreeError::SmoothingLengthCeiling { particle: index, h, h_max });
            }
        };

        let h = target(rho);
        if h > h_max {
            return Err(TreeError::SmoothingLengthCeiling { particle: index, h, h_max });
        }
        particle.h = h;
        particle.invh = 1.0 / h;
        particle.rho = rho;
        particle.invrho = 1.0 / rho;
        particle.hfactor = particle.invh.powi(dim);
        particle.invomega = 1.0 / (1.0 + invdim * h * omega / rho);
        Ok(())
    }
}
