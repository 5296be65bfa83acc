use std::f64::consts::PI;

use approx::assert_relative_eq;

use crate::density::{GradhSolver, M4Kernel, QuinticKernel, SphKernel};
use crate::driver::{update_all_properties, DensitySolver, GatherNeighbours};
use crate::grid::UniformGrid;
use crate::particles::{ParticleSet, SphParticle};
use crate::tree::BinaryTree;
use crate::utils::{DensityConfig, TreeConfig, TreeError};

/// Midpoint-rule integral of the kernel over `D`-dimensional space.
fn integrate(kernel: &dyn SphKernel) -> f64 {
    let steps = 100_000;
    let ds = kernel.range() / steps as f64;
    (0..steps)
        .map(|k| {
            let s = (k as f64 + 0.5) * ds;
            let shell = match kernel.dimension() {
                1 => 2.0,
                2 => 2.0 * PI * s,
                _ => 4.0 * PI * s * s,
            };
            shell * kernel.w0(s) * ds
        })
        .sum()
}

#[test]
fn test_kernels_are_normalised() {
    for dimension in 1..=3 {
        assert_relative_eq!(integrate(&M4Kernel::new(dimension).unwrap()), 1.0, epsilon = 1e-6);
        assert_relative_eq!(integrate(&QuinticKernel::new(dimension).unwrap()), 1.0, epsilon = 1e-6);
    }
}

#[test]
fn test_quintic_central_values() {
    // w0(0) = norm * (3^5 - 6 * 2^5 + 15) = 66 * norm.
    assert_relative_eq!(QuinticKernel::new(1).unwrap().w0(0.0), 66.0 / 120.0, epsilon = 1e-15);
    assert_relative_eq!(QuinticKernel::new(2).unwrap().w0(0.0), 66.0 * 7.0 / (478.0 * PI), epsilon = 1e-15);
    assert_relative_eq!(QuinticKernel::new(3).unwrap().w0(0.0), 66.0 / (120.0 * PI), epsilon = 1e-15);
}

#[test]
fn test_kernel_derivatives() {
    let kernels: Vec<Box<dyn SphKernel>> = vec![
        Box::new(M4Kernel::new(2).unwrap()),
        Box::new(QuinticKernel::new(3).unwrap()),
    ];
    let eps = 1e-6;
    for kernel in &kernels {
        for s in [0.3, 0.7, 1.4, 1.8, 2.5] {
            let numeric = (kernel.w0(s + eps) - kernel.w0(s - eps)) / (2.0 * eps);
            assert_relative_eq!(kernel.w1(s), numeric, epsilon = 1e-6);
        }
        assert_eq!(kernel.w0(kernel.range()), 0.0);
        assert_eq!(kernel.w1(kernel.range() + 0.1), 0.0);
        let s = 0.4;
        let expected = -(kernel.dimension() as f64 * kernel.w0(s) + s * kernel.w1(s));
        assert_eq!(kernel.womega(s), expected);
    }
}

#[test]
fn test_kernel_rejects_bad_dimension() {
    assert_eq!(M4Kernel::new(0), Err(TreeError::InvalidDimension(0)));
    assert_eq!(QuinticKernel::new(4), Err(TreeError::InvalidDimension(4)));
}

#[test]
fn test_uniform_line_has_unit_density() {
    let n = 101;
    let dx = 0.01;
    let mut particles = ParticleSet::from_real(
        (0..n).map(|i| SphParticle::new([i as f64 * dx], 0.01, 0.015).unwrap()).collect(),
    )
    .unwrap();
    let config = TreeConfig::new(Some(4), None, Some(1.2), None, None);
    let mut tree = BinaryTree::new(config).unwrap();
    tree.update(&particles).unwrap();

    let kernel = M4Kernel::new(1).unwrap();
    let range = kernel.range();
    let solver = GradhSolver::new(kernel, DensityConfig::default()).unwrap();
    let report = update_all_properties(&tree, &mut particles, &solver, range, &config).unwrap();
    assert_eq!(report.updated + report.unconverged.len(), n);

    for i in 10..=90 {
        let p = particles.get(i);
        assert_relative_eq!(p.rho, 1.0, epsilon = 1e-2);
        assert_relative_eq!(p.h, 1.2 * dx, max_relative = 2e-2);
        assert_relative_eq!(p.invrho * p.rho, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.hfactor * p.h, 1.0, epsilon = 1e-9);
        assert!(p.invomega > 0.0 && p.invomega.is_finite());
    }
}

#[test]
fn test_uniform_plane_with_quintic_kernel() {
    let side = 21;
    let dx = 0.05;
    let real = (0..side * side)
        .map(|k| {
            let (x, y) = ((k % side) as f64 * dx, (k / side) as f64 * dx);
            SphParticle::new([x, y], dx * dx, 1.2 * dx).unwrap()
        })
        .collect();
    let mut particles = ParticleSet::from_real(real).unwrap();

    let config = TreeConfig::new(None, None, Some(1.2), None, None);
    let kernel = QuinticKernel::new(2).unwrap();
    let range = kernel.range();
    let grid = UniformGrid::for_kernel(&particles, &config, range).unwrap();
    let solver = GradhSolver::new(kernel, DensityConfig::default()).unwrap();
    update_all_properties(&grid, &mut particles, &solver, range, &config).unwrap();

    for y in 6..15 {
        for x in 6..15 {
            let p = particles.get(y * side + x);
            assert_relative_eq!(p.rho, 1.0, epsilon = 2e-2);
        }
    }
}

#[test]
fn test_isolated_particle_hits_the_ceiling() {
    let solver = GradhSolver::new(M4Kernel::new(1).unwrap(), DensityConfig::default()).unwrap();
    let mut particle = SphParticle::new([0.0], 1.0, 0.1).unwrap();
    let neighbours = GatherNeighbours {
        masses: &[1.0],
        mass_energy: &[0.0],
        distances_squared: &[0.0],
        range_squared: 0.04,
    };
    let result = solver.solve(7, &neighbours, &mut particle);
    assert!(matches!(result, Err(TreeError::SmoothingLengthCeiling { particle: 7, .. })));
    assert!(result.unwrap_err().is_recoverable());
    // A failed solve leaves the outputs alone.
    assert_eq!(particle.rho, 0.0);
}

#[test]
fn test_bisection_gives_up() {
    let config = DensityConfig::new(None, Some(1e-12), Some(1));
    let solver = GradhSolver::new(M4Kernel::new(1).unwrap(), config).unwrap();
    let mut particle = SphParticle::new([0.0], 0.01, 0.012).unwrap();
    let neighbours = GatherNeighbours {
        masses: &[0.01; 5],
        mass_energy: &[0.0; 5],
        distances_squared: &[0.0, 1e-4, 1e-4, 4e-4, 4e-4],
        range_squared: 0.036 * 0.036,
    };
    assert_eq!(
        solver.solve(0, &neighbours, &mut particle),
        Err(TreeError::NonConvergence { particle: 0, iterations: 5 })
    );
}

#[test]
fn test_dimension_mismatch_is_rejected() {
    let solver = GradhSolver::new(M4Kernel::new(2).unwrap(), DensityConfig::default()).unwrap();
    let mut particle = SphParticle::new([0.0], 1.0, 0.1).unwrap();
    let neighbours = GatherNeighbours {
        masses: &[1.0],
        mass_energy: &[0.0],
        distances_squared: &[0.0],
        range_squared: 1.0,
    };
    assert!(matches!(
        solver.solve(0, &neighbours, &mut particle),
        Err(TreeError::InvalidConfig(_))
    ));
}

#[test]
fn test_invalid_density_config() {
    let config = DensityConfig::new(Some(-1.0), None, None);
    assert!(GradhSolver::new(M4Kernel::new(1).unwrap(), config).is_err());
}
