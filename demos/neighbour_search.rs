// demos/neighbour_search.rs
//
// Run with `RUST_LOG=debug cargo run --example neighbour_search` to see the tree checkpoints.

use rs_sph_tree::density::{GradhSolver, M4Kernel, SphKernel};
use rs_sph_tree::driver::{accumulate_pairwise, update_all_properties};
use rs_sph_tree::grid::UniformGrid;
use rs_sph_tree::models::BoundingBox;
use rs_sph_tree::particles::{ParticleSet, SphParticle};
use rs_sph_tree::tree::{BinaryTree, LogObserver};
use rs_sph_tree::utils::{DensityConfig, TreeConfig, TreeError};

fn main() -> Result<(), TreeError> {
    env_logger::init();

    // Unit square of gas with a row of ghost particles mirrored below y = 0.
    let n = 4_000;
    let bounds = BoundingBox::new([0.0, 0.0], [1.0, 1.0]);
    let h = 1.2 * (1.0 / n as f64).sqrt();
    let real = ParticleSet::uniform_random(n, &bounds, h, 7)?;
    let ghosts: Vec<SphParticle<2>> = real
        .as_slice()
        .iter()
        .filter(|p| p.position[1] < 4.0 * h)
        .map(|p| {
            let mut ghost = *p;
            ghost.position[1] = -p.position[1];
            ghost
        })
        .collect();
    let mut particles = ParticleSet::new(real.as_slice().to_vec(), ghosts)?;
    println!("{} real and {} ghost particles", particles.n_real(), particles.n_total() - particles.n_real());

    let config = TreeConfig::new(Some(8), Some(0.6), Some(1.2), Some(256), None);
    let kernel = M4Kernel::new(2)?;
    let kernel_range = kernel.range();
    let solver = GradhSolver::new(kernel, DensityConfig::default())?;

    let mut tree = BinaryTree::new(config)?;
    tree.update_observed(&particles, &mut LogObserver { per_cell: false })?;
    println!(
        "Tree: {} levels, {} cells, root mass {:.4}, root opening distance {:.4}",
        tree.levels(),
        tree.cell_count(),
        tree.root().mass,
        tree.root().opening_distance
    );

    let report = update_all_properties(&tree, &mut particles, &solver, kernel_range, &config)?;
    println!("Tree pass: {:?}", report);

    let interior: Vec<f64> = (0..particles.n_real())
        .map(|i| particles.get(i))
        .filter(|p| p.position.iter().all(|&x| x > 0.1 && x < 0.9))
        .map(|p| p.rho)
        .collect();
    let mean = interior.iter().sum::<f64>() / interior.len().max(1) as f64;
    println!("Mean interior density: {:.4} over {} particles", mean, interior.len());

    // Same pass through the bucket grid, starting from the converged smoothing lengths.
    let grid = UniformGrid::for_kernel(&particles, &config, kernel_range)?;
    let report = update_all_properties(&grid, &mut particles, &solver, kernel_range, &config)?;
    println!("Grid pass ({:?} cells): {:?}", grid.dims(), report);

    let counts = accumulate_pairwise(&grid, &particles, config.gather_tolerance * kernel_range, 256, |_, _, _| (1.0, 1.0))?;
    let mean_neighbours = counts[..particles.n_real()].iter().sum::<f64>() / particles.n_real() as f64;
    println!("Mean neighbour count: {:.2}", mean_neighbours);

    Ok(())
}
