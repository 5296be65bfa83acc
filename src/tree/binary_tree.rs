//! Level-complete weighted binary tree over a particle snapshot.
//!
//! The tree is rebuilt from scratch on every update: sizing, skeleton, per-axis ordering,
//! weighted loading and bottom-up stocking run back to back, each stage finishing before
//! the next starts. Between updates the tree is frozen and only answers queries.
//!
//! # Example
//!
//! ```
//! use rs_sph_tree::particles::{ParticleSet, SphParticle};
//! use rs_sph_tree::tree::BinaryTree;
//! use rs_sph_tree::utils::TreeConfig;
//!
//! let particles = ParticleSet::from_real(
//!     (0..8).map(|i| SphParticle::new([i as f64], 1.0, 0.5).unwrap()).collect(),
//! ).unwrap();
//!
//! let config = TreeConfig::new(Some(1), None, None, None, None);
//! let mut tree = BinaryTree::<1>::new(config).unwrap();
//! tree.update(&particles).unwrap();
//!
//! assert_eq!(tree.levels(), 3);
//! assert_eq!(tree.cell_count(), 15);
//! assert_eq!(tree.root().mass, 8.0);
//! ```
use crate::neighbours::ChainIter;
use crate::particles::ParticleSet;
use crate::tree::{
    build_topology, count_active, load_tree, stock_cells, uniform_weights, validate_weights,
    CoordinateOrder, LoaderScratch, NullObserver, TreeCell, TreeObserver, TreeSize, TreeSummary,
};
use crate::utils::{TreeConfig, TreeError};

/// Weighted binary tree plus the particle chains hanging off its leaves.
///
/// All buffers are owned by the tree and reused across rebuilds; they only grow when a
/// snapshot needs more room than the previous one.
#[derive(Debug, Clone)]
pub struct BinaryTree<const D: usize> {
    config: TreeConfig,
    size: TreeSize,
    n_real: usize,
    cells: Vec<TreeCell<D>>,
    /// Leaf id -> cell index.
    leaf_cells: Vec<usize>,
    /// Particle chain links, one per particle.
    next: Vec<Option<usize>>,
    /// Final leaf of every particle.
    particle_cell: Vec<usize>,
    order: CoordinateOrder<D>,
    weights: Vec<f64>,
    scratch: LoaderScratch,
}

impl<const D: usize> BinaryTree<D> {
    /// Creates an empty tree (a single empty leaf).
    ///
    /// # Errors
    ///
    /// Returns an error for an unsupported dimension or an invalid configuration.
    pub fn new(config: TreeConfig) -> Result<Self, TreeError> {
        if !(1..=3).contains(&D) {
            return Err(TreeError::InvalidDimension(D));
        }
        config.validate()?;
        let size = TreeSize::estimate(0, config.leaf_capacity)?;
        let mut tree = Self {
            config,
            size,
            n_real: 0,
            cells: Vec::new(),
            leaf_cells: Vec::new(),
            next: Vec::new(),
            particle_cell: Vec::new(),
            order: CoordinateOrder::default(),
            weights: Vec::new(),
            scratch: LoaderScratch::default(),
        };
        build_topology(&tree.size, &mut tree.cells, &mut tree.leaf_cells)?;
        Ok(tree)
    }

    /// Rebuilds the tree from `particles` with uniform load-balancing weights.
    pub fn update(&mut self, particles: &ParticleSet<D>) -> Result<(), TreeError> {
        self.update_observed(particles, &mut NullObserver)
    }

    /// Rebuilds the tree, reporting to `observer` after loading and after stocking.
    pub fn update_observed(
        &mut self,
        particles: &ParticleSet<D>,
        observer: &mut dyn TreeObserver<D>,
    ) -> Result<(), TreeError> {
        uniform_weights(particles.n_total(), &mut self.weights);
        self.rebuild(particles, observer)
    }

    /// Rebuilds the tree with caller-supplied per-particle weights (any positive scale).
    pub fn update_weighted(
        &mut self,
        particles: &ParticleSet<D>,
        weights: &[f64],
        observer: &mut dyn TreeObserver<D>,
    ) -> Result<(), TreeError> {
        validate_weights(weights, particles.n_total())?;
        let total: f64 = weights.iter().sum();
        self.weights.clear();
        self.weights.extend(weights.iter().map(|w| if total > 0.0 { w / total } else { 0.0 }));
        self.rebuild(particles, observer)
    }

    fn rebuild(&mut self, particles: &ParticleSet<D>, observer: &mut dyn TreeObserver<D>) -> Result<(), TreeError> {
        let n_total = particles.n_total();
        self.size = TreeSize::estimate(n_total, self.config.leaf_capacity)?;
        self.n_real = particles.n_real();

        build_topology(&self.size, &mut self.cells, &mut self.leaf_cells)?;
        self.order.compute(particles)?;
        load_tree(
            &self.size,
            &mut self.cells,
            &self.order,
            &self.weights,
            &mut self.particle_cell,
            &mut self.next,
            &mut self.scratch,
        )?;
        observer.on_build(&self.summary());

        stock_cells(&mut self.cells, &self.next, particles, self.config.opening_factor())?;
        if self.cells[0].particle_count != n_total {
            return Err(TreeError::StructuralInvariantViolation(format!(
                "leaf chains hold {} of {} particles",
                self.cells[0].particle_count, n_total
            )));
        }
        observer.on_stock(self);
        Ok(())
    }

    /// Recounts active particles per cell after the caller changed active flags.
    pub fn update_active_counters(&mut self, particles: &ParticleSet<D>) {
        count_active(&mut self.cells, &self.next, particles);
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn size(&self) -> &TreeSize {
        &self.size
    }

    pub fn levels(&self) -> usize {
        self.size.levels
    }

    pub fn leaf_count(&self) -> usize {
        self.size.leaf_count
    }

    pub fn cell_count(&self) -> usize {
        self.size.cell_count
    }

    pub fn particle_capacity(&self) -> usize {
        self.size.particle_capacity
    }

    pub fn cells(&self) -> &[TreeCell<D>] {
        &self.cells
    }

    pub fn cell(&self, c: usize) -> &TreeCell<D> {
        &self.cells[c]
    }

    pub fn root(&self) -> &TreeCell<D> {
        &self.cells[0]
    }

    /// Cell index of leaf `grid_id`.
    pub fn leaf_cell(&self, grid_id: usize) -> usize {
        self.leaf_cells[grid_id]
    }

    /// Leaf cell that holds particle `i` after the last update.
    pub fn particle_leaf(&self, i: usize) -> usize {
        self.particle_cell[i]
    }

    /// Particles of leaf cell `c`, in chain order.
    pub fn leaf_particles(&self, c: usize) -> ChainIter<'_> {
        ChainIter::new(self.cells[c].particle_head, &self.next)
    }

    pub fn summary(&self) -> TreeSummary {
        let max_leaf_occupancy = self
            .leaf_cells
            .iter()
            .map(|&c| self.cells[c].particle_count)
            .max()
            .unwrap_or(0);
        TreeSummary {
            n_total: self.next.len(),
            n_real: self.n_real,
            levels: self.size.levels,
            leaf_count: self.size.leaf_count,
            cell_count: self.size.cell_count,
            particle_capacity: self.size.particle_capacity,
            max_leaf_occupancy,
        }
    }
}
