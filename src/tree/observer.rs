use log::{debug, info, trace};
use crate::tree::BinaryTree;

/// Headline numbers of a finished rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeSummary {
    pub n_total: usize,
    pub n_real: usize,
    pub levels: usize,
    pub leaf_count: usize,
    pub cell_count: usize,
    pub particle_capacity: usize,
    /// Largest number of particles found in a single leaf.
    pub max_leaf_occupancy: usize,
}

/// Checkpoint hooks invoked by [`BinaryTree::update_observed`].
///
/// Both hooks default to doing nothing; the tree never depends on what they do.
pub trait TreeObserver<const D: usize> {
    /// Called once the skeleton is built and the particles are loaded.
    fn on_build(&mut self, _summary: &TreeSummary) {}

    /// Called once every cell is stocked.
    fn on_stock(&mut self, _tree: &BinaryTree<D>) {}
}

/// Observer that ignores every checkpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl<const D: usize> TreeObserver<D> for NullObserver {}

/// Observer reporting through the `log` facade.
///
/// Build numbers go to `info`, the root cell to `debug`, and with `per_cell` every cell's
/// mass and box to `trace`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver {
    pub per_cell: bool,
}

impl<const D: usize> TreeObserver<D> for LogObserver {
    fn on_build(&mut self, summary: &TreeSummary) {
        info!(
            "Tree built: {} particles ({} real), {} levels, {} cells, {} leaves, capacity {}, fullest leaf {}",
            summary.n_total,
            summary.n_real,
            summary.levels,
            summary.cell_count,
            summary.leaf_count,
            summary.particle_capacity,
            summary.max_leaf_occupancy
        );
    }

    fn on_stock(&mut self, tree: &BinaryTree<D>) {
        let root = tree.root();
        debug!(
            "Root cell: mass {}, centroid {:?}, bbox {:?} .. {:?}",
            root.mass, root.centroid, root.bbox.min, root.bbox.max
        );
        if self.per_cell {
            for (c, cell) in tree.cells().iter().enumerate() {
                trace!(
                    "cell {} level {} mass {} bbox {:?} .. {:?} opening {}",
                    c, cell.level, cell.mass, cell.bbox.min, cell.bbox.max, cell.opening_distance
                );
            }
        }
    }
}
