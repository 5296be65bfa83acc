use crate::models::BoundingBox;

/// One cell of the flat binary-tree arena.
///
/// Links are plain indices into the arena: the first child of an internal cell is always
/// the next slot, the second child is `second_child`, and `skip_next` is the cell to visit
/// when this cell is not opened. Children always have larger indices than their parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeCell<const D: usize> {
    /// Depth from the root (root = 0).
    pub level: usize,
    /// Index of the second child; `None` for leaves.
    pub second_child: Option<usize>,
    /// Next cell in a depth-first walk that skips this cell's subtree.
    pub skip_next: usize,
    /// Sequential leaf id; `None` for internal cells.
    pub grid_id: Option<usize>,
    /// First particle of the leaf chain; `None` for empty leaves and internal cells.
    pub particle_head: Option<usize>,
    /// Particles in this cell's subtree.
    pub particle_count: usize,
    /// Active particles in this cell's subtree.
    pub active_count: usize,
    pub mass: f64,
    /// Mass-weighted centroid (bounding-box centre for zero-mass cells).
    pub centroid: [f64; D],
    pub bbox: BoundingBox<D>,
    /// Multipole-acceptance threshold `‖bbox.max - bbox.min‖² / θ²`.
    pub opening_distance: f64,
}

impl<const D: usize> Default for TreeCell<D> {
    fn default() -> Self {
        Self {
            level: 0,
            second_child: None,
            skip_next: 0,
            grid_id: None,
            particle_head: None,
            particle_count: 0,
            active_count: 0,
            mass: 0.0,
            centroid: [0.0; D],
            bbox: BoundingBox::empty(),
            opening_distance: 0.0,
        }
    }
}

impl<const D: usize> TreeCell<D> {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.second_child.is_none()
    }

    /// Clears everything the loader and the stocker fill in, keeping the topology.
    pub(crate) fn reset_contents(&mut self) {
        self.particle_head = None;
        self.particle_count = 0;
        self.active_count = 0;
        self.mass = 0.0;
        self.centroid = [0.0; D];
        self.bbox = BoundingBox::empty();
        self.opening_distance = 0.0;
    }
}
