use crate::models::BoundingBox;
use crate::neighbours::{CandidateBuffer, NeighbourSearch};
use crate::particles::ParticleSet;
use crate::tree::BinaryTree;
use crate::utils::TreeError;

impl<const D: usize> BinaryTree<D> {
    /// Leaf cells holding at least one active particle, in index order.
    pub fn active_leaves(&self) -> Vec<usize> {
        self.cells()
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_leaf() && cell.active_count > 0)
            .map(|(c, _)| c)
            .collect()
    }

    /// Active particles in the chain of leaf `c`.
    pub fn leaf_active_particles(&self, c: usize, particles: &ParticleSet<D>, out: &mut Vec<usize>) {
        out.clear();
        out.extend(self.leaf_particles(c).filter(|&i| particles.is_active(i)));
    }

    /// Every particle of every leaf whose box touches the sphere of `radius` around `center`.
    ///
    /// Subtrees whose box misses the sphere are skipped through `skip_next`; the result is a
    /// superset of the particles inside the sphere.
    pub fn gather_in_sphere(
        &self,
        center: &[f64; D],
        radius: f64,
        buffer: &mut CandidateBuffer,
    ) -> Result<(), TreeError> {
        self.walk(|bbox| bbox.intersects_sphere(center, radius), buffer)
    }

    /// Every particle of every leaf whose box overlaps `query`.
    pub fn gather_in_box(&self, query: &BoundingBox<D>, buffer: &mut CandidateBuffer) -> Result<(), TreeError> {
        self.walk(|bbox| bbox.intersects(query), buffer)
    }

    /// Bounding box and largest smoothing length of the active particles of leaf `c`.
    fn active_extent(&self, c: usize, particles: &ParticleSet<D>) -> Option<(BoundingBox<D>, f64)> {
        let mut extent = BoundingBox::empty();
        let mut h_max: f64 = 0.0;
        for i in self.leaf_particles(c).filter(|&i| particles.is_active(i)) {
            let p = particles.get(i);
            extent.include(&p.position);
            h_max = h_max.max(p.h);
        }
        if extent.is_empty() {
            None
        } else {
            Some((extent, h_max))
        }
    }

    fn walk<F>(&self, opens: F, buffer: &mut CandidateBuffer) -> Result<(), TreeError>
    where
        F: Fn(&BoundingBox<D>) -> bool,
    {
        buffer.clear();
        let cells = self.cells();
        let mut c = 0;
        while c < cells.len() {
            let cell = &cells[c];
            if cell.particle_count == 0 || !opens(&cell.bbox) {
                c = cell.skip_next;
                continue;
            }
            if cell.is_leaf() {
                for i in self.leaf_particles(c) {
                    buffer.push(i);
                }
            }
            c += 1;
        }
        buffer.finish()
    }
}

impl<const D: usize> NeighbourSearch<D> for BinaryTree<D> {
    fn active_cells(&self) -> Vec<usize> {
        self.active_leaves()
    }

    fn active_particles(&self, cell: usize, particles: &ParticleSet<D>, out: &mut Vec<usize>) {
        self.leaf_active_particles(cell, particles, out);
    }

    fn cell_candidates(
        &self,
        cell: usize,
        particles: &ParticleSet<D>,
        range_factor: f64,
        buffer: &mut CandidateBuffer,
    ) -> Result<(), TreeError> {
        match self.active_extent(cell, particles) {
            Some((query, h_max)) => self.gather_in_box(&query.padded(range_factor * h_max), buffer),
            None => {
                buffer.clear();
                Ok(())
            }
        }
    }

    fn pair_candidates(
        &self,
        cell: usize,
        particles: &ParticleSet<D>,
        range_factor: f64,
        h_bound: f64,
        buffer: &mut CandidateBuffer,
    ) -> Result<(), TreeError> {
        match self.active_extent(cell, particles) {
            Some((query, h_max)) => {
                self.gather_in_box(&query.padded(range_factor * h_max.max(h_bound)), buffer)
            }
            None => {
                buffer.clear();
                Ok(())
            }
        }
    }

    fn gather_candidates(
        &self,
        position: &[f64; D],
        radius: f64,
        buffer: &mut CandidateBuffer,
    ) -> Result<(), TreeError> {
        self.gather_in_sphere(position, radius, buffer)
    }
}
