//! Uniform Cartesian bucket grid for adjacency-based neighbour searches.
//!
//! The grid covers the bounding box of the particle snapshot with cubic cells of a fixed
//! spacing. Every cell owns a singly linked chain of the particles it contains, built in
//! ascending particle index order. Cells are addressed by a coordinate tuple or by the
//! linear id `x + y*Nx + z*Nx*Ny`.
use smallvec::SmallVec;

use crate::models::BoundingBox;
use crate::neighbours::{CandidateBuffer, ChainIter, NeighbourSearch};
use crate::particles::ParticleSet;
use crate::utils::{TreeConfig, TreeError, MAX_GRID_CELLS};

/// Cell ids returned by [`UniformGrid::adjacent_cells`]; 27 covers a radius-1 block in 3D.
pub type AdjacentCells = SmallVec<[usize; 27]>;

/// Chain bookkeeping of one grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridCell {
    pub head: Option<usize>,
    pub tail: Option<usize>,
    pub particle_count: usize,
    pub active_count: usize,
}

#[derive(Debug, Clone)]
pub struct UniformGrid<const D: usize> {
    origin: [f64; D],
    spacing: f64,
    dims: [usize; D],
    cells: Vec<GridCell>,
    next: Vec<Option<usize>>,
    particle_cell: Vec<usize>,
}

impl<const D: usize> Default for UniformGrid<D> {
    fn default() -> Self {
        Self {
            origin: [0.0; D],
            spacing: 1.0,
            dims: [1; D],
            cells: vec![GridCell::default()],
            next: Vec::new(),
            particle_cell: Vec::new(),
        }
    }
}

impl<const D: usize> UniformGrid<D> {
    /// Builds a grid of cells `spacing` wide over `particles`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rs_sph_tree::grid::UniformGrid;
    /// use rs_sph_tree::particles::{ParticleSet, SphParticle};
    ///
    /// let particles = ParticleSet::from_real(
    ///     (0..10).map(|i| SphParticle::new([0.1 * i as f64, 0.0], 1.0, 0.1).unwrap()).collect(),
    /// ).unwrap();
    /// let grid = UniformGrid::build(&particles, 0.25).unwrap();
    ///
    /// assert_eq!(grid.dims(), [4, 1]);
    /// assert_eq!(grid.cell_of_position(&[0.55, 0.0]), [2, 0]);
    /// assert_eq!(grid.adjacent_cells(0, 1).as_slice(), &[0, 1]);
    /// ```
    pub fn build(particles: &ParticleSet<D>, spacing: f64) -> Result<Self, TreeError> {
        let mut grid = Self::default();
        grid.rebuild(particles, spacing)?;
        Ok(grid)
    }

    /// Builds a grid whose spacing is one gather radius of the largest particle,
    /// `gather_tolerance * kernel_range * h_max`.
    pub fn for_kernel(particles: &ParticleSet<D>, config: &TreeConfig, kernel_range: f64) -> Result<Self, TreeError> {
        Self::build(particles, Self::kernel_spacing(particles, config, kernel_range))
    }

    pub fn kernel_spacing(particles: &ParticleSet<D>, config: &TreeConfig, kernel_range: f64) -> f64 {
        if particles.is_empty() {
            return 1.0;
        }
        config.gather_tolerance * kernel_range * particles.max_smoothing_length()
    }

    /// Rebuilds the grid for a new snapshot, reusing the existing allocations.
    ///
    /// # Errors
    ///
    /// [`TreeError::InvalidConfig`] for a non-positive spacing or one that would need more
    /// than [`MAX_GRID_CELLS`] cells, [`TreeError::NonFiniteCoordinate`] for a particle
    /// that cannot be placed.
    pub fn rebuild(&mut self, particles: &ParticleSet<D>, spacing: f64) -> Result<(), TreeError> {
        if !(1..=3).contains(&D) {
            return Err(TreeError::InvalidDimension(D));
        }
        if !(spacing.is_finite() && spacing > 0.0) {
            return Err(TreeError::InvalidConfig(format!("grid spacing must be positive, got {}", spacing)));
        }
        for i in 0..particles.n_total() {
            let r = particles.position(i);
            if let Some(axis) = (0..D).find(|&k| !r[k].is_finite()) {
                return Err(TreeError::NonFiniteCoordinate { particle: i, axis });
            }
        }

        let bbox = particles.bounding_box();
        let mut dims = [1usize; D];
        let mut cell_total = 1usize;
        if !bbox.is_empty() {
            for k in 0..D {
                let span = ((bbox.max[k] - bbox.min[k]) / spacing).ceil();
                if span > MAX_GRID_CELLS as f64 {
                    return Err(TreeError::InvalidConfig(format!(
                        "grid spacing {} needs {} cells along axis {}",
                        spacing, span, k
                    )));
                }
                dims[k] = (span as usize).max(1);
                cell_total = cell_total
                    .checked_mul(dims[k])
                    .filter(|&total| total <= MAX_GRID_CELLS)
                    .ok_or_else(|| {
                        TreeError::InvalidConfig(format!("grid spacing {} needs more than {} cells", spacing, MAX_GRID_CELLS))
                    })?;
            }
        }

        self.origin = if bbox.is_empty() { [0.0; D] } else { bbox.min };
        self.spacing = spacing;
        self.dims = dims;
        self.cells.clear();
        self.cells.resize(cell_total, GridCell::default());

        let n = particles.n_total();
        self.next.clear();
        self.next.resize(n, None);
        self.particle_cell.clear();
        self.particle_cell.reserve(n);

        for i in 0..n {
            let id = self.cell_id(&self.cell_of_position(particles.position(i)));
            let cell = &mut self.cells[id];
            match cell.tail {
                None => cell.head = Some(i),
                Some(tail) => self.next[tail] = Some(i),
            }
            cell.tail = Some(i);
            cell.particle_count += 1;
            if particles.is_active(i) {
                cell.active_count += 1;
            }
            self.particle_cell.push(id);
        }
        Ok(())
    }

    /// Recounts active particles per cell after the caller changed active flags.
    pub fn update_active_counters(&mut self, particles: &ParticleSet<D>) {
        for cell in &mut self.cells {
            cell.active_count = ChainIter::new(cell.head, &self.next)
                .filter(|&i| particles.is_active(i))
                .count();
        }
    }

    pub fn origin(&self) -> [f64; D] {
        self.origin
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Number of cells along each axis.
    pub fn dims(&self) -> [usize; D] {
        self.dims
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cell(&self, id: usize) -> &GridCell {
        &self.cells[id]
    }

    /// Grid cell holding particle `i`.
    pub fn particle_cell(&self, i: usize) -> usize {
        self.particle_cell[i]
    }

    pub fn cell_particles(&self, id: usize) -> ChainIter<'_> {
        ChainIter::new(self.cells[id].head, &self.next)
    }

    /// Cell coordinate of `position`, clamped into the grid. Points on the upper face of the
    /// particle box land in the last cell.
    pub fn cell_of_position(&self, position: &[f64; D]) -> [usize; D] {
        std::array::from_fn(|k| {
            let offset = ((position[k] - self.origin[k]) / self.spacing).floor();
            if offset <= 0.0 {
                0
            } else {
                (offset as usize).min(self.dims[k] - 1)
            }
        })
    }

    pub fn cell_id(&self, coordinate: &[usize; D]) -> usize {
        let mut id = 0;
        let mut stride = 1;
        for k in 0..D {
            id += coordinate[k] * stride;
            stride *= self.dims[k];
        }
        id
    }

    pub fn cell_coordinate(&self, id: usize) -> [usize; D] {
        let mut rest = id;
        std::array::from_fn(|k| {
            let c = rest % self.dims[k];
            rest /= self.dims[k];
            c
        })
    }

    /// Region covered by cell `id`.
    pub fn cell_bounds(&self, id: usize) -> BoundingBox<D> {
        let coordinate = self.cell_coordinate(id);
        BoundingBox::new(
            std::array::from_fn(|k| self.origin[k] + coordinate[k] as f64 * self.spacing),
            std::array::from_fn(|k| self.origin[k] + (coordinate[k] + 1) as f64 * self.spacing),
        )
    }

    /// Ids of every cell within Chebyshev distance `radius` of cell `id`, clipped to the
    /// grid, in ascending order. Includes `id` itself.
    pub fn adjacent_cells(&self, id: usize, radius: usize) -> AdjacentCells {
        let centre = self.cell_coordinate(id);
        let lo: [usize; D] = std::array::from_fn(|k| centre[k].saturating_sub(radius));
        let hi: [usize; D] = std::array::from_fn(|k| centre[k].saturating_add(radius).min(self.dims[k] - 1));

        let mut out = AdjacentCells::new();
        let mut coordinate = lo;
        loop {
            out.push(self.cell_id(&coordinate));
            // Odometer over the block, axis 0 fastest.
            let mut k = 0;
            loop {
                if k == D {
                    return out;
                }
                if coordinate[k] < hi[k] {
                    coordinate[k] += 1;
                    break;
                }
                coordinate[k] = lo[k];
                k += 1;
            }
        }
    }

    /// Every particle in cell `id` and its direct neighbours (3, 9 or 27 cells).
    pub fn neighbour_candidates(&self, id: usize, buffer: &mut CandidateBuffer) -> Result<(), TreeError> {
        self.neighbour_candidates_within(id, 1, buffer)
    }

    /// Every particle in the cells within Chebyshev distance `radius` of cell `id`.
    pub fn neighbour_candidates_within(
        &self,
        id: usize,
        radius: usize,
        buffer: &mut CandidateBuffer,
    ) -> Result<(), TreeError> {
        buffer.clear();
        for c in self.adjacent_cells(id, radius) {
            for i in self.cell_particles(c) {
                buffer.push(i);
            }
        }
        buffer.finish()
    }

    /// Largest smoothing length among the active particles of cell `id`.
    fn active_h_max(&self, id: usize, particles: &ParticleSet<D>) -> Option<f64> {
        self.cell_particles(id)
            .filter(|&i| particles.is_active(i))
            .map(|i| particles.get(i).h)
            .fold(None, |acc: Option<f64>, h| Some(acc.map_or(h, |m| m.max(h))))
    }

    /// Number of cell widths needed to cover `distance`.
    fn cells_to_cover(&self, distance: f64) -> usize {
        let widest = self.dims.iter().copied().max().unwrap_or(1);
        let cells = (distance / self.spacing).ceil();
        if cells >= widest as f64 {
            widest
        } else if cells > 0.0 {
            cells as usize
        } else {
            0
        }
    }
}

impl<const D: usize> NeighbourSearch<D> for UniformGrid<D> {
    fn active_cells(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.active_count > 0)
            .map(|(id, _)| id)
            .collect()
    }

    fn active_particles(&self, cell: usize, particles: &ParticleSet<D>, out: &mut Vec<usize>) {
        out.clear();
        out.extend(self.cell_particles(cell).filter(|&i| particles.is_active(i)));
    }

    fn cell_candidates(
        &self,
        cell: usize,
        particles: &ParticleSet<D>,
        range_factor: f64,
        buffer: &mut CandidateBuffer,
    ) -> Result<(), TreeError> {
        match self.active_h_max(cell, particles) {
            Some(h) => {
                let radius = self.cells_to_cover(range_factor * h).max(1);
                self.neighbour_candidates_within(cell, radius, buffer)
            }
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
        match self.active_h_max(cell, particles) {
            Some(h) => {
                let radius = self.cells_to_cover(range_factor * h.max(h_bound)).max(1);
                self.neighbour_candidates_within(cell, radius, buffer)
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
        let id = self.cell_id(&self.cell_of_position(position));
        self.neighbour_candidates_within(id, self.cells_to_cover(radius), buffer)
    }
}
