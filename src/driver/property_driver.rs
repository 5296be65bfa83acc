//! Parallel per-cell dispatch of the density / smoothing-length solver.
//!
//! Each active cell is a unit of work. A worker assembles the cell's active particles and
//! their neighbour candidates, filters the candidates per particle by true distance and
//! hands the survivors to a [`DensitySolver`]. Workers only read the particle snapshot;
//! results are written back in one sequential pass once every cell is done.
use log::{debug, warn};
use rayon::prelude::*;

use crate::neighbours::{CandidateBuffer, NeighbourSearch};
use crate::particles::{ParticleSet, SphParticle};
use crate::utils::{distance_squared, TreeConfig, TreeError};

/// Gather neighbours of one particle, already filtered to `range_squared`.
///
/// The three slices are parallel: entry `k` describes the same neighbour. The particle
/// itself is included with a zero distance.
#[derive(Debug, Clone, Copy)]
pub struct GatherNeighbours<'a> {
    pub masses: &'a [f64],
    /// `m_j * u_j` of every neighbour.
    pub mass_energy: &'a [f64],
    pub distances_squared: &'a [f64],
    /// Squared radius the list was gathered with.
    pub range_squared: f64,
}

impl GatherNeighbours<'_> {
    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }
}

/// Solver updating the state of a single particle from its gather neighbours.
///
/// Implementations may only touch `particle`. A recoverable error
/// ([`TreeError::is_recoverable`]) asks the driver for a wider neighbour list; any other
/// error aborts the pass.
pub trait DensitySolver<const D: usize>: Sync {
    fn solve(
        &self,
        index: usize,
        neighbours: &GatherNeighbours<'_>,
        particle: &mut SphParticle<D>,
    ) -> Result<(), TreeError>;
}

/// Outcome of [`update_all_properties`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverReport {
    pub active_cells: usize,
    /// Particles whose solver call eventually succeeded.
    pub updated: usize,
    /// Candidate buffer enlargements after an overflow.
    pub buffer_growths: usize,
    /// Solver retries with a widened search radius.
    pub search_expansions: usize,
    /// Particles left untouched because every retry failed.
    pub unconverged: Vec<usize>,
}

impl DriverReport {
    pub fn is_complete(&self) -> bool {
        self.unconverged.is_empty()
    }
}

/// Per-worker buffers, allocated once per worker and reused for every cell it processes.
struct WorkerScratch<const D: usize> {
    active: Vec<usize>,
    candidates: CandidateBuffer,
    positions: Vec<[f64; D]>,
    masses: Vec<f64>,
    mass_energy: Vec<f64>,
    neighbour_masses: Vec<f64>,
    neighbour_mass_energy: Vec<f64>,
    neighbour_distances: Vec<f64>,
}

impl<const D: usize> WorkerScratch<D> {
    fn new(capacity: usize) -> Self {
        Self {
            active: Vec::new(),
            candidates: CandidateBuffer::new(capacity),
            positions: Vec::with_capacity(capacity),
            masses: Vec::with_capacity(capacity),
            mass_energy: Vec::with_capacity(capacity),
            neighbour_masses: Vec::with_capacity(capacity),
            neighbour_mass_energy: Vec::with_capacity(capacity),
            neighbour_distances: Vec::with_capacity(capacity),
        }
    }

    /// Copies the fields the solver needs out of the particle store.
    fn load_candidates(&mut self, particles: &ParticleSet<D>) {
        self.positions.clear();
        self.masses.clear();
        self.mass_energy.clear();
        for &j in self.candidates.as_slice() {
            let p = particles.get(j);
            self.positions.push(p.position);
            self.masses.push(p.mass);
            self.mass_energy.push(p.mass * p.u);
        }
    }

    /// Keeps the loaded candidates within `range_squared` of `position`.
    fn filter(&mut self, position: &[f64; D], range_squared: f64) -> GatherNeighbours<'_> {
        self.neighbour_masses.clear();
        self.neighbour_mass_energy.clear();
        self.neighbour_distances.clear();
        for k in 0..self.positions.len() {
            let dr2 = distance_squared(position, &self.positions[k]);
            if dr2 <= range_squared {
                self.neighbour_masses.push(self.masses[k]);
                self.neighbour_mass_energy.push(self.mass_energy[k]);
                self.neighbour_distances.push(dr2);
            }
        }
        GatherNeighbours {
            masses: &self.neighbour_masses,
            mass_energy: &self.neighbour_mass_energy,
            distances_squared: &self.neighbour_distances,
            range_squared,
        }
    }
}

#[derive(Default)]
struct CellOutcome<const D: usize> {
    updates: Vec<(usize, SphParticle<D>)>,
    unconverged: Vec<usize>,
    buffer_growths: usize,
    search_expansions: usize,
}

/// Runs `query` into `buffer`, growing the buffer after each overflow.
///
/// Returns `Ok(false)` if the query still overflows after `max_growths` enlargements.
pub(crate) fn query_with_growth<F>(
    buffer: &mut CandidateBuffer,
    max_growths: usize,
    growths: &mut usize,
    mut query: F,
) -> Result<bool, TreeError>
where
    F: FnMut(&mut CandidateBuffer) -> Result<(), TreeError>,
{
    let mut attempts = 0;
    loop {
        match query(buffer) {
            Ok(()) => return Ok(true),
            Err(TreeError::CandidateOverflow { required, capacity }) => {
                if attempts == max_growths {
                    warn!(
                        "Neighbour buffer still too small after {} enlargements ({} candidates, capacity {})",
                        attempts, required, capacity
                    );
                    return Ok(false);
                }
                let grown = required.checked_next_power_of_two().unwrap_or(required);
                warn!("Neighbour buffer overflow: growing from {} to {}", capacity, grown);
                buffer.grow(grown);
                attempts += 1;
                *growths += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn solve_widened<const D: usize, S, P>(
    search: &S,
    particles: &ParticleSet<D>,
    solver: &P,
    config: &TreeConfig,
    scratch: &mut WorkerScratch<D>,
    outcome: &mut CellOutcome<D>,
    i: usize,
    base_radius: f64,
) -> Result<Option<SphParticle<D>>, TreeError>
where
    S: NeighbourSearch<D> + ?Sized,
    P: DensitySolver<D> + ?Sized,
{
    let position = particles.get(i).position;
    let mut radius = base_radius;
    for expansion in 1..=config.max_search_expansions {
        radius *= config.search_expansion_factor;
        outcome.search_expansions += 1;

        let gathered = query_with_growth(
            &mut scratch.candidates,
            config.max_buffer_growths,
            &mut outcome.buffer_growths,
            |buffer| search.gather_candidates(&position, radius, buffer),
        )?;
        if !gathered {
            return Ok(None);
        }
        scratch.load_candidates(particles);

        let mut state = *particles.get(i);
        let neighbours = scratch.filter(&position, radius * radius);
        match solver.solve(i, &neighbours, &mut state) {
            Ok(()) => return Ok(Some(state)),
            Err(e) if e.is_recoverable() => {
                debug!("Particle {} failed with radius {} (expansion {}): {}", i, radius, expansion, e);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(None)
}

fn process_cell<const D: usize, S, P>(
    search: &S,
    particles: &ParticleSet<D>,
    solver: &P,
    range_factor: f64,
    config: &TreeConfig,
    cell: usize,
    scratch: &mut WorkerScratch<D>,
) -> Result<CellOutcome<D>, TreeError>
where
    S: NeighbourSearch<D> + ?Sized,
    P: DensitySolver<D> + ?Sized,
{
    let mut outcome = CellOutcome::default();
    search.active_particles(cell, particles, &mut scratch.active);
    if scratch.active.is_empty() {
        return Ok(outcome);
    }

    let gathered = query_with_growth(
        &mut scratch.candidates,
        config.max_buffer_growths,
        &mut outcome.buffer_growths,
        |buffer| search.cell_candidates(cell, particles, range_factor, buffer),
    )?;
    if !gathered {
        outcome.unconverged.extend_from_slice(&scratch.active);
        return Ok(outcome);
    }

    let active = std::mem::take(&mut scratch.active);
    scratch.load_candidates(particles);
    for (n, &i) in active.iter().enumerate() {
        let mut state = *particles.get(i);
        let radius = range_factor * state.h;
        let neighbours = scratch.filter(&state.position, radius * radius);
        match solver.solve(i, &neighbours, &mut state) {
            Ok(()) => outcome.updates.push((i, state)),
            Err(e) if e.is_recoverable() => {
                match solve_widened(search, particles, solver, config, scratch, &mut outcome, i, radius)? {
                    Some(widened) => outcome.updates.push((i, widened)),
                    None => {
                        warn!(
                            "Particle {} did not converge after {} search expansions: {}",
                            i, config.max_search_expansions, e
                        );
                        outcome.unconverged.push(i);
                    }
                }
                // The widened search replaced the cell's candidate list.
                let restored = query_with_growth(
                    &mut scratch.candidates,
                    config.max_buffer_growths,
                    &mut outcome.buffer_growths,
                    |buffer| search.cell_candidates(cell, particles, range_factor, buffer),
                )?;
                if !restored {
                    outcome.unconverged.extend_from_slice(&active[n + 1..]);
                    break;
                }
                scratch.load_candidates(particles);
            }
            Err(e) => return Err(e),
        }
    }
    scratch.active = active;
    Ok(outcome)
}

/// Updates the density and smoothing length of every active particle.
///
/// Active cells of `search` are processed in parallel; the candidate radius of particle `i`
/// is `config.gather_tolerance * kernel_range * h_i`. A candidate overflow grows the
/// worker's buffer (up to `config.max_buffer_growths` times); a recoverable solver failure
/// re-gathers with the radius multiplied by `config.search_expansion_factor` (up to
/// `config.max_search_expansions` times). Particles that still fail are listed in
/// [`DriverReport::unconverged`] and keep their previous state.
///
/// # Errors
///
/// Configuration errors, and any non-recoverable error returned by a query or the solver.
pub fn update_all_properties<const D: usize, S, P>(
    search: &S,
    particles: &mut ParticleSet<D>,
    solver: &P,
    kernel_range: f64,
    config: &TreeConfig,
) -> Result<DriverReport, TreeError>
where
    S: NeighbourSearch<D> + ?Sized,
    P: DensitySolver<D> + ?Sized,
{
    config.validate()?;
    if !(kernel_range.is_finite() && kernel_range > 0.0) {
        return Err(TreeError::InvalidConfig(format!("kernel range must be positive, got {}", kernel_range)));
    }
    let range_factor = config.gather_tolerance * kernel_range;
    let cells = search.active_cells();

    let snapshot: &ParticleSet<D> = particles;
    let outcomes = cells
        .par_iter()
        .map_init(
            || WorkerScratch::new(config.max_neighbours),
            |scratch, &cell| process_cell(search, snapshot, solver, range_factor, config, cell, scratch),
        )
        .collect::<Result<Vec<_>, _>>()?;

    let mut report = DriverReport { active_cells: cells.len(), ..DriverReport::default() };
    let store = particles.as_mut_slice();
    for outcome in outcomes {
        report.updated += outcome.updates.len();
        report.buffer_growths += outcome.buffer_growths;
        report.search_expansions += outcome.search_expansions;
        report.unconverged.extend(outcome.unconverged);
        for (i, state) in outcome.updates {
            store[i] = state;
        }
    }
    report.unconverged.sort_unstable();

    debug!(
        "Property update: {} cells, {} particles updated, {} buffer growths, {} search expansions, {} unconverged",
        report.active_cells,
        report.updated,
        report.buffer_growths,
        report.search_expansions,
        report.unconverged.len()
    );
    Ok(report)
}
