use crate::models::BoundingBox;
use crate::neighbours::ChainIter;
use crate::particles::ParticleSet;
use crate::tree::TreeCell;
use crate::utils::TreeError;

/// Bottom-up pass computing mass, centroid, bounding box, particle counts and the opening
/// distance of every cell.
///
/// Cells are visited in descending index order, so both children of an internal cell are
/// complete by the time the parent is combined. `opening_factor` is `1/θ²`.
///
/// Zero-mass cells take the centre of their bounding box as centroid; empty cells keep a
/// zero centroid, an empty box and a zero opening distance.
pub fn stock_cells<const D: usize>(
    cells: &mut [TreeCell<D>],
    next: &[Option<usize>],
    particles: &ParticleSet<D>,
    opening_factor: f64,
) -> Result<(), TreeError> {
    for c in (0..cells.len()).rev() {
        let stocked = match cells[c].second_child {
            None => stock_leaf(&cells[c], next, particles)?,
            Some(second) => {
                let first = c + 1;
                if first >= cells.len() || second >= cells.len() || second <= c {
                    return Err(TreeError::StructuralInvariantViolation(format!(
                        "cell {} has children {} and {} outside the arena",
                        c, first, second
                    )));
                }
                combine(&cells[first], &cells[second])
            }
        };

        let cell = &mut cells[c];
        cell.mass = stocked.mass;
        cell.centroid = stocked.centroid;
        cell.bbox = stocked.bbox;
        cell.particle_count = stocked.particle_count;
        cell.active_count = stocked.active_count;
        cell.opening_distance = opening_factor * stocked.bbox.extent_squared();
    }
    Ok(())
}

/// Recounts active particles per cell without touching anything else.
pub fn count_active<const D: usize>(cells: &mut [TreeCell<D>], next: &[Option<usize>], particles: &ParticleSet<D>) {
    for c in (0..cells.len()).rev() {
        cells[c].active_count = match cells[c].second_child {
            None => ChainIter::new(cells[c].particle_head, next)
                .filter(|&i| particles.is_active(i))
                .count(),
            Some(second) => cells[c + 1].active_count + cells[second].active_count,
        };
    }
}

struct Stocked<const D: usize> {
    mass: f64,
    centroid: [f64; D],
    bbox: BoundingBox<D>,
    particle_count: usize,
    active_count: usize,
}

fn stock_leaf<const D: usize>(
    cell: &TreeCell<D>,
    next: &[Option<usize>],
    particles: &ParticleSet<D>,
) -> Result<Stocked<D>, TreeError> {
    let mut mass = 0.0;
    let mut moment = [0.0; D];
    let mut bbox = BoundingBox::empty();
    let mut particle_count = 0;
    let mut active_count = 0;

    for i in ChainIter::new(cell.particle_head, next) {
        if particle_count >= particles.n_total() {
            return Err(TreeError::StructuralInvariantViolation(format!(
                "particle chain of leaf {:?} does not terminate",
                cell.grid_id
            )));
        }
        let p = particles.get(i);
        mass += p.mass;
        for k in 0..D {
            moment[k] += p.mass * p.position[k];
        }
        bbox.include(&p.position);
        particle_count += 1;
        if particles.is_active(i) {
            active_count += 1;
        }
    }

    let centroid = if mass > 0.0 {
        std::array::from_fn(|k| moment[k] / mass)
    } else if !bbox.is_empty() {
        bbox.center()
    } else {
        [0.0; D]
    };
    Ok(Stocked { mass, centroid, bbox, particle_count, active_count })
}

fn combine<const D: usize>(a: &TreeCell<D>, b: &TreeCell<D>) -> Stocked<D> {
    let mass = a.mass + b.mass;
    let bbox = a.bbox.union(&b.bbox);
    let centroid = if mass > 0.0 {
        std::array::from_fn(|k| (a.mass * a.centroid[k] + b.mass * b.centroid[k]) / mass)
    } else if !bbox.is_empty() {
        bbox.center()
    } else {
        [0.0; D]
    };
    Stocked {
        mass,
        centroid,
        bbox,
        particle_count: a.particle_count + b.particle_count,
        active_count: a.active_count + b.active_count,
    }
}
