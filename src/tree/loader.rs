use crate::tree::{CoordinateOrder, TreeCell, TreeSize};
use crate::utils::TreeError;

/// Scratch arrays of the weighted loader, kept by the tree between rebuilds.
#[derive(Debug, Clone, Default)]
pub struct LoaderScratch {
    content: Vec<f64>,
    accumulated: Vec<f64>,
    tails: Vec<Option<usize>>,
}

/// Fills `weights` with the uniform weight `1/n` for `n` particles.
pub fn uniform_weights(n: usize, weights: &mut Vec<f64>) {
    weights.clear();
    if n > 0 {
        weights.resize(n, 1.0 / n as f64);
    }
}

/// Checks that `weights` holds one finite, non-negative weight per particle and that the
/// total is positive (unless there are no particles at all).
pub fn validate_weights(weights: &[f64], n: usize) -> Result<(), TreeError> {
    if weights.len() != n {
        return Err(TreeError::InvalidConfig(format!("{} weights for {} particles", weights.len(), n)));
    }
    if let Some(i) = weights.iter().position(|w| !w.is_finite() || *w < 0.0) {
        return Err(TreeError::InvalidParticle { particle: i, reason: "load-balancing weight must be finite and non-negative".to_string() });
    }
    if n > 0 && !(weights.iter().sum::<f64>() > 0.0) {
        return Err(TreeError::InvalidConfig("load-balancing weights sum to zero".to_string()));
    }
    Ok(())
}

/// Slack added to a child's capacity when deciding where a particle goes.
///
/// A quarter of the lightest positive weight: large enough to swallow summation round-off,
/// small enough never to admit a whole extra particle.
fn tie_slack(weights: &[f64]) -> f64 {
    let lightest = weights.iter().copied().filter(|w| *w > 0.0).fold(f64::INFINITY, f64::min);
    if lightest.is_finite() { 0.25 * lightest } else { 0.0 }
}

/// Assigns every particle to exactly one leaf by weighted bisection.
///
/// Round `k` (of `size.levels`) walks the particles in the order of axis `k mod D`. Each
/// particle adds its weight to its current cell's running total and moves to the first
/// child while that total is at most half of the cell's content (plus [`tie_slack`]),
/// otherwise to the second child. A particle whose running total lands exactly on the half
/// therefore stays in the first child.
///
/// The half is taken of the weight the cell actually received in the previous round, not of
/// a capacity halved down from the root, so each cell splits at its own weighted midpoint.
///
/// After the last round the particles are linked into per-leaf chains (`next`, with
/// `cells[leaf].particle_head` as the head) in the order of the last round's axis.
///
/// # Errors
///
/// [`TreeError::StructuralInvariantViolation`] if a particle is routed through a leaf
/// before the last round or ends up in an internal cell.
pub fn load_tree<const D: usize>(
    size: &TreeSize,
    cells: &mut [TreeCell<D>],
    order: &CoordinateOrder<D>,
    weights: &[f64],
    particle_cell: &mut Vec<usize>,
    next: &mut Vec<Option<usize>>,
    scratch: &mut LoaderScratch,
) -> Result<(), TreeError> {
    let n = weights.len();
    let n_cell = cells.len();
    particle_cell.clear();
    particle_cell.resize(n, 0);
    scratch.content.clear();
    scratch.content.resize(n_cell, 0.0);
    scratch.accumulated.clear();
    scratch.accumulated.resize(n_cell, 0.0);

    let slack = tie_slack(weights);

    for round in 0..size.levels {
        let axis = round % D;
        scratch.content.iter_mut().for_each(|w| *w = 0.0);
        scratch.accumulated.iter_mut().for_each(|w| *w = 0.0);
        for (i, &c) in particle_cell.iter().enumerate() {
            scratch.content[c] += weights[i];
        }

        for &j in order.axis(axis) {
            let c = particle_cell[j];
            let second = cells[c].second_child.ok_or_else(|| {
                TreeError::StructuralInvariantViolation(format!(
                    "particle {} reached leaf {} in round {} of {}",
                    j, c, round, size.levels
                ))
            })?;
            scratch.accumulated[c] += weights[j];
            particle_cell[j] = if scratch.accumulated[c] <= 0.5 * scratch.content[c] + slack {
                c + 1
            } else {
                second
            };
        }
    }

    let final_axis = size.levels.saturating_sub(1) % D;
    next.clear();
    next.resize(n, None);
    scratch.tails.clear();
    scratch.tails.resize(n_cell, None);

    for &j in order.axis(final_axis) {
        let c = particle_cell[j];
        if !cells[c].is_leaf() {
            return Err(TreeError::StructuralInvariantViolation(format!(
                "particle {} finished loading in internal cell {}",
                j, c
            )));
        }
        match scratch.tails[c] {
            None => cells[c].particle_head = Some(j),
            Some(tail) => next[tail] = Some(j),
        }
        scratch.tails[c] = Some(j);
        cells[c].particle_count += 1;
    }
    Ok(())
}
