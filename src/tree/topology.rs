use crate::tree::{TreeCell, TreeSize};
use crate::utils::TreeError;

/// Lays out the skeleton of a level-complete binary tree in `cells`.
///
/// One pass in index order: a cell on the last level is a leaf and receives the next
/// sequential grid id; any other cell gets its first child at `c + 1`, its second child at
/// `c + stride(level)` and `skip_next = c + 2 * stride(level) - 1`. Parents always precede
/// their children, so every level is known by the time its cell is visited.
///
/// `cells` and `leaf_cells` are resized in place, reusing their allocations. On return
/// `leaf_cells[g]` is the cell index of leaf `g`.
///
/// # Errors
///
/// Returns [`TreeError::StructuralInvariantViolation`] if a level exceeds `size.levels`, a
/// link points outside the arena, or the number of leaves does not match.
pub fn build_topology<const D: usize>(
    size: &TreeSize,
    cells: &mut Vec<TreeCell<D>>,
    leaf_cells: &mut Vec<usize>,
) -> Result<(), TreeError> {
    let n_cell = size.cell_count;
    cells.clear();
    cells.resize(n_cell, TreeCell::default());
    leaf_cells.clear();
    leaf_cells.reserve(size.leaf_count);

    for c in 0..n_cell {
        let level = cells[c].level;
        if level > size.levels {
            return Err(TreeError::StructuralInvariantViolation(format!(
                "cell {} sits on level {} of a {}-level tree",
                c, level, size.levels
            )));
        }

        if level == size.levels {
            cells[c].grid_id = Some(leaf_cells.len());
            cells[c].skip_next = c + 1;
            leaf_cells.push(c);
            continue;
        }

        let stride = size.stride(level);
        let second = c + stride;
        let skip = c + 2 * stride - 1;
        if second >= n_cell || skip > n_cell {
            return Err(TreeError::StructuralInvariantViolation(format!(
                "cell {} links to second child {} / next cell {} outside {} cells",
                c, second, skip, n_cell
            )));
        }
        cells[c + 1].level = level + 1;
        cells[second].level = level + 1;
        cells[c].second_child = Some(second);
        cells[c].skip_next = skip;
    }

    if leaf_cells.len() != size.leaf_count {
        return Err(TreeError::StructuralInvariantViolation(format!(
            "built {} leaves, expected {}",
            leaf_cells.len(),
            size.leaf_count
        )));
    }
    Ok(())
}
