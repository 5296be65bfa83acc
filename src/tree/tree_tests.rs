use approx::assert_relative_eq;

use crate::models::BoundingBox;
use crate::particles::{ParticleSet, SphParticle};
use crate::tree::{build_topology, BinaryTree, NullObserver, TreeCell, TreeObserver, TreeSize, TreeSummary};
use crate::utils::{TreeConfig, TreeError};

fn line(xs: &[f64]) -> ParticleSet<1> {
    ParticleSet::from_real(xs.iter().map(|&x| SphParticle::new([x], 1.0, 0.5).unwrap()).collect()).unwrap()
}

fn tree_with_capacity<const D: usize>(leaf_capacity: usize) -> BinaryTree<D> {
    BinaryTree::new(TreeConfig::new(Some(leaf_capacity), None, None, None, None)).unwrap()
}

fn leaf_contents<const D: usize>(tree: &BinaryTree<D>) -> Vec<Vec<usize>> {
    (0..tree.leaf_count())
        .map(|g| tree.leaf_particles(tree.leaf_cell(g)).collect())
        .collect()
}

fn cloud(n: usize, seed: u64) -> ParticleSet<2> {
    let bounds = BoundingBox::new([0.0, 0.0], [1.0, 1.0]);
    let real = ParticleSet::uniform_random(n, &bounds, 0.05, seed).unwrap();
    // A few ghosts just outside the left edge.
    let ghosts = (0..10)
        .map(|k| SphParticle::new([-0.02, 0.1 * k as f64], 1.0 / n as f64, 0.05).unwrap())
        .collect();
    ParticleSet::new(real.as_slice().to_vec(), ghosts).unwrap()
}

#[test]
fn test_tree_size_estimate() {
    let size = TreeSize::estimate(8, 1).unwrap();
    assert_eq!((size.levels, size.leaf_count, size.cell_count, size.particle_capacity), (3, 8, 15, 8));

    let size = TreeSize::estimate(1, 1).unwrap();
    assert_eq!((size.levels, size.leaf_count, size.cell_count), (0, 1, 1));

    let size = TreeSize::estimate(0, 4).unwrap();
    assert_eq!(size.levels, 0);

    let size = TreeSize::estimate(1000, 8).unwrap();
    assert_eq!(size.levels, 7);
    assert!(size.particle_capacity >= 1000);
    assert!(size.particle_capacity / 2 < 1000);

    assert_eq!(TreeSize::estimate(10, 0), Err(TreeError::InvalidLeafCapacity));
}

#[test]
fn test_topology_links() {
    let size = TreeSize::estimate(4, 1).unwrap();
    let mut cells: Vec<TreeCell<2>> = Vec::new();
    let mut leaf_cells = Vec::new();
    build_topology(&size, &mut cells, &mut leaf_cells).unwrap();

    assert_eq!(cells.len(), 7);
    assert_eq!(leaf_cells, vec![2, 3, 5, 6]);

    let second: Vec<Option<usize>> = cells.iter().map(|c| c.second_child).collect();
    assert_eq!(second, vec![Some(4), Some(3), None, None, Some(6), None, None]);

    let skip: Vec<usize> = cells.iter().map(|c| c.skip_next).collect();
    assert_eq!(skip, vec![7, 4, 3, 4, 7, 6, 7]);

    let levels: Vec<usize> = cells.iter().map(|c| c.level).collect();
    assert_eq!(levels, vec![0, 1, 2, 2, 1, 2, 2]);

    let grid_ids: Vec<Option<usize>> = leaf_cells.iter().map(|&c| cells[c].grid_id).collect();
    assert_eq!(grid_ids, vec![Some(0), Some(1), Some(2), Some(3)]);
}

#[test]
fn test_eight_collinear_particles_one_per_leaf() {
    let xs = [5.0, 2.0, 7.0, 0.0, 3.0, 6.0, 1.0, 4.0];
    let particles = line(&xs);
    let mut tree = tree_with_capacity::<1>(1);
    tree.update(&particles).unwrap();

    assert_eq!(tree.levels(), 3);
    assert_eq!(tree.leaf_count(), 8);
    assert_eq!(tree.cell_count(), 15);

    // Leaf g holds the particle sitting at x = g.
    for (g, contents) in leaf_contents(&tree).iter().enumerate() {
        assert_eq!(contents.len(), 1);
        assert_eq!(xs[contents[0]], g as f64);
    }
}

#[test]
fn test_single_particle_tree() {
    let particles = ParticleSet::from_real(vec![SphParticle::new([0.3, -0.7], 2.5, 0.1).unwrap()]).unwrap();
    let mut tree = tree_with_capacity::<2>(1);
    tree.update(&particles).unwrap();

    assert_eq!((tree.levels(), tree.leaf_count(), tree.cell_count()), (0, 1, 1));
    let root = tree.root();
    assert!(root.is_leaf());
    assert_eq!(root.particle_head, Some(0));
    assert_eq!(root.mass, 2.5);
    assert_relative_eq!(root.centroid[0], 0.3);
    assert_relative_eq!(root.centroid[1], -0.7);
    assert_eq!(root.opening_distance, 0.0);
}

#[test]
fn test_four_particles_split_at_median() {
    let particles = ParticleSet::from_real(
        [[0.3, 0.9], [0.1, 0.2], [0.4, 0.1], [0.2, 0.8]]
            .iter()
            .map(|&r| SphParticle::new(r, 0.25, 0.1).unwrap())
            .collect(),
    )
    .unwrap();
    let mut tree = tree_with_capacity::<2>(2);
    tree.update(&particles).unwrap();

    assert_eq!(tree.leaf_count(), 2);
    assert_eq!(leaf_contents(&tree), vec![vec![1, 3], vec![0, 2]]);
    assert_eq!(tree.particle_leaf(1), tree.leaf_cell(0));
    assert_eq!(tree.particle_leaf(2), tree.leaf_cell(1));
}

#[test]
fn test_tie_at_half_stays_in_first_child() {
    let particles = line(&[0.0, 1.0, 2.0]);
    let mut tree = tree_with_capacity::<1>(2);

    // Running total reaches exactly half after the second particle.
    tree.update_weighted(&particles, &[1.0, 1.0, 2.0], &mut NullObserver).unwrap();
    assert_eq!(leaf_contents(&tree), vec![vec![0, 1], vec![2]]);

    // Odd counts put the extra particle in the second child.
    tree.update(&particles).unwrap();
    assert_eq!(leaf_contents(&tree), vec![vec![0], vec![1, 2]]);
}

#[test]
fn test_cells_split_at_their_own_content() {
    let particles = line(&[0.0, 1.0, 2.0]);
    let mut tree = tree_with_capacity::<1>(1);
    tree.update(&particles).unwrap();
    assert_eq!(tree.levels(), 2);

    // The lone particle of the first child is past half of that child's content.
    assert_eq!(leaf_contents(&tree), vec![vec![], vec![0], vec![1], vec![2]]);
}

#[test]
fn test_rejects_bad_weights() {
    let particles = line(&[0.0, 1.0]);
    let mut tree = tree_with_capacity::<1>(1);
    assert!(matches!(
        tree.update_weighted(&particles, &[1.0], &mut NullObserver),
        Err(TreeError::InvalidConfig(_))
    ));
    assert!(matches!(
        tree.update_weighted(&particles, &[1.0, -1.0], &mut NullObserver),
        Err(TreeError::InvalidParticle { particle: 1, .. })
    ));
    assert!(matches!(
        tree.update_weighted(&particles, &[0.0, 0.0], &mut NullObserver),
        Err(TreeError::InvalidConfig(_))
    ));
}

#[test]
fn test_chains_partition_particles() {
    let particles = cloud(500, 7);
    let mut tree = tree_with_capacity::<2>(8);
    tree.update(&particles).unwrap();

    let mut seen = vec![0usize; particles.n_total()];
    for contents in leaf_contents(&tree) {
        assert!(contents.len() <= 8);
        for i in contents {
            seen[i] += 1;
        }
    }
    assert!(seen.iter().all(|&count| count == 1));
    assert_eq!(tree.root().particle_count, particles.n_total());
    assert!(tree.summary().max_leaf_occupancy <= 8);
}

#[test]
fn test_stocked_mass_and_bounding_boxes() {
    let particles = cloud(300, 11);
    let mut tree = tree_with_capacity::<2>(4);
    tree.update(&particles).unwrap();

    for (c, cell) in tree.cells().iter().enumerate() {
        if let Some(second) = cell.second_child {
            let (a, b) = (tree.cell(c + 1), tree.cell(second));
            assert_relative_eq!(cell.mass, a.mass + b.mass, epsilon = 1e-12);
            assert_eq!(cell.bbox, a.bbox.union(&b.bbox));
        }
    }
    assert_relative_eq!(tree.root().mass, particles.total_mass(), epsilon = 1e-12);
    assert_eq!(tree.root().bbox, particles.bounding_box());

    let mut moment = [0.0; 2];
    for p in particles.as_slice() {
        moment[0] += p.mass * p.position[0];
        moment[1] += p.mass * p.position[1];
    }
    let mass = particles.total_mass();
    assert_relative_eq!(tree.root().centroid[0], moment[0] / mass, epsilon = 1e-12);
    assert_relative_eq!(tree.root().centroid[1], moment[1] / mass, epsilon = 1e-12);
}

#[test]
fn test_opening_distance() {
    let particles = ParticleSet::from_real(vec![
        SphParticle::new([0.0, 0.0], 1.0, 0.1).unwrap(),
        SphParticle::new([3.0, 4.0], 1.0, 0.1).unwrap(),
    ])
    .unwrap();
    let mut tree = tree_with_capacity::<2>(1);
    tree.update(&particles).unwrap();

    // Extent squared 25, theta 0.5.
    assert_relative_eq!(tree.root().opening_distance, 100.0);
    assert_relative_eq!(tree.root().centroid[0], 1.5);
}

#[test]
fn test_zero_mass_and_empty_cells() {
    let particles = ParticleSet::from_real(vec![
        SphParticle::new([1.0], 0.0, 0.1).unwrap(),
        SphParticle::new([3.0], 0.0, 0.1).unwrap(),
    ])
    .unwrap();
    let mut tree = tree_with_capacity::<1>(1);
    tree.update(&particles).unwrap();
    assert_eq!(tree.root().mass, 0.0);
    assert_eq!(tree.root().centroid, [2.0]);

    // Three particles in four leaves leave one leaf empty.
    let particles = line(&[0.0, 1.0, 2.0]);
    tree.update(&particles).unwrap();
    let empty: Vec<&TreeCell<1>> = tree.cells().iter().filter(|c| c.is_leaf() && c.particle_count == 0).collect();
    assert_eq!(empty.len(), 1);
    assert_eq!(empty[0].mass, 0.0);
    assert_eq!(empty[0].centroid, [0.0]);
    assert!(empty[0].bbox.is_empty());
    assert_eq!(empty[0].opening_distance, 0.0);
    assert_eq!(empty[0].particle_head, None);
}

#[test]
fn test_rebuild_is_idempotent() {
    let particles = cloud(200, 3);
    let mut tree = tree_with_capacity::<2>(4);
    tree.update(&particles).unwrap();
    let cells = tree.cells().to_vec();
    let chains = leaf_contents(&tree);

    tree.update(&particles).unwrap();
    assert_eq!(tree.cells(), cells.as_slice());
    assert_eq!(leaf_contents(&tree), chains);

    let mut fresh = tree_with_capacity::<2>(4);
    fresh.update(&particles).unwrap();
    assert_eq!(fresh.cells(), cells.as_slice());
}

#[test]
fn test_rebuild_after_particle_count_changes() {
    let mut tree = tree_with_capacity::<2>(2);
    tree.update(&cloud(100, 1)).unwrap();
    assert_eq!(tree.levels(), 6);

    let small = cloud(10, 2);
    tree.update(&small).unwrap();
    assert_eq!(tree.levels(), 4);
    assert_eq!(tree.root().particle_count, small.n_total());
}

#[test]
fn test_rejects_non_finite_coordinates() {
    let mut particles = line(&[0.0, 1.0, 2.0]);
    particles.as_mut_slice()[2].position[0] = f64::NAN;
    let mut tree = tree_with_capacity::<1>(1);
    assert_eq!(tree.update(&particles), Err(TreeError::NonFiniteCoordinate { particle: 2, axis: 0 }));
}

#[test]
fn test_rejects_invalid_dimension() {
    let config = TreeConfig::default();
    assert_eq!(BinaryTree::<4>::new(config).err(), Some(TreeError::InvalidDimension(4)));
}

#[test]
fn test_active_counters() {
    let mut particles = cloud(64, 5);
    let mut tree = tree_with_capacity::<2>(4);
    tree.update(&particles).unwrap();
    assert_eq!(tree.root().active_count, particles.n_real());

    for i in 0..32 {
        particles.set_active(i, false);
    }
    tree.update_active_counters(&particles);
    assert_eq!(tree.root().active_count, particles.n_real() - 32);
}

#[derive(Default)]
struct Recorder {
    summary: Option<TreeSummary>,
    root_mass: Option<f64>,
}

impl TreeObserver<1> for Recorder {
    fn on_build(&mut self, summary: &TreeSummary) {
        self.summary = Some(*summary);
    }

    fn on_stock(&mut self, tree: &BinaryTree<1>) {
        self.root_mass = Some(tree.root().mass);
    }
}

#[test]
fn test_observer_checkpoints() {
    let particles = line(&[0.0, 1.0, 2.0, 3.0, 4.0]);
    let mut tree = tree_with_capacity::<1>(2);
    let mut recorder = Recorder::default();
    tree.update_observed(&particles, &mut recorder).unwrap();

    let summary = recorder.summary.unwrap();
    assert_eq!(summary.n_total, 5);
    assert_eq!(summary.levels, 2);
    assert_eq!(summary.cell_count, 7);
    assert_eq!(summary.max_leaf_occupancy, 2);
    assert_eq!(recorder.root_mass, Some(5.0));
}
