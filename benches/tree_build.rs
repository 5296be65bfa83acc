use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rs_sph_tree::grid::UniformGrid;
use rs_sph_tree::models::BoundingBox;
use rs_sph_tree::neighbours::{CandidateBuffer, NeighbourSearch};
use rs_sph_tree::particles::ParticleSet;
use rs_sph_tree::tree::BinaryTree;
use rs_sph_tree::utils::TreeConfig;

fn cloud(n: usize) -> ParticleSet<3> {
    let bounds = BoundingBox::new([0.0; 3], [1.0; 3]);
    let h = 1.2 * (1.0 / n as f64).cbrt();
    ParticleSet::uniform_random(n, &bounds, h, 42).unwrap()
}

pub fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebuild");
    group.measurement_time(std::time::Duration::from_secs(5));
    group.sample_size(50);

    for n in [1_000, 10_000, 50_000] {
        let particles = cloud(n);
        let config = TreeConfig::default();
        let mut tree = BinaryTree::new(config).unwrap();

        group.bench_function(format!("tree_{}", n), |b| b.iter(|| {
            tree.update(black_box(&particles)).unwrap();
        }));

        let spacing = UniformGrid::kernel_spacing(&particles, &config, 2.0);
        let mut grid = UniformGrid::default();
        group.bench_function(format!("grid_{}", n), |b| b.iter(|| {
            grid.rebuild(black_box(&particles), spacing).unwrap();
        }));
    }
}

pub fn bench_gather(c: &mut Criterion) {
    let mut group = c.benchmark_group("gather");
    group.measurement_time(std::time::Duration::from_secs(5));
    group.sample_size(50);

    let particles = cloud(20_000);
    let config = TreeConfig::default();
    let mut tree = BinaryTree::new(config).unwrap();
    tree.update(&particles).unwrap();
    let grid = UniformGrid::for_kernel(&particles, &config, 2.0).unwrap();
    let mut buffer = CandidateBuffer::new(4096);

    group.bench_function("tree_sphere", |b| b.iter(|| {
        let mut total = 0;
        for i in (0..particles.n_total()).step_by(20) {
            let p = particles.get(i);
            tree.gather_in_sphere(&p.position, 2.0 * p.h, &mut buffer).unwrap();
            total += buffer.len();
        }
        black_box(total)
    }));

    group.bench_function("tree_cells", |b| b.iter(|| {
        let mut total = 0;
        for cell in tree.active_cells() {
            tree.cell_candidates(cell, &particles, 2.0, &mut buffer).unwrap();
            total += buffer.len();
        }
        black_box(total)
    }));

    group.bench_function("grid_cells", |b| b.iter(|| {
        let mut total = 0;
        for cell in grid.active_cells() {
            grid.cell_candidates(cell, &particles, 2.0, &mut buffer).unwrap();
            total += buffer.len();
        }
        black_box(total)
    }));
}

criterion_group!(benches, bench_rebuild, bench_gather);
criterion_main!(benches);
