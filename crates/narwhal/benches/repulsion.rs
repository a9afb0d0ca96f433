use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use narwhal::{
    BarnesHutApproximation, DirectSum, NodeForceStrategy, Point, SimulationParameters, Vector,
    XorShift64Star,
};
use std::hint::black_box;

fn grid(n: usize) -> Vec<Point> {
    let side = (n as f64).sqrt().ceil() as usize;
    (0..n)
        .map(|i| Point::new((i % side) as f64 * 40.0, (i / side) as f64 * 40.0))
        .collect()
}

fn bench_repulsion(c: &mut Criterion) {
    let mut group = c.benchmark_group("repulsion");
    group.sample_size(20);

    for n in [100usize, 1000, 4000] {
        let positions = grid(n);
        let exact = DirectSum::from_parameters(&SimulationParameters {
            theta: 0.0,
            ..Default::default()
        });
        let approx = BarnesHutApproximation::from_parameters(&SimulationParameters::default());

        group.bench_with_input(BenchmarkId::new("direct_sum", n), &positions, |b, p| {
            let mut forces = vec![Vector::zeros(); p.len()];
            let mut rng = XorShift64Star::new(1);
            b.iter(|| {
                exact.apply(black_box(p), &mut forces, &mut rng);
                black_box(&forces);
            });
        });
        group.bench_with_input(BenchmarkId::new("barnes_hut", n), &positions, |b, p| {
            let mut forces = vec![Vector::zeros(); p.len()];
            let mut rng = XorShift64Star::new(1);
            b.iter(|| {
                approx.apply(black_box(p), &mut forces, &mut rng);
                black_box(&forces);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_repulsion);
criterion_main!(benches);
