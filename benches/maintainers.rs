use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dyn_coreset::{
    CoresetTree, DynamicClustering, Key, LayeredSampling, LpNorm, SlidingWindow, UpdateStream,
};

fn dataset(n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| {
            let group = (i % 4) as f64;
            vec![
                group * 15.0 + (i as f64 * 0.37).sin(),
                (i as f64 * 0.53).cos(),
            ]
        })
        .collect()
}

fn layered(k: usize) -> LayeredSampling<LpNorm> {
    LayeredSampling::new(k, LpNorm::with_jitter(2, 1e-4), 20.0, 0.5, 0.2, 1)
}

fn tree(k: usize) -> CoresetTree<LpNorm> {
    CoresetTree::new(k, LpNorm::euclidean(), 60, 1)
}

fn benchmark_insert_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_throughput");

    for size in [100, 400, 1600].iter() {
        let data = dataset(*size);

        group.bench_with_input(
            BenchmarkId::new("layered", size),
            size,
            |b, _| {
                b.iter_with_setup(
                    || (layered(4), data.clone()),
                    |(mut algo, data)| {
                        for (i, p) in data.into_iter().enumerate() {
                            algo.insert(i as Key, black_box(p));
                        }
                    },
                );
            },
        );

        group.bench_with_input(BenchmarkId::new("tree", size), size, |b, _| {
            b.iter_with_setup(
                || (tree(4), data.clone()),
                |(mut algo, data)| {
                    for (i, p) in data.into_iter().enumerate() {
                        algo.insert(i as Key, black_box(p));
                    }
                },
            );
        });
    }

    group.finish();
}

fn benchmark_cluster_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("cluster_query");

    for size in [200, 800].iter() {
        let data = dataset(*size);

        let mut filled_layered = layered(4);
        let mut filled_tree = tree(4);
        for (i, p) in data.iter().enumerate() {
            filled_layered.insert(i as Key, p.clone());
            filled_tree.insert(i as Key, p.clone());
        }

        group.bench_with_input(
            BenchmarkId::new("layered", size),
            size,
            |b, _| {
                b.iter(|| black_box(filled_layered.cluster()));
            },
        );

        group.bench_with_input(BenchmarkId::new("tree", size), size, |b, _| {
            b.iter(|| black_box(filled_tree.cluster()));
        });
    }

    group.finish();
}

fn benchmark_sliding_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("sliding_window_replay");

    for size in [200, 800].iter() {
        let stream = SlidingWindow::shuffled(dataset(*size), size / 4, 3);

        group.bench_with_input(
            BenchmarkId::new("layered", size),
            size,
            |b, _| {
                b.iter_with_setup(
                    || layered(4),
                    |mut algo| {
                        for i in 0..stream.len() {
                            let u = stream.update(i);
                            if u.is_insert {
                                algo.insert(u.key, u.point);
                            } else {
                                algo.delete(u.key);
                            }
                        }
                    },
                );
            },
        );

        group.bench_with_input(BenchmarkId::new("tree", size), size, |b, _| {
            b.iter_with_setup(
                || tree(4),
                |mut algo| {
                    for i in 0..stream.len() {
                        let u = stream.update(i);
                        if u.is_insert {
                            algo.insert(u.key, u.point);
                        } else {
                            algo.delete(u.key);
                        }
                    }
                },
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_insert_throughput,
    benchmark_cluster_query,
    benchmark_sliding_window
);
criterion_main!(benches);
