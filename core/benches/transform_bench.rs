use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cotext_core::{transform, CodepointText, ConsistencyModel, Transform};

/// Benchmark a single insert into documents of increasing size
fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_insert");

    for size in [100, 1000, 10000].iter() {
        let content = CodepointText::from("aé😀b".repeat(size / 4));
        let t = Transform::insert(size / 2, "x");
        group.bench_with_input(BenchmarkId::from_parameter(size), &content, |b, content| {
            b.iter(|| black_box(transform::apply(&t, content)));
        });
    }

    group.finish();
}

/// Benchmark sequential typing folded into one pending transform
fn bench_merge_typing(c: &mut Criterion) {
    c.bench_function("merge_1000_keystrokes", |b| {
        b.iter(|| {
            let mut pending = Transform::insert(0, "a");
            for i in 1..1000 {
                black_box(transform::merge(&mut pending, &Transform::insert(i, "a")));
            }
            pending
        });
    });
}

/// Benchmark collision of overlapping edits
fn bench_collide(c: &mut Criterion) {
    c.bench_function("collide_overlapping", |b| {
        b.iter(|| {
            let mut remote = Transform::new(6, 3, "543").with_version(2);
            let mut local = Transform::new(6, 11, "0");
            transform::collide(black_box(&mut remote), black_box(&mut local));
        });
    });
}

/// Benchmark a full submit/receive/correct cycle with buffered remote edits
fn bench_model_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("model_cycle");

    for remote in [1u64, 10, 100].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(remote), remote, |b, &remote| {
            b.iter(|| {
                let mut model = ConsistencyModel::new(1);
                model.submit(Transform::insert(0, "local")).unwrap();
                let incoming = (0..remote)
                    .map(|i| Transform::insert(0, "r").with_version(2 + i))
                    .collect();
                model.receive(incoming).unwrap();
                black_box(model.correct(remote + 2).unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_apply,
    bench_merge_typing,
    bench_collide,
    bench_model_cycle
);
criterion_main!(benches);
