use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use deep_map::{Node, Value};
use deep_map_tests::{increment, naive::naive_map};
use pprof::criterion::{Output, PProfProfiler};

// a binary tree where both children of every node are the same node: `depth` composites,
// 2^depth paths, so anything that ignores sharing does exponential work
fn shared_ladder(depth: usize) -> Value {
    let mut tip = Value::array([0]);
    for level in 0..depth {
        tip = Value::object([
            ("left", tip.clone()),
            ("right", tip),
            ("level", Value::Int(level as i64)),
        ]);
    }
    tip
}

// a wide tree with no sharing at all
fn wide_tree(depth: usize, width: usize) -> Value {
    if depth == 0 {
        return Value::array((0..width as i64).collect::<Vec<_>>());
    }
    Value::array((0..width).map(|_| wide_tree(depth - 1, width)).collect::<Vec<_>>())
}

// one long chain of single-member arrays
fn chain(len: usize) -> Node {
    let root = Node::new_array();
    let mut tip = root.clone();
    for _ in 0..len {
        let next = Node::new_array();
        tip.push(next.clone());
        tip = next;
    }
    root
}

fn bench_map(criterion: &mut Criterion) {
    let test_cases = vec![
        ("shared ladder", shared_ladder(64)),
        ("wide tree", wide_tree(4, 8)),
        ("chain", Value::from(chain(1_000))),
    ];

    let mut group = criterion.benchmark_group("map with increment");

    for (name, input) in test_cases.iter() {
        group.bench_with_input(BenchmarkId::new("naive recursion", name), input, |b, input| {
            b.iter(|| naive_map(input, increment))
        });

        group.bench_with_input(BenchmarkId::new("stack machine", name), input, |b, input| {
            b.iter(|| deep_map::map(input, increment))
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .with_profiler(
            PProfProfiler::new(100, Output::Flamegraph(None))
        );
    targets = bench_map
}
criterion_main!(benches);
