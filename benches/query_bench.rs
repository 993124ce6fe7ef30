#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use n3log::{Node, Reasoner, Rule, Triple};

fn ex(name: &str) -> Node {
    Node::iri(format!("http://example.com/{name}"))
}

fn setup_graph() -> Reasoner {
    let mut reasoner = Reasoner::new();

    // Forward edges only, so the closure stays acyclic
    for i in 0..60 {
        for j in 1..=3 {
            let next = i + j;
            if next < 60 {
                reasoner
                    .add_fact(Triple::new(
                        ex(&format!("node_{i}")),
                        ex("edge"),
                        ex(&format!("node_{next}")),
                    ))
                    .unwrap();
            }
        }
    }

    let (x, y, z) = (Node::var("x"), Node::var("y"), Node::var("z"));
    reasoner.add_rule(Rule::new(
        [Triple::new(x.clone(), ex("edge"), y.clone())],
        [Triple::new(x.clone(), ex("path"), y.clone())],
    ));
    reasoner.add_rule(Rule::new(
        [
            Triple::new(x.clone(), ex("path"), y.clone()),
            Triple::new(y, ex("edge"), z.clone()),
        ],
        [Triple::new(x, ex("path"), z)],
    ));

    reasoner.run().unwrap();
    reasoner
}

fn query_specific_paths(c: &mut Criterion) {
    let reasoner = setup_graph();

    c.bench_function("query_specific_paths", |b| {
        b.iter(|| {
            let pattern = Triple::new(ex("node_0"), ex("path"), Node::var("x"));
            black_box(reasoner.query([pattern]))
        });
    });
}

fn query_existence_check(c: &mut Criterion) {
    let reasoner = setup_graph();

    c.bench_function("query_existence_check", |b| {
        b.iter(|| {
            let pattern = Triple::new(ex("node_0"), ex("path"), ex("node_50"));
            black_box(reasoner.ask([pattern]))
        });
    });
}

fn query_two_hop_join(c: &mut Criterion) {
    let reasoner = setup_graph();

    c.bench_function("query_two_hop_join", |b| {
        b.iter(|| {
            let patterns = [
                Triple::new(ex("node_10"), ex("edge"), Node::var("m")),
                Triple::new(Node::var("m"), ex("path"), Node::var("x")),
            ];
            black_box(reasoner.query(patterns))
        });
    });
}

fn query_all_paths(c: &mut Criterion) {
    let reasoner = setup_graph();

    c.bench_function("query_all_paths", |b| {
        b.iter(|| {
            let pattern = Triple::new(Node::var("x"), ex("path"), Node::var("y"));
            black_box(reasoner.query([pattern]))
        });
    });
}

criterion_group!(
    benches,
    query_specific_paths,
    query_existence_check,
    query_two_hop_join,
    query_all_paths
);
criterion_main!(benches);
