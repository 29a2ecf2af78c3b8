use std::sync::Arc;

use ai_bt::{AiRegistry, TreeSpec};
use ai_core::{Agent, BasicCharacter, NodeStateStore, TickContext};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_selector_tick(c: &mut Criterion) {
    let registry = AiRegistry::new();
    let mut spec = TreeSpec::new("bench");
    let root = spec.create_root("PrioritySelector", "root").unwrap();
    for i in 0..31 {
        let node = spec.add_node(root, "Idle{1000}", format!("blocked-{i}")).unwrap();
        spec.set_condition(node, "Not(True)").unwrap();
    }
    spec.add_node(root, "Idle{1000}", "idle").unwrap();
    let tree = spec.build(&registry).unwrap();

    let agent = Arc::new(Agent::new(Arc::new(BasicCharacter::new(1))));
    let mut states = NodeStateStore::new();
    c.bench_function("ai-bt/tick(priority-selector=32)", |b| {
        b.iter(|| {
            let mut ctx = TickContext::new(&agent, &mut states, 16);
            black_box(tree.execute(&mut ctx));
        })
    });
}

fn bench_probability_tick(c: &mut Criterion) {
    let registry = AiRegistry::new();
    let mut spec = TreeSpec::new("bench");
    let weights = vec!["1"; 8].join(",");
    let root = spec
        .create_root(format!("ProbabilitySelector{{{weights}}}"), "root")
        .unwrap();
    for i in 0..8 {
        spec.add_node(root, "Print{}", format!("leaf-{i}")).unwrap();
    }
    let tree = spec.build(&registry).unwrap();

    let agent = Arc::new(Agent::new(Arc::new(BasicCharacter::new(1))));
    let mut states = NodeStateStore::new();
    c.bench_function("ai-bt/tick(probability-selector=8)", |b| {
        b.iter(|| {
            let mut ctx = TickContext::new(&agent, &mut states, 16);
            black_box(tree.execute(&mut ctx));
        })
    });
}

criterion_group!(benches, bench_selector_tick, bench_probability_tick);
criterion_main!(benches);
