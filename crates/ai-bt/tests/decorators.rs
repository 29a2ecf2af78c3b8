use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ai_bt::{Invert, Limit, Parallel, PrioritySelector, Sequence, Task};
use ai_core::{
    Agent, AgentPtr, BasicCharacter, NodeBase, NodeStateStore, TickContext, TreeNode, TreeNodePtr,
    TreeNodeStatus,
};

fn agent() -> AgentPtr {
    Arc::new(Agent::new(Arc::new(BasicCharacter::new(1))))
}

fn base(type_name: &str, parameters: &str) -> NodeBase {
    NodeBase::new(type_name, type_name, parameters, None)
}

fn counting(status: TreeNodeStatus, hits: Arc<AtomicUsize>) -> TreeNodePtr {
    Arc::new(Task::new(base("Task", ""), move |_ctx| {
        hits.fetch_add(1, Ordering::Relaxed);
        status
    }))
}

/// `Running` on the first call, `Failed` on every later one.
fn runs_once_then_fails(hits: Arc<AtomicUsize>) -> TreeNodePtr {
    Arc::new(Task::new(base("Task", ""), move |_ctx| {
        if hits.fetch_add(1, Ordering::Relaxed) == 0 {
            TreeNodeStatus::Running
        } else {
            TreeNodeStatus::Failed
        }
    }))
}

fn limit(amount: u32, child: TreeNodePtr) -> TreeNodePtr {
    Arc::new(Limit::new(base("Limit", &amount.to_string()), vec![child]).unwrap())
}

fn run(node: &TreeNodePtr, agent: &AgentPtr, states: &mut NodeStateStore) -> TreeNodeStatus {
    node.execute(&mut TickContext::new(agent, states, 10))
}

#[test]
fn limit_under_parallel_runs_child_once() {
    let hits = Arc::new(AtomicUsize::new(0));
    let node: TreeNodePtr = Arc::new(Parallel::new(
        base("Parallel", ""),
        vec![limit(1, counting(TreeNodeStatus::Finished, Arc::clone(&hits)))],
    ));

    let agent = agent();
    let mut states = NodeStateStore::new();
    for _ in 0..5 {
        assert_eq!(run(&node, &agent, &mut states), TreeNodeStatus::Finished);
    }
    assert_eq!(hits.load(Ordering::Relaxed), 1);
}

#[test]
fn limit_under_priority_selector_survives_failed_child_reset() {
    let hits = Arc::new(AtomicUsize::new(0));
    let node: TreeNodePtr = Arc::new(PrioritySelector::new(
        base("PrioritySelector", ""),
        vec![limit(1, counting(TreeNodeStatus::Failed, Arc::clone(&hits)))],
    ));

    let agent = agent();
    let mut states = NodeStateStore::new();
    assert_eq!(run(&node, &agent, &mut states), TreeNodeStatus::Failed);
    for _ in 0..4 {
        assert_eq!(run(&node, &agent, &mut states), TreeNodeStatus::Finished);
    }
    assert_eq!(hits.load(Ordering::Relaxed), 1);
}

#[test]
fn limit_under_failing_sequence_stops_after_amount() {
    let limited = Arc::new(AtomicUsize::new(0));
    let after = Arc::new(AtomicUsize::new(0));
    let node: TreeNodePtr = Arc::new(Sequence::new(
        base("Sequence", ""),
        vec![
            limit(2, counting(TreeNodeStatus::Failed, Arc::clone(&limited))),
            counting(TreeNodeStatus::Finished, Arc::clone(&after)),
        ],
    ));

    let agent = agent();
    let mut states = NodeStateStore::new();
    assert_eq!(run(&node, &agent, &mut states), TreeNodeStatus::Failed);
    assert_eq!(run(&node, &agent, &mut states), TreeNodeStatus::Failed);
    for _ in 0..3 {
        assert_eq!(run(&node, &agent, &mut states), TreeNodeStatus::Finished);
    }
    assert_eq!(limited.load(Ordering::Relaxed), 2);
    assert_eq!(after.load(Ordering::Relaxed), 3);
}

#[test]
fn limit_count_survives_explicit_reset() {
    let hits = Arc::new(AtomicUsize::new(0));
    let node = limit(1, counting(TreeNodeStatus::Finished, Arc::clone(&hits)));

    let agent = agent();
    let mut states = NodeStateStore::new();
    run(&node, &agent, &mut states);
    node.reset_state(&mut states);

    let state = states.get(node.id()).copied().unwrap_or_default();
    assert_eq!(state.counter, 1);
    assert_eq!(state.last_status, None);
    assert_eq!(states.len(), 1);

    assert_eq!(run(&node, &agent, &mut states), TreeNodeStatus::Finished);
    assert_eq!(hits.load(Ordering::Relaxed), 1);
}

#[test]
fn limit_under_parallel_keeps_sibling_running() {
    let limited = Arc::new(AtomicUsize::new(0));
    let sibling = Arc::new(AtomicUsize::new(0));
    let node: TreeNodePtr = Arc::new(Parallel::new(
        base("Parallel", ""),
        vec![
            limit(1, counting(TreeNodeStatus::Finished, Arc::clone(&limited))),
            counting(TreeNodeStatus::Running, Arc::clone(&sibling)),
        ],
    ));

    let agent = agent();
    let mut states = NodeStateStore::new();
    for _ in 0..5 {
        assert_eq!(run(&node, &agent, &mut states), TreeNodeStatus::Running);
    }
    assert_eq!(limited.load(Ordering::Relaxed), 1);
    assert_eq!(sibling.load(Ordering::Relaxed), 5);
}

#[test]
fn invert_under_sequence_reenters_from_scratch_after_reset() {
    let first = Arc::new(AtomicUsize::new(0));
    let flaky = Arc::new(AtomicUsize::new(0));
    let tail = Arc::new(AtomicUsize::new(0));
    let inner: TreeNodePtr = Arc::new(Sequence::new(
        base("Sequence", ""),
        vec![
            counting(TreeNodeStatus::Finished, Arc::clone(&first)),
            runs_once_then_fails(Arc::clone(&flaky)),
        ],
    ));
    let invert: TreeNodePtr =
        Arc::new(Invert::new(base("Invert", ""), vec![inner.clone()]).unwrap());
    let node: TreeNodePtr = Arc::new(Sequence::new(
        base("Sequence", ""),
        vec![invert, counting(TreeNodeStatus::Finished, Arc::clone(&tail))],
    ));

    let agent = agent();
    let mut states = NodeStateStore::new();

    assert_eq!(run(&node, &agent, &mut states), TreeNodeStatus::Running);
    assert_eq!(states.selected(inner.id()), Some(1));

    // Resumes the inner sequence at the running child, which now fails and gets inverted.
    assert_eq!(run(&node, &agent, &mut states), TreeNodeStatus::Finished);
    assert_eq!(first.load(Ordering::Relaxed), 1);
    assert_eq!(states.selected(inner.id()), None);
    assert_eq!(tail.load(Ordering::Relaxed), 1);

    // Starts over at the first inner child.
    assert_eq!(run(&node, &agent, &mut states), TreeNodeStatus::Finished);
    assert_eq!(first.load(Ordering::Relaxed), 2);
    assert_eq!(flaky.load(Ordering::Relaxed), 3);
    assert_eq!(tail.load(Ordering::Relaxed), 2);
}

#[test]
fn invert_under_parallel_is_reset_once_nothing_runs() {
    let hits = Arc::new(AtomicUsize::new(0));
    let invert: TreeNodePtr = Arc::new(
        Invert::new(base("Invert", ""), vec![runs_once_then_fails(Arc::clone(&hits))]).unwrap(),
    );
    let node: TreeNodePtr = Arc::new(Parallel::new(base("Parallel", ""), vec![invert.clone()]));

    let agent = agent();
    let mut states = NodeStateStore::new();
    assert_eq!(run(&node, &agent, &mut states), TreeNodeStatus::Running);
    assert_eq!(states.last_status(invert.id()), Some(TreeNodeStatus::Running));

    assert_eq!(run(&node, &agent, &mut states), TreeNodeStatus::Finished);
    assert_eq!(states.last_status(invert.id()), None);
    assert_eq!(hits.load(Ordering::Relaxed), 2);
}
